//! Application layer containing the core business logic orchestration.
//!
//! This module defines the [`coordinator::PaymentCoordinator`], the single
//! entry point for balance mutations, and the [`recorder::TransactionRecorder`]
//! which offloads ledger appends to a background task so they never sit on the
//! payment path.

pub mod coordinator;
pub mod provisioning;
pub mod recorder;
