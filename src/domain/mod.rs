pub mod account;
pub mod authorizer;
pub mod ledger;
pub mod ports;
