use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failure taxonomy for the simulator.
///
/// Each variant maps to a stable discriminator (see [`PaymentError::kind`]) so
/// transport adapters can distinguish failure classes without parsing
/// messages. Declined-by-insufficient-funds is not represented here: a
/// declined payment is a normal result, not an error.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Malformed or missing input. No store access was attempted.
    #[error("{0}")]
    Validation(String),
    /// The referenced account or card does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A card was found but its expiry/CVV did not match the stored values.
    #[error("{0}")]
    CardAuthentication(String),
    /// Mutually exclusive fields were supplied together.
    #[error("{0}")]
    Conflict(String),
    /// The underlying store was unavailable or a write failed.
    #[error("storage failure: {0}")]
    Persistence(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PaymentError {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "validation_error",
            PaymentError::NotFound(_) => "not_found",
            PaymentError::CardAuthentication(_) => "card_authentication_failed",
            PaymentError::Conflict(_) => "conflict",
            PaymentError::Persistence(_) => "persistence_error",
            PaymentError::Csv(_) => "csv_error",
            PaymentError::Io(_) => "io_error",
        }
    }
}
