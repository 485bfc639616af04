use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxError {
    #[error("Transactions are required and must not be empty")]
    EmptyTransactions,

    #[error("Country is required")]
    MissingCountry,

    #[error("Unsupported jurisdiction: {0}")]
    UnknownJurisdiction(String),

    #[error("Invalid date for transaction {id}: {value}")]
    InvalidDate { id: String, value: String },

    #[error("Invalid tax rule table: {0}")]
    InvalidRuleBook(String),

    #[error("Failed to read tax rule table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse tax rule table: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TaxError {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TaxError::EmptyTransactions
                | TaxError::MissingCountry
                | TaxError::UnknownJurisdiction(_)
                | TaxError::InvalidDate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TaxError>;
