#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt consent record: {0}")]
    CorruptRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Misconfigured host: {0}")]
    MisconfiguredHost(String),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for ConsentError {
    fn from(error: serde_json::Error) -> Self {
        ConsentError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsentError>;
