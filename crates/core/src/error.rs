use thiserror::Error;

pub type OfferPulseResult<T> = Result<T, OfferPulseError>;

#[derive(Error, Debug)]
pub enum OfferPulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Beacon error: {0}")]
    Beacon(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
