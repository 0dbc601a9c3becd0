use thiserror::Error;

/// Errors raised by a data provider at the fetch boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Data unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug)]
pub enum MesoError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid trade date: {0}")]
    InvalidDate(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
