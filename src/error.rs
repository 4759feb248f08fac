use thiserror::Error;

/// Failures surfaced by block-decision operations
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("invalid country code '{0}': use a 2-letter ISO code (e.g., US)")]
    InvalidCountryCode(String),

    #[error("duration must be between 1 and 1440 minutes, got {0}")]
    InvalidDuration(i64),

    #[error("country '{0}' is already permanently blocked")]
    AlreadyPermanentlyBlocked(String),

    #[error("country '{0}' is already temporarily blocked")]
    AlreadyTemporallyBlocked(String),

    #[error("country '{0}' is not blocked")]
    NotFound(String),

    #[error("store rejected the update for '{0}'")]
    StoreFailure(String),
}

pub type Result<T> = std::result::Result<T, BlockError>;
