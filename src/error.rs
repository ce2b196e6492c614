use thiserror::Error;

/// Rejections raised while checking an imported payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid JSON payload: {0}")]
    Malformed(String),

    #[error("invalid JSON payload: must be array")]
    NotAnArray,

    /// `index` is 1-based.
    #[error("item {index} is missing fields: {}", missing.join(", "))]
    MissingFields { index: usize, missing: Vec<String> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("assistant service unavailable: {0}")]
    ServiceUnavailable(String),
}
