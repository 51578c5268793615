//! Error type for the physical network model.
//!
//! Algorithm crates wrap [`GridError`] in their own error enums so that model
//! failures propagate with `?` up to the API boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// A graph slot does not hold the element kind the caller expected
    #[error("Network error: {0}")]
    Network(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GridResult<T> = Result<T, GridError>;
