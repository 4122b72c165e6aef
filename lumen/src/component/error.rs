//! Component-level error types.

use thiserror::Error;

/// An enumeration of component errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter value outside the component's valid range.
    #[error("invalid parameter: {0}")]
    InvalidParams(String),
}
