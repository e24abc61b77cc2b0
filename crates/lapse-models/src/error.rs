//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("outputSeconds must be one of 15, 30, 45, 60, 90, 120 (got {0})")]
    InvalidOutputSeconds(i64),

    #[error("aspectRatio must be one of 9:16, 1:1, 4:5, 16:9 (got {0:?})")]
    InvalidAspectRatio(String),
}
