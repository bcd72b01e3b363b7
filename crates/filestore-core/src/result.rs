//! Convenience result type alias for filestore.

use crate::error::AppError;

/// A specialized `Result` type for filestore operations.
pub type AppResult<T> = Result<T, AppError>;
