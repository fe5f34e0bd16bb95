//! Error types for `admit-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid review status: {0:?}")]
  InvalidStatus(String),

  #[error("invalid role: {0:?}")]
  InvalidRole(String),

  #[error("rating must be between 0.0 and 10.0, got {0}")]
  RatingOutOfRange(f64),

  #[error("rating must have at most one decimal place, got {0}")]
  RatingPrecision(f64),

  #[error("invalid session code: {0:?}")]
  InvalidSessionCode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
