//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler or extractor.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("insufficient permissions")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<admit_core::Error> for ApiError {
  fn from(e: admit_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl From<admit_csv::Error> for ApiError {
  fn from(e: admit_csv::Error) -> Self {
    if e.is_validation() {
      ApiError::BadRequest(e.to_string())
    } else {
      ApiError::store(e)
    }
  }
}

impl From<MultipartError> for ApiError {
  fn from(e: MultipartError) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = match &self {
      ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Internal(m) => m.clone(),
      ApiError::Store(e) => e.to_string(),
      other => other.to_string(),
    };
    if let ApiError::Store(e) = &self {
      tracing::error!(error = %e, "store failure");
    }
    (self.status(), Json(json!({ "success": false, "message": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_errors_to_status_codes() {
    assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);

    let invalid = ApiError::from(admit_core::Error::InvalidStatus("Accepted".into()));
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let csv = ApiError::from(admit_csv::Error::MissingColumn("user code"));
    assert_eq!(csv.status(), StatusCode::BAD_REQUEST);
  }
}
