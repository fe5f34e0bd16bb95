//! JSON REST API for Admit.
//!
//! Exposes an axum [`Router`] backed by any
//! [`admit_core::store::AdmissionsStore`]. Every route except login is
//! gated by an [`auth::Authorized`] extractor naming its minimum role.
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", admit_api::api_router(state))
//! ```

pub mod activity;
pub mod applicants;
pub mod auth;
pub mod error;
pub mod export;
pub mod login;
pub mod ratings;
pub mod sessions;
pub mod upload;
pub mod users;

use std::sync::Arc;

use admit_core::store::AdmissionsStore;
use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use serde_json::{Value, json};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings the HTTP layer needs from the server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub session_ttl_hours: i64,
  pub max_upload_bytes:  usize,
  pub cookie_secure:     bool,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      session_ttl_hours: 12,
      max_upload_bytes:  16 * 1024 * 1024,
      cookie_secure:     false,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers and extractors.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig) -> Self {
    Self { store, config: Arc::new(config) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

/// Wrap `fields` in the `{"success": true, ...}` envelope.
pub(crate) fn success(fields: Value) -> Json<Value> {
  let mut body = json!({ "success": true });
  if let (Value::Object(body), Value::Object(fields)) = (&mut body, fields) {
    body.extend(fields);
  }
  Json(body)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: AdmissionsStore + 'static,
{
  let upload_limit = state.config.max_upload_bytes;

  Router::new()
    // Auth
    .route("/auth/login", post(login::login::<S>))
    .route("/auth/logout", post(login::logout::<S>))
    .route("/auth/me", get(login::me::<S>))
    // Sessions & statuses
    .route("/sessions", get(sessions::list::<S>))
    .route("/statuses", get(sessions::statuses::<S>))
    // Applicants
    .route("/applicants", get(applicants::list::<S>))
    .route("/applicants/{user_code}", get(applicants::get_one::<S>))
    .route("/applicants/{user_code}/review", put(applicants::review::<S>))
    .route("/applicants/{user_code}/status", put(applicants::set_status::<S>))
    .route("/applicants/{user_code}/english", post(applicants::english::<S>))
    // Ratings
    .route("/applicants/{user_code}/ratings", get(ratings::list::<S>))
    .route(
      "/applicants/{user_code}/rating",
      put(ratings::upsert::<S>).delete(ratings::remove::<S>),
    )
    // English
    .route("/english/recompute", post(applicants::recompute_english::<S>))
    // Ingestion & export
    .route(
      "/upload",
      post(upload::handler::<S>).layer(DefaultBodyLimit::max(upload_limit)),
    )
    .route("/export", get(export::handler::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route("/users/{id}", axum::routing::delete(users::remove::<S>))
    .route("/users/{id}/role", put(users::set_role::<S>))
    // Activity
    .route("/activity", get(activity::list::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
