//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"username":"..","password":".."}`; sets the session cookie |
//! | `POST` | `/auth/logout` | Ends the current session |
//! | `GET`  | `/auth/me` | The logged-in user |

use admit_core::{
  activity::{ActivityAction, NewActivity},
  store::AdmissionsStore,
};
use axum::{
  Json,
  extract::State,
  http::header,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
  AppState,
  auth::{self, Authorized, Viewer},
  error::ApiError,
  success,
};

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdmissionsStore,
{
  let username = body.username.trim();
  let user = state
    .store
    .find_user(username.to_owned())
    .await
    .map_err(ApiError::store)?;

  let Some(user) = user.filter(|u| auth::verify_password(&body.password, &u.password_hash))
  else {
    warn!(username, "failed login");
    return Err(ApiError::Unauthorized);
  };

  let ttl = Duration::hours(state.config.session_ttl_hours);
  let token = auth::generate_token();
  state
    .store
    .create_auth_session(auth::hash_token(&token), user.id, Utc::now() + ttl)
    .await
    .map_err(ApiError::store)?;

  state
    .store
    .log_activity(NewActivity::new(Some(user.id), ActivityAction::Login))
    .await
    .map_err(ApiError::store)?;
  info!(username = %user.username, role = %user.role, "login");

  let cookie = auth::session_cookie(&token, ttl.num_seconds(), state.config.cookie_secure);
  Ok(([(header::SET_COOKIE, cookie)], success(json!({ "user": user }))))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Viewer>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdmissionsStore,
{
  state
    .store
    .delete_auth_session(caller.token_hash)
    .await
    .map_err(ApiError::store)?;
  state
    .store
    .log_activity(NewActivity::new(Some(caller.user.id), ActivityAction::Logout))
    .await
    .map_err(ApiError::store)?;

  let cookie = auth::clear_cookie(state.config.cookie_secure);
  Ok(([(header::SET_COOKIE, cookie)], success(json!({ "message": "Logged out" }))))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S>(caller: Authorized<Viewer>) -> Json<serde_json::Value>
where
  S: AdmissionsStore,
{
  success(json!({ "user": caller.user }))
}
