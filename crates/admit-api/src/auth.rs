//! Cookie sessions, password hashing and the role-gated [`Authorized`]
//! extractor.
//!
//! A login issues a random token in the `admit_session` cookie. Only the
//! SHA-256 of the token is stored.

use std::marker::PhantomData;

use admit_core::{
  role::{Role, User},
  store::AdmissionsStore,
};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "admit_session";

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Type-level minimum role for [`Authorized`].
pub trait MinRole {
  const ROLE: Role;
}

pub struct Viewer;
pub struct Faculty;
pub struct Admin;

impl MinRole for Viewer {
  const ROLE: Role = Role::Viewer;
}

impl MinRole for Faculty {
  const ROLE: Role = Role::Faculty;
}

impl MinRole for Admin {
  const ROLE: Role = Role::Admin;
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The logged-in user, holding at least role `R`. Rejects with 401 when no
/// live session is presented and 403 when the role is too low, before the
/// handler touches any data.
pub struct Authorized<R> {
  pub user:       User,
  pub token_hash: String,
  _role:          PhantomData<fn() -> R>,
}

impl<S, R> FromRequestParts<AppState<S>> for Authorized<R>
where
  S: AdmissionsStore,
  R: MinRole,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let token_hash = hash_token(token);

    let user = state
      .store
      .user_for_session(token_hash.clone(), Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    if !user.role.at_least(R::ROLE) {
      tracing::debug!(username = %user.username, required = %R::ROLE, "role check failed");
      return Err(ApiError::Forbidden);
    }

    Ok(Authorized { user, token_hash, _role: PhantomData })
  }
}

// ─── Cookies & tokens ────────────────────────────────────────────────────────

/// The `admit_session` value from the `Cookie` header(s), if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value)
    .filter(|value| !value.is_empty())
}

/// 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// A `Set-Cookie` value carrying `token` for `max_age_secs`.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
  let mut cookie =
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
  if secure {
    cookie.push_str("; Secure");
  }
  cookie
}

/// A `Set-Cookie` value that expires the session cookie.
pub fn clear_cookie(secure: bool) -> String { session_cookie("", 0, secure) }

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// `false` for a wrong password or an unparseable stored hash.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}
