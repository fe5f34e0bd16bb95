//! Handlers for `/users` endpoints. Admin only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | |
//! | `POST`   | `/users` | Body: `{"username":"..","password":"..","role":"faculty"}` |
//! | `PUT`    | `/users/{id}/role` | Body: `{"role":"admin"}` |
//! | `DELETE` | `/users/{id}` | Also ends the user's sessions and removes their ratings |

use admit_core::{
  activity::{ActivityAction, NewActivity},
  role::{NewUser, Role},
  store::AdmissionsStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
  AppState,
  auth::{self, Admin, Authorized},
  error::ApiError,
  success,
};

fn parse_role(role: &str) -> Result<Role, ApiError> {
  role
    .trim()
    .parse()
    .map_err(|_| admit_core::Error::InvalidRole(role.to_owned()).into())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Admin>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  Ok(success(json!({ "users": users })))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username: String,
  pub password: String,
  pub role:     String,
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdmissionsStore,
{
  let username = body.username.trim().to_owned();
  if username.is_empty() || body.password.is_empty() {
    return Err(ApiError::BadRequest("username and password are required".into()));
  }
  let role = parse_role(&body.role)?;

  let password_hash = auth::hash_password(&body.password)?;
  let user = state
    .store
    .create_user(NewUser { username: username.clone(), password_hash, role })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest(format!("username {username:?} is taken")))?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::UserCreated)
        .target(&user.username)
        .details(role.as_ref()),
    )
    .await
    .map_err(ApiError::store)?;
  info!(username = %user.username, %role, by = %caller.user.username, "user created");

  Ok((StatusCode::CREATED, success(json!({ "user": user }))))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: String,
}

/// `PUT /users/{id}/role`
pub async fn set_role<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
  Path(id): Path<i64>,
  Json(body): Json<RoleBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let role = parse_role(&body.role)?;
  if id == caller.user.id && role != Role::Admin {
    return Err(ApiError::BadRequest("admins cannot demote themselves".into()));
  }

  let user = state
    .store
    .set_user_role(id, role)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::UserRoleChanged)
        .target(&user.username)
        .details(role.as_ref()),
    )
    .await
    .map_err(ApiError::store)?;
  info!(username = %user.username, %role, by = %caller.user.username, "user role changed");

  Ok(success(json!({ "user": user })))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /users/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  if id == caller.user.id {
    return Err(ApiError::BadRequest("admins cannot delete themselves".into()));
  }

  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  state.store.delete_user(id).await.map_err(ApiError::store)?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::UserDeleted).target(&user.username),
    )
    .await
    .map_err(ApiError::store)?;
  info!(username = %user.username, by = %caller.user.username, "user deleted");

  Ok(success(json!({ "message": format!("Deleted user {}", user.username) })))
}
