//! Handlers for `/sessions` and `/statuses`.

use admit_core::{review::ReviewStatus, store::AdmissionsStore};
use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{Authorized, Viewer},
  error::ApiError,
  success,
};

/// `GET /sessions`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Viewer>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let sessions = state.store.list_sessions().await.map_err(ApiError::store)?;
  Ok(success(json!({ "sessions": sessions })))
}

/// `GET /statuses`: the review workflow in order.
pub async fn statuses<S>(_caller: Authorized<Viewer>) -> Json<Value>
where
  S: AdmissionsStore,
{
  success(json!({ "statuses": ReviewStatus::all() }))
}
