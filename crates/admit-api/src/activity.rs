//! `GET /activity[?limit=<n>]`: the audit trail, newest first. Admin only.

use admit_core::store::AdmissionsStore;
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{Admin, Authorized},
  error::ApiError,
  success,
};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /activity`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Admin>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let entries = state
    .store
    .list_activity(limit)
    .await
    .map_err(ApiError::store)?;
  Ok(success(json!({ "activity": entries })))
}
