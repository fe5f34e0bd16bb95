//! Handlers for `/applicants` endpoints and English re-evaluation.
//!
//! | Method | Path | Role | Notes |
//! |--------|------|------|-------|
//! | `GET`  | `/applicants` | Viewer | `?session_id&status&english_status&search&limit&offset` |
//! | `GET`  | `/applicants/{user_code}` | Viewer | 404 if unknown |
//! | `PUT`  | `/applicants/{user_code}/review` | Faculty | Body: any of `cs`, `stat`, `math`, `gpa`, `comment` |
//! | `PUT`  | `/applicants/{user_code}/status` | Admin | Body: `{"status":"Reviewed"}` |
//! | `POST` | `/applicants/{user_code}/english` | Faculty | Re-evaluate one applicant |
//! | `POST` | `/english/recompute` | Admin | Re-evaluate everyone |

use admit_core::{
  activity::{ActivityAction, NewActivity},
  english::EnglishStatus,
  review::{ReviewStatus, ReviewUpdate},
  store::{AdmissionsStore, ApplicantQuery},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
  AppState,
  auth::{Admin, Authorized, Faculty, Viewer},
  error::ApiError,
  success,
};

fn not_found(user_code: &str) -> ApiError {
  ApiError::NotFound(format!("applicant {user_code:?} not found"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub session_id:     Option<i64>,
  pub status:         Option<String>,
  pub english_status: Option<String>,
  pub search:         Option<String>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

impl ListParams {
  /// Validate the string filters into a store query.
  pub fn into_query(self) -> Result<ApplicantQuery, ApiError> {
    let status = self
      .status
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      .map(ReviewStatus::parse)
      .transpose()?;
    let english_status = self
      .english_status
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      .map(|s| {
        s.trim()
          .parse::<EnglishStatus>()
          .map_err(|_| ApiError::BadRequest(format!("invalid English status: {s:?}")))
      })
      .transpose()?;
    let search = self.search.filter(|s| !s.trim().is_empty());

    Ok(ApplicantQuery {
      session_id: self.session_id,
      status,
      english_status,
      search,
      limit: self.limit,
      offset: self.offset,
    })
  }
}

/// `GET /applicants`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Viewer>,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let query = params.into_query()?;
  let applicants = state
    .store
    .list_applicants(query)
    .await
    .map_err(ApiError::store)?;
  Ok(success(json!({ "count": applicants.len(), "applicants": applicants })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /applicants/{user_code}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Viewer>,
  Path(user_code): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let applicant = state
    .store
    .get_applicant(user_code.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&user_code))?;
  Ok(success(json!({ "applicant": applicant })))
}

// ─── Review ───────────────────────────────────────────────────────────────────

/// `PUT /applicants/{user_code}/review`
pub async fn review<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Faculty>,
  Path(user_code): Path<String>,
  Json(update): Json<ReviewUpdate>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  if update.is_empty() {
    return Err(ApiError::BadRequest("no review fields supplied".into()));
  }

  let application = state
    .store
    .update_review(user_code.clone(), update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&user_code))?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::ReviewUpdate).target(&user_code),
    )
    .await
    .map_err(ApiError::store)?;

  Ok(success(json!({ "application": application })))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

/// `PUT /applicants/{user_code}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
  Path(user_code): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let status = ReviewStatus::parse(&body.status)?;

  let application = state
    .store
    .set_review_status(user_code.clone(), status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&user_code))?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::StatusChange)
        .target(&user_code)
        .details(status.as_ref()),
    )
    .await
    .map_err(ApiError::store)?;
  info!(%user_code, %status, by = %caller.user.username, "review status changed");

  Ok(success(json!({ "application": application })))
}

// ─── English ──────────────────────────────────────────────────────────────────

/// `POST /applicants/{user_code}/english`
pub async fn english<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Faculty>,
  Path(user_code): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let outcome = state
    .store
    .compute_english_status(user_code.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&user_code))?;

  Ok(success(json!({
    "english_status":      outcome.status,
    "english_description": outcome.description,
    "english":             outcome.english(),
  })))
}

/// `POST /english/recompute`
pub async fn recompute_english<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let evaluated = state
    .store
    .recompute_all_english()
    .await
    .map_err(ApiError::store)?;

  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::EnglishRecompute)
        .details(format!("{evaluated} applicants evaluated")),
    )
    .await
    .map_err(ApiError::store)?;
  info!(evaluated, "English status recomputed");

  Ok(success(json!({ "evaluated": evaluated })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_filters_are_ignored() {
    let params = ListParams {
      status: Some(" ".into()),
      english_status: Some(String::new()),
      search: Some("  ".into()),
      ..Default::default()
    };
    let query = params.into_query().unwrap();
    assert!(query.status.is_none());
    assert!(query.english_status.is_none());
    assert!(query.search.is_none());
  }

  #[test]
  fn filters_parse_display_names() {
    let params = ListParams {
      status: Some("Send Offer to CoGS".into()),
      english_status: Some("Not Met".into()),
      ..Default::default()
    };
    let query = params.into_query().unwrap();
    assert_eq!(query.status, Some(ReviewStatus::SendOfferToCogs));
    assert_eq!(query.english_status, Some(EnglishStatus::NotMet));
  }

  #[test]
  fn unknown_filters_are_rejected() {
    let params = ListParams { status: Some("Accepted".into()), ..Default::default() };
    assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));

    let params = ListParams { english_status: Some("Maybe".into()), ..Default::default() };
    assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));
  }
}
