//! Handlers for reviewer ratings.
//!
//! | Method   | Path | Role | Notes |
//! |----------|------|------|-------|
//! | `GET`    | `/applicants/{user_code}/ratings` | Viewer | Every reviewer's rating |
//! | `PUT`    | `/applicants/{user_code}/rating` | Faculty | Body: `{"rating":7.5,"comment":".."}` |
//! | `DELETE` | `/applicants/{user_code}/rating` | Faculty | Removes the caller's own rating |

use admit_core::{review::NewRating, store::AdmissionsStore};
use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{Authorized, Faculty, Viewer},
  error::ApiError,
  success,
};

/// `GET /applicants/{user_code}/ratings`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Viewer>,
  Path(user_code): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let ratings = state
    .store
    .list_ratings(user_code)
    .await
    .map_err(ApiError::store)?;

  let average = (!ratings.is_empty())
    .then(|| ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64);
  Ok(success(json!({ "ratings": ratings, "average": average })))
}

#[derive(Debug, Deserialize)]
pub struct RatingBody {
  pub rating:  f64,
  #[serde(default)]
  pub comment: Option<String>,
}

/// `PUT /applicants/{user_code}/rating`
pub async fn upsert<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Faculty>,
  Path(user_code): Path<String>,
  Json(body): Json<RatingBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let comment = body.comment.filter(|c| !c.trim().is_empty());
  let rating = NewRating::new(caller.user.id, user_code.clone(), body.rating, comment)?;

  let rating = state
    .store
    .upsert_rating(rating)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("applicant {user_code:?} not found")))?;
  Ok(success(json!({ "rating": rating })))
}

/// `DELETE /applicants/{user_code}/rating`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Faculty>,
  Path(user_code): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let removed = state
    .store
    .delete_rating(caller.user.id, user_code.clone())
    .await
    .map_err(ApiError::store)?;

  if !removed {
    return Err(ApiError::NotFound(format!("no rating of {user_code:?} to delete")));
  }
  Ok(success(json!({ "message": "Rating deleted" })))
}
