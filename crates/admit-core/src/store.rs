//! The `AdmissionsStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `admit-store-sqlite`).
//! The HTTP layer and the server binary depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  activity::{ActivityEntry, NewActivity},
  applicant::{ApplicantRecord, Session, SessionKey},
  english::{EnglishOutcome, EnglishStatus},
  review::{ApplicationInfo, NewRating, Rating, ReviewStatus, ReviewUpdate},
  role::{NewUser, Role, User},
  view::{ApplicantDetail, ApplicantOverview},
};

// ─── Ingestion types ─────────────────────────────────────────────────────────

/// A parsed upload: every record attaches to the one session resolved from
/// the first valid row.
#[derive(Debug, Clone)]
pub struct ImportBatch {
  pub session:      SessionKey,
  pub records:      Vec<ApplicantRecord>,
  /// Rows skipped for a blank `User Code` or an undecodable line.
  pub dropped_rows: usize,
}

/// What an import did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
  pub session_id:      i64,
  pub session_created: bool,
  /// Applicant rows written.
  pub processed:       usize,
  pub dropped:         usize,
  /// Sub-records whose tracked columns actually changed (or were new).
  pub changed:         usize,
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`AdmissionsStore::list_applicants`].
#[derive(Debug, Clone, Default)]
pub struct ApplicantQuery {
  pub session_id:     Option<i64>,
  pub status:         Option<ReviewStatus>,
  pub english_status: Option<EnglishStatus>,
  /// Substring match over user code, names and email.
  pub search:         Option<String>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an admissions store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Lookups that can
/// miss return `Option`; `Err` is reserved for backend failures.
pub trait AdmissionsStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sessions & ingestion ──────────────────────────────────────────────

  fn list_sessions(&self) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  /// Resolve the batch's session, upsert every record with change
  /// detection, refresh derived fields and English status. Atomic: any
  /// failure leaves the store untouched.
  fn import_batch(
    &self,
    batch: ImportBatch,
  ) -> impl Future<Output = Result<ImportSummary, Self::Error>> + Send + '_;

  // ── Applicants ────────────────────────────────────────────────────────

  fn list_applicants(
    &self,
    query: ApplicantQuery,
  ) -> impl Future<Output = Result<Vec<ApplicantOverview>, Self::Error>> + Send + '_;

  fn get_applicant(
    &self,
    user_code: String,
  ) -> impl Future<Output = Result<Option<ApplicantDetail>, Self::Error>> + Send + '_;

  /// Apply reviewer edits. Returns `None` for an unknown applicant.
  fn update_review(
    &self,
    user_code: String,
    update: ReviewUpdate,
  ) -> impl Future<Output = Result<Option<ApplicationInfo>, Self::Error>> + Send + '_;

  /// Move an applicant through the workflow. Returns `None` for an unknown
  /// applicant.
  fn set_review_status(
    &self,
    user_code: String,
    status: ReviewStatus,
  ) -> impl Future<Output = Result<Option<ApplicationInfo>, Self::Error>> + Send + '_;

  // ── English ───────────────────────────────────────────────────────────

  /// Re-evaluate and persist one applicant's English status. Returns
  /// `None` for an unknown applicant.
  fn compute_english_status(
    &self,
    user_code: String,
  ) -> impl Future<Output = Result<Option<EnglishOutcome>, Self::Error>> + Send + '_;

  /// Re-evaluate every known applicant; returns how many were evaluated.
  fn recompute_all_english(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Ratings ───────────────────────────────────────────────────────────

  fn list_ratings(
    &self,
    user_code: String,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + '_;

  /// Insert or replace the reviewer's rating. Returns `None` for an
  /// unknown applicant.
  fn upsert_rating(
    &self,
    rating: NewRating,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// Returns `true` if a rating was removed.
  fn delete_rating(
    &self,
    user_id: i64,
    user_code: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Users & auth sessions ─────────────────────────────────────────────

  /// Returns `None` if the username (compared case-insensitively) is taken.
  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn set_user_role(
    &self,
    id: i64,
    role: Role,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Deletes the user with their auth sessions and ratings. Returns `true`
  /// if the user existed.
  fn delete_user(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Persist a login session keyed by the hash of its cookie token.
  fn create_auth_session(
    &self,
    token_hash: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user owning an unexpired session, if any.
  fn user_for_session(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn delete_auth_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Activity log ──────────────────────────────────────────────────────

  fn log_activity(
    &self,
    entry: NewActivity,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// Most recent entries first.
  fn list_activity(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;
}
