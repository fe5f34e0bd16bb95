//! `POST /upload`: multipart CSV ingestion.
//!
//! The form field `file` carries the extract. The whole file is parsed
//! before the store is touched, so a malformed upload changes nothing.

use admit_core::{
  activity::{ActivityAction, NewActivity},
  store::AdmissionsStore,
};
use axum::{
  Json,
  extract::{Multipart, State},
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
  AppState,
  auth::{Admin, Authorized},
  error::ApiError,
  success,
};

pub const FILE_FIELD: &str = "file";

/// `POST /upload`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  caller: Authorized<Admin>,
  mut multipart: Multipart,
) -> Result<Json<Value>, ApiError>
where
  S: AdmissionsStore,
{
  let mut upload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(FILE_FIELD) {
      let filename = field.file_name().map(str::to_owned);
      upload = Some((filename, field.bytes().await?));
      break;
    }
  }
  let (filename, bytes) =
    upload.ok_or_else(|| ApiError::BadRequest(format!("missing form field {FILE_FIELD:?}")))?;

  let batch = admit_csv::parse_upload(&bytes)?;
  let session_name = batch.session.name();

  let summary = state
    .store
    .import_batch(batch)
    .await
    .map_err(ApiError::store)?;

  let details = format!(
    "{} processed, {} dropped, {} changed",
    summary.processed, summary.dropped, summary.changed
  );
  state
    .store
    .log_activity(
      NewActivity::new(Some(caller.user.id), ActivityAction::DataImport)
        .target(&session_name)
        .details(&details),
    )
    .await
    .map_err(ApiError::store)?;
  info!(
    session = %session_name,
    file = filename.as_deref().unwrap_or("-"),
    by = %caller.user.username,
    "{details}"
  );

  Ok(success(json!({
    "message": format!("Imported {} applicants into {session_name}", summary.processed),
    "summary": summary,
  })))
}
