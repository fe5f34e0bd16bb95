//! `GET /export[?session_id=<id>][&format=csv|xlsx]`: the applicant list as
//! a CSV or Excel download.

use admit_core::store::{AdmissionsStore, ApplicantQuery};
use axum::{
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authorized, Viewer},
  error::ApiError,
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  pub session_id: Option<i64>,
  /// `csv` (the default) or `xlsx`.
  pub format:     Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
  Csv,
  Xlsx,
}

impl ExportFormat {
  fn parse(format: Option<&str>) -> Result<Self, ApiError> {
    match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
      None | Some("") | Some("csv") => Ok(Self::Csv),
      Some("xlsx") | Some("excel") => Ok(Self::Xlsx),
      Some(other) => Err(ApiError::BadRequest(format!("unknown export format: {other:?}"))),
    }
  }

  fn extension(self) -> &'static str {
    match self {
      Self::Csv => "csv",
      Self::Xlsx => "xlsx",
    }
  }

  fn content_type(self) -> &'static str {
    match self {
      Self::Csv => "text/csv; charset=utf-8",
      Self::Xlsx => XLSX_CONTENT_TYPE,
    }
  }
}

/// `GET /export`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  _caller: Authorized<Viewer>,
  Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdmissionsStore,
{
  let format = ExportFormat::parse(params.format.as_deref())?;
  let query = ApplicantQuery { session_id: params.session_id, ..Default::default() };
  let applicants = state
    .store
    .list_applicants(query)
    .await
    .map_err(ApiError::store)?;

  let body = match format {
    ExportFormat::Csv => admit_csv::write_report(&applicants),
    ExportFormat::Xlsx => admit_csv::write_report_xlsx(&applicants),
  }
  .map_err(ApiError::store)?;

  let stem = match params.session_id {
    Some(id) => format!("applicants-session-{id}"),
    None => "applicants".to_owned(),
  };
  let filename = format!("{stem}.{}", format.extension());

  Ok((
    [
      (header::CONTENT_TYPE, format.content_type().to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    body,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_defaults_to_csv() {
    assert_eq!(ExportFormat::parse(None).unwrap(), ExportFormat::Csv);
    assert_eq!(ExportFormat::parse(Some("CSV")).unwrap(), ExportFormat::Csv);
    assert_eq!(ExportFormat::parse(Some("xlsx")).unwrap(), ExportFormat::Xlsx);
    assert!(matches!(ExportFormat::parse(Some("pdf")), Err(ApiError::BadRequest(_))));
  }
}
