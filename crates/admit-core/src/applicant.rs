//! Applicant records as they arrive from the admissions-system extract.
//!
//! One [`ApplicantRecord`] bundles every sub-record an upload row carries
//! for a single `user_code`. Each sub-record maps onto its own table and is
//! upserted independently by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, scores::TestScores};

/// Maximum number of prior-education records per applicant.
pub const MAX_INSTITUTIONS: u8 = 6;

// ─── Session ─────────────────────────────────────────────────────────────────

/// The natural key of an admissions cycle: program, year, term and campus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
  pub program_code:   String,
  pub program:        String,
  pub session_abbrev: String,
  pub year:           i32,
  pub campus:         String,
}

impl SessionKey {
  /// Human-readable name stored alongside the session, e.g. `"MDS 2025W"`.
  pub fn name(&self) -> String {
    format!("{} {}{}", self.program, self.year, self.session_abbrev)
  }
}

/// Split a session code such as `"2025W"` into its year and term suffix.
pub fn parse_session_code(code: &str) -> Result<(i32, String)> {
  let code = code.trim();
  let digits = code.chars().take_while(char::is_ascii_digit).count();
  if digits != 4 || code.len() == digits {
    return Err(Error::InvalidSessionCode(code.to_owned()));
  }
  let year = code[..digits]
    .parse()
    .map_err(|_| Error::InvalidSessionCode(code.to_owned()))?;
  Ok((year, code[digits..].trim().to_uppercase()))
}

/// Infer the campus from the program-code prefix convention.
pub fn campus_from_program_code(program_code: &str) -> &'static str {
  let upper = program_code.trim().to_ascii_uppercase();
  if upper.starts_with("OG") {
    "Okanagan"
  } else {
    // `VG*` and anything unrecognised.
    "Vancouver"
  }
}

/// A persisted admissions cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub id:             i64,
  pub program_code:   String,
  pub program:        String,
  pub session_abbrev: String,
  pub year:           i32,
  pub campus:         String,
  pub name:           String,
  pub created_at:     DateTime<Utc>,
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Demographic and contact fields for one applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantInfo {
  pub user_code:           String,
  pub family_name:         Option<String>,
  pub given_name:          Option<String>,
  pub middle_name:         Option<String>,
  pub preferred_name:      Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub address_line:        Option<String>,
  pub city:                Option<String>,
  pub province:            Option<String>,
  pub postal_code:         Option<String>,
  pub country:             Option<String>,
  pub birth_date:          Option<NaiveDate>,
  pub gender:              Option<String>,
  pub citizenship_country: Option<String>,
  pub citizenship_status:  Option<String>,
  pub dual_citizenship:    Option<String>,
}

/// Application lifecycle dates and the source system's status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantStatus {
  pub user_code:              String,
  pub application_start_date: Option<NaiveDate>,
  pub submit_date:            Option<NaiveDate>,
  pub status_code:            Option<String>,
  pub detailed_status:        Option<String>,
}

/// One prior-education record (`institution_number` in `1..=6`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Institution {
  pub user_code:          String,
  pub institution_number: u8,
  pub institution_name:   Option<String>,
  pub country:            Option<String>,
  pub program_study:      Option<String>,
  pub credential:         Option<String>,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
  pub date_confer:        Option<NaiveDate>,
  pub gpa:                Option<String>,
}

impl Institution {
  /// `true` when no field beyond the key carries a value.
  pub fn is_empty(&self) -> bool {
    self.institution_name.is_none()
      && self.country.is_none()
      && self.program_study.is_none()
      && self.credential.is_none()
      && self.start_date.is_none()
      && self.end_date.is_none()
      && self.date_confer.is_none()
      && self.gpa.is_none()
  }
}

/// Everything one upload row says about one applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
  pub info:         ApplicantInfo,
  pub status:       ApplicantStatus,
  /// Only non-empty institutions are kept.
  pub institutions: Vec<Institution>,
  pub scores:       TestScores,
}

impl ApplicantRecord {
  pub fn user_code(&self) -> &str { &self.info.user_code }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn session_code_splits_year_and_term() {
    assert_eq!(parse_session_code("2025W").unwrap(), (2025, "W".to_owned()));
    assert_eq!(parse_session_code(" 2024s ").unwrap(), (2024, "S".to_owned()));
  }

  #[test]
  fn session_code_requires_year_and_term() {
    assert!(parse_session_code("2025").is_err());
    assert!(parse_session_code("W2025").is_err());
    assert!(parse_session_code("25W").is_err());
    assert!(parse_session_code("").is_err());
  }

  #[test]
  fn campus_follows_program_prefix() {
    assert_eq!(campus_from_program_code("OGMDS"), "Okanagan");
    assert_eq!(campus_from_program_code("vg01"), "Vancouver");
    assert_eq!(campus_from_program_code("XYZ"), "Vancouver");
  }

  #[test]
  fn session_name_joins_program_and_code() {
    let key = SessionKey {
      program_code:   "VG01".into(),
      program:        "Master of Data Science".into(),
      session_abbrev: "W".into(),
      year:           2025,
      campus:         "Vancouver".into(),
    };
    assert_eq!(key.name(), "Master of Data Science 2025W");
  }
}
