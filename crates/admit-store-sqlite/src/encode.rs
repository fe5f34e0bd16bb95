//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC so they sort
//! and compare as text. Calendar dates go through rusqlite's `chrono`
//! support as `YYYY-MM-DD`. Enums are stored by their display names.

use std::str::FromStr;

use admit_core::{
  activity::{ActivityAction, ActivityEntry},
  applicant::{ApplicantInfo, ApplicantStatus, Institution, Session},
  english::EnglishStatus,
  review::{ApplicationInfo, Rating, ReviewStatus},
  role::{Role, User},
  scores::TestScores,
  view::{ApplicantDetail, ApplicantOverview},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

pub fn decode_role(s: &str) -> Result<Role> { decode_enum("role", s) }

pub fn decode_review_status(s: &str) -> Result<ReviewStatus> { decode_enum("sent", s) }

pub fn decode_english_status(s: &str) -> Result<EnglishStatus> {
  decode_enum("english_status", s)
}

pub fn decode_action(s: &str) -> Result<ActivityAction> { decode_enum("action", s) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub id:             i64,
  pub program_code:   String,
  pub program:        String,
  pub session_abbrev: String,
  pub year:           i32,
  pub campus:         String,
  pub name:           String,
  pub created_at:     String,
}

impl RawSession {
  pub const COLUMNS: &'static str =
    "id, program_code, program, session_abbrev, year, campus, name, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      program_code:   row.get(1)?,
      program:        row.get(2)?,
      session_abbrev: row.get(3)?,
      year:           row.get(4)?,
      campus:         row.get(5)?,
      name:           row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      id:             self.id,
      program_code:   self.program_code,
      program:        self.program,
      session_abbrev: self.session_abbrev,
      year:           self.year,
      campus:         self.campus,
      name:           self.name,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "u.id, u.username, u.password_hash, u.role, u.created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      role:          row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      role:          decode_role(&self.role)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// A `ratings` row joined with the reviewer's username.
pub struct RawRating {
  pub user_id:    i64,
  pub username:   String,
  pub user_code:  String,
  pub rating:     f64,
  pub comment:    Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRating {
  pub const SELECT: &'static str = "SELECT r.user_id, u.username, r.user_code, r.rating,
            r.comment, r.created_at, r.updated_at
     FROM ratings r
     JOIN users u ON u.id = r.user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      user_code:  row.get(2)?,
      rating:     row.get(3)?,
      comment:    row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      user_id:    self.user_id,
      username:   self.username,
      user_code:  self.user_code,
      rating:     self.rating,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `application_info` row.
pub struct RawApplicationInfo {
  pub user_code:           String,
  pub sent:                String,
  pub cs:                  Option<bool>,
  pub stat:                Option<bool>,
  pub math:                Option<bool>,
  pub gpa:                 Option<String>,
  pub highest_degree:      Option<String>,
  pub degree_area:         Option<String>,
  pub english_status:      Option<String>,
  pub english_description: Option<String>,
  pub english:             bool,
  pub comment:             Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawApplicationInfo {
  pub const COLUMNS: &'static str = "user_code, sent, cs, stat, math, gpa, highest_degree,
     degree_area, english_status, english_description, english, comment,
     created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_code:           row.get(0)?,
      sent:                row.get(1)?,
      cs:                  row.get(2)?,
      stat:                row.get(3)?,
      math:                row.get(4)?,
      gpa:                 row.get(5)?,
      highest_degree:      row.get(6)?,
      degree_area:         row.get(7)?,
      english_status:      row.get(8)?,
      english_description: row.get(9)?,
      english:             row.get(10)?,
      comment:             row.get(11)?,
      created_at:          row.get(12)?,
      updated_at:          row.get(13)?,
    })
  }

  pub fn into_application_info(self) -> Result<ApplicationInfo> {
    Ok(ApplicationInfo {
      user_code:           self.user_code,
      sent:                decode_review_status(&self.sent)?,
      cs:                  self.cs,
      stat:                self.stat,
      math:                self.math,
      gpa:                 self.gpa,
      highest_degree:      self.highest_degree,
      degree_area:         self.degree_area,
      english_status:      self
        .english_status
        .as_deref()
        .map(decode_english_status)
        .transpose()?,
      english_description: self.english_description,
      english:             self.english,
      comment:             self.comment,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// An `activity_log` row joined with the acting user's name.
pub struct RawActivity {
  pub id:         i64,
  pub user_id:    Option<i64>,
  pub username:   Option<String>,
  pub action:     String,
  pub target:     Option<String>,
  pub details:    Option<String>,
  pub created_at: String,
}

impl RawActivity {
  pub const SELECT: &'static str = "SELECT a.id, a.user_id, u.username, a.action, a.target,
            a.details, a.created_at
     FROM activity_log a
     LEFT JOIN users u ON u.id = a.user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      username:   row.get(2)?,
      action:     row.get(3)?,
      target:     row.get(4)?,
      details:    row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      id:         self.id,
      user_id:    self.user_id,
      username:   self.username,
      action:     decode_action(&self.action)?,
      target:     self.target,
      details:    self.details,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// One applicant-list line: identity joined with review state and the
/// rating aggregate.
pub struct RawOverview {
  pub user_code:           String,
  pub session_id:          Option<i64>,
  pub session_name:        Option<String>,
  pub family_name:         Option<String>,
  pub given_name:          Option<String>,
  pub preferred_name:      Option<String>,
  pub email:               Option<String>,
  pub citizenship_country: Option<String>,
  pub citizenship_status:  Option<String>,
  pub is_domestic:         bool,
  pub age:                 Option<u32>,
  pub highest_degree:      Option<String>,
  pub degree_area:         Option<String>,
  pub gpa:                 Option<String>,
  pub cs:                  Option<bool>,
  pub stat:                Option<bool>,
  pub math:                Option<bool>,
  pub sent:                Option<String>,
  pub english_status:      Option<String>,
  pub english:             Option<bool>,
  pub average_rating:      Option<f64>,
  pub rating_count:        u32,
  pub updated_at:          String,
}

impl RawOverview {
  pub const SELECT: &'static str = "SELECT i.user_code, i.session_id, s.name, i.family_name,
            i.given_name, i.preferred_name, i.email, i.citizenship_country,
            i.citizenship_status, i.is_domestic, i.age, a.highest_degree,
            a.degree_area, a.gpa, a.cs, a.stat, a.math, a.sent,
            a.english_status, a.english, r.average, COALESCE(r.count, 0),
            i.updated_at
     FROM applicant_info i
     LEFT JOIN sessions s         ON s.id = i.session_id
     LEFT JOIN application_info a ON a.user_code = i.user_code
     LEFT JOIN (SELECT user_code, AVG(rating) AS average, COUNT(*) AS count
                FROM ratings GROUP BY user_code) r ON r.user_code = i.user_code";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_code:           row.get(0)?,
      session_id:          row.get(1)?,
      session_name:        row.get(2)?,
      family_name:         row.get(3)?,
      given_name:          row.get(4)?,
      preferred_name:      row.get(5)?,
      email:               row.get(6)?,
      citizenship_country: row.get(7)?,
      citizenship_status:  row.get(8)?,
      is_domestic:         row.get(9)?,
      age:                 row.get(10)?,
      highest_degree:      row.get(11)?,
      degree_area:         row.get(12)?,
      gpa:                 row.get(13)?,
      cs:                  row.get(14)?,
      stat:                row.get(15)?,
      math:                row.get(16)?,
      sent:                row.get(17)?,
      english_status:      row.get(18)?,
      english:             row.get(19)?,
      average_rating:      row.get(20)?,
      rating_count:        row.get(21)?,
      updated_at:          row.get(22)?,
    })
  }

  pub fn into_overview(self) -> Result<ApplicantOverview> {
    Ok(ApplicantOverview {
      user_code:           self.user_code,
      session_id:          self.session_id,
      session_name:        self.session_name,
      family_name:         self.family_name,
      given_name:          self.given_name,
      preferred_name:      self.preferred_name,
      email:               self.email,
      citizenship_country: self.citizenship_country,
      citizenship_status:  self.citizenship_status,
      is_domestic:         self.is_domestic,
      age:                 self.age,
      highest_degree:      self.highest_degree,
      degree_area:         self.degree_area,
      gpa:                 self.gpa,
      cs:                  self.cs,
      stat:                self.stat,
      math:                self.math,
      sent:                self
        .sent
        .as_deref()
        .map(decode_review_status)
        .transpose()?
        .unwrap_or_default(),
      english_status:      self
        .english_status
        .as_deref()
        .map(decode_english_status)
        .transpose()?,
      english:             self.english.unwrap_or(false),
      average_rating:      self.average_rating,
      rating_count:        self.rating_count,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// Everything read for one applicant before timestamps and enums are
/// decoded.
pub struct RawApplicant {
  pub info:         ApplicantInfo,
  pub age:          Option<u32>,
  pub is_domestic:  bool,
  pub created_at:   String,
  pub updated_at:   String,
  pub session:      Option<RawSession>,
  pub status:       Option<ApplicantStatus>,
  pub institutions: Vec<Institution>,
  pub scores:       TestScores,
  pub application:  Option<RawApplicationInfo>,
  pub ratings:      Vec<RawRating>,
}

impl RawApplicant {
  pub fn into_detail(self) -> Result<ApplicantDetail> {
    Ok(ApplicantDetail {
      info:         self.info,
      age:          self.age,
      is_domestic:  self.is_domestic,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
      session:      self.session.map(RawSession::into_session).transpose()?,
      status:       self.status,
      institutions: self.institutions,
      scores:       self.scores,
      application:  self
        .application
        .map(RawApplicationInfo::into_application_info)
        .transpose()?,
      ratings:      self
        .ratings
        .into_iter()
        .map(RawRating::into_rating)
        .collect::<Result<_>>()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = decode_dt("2025-01-02T03:04:05Z").unwrap();
    let b = decode_dt("2025-01-02T03:04:05.5Z").unwrap();
    assert_eq!(encode_dt(a), "2025-01-02T03:04:05.000000Z");
    assert_eq!(encode_dt(b), "2025-01-02T03:04:05.500000Z");
    assert!(encode_dt(a) < encode_dt(b));
  }

  #[test]
  fn enums_decode_by_display_name() {
    assert_eq!(decode_review_status("Send Offer to CoGS").unwrap(), ReviewStatus::SendOfferToCogs);
    assert_eq!(decode_english_status("Not Met").unwrap(), EnglishStatus::NotMet);
    assert_eq!(decode_role("Faculty").unwrap(), Role::Faculty);
    assert_eq!(decode_action("data_import").unwrap(), ActivityAction::DataImport);
    assert!(matches!(
      decode_role("superuser"),
      Err(Error::UnknownValue { column: "role", .. })
    ));
  }
}
