//! Natural-key upserts with null-safe change detection.
//!
//! Each uploaded sub-record maps onto one table through [`Record`]. Writing
//! goes through [`upsert`], which only advances `updated_at` when one of
//! the record's columns differs from the stored row. SQLite's `IS NOT`
//! treats two NULLs as equal, so a blank cell that stays blank is not a
//! change.

use admit_core::{
  applicant::{ApplicantInfo, ApplicantStatus, Institution},
  scores::{
    AltElppScore, CaelScore, CelpipScore, DuolingoScore, GmatScore, GreScore, IeltsScore,
    MelabScore, PteScore, TestScores, ToeflScore,
  },
};
use rusqlite::{Connection, Row, ToSql, params_from_iter};

/// A struct stored as one row of `TABLE`, with `KEY` columns identifying
/// the row and `COLUMNS` holding tracked values. `REFRESHED` columns are
/// overwritten on every upsert but never count as a change; they hold
/// values that depend on the import date rather than the upload. All lists
/// name struct fields and table columns alike.
pub trait Record: Sized {
  const TABLE: &'static str;
  const KEY: &'static [&'static str];
  const COLUMNS: &'static [&'static str];
  const REFRESHED: &'static [&'static str] = &[];

  /// Key, column and refreshed values, in declaration order.
  fn params(&self) -> Vec<&dyn ToSql>;

  /// Read a row selected as `KEY ++ COLUMNS ++ REFRESHED`.
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

macro_rules! record {
  (
    $ty:ty => $table:literal,
    key [$($key:ident),+ $(,)?],
    columns [$($col:ident),+ $(,)?]
    $(, refreshed [$($fresh:ident),+ $(,)?])? $(,)?
  ) => {
    impl Record for $ty {
      const TABLE: &'static str = $table;
      const KEY: &'static [&'static str] = &[$(stringify!($key)),+];
      const COLUMNS: &'static [&'static str] = &[$(stringify!($col)),+];
      const REFRESHED: &'static [&'static str] = &[$($(stringify!($fresh)),+)?];

      fn params(&self) -> Vec<&dyn ToSql> {
        vec![
          $(&self.$key as &dyn ToSql,)+
          $(&self.$col as &dyn ToSql,)+
          $($(&self.$fresh as &dyn ToSql,)+)?
        ]
      }

      fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut idx = 0usize..;
        let mut next = move || idx.next().unwrap_or_default();
        Ok(Self {
          $($key: row.get(next())?,)+
          $($col: row.get(next())?,)+
          $($($fresh: row.get(next())?,)+)?
        })
      }
    }
  };
}

// ─── Uploaded sub-records ────────────────────────────────────────────────────

record!(ApplicantInfo => "applicant_info",
  key [user_code],
  columns [family_name, given_name, middle_name, preferred_name, email, phone,
    address_line, city, province, postal_code, country, birth_date, gender,
    citizenship_country, citizenship_status, dual_citizenship]);

record!(ApplicantStatus => "applicant_status",
  key [user_code],
  columns [application_start_date, submit_date, status_code, detailed_status]);

record!(Institution => "institution_info",
  key [user_code, institution_number],
  columns [institution_name, country, program_study, credential, start_date,
    end_date, date_confer, gpa]);

record!(ToeflScore => "toefl",
  key [user_code, toefl_number],
  columns [registration_number, date_written, listening, reading, writing,
    speaking, total, mybest_listening, mybest_reading, mybest_writing,
    mybest_speaking, mybest_total]);

record!(IeltsScore => "ielts",
  key [user_code, ielts_number],
  columns [candidate_number, date_written, listening, reading, writing,
    speaking, total]);

record!(MelabScore => "melab",
  key [user_code],
  columns [reference_number, date_written, listening, gcvr, writing, speaking,
    total]);

record!(PteScore => "pte",
  key [user_code],
  columns [reference_number, date_written, listening, reading, speaking,
    writing, total]);

record!(CaelScore => "cael",
  key [user_code],
  columns [reference_number, date_written, reading, listening, writing,
    speaking, total]);

record!(CelpipScore => "celpip",
  key [user_code],
  columns [date_written, listening, speaking, reading_writing]);

record!(DuolingoScore => "duolingo",
  key [user_code],
  columns [date_written, score, literacy, conversation, comprehension,
    production]);

record!(AltElppScore => "alt_elpp",
  key [user_code],
  columns [test_type, date_written, total]);

record!(GreScore => "gre",
  key [user_code],
  columns [registration_number, date_written, verbal, verbal_below,
    quantitative, quantitative_below, writing, writing_below]);

record!(GmatScore => "gmat",
  key [user_code],
  columns [reference_number, date_written, total, integrated_reasoning,
    quantitative, verbal, writing]);

// ─── Derived columns ─────────────────────────────────────────────────────────

/// Columns of `applicant_info` computed at import time.
pub struct ApplicantDerived {
  pub user_code:   String,
  pub session_id:  i64,
  pub age:         Option<u32>,
  pub is_domestic: bool,
}

record!(ApplicantDerived => "applicant_info",
  key [user_code],
  columns [session_id, is_domestic],
  refreshed [age]);

/// Columns of `application_info` an upload may refresh. A new row gets the
/// table's default review status.
pub struct ApplicationDerived {
  pub user_code:           String,
  pub highest_degree:      Option<String>,
  pub degree_area:         Option<String>,
  pub english_status:      String,
  pub english_description: String,
  pub english:             bool,
}

record!(ApplicationDerived => "application_info",
  key [user_code],
  columns [highest_degree, degree_area, english_status, english_description,
    english]);

/// The English triple alone, for re-evaluation outside an upload.
pub struct EnglishFields {
  pub user_code:           String,
  pub english_status:      String,
  pub english_description: String,
  pub english:             bool,
}

record!(EnglishFields => "application_info",
  key [user_code],
  columns [english_status, english_description, english]);

// ─── SQL ─────────────────────────────────────────────────────────────────────

fn column_names<R: Record>() -> Vec<&'static str> {
  R::KEY.iter().chain(R::COLUMNS).chain(R::REFRESHED).copied().collect()
}

fn upsert_sql<R: Record>() -> String {
  let table = R::TABLE;
  let names = column_names::<R>();
  let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
  let now = names.len() + 1;

  let assignments: Vec<String> = R::COLUMNS
    .iter()
    .chain(R::REFRESHED)
    .map(|c| format!("{c} = excluded.{c}"))
    .collect();
  let differs: Vec<String> = R::COLUMNS
    .iter()
    .map(|c| format!("{table}.{c} IS NOT excluded.{c}"))
    .collect();

  format!(
    "INSERT INTO {table} ({names}, created_at, updated_at)
     VALUES ({placeholders}, ?{now}, ?{now})
     ON CONFLICT ({key}) DO UPDATE SET
       {assignments},
       updated_at = CASE WHEN {differs}
                         THEN excluded.updated_at
                         ELSE {table}.updated_at END
     RETURNING updated_at",
    names = names.join(", "),
    placeholders = placeholders.join(", "),
    key = R::KEY.join(", "),
    assignments = assignments.join(",\n       "),
    differs = differs.join("\n                           OR "),
  )
}

fn select_sql<R: Record>() -> String {
  let names = column_names::<R>();
  format!(
    "SELECT {names} FROM {table} WHERE user_code = ?1 ORDER BY {key}",
    names = names.join(", "),
    table = R::TABLE,
    key = R::KEY.join(", "),
  )
}

/// Insert or update `record`, stamping `now` on insert or on change.
/// Returns `true` if the row is new or one of its columns changed.
pub fn upsert<R: Record>(conn: &Connection, record: &R, now: &str) -> rusqlite::Result<bool> {
  let mut params: Vec<&dyn ToSql> = record.params();
  params.push(&now);

  let mut stmt = conn.prepare_cached(&upsert_sql::<R>())?;
  let updated_at: String = stmt.query_row(params_from_iter(params), |row| row.get(0))?;
  Ok(updated_at == now)
}

/// Every stored row of `R` for one applicant, in key order.
pub fn load_all<R: Record>(conn: &Connection, user_code: &str) -> rusqlite::Result<Vec<R>> {
  let mut stmt = conn.prepare_cached(&select_sql::<R>())?;
  let rows = stmt
    .query_map([user_code], R::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn load_one<R: Record>(conn: &Connection, user_code: &str) -> rusqlite::Result<Option<R>> {
  Ok(load_all(conn, user_code)?.into_iter().next())
}

/// Every stored score for one applicant.
pub fn load_scores(conn: &Connection, user_code: &str) -> rusqlite::Result<TestScores> {
  Ok(TestScores {
    toefl:    load_all(conn, user_code)?,
    ielts:    load_all(conn, user_code)?,
    melab:    load_one(conn, user_code)?,
    pte:      load_one(conn, user_code)?,
    cael:     load_one(conn, user_code)?,
    celpip:   load_one(conn, user_code)?,
    duolingo: load_one(conn, user_code)?,
    alt_elpp: load_one(conn, user_code)?,
    gre:      load_one(conn, user_code)?,
    gmat:     load_one(conn, user_code)?,
  })
}

/// Upsert every reported score; returns how many rows were new or changed.
pub fn upsert_scores(conn: &Connection, scores: &TestScores, now: &str) -> rusqlite::Result<usize> {
  let mut changed = 0;
  for toefl in &scores.toefl {
    changed += usize::from(upsert(conn, toefl, now)?);
  }
  for ielts in &scores.ielts {
    changed += usize::from(upsert(conn, ielts, now)?);
  }
  macro_rules! single {
    ($($field:ident),+) => {
      $(if let Some(score) = &scores.$field {
        changed += usize::from(upsert(conn, score, now)?);
      })+
    };
  }
  single!(melab, pte, cael, celpip, duolingo, alt_elpp, gre, gmat);
  Ok(changed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upsert_sql_tracks_every_column() {
    let sql = upsert_sql::<CelpipScore>();
    assert!(sql.contains("ON CONFLICT (user_code) DO UPDATE SET"));
    assert!(sql.contains("listening = excluded.listening"));
    assert!(sql.contains("celpip.reading_writing IS NOT excluded.reading_writing"));
    assert!(sql.contains("VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"));
    assert!(sql.ends_with("RETURNING updated_at"));
  }

  #[test]
  fn refreshed_columns_are_assigned_but_not_compared() {
    let sql = upsert_sql::<ApplicantDerived>();
    assert!(sql.contains("(user_code, session_id, is_domestic, age, created_at, updated_at)"));
    assert!(sql.contains("age = excluded.age"));
    assert!(sql.contains("applicant_info.is_domestic IS NOT excluded.is_domestic"));
    assert!(!sql.contains("applicant_info.age IS NOT"));
  }

  #[test]
  fn select_sql_orders_by_key() {
    let sql = select_sql::<ToeflScore>();
    assert!(sql.starts_with("SELECT user_code, toefl_number, registration_number"));
    assert!(sql.ends_with("ORDER BY user_code, toefl_number"));
  }
}
