//! [`SqliteStore`]: the SQLite implementation of [`AdmissionsStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _};

use admit_core::{
  activity::{ActivityEntry, NewActivity},
  applicant::{ApplicantInfo, ApplicantRecord, ApplicantStatus, Institution, Session, SessionKey},
  derive::{age_on, calculate_application_info_fields, is_domestic},
  english::{EnglishExemption, EnglishOutcome, NoExemption, evaluate},
  review::{ApplicationInfo, NewRating, Rating, ReviewStatus, ReviewUpdate},
  role::{NewUser, Role, User},
  store::{AdmissionsStore, ApplicantQuery, ImportBatch, ImportSummary},
  view::{ApplicantDetail, ApplicantOverview},
};

use crate::{
  Result,
  encode::{
    RawActivity, RawApplicant, RawApplicationInfo, RawOverview, RawRating, RawSession, RawUser,
    encode_dt,
  },
  record::{
    ApplicantDerived, ApplicationDerived, EnglishFields, load_all, load_one, load_scores, upsert,
    upsert_scores,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An admissions store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and exemption policy are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  exemption:       Arc<dyn EnglishExemption>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the English exemption policy (defaults to [`NoExemption`]).
  pub fn with_exemption(mut self, exemption: Arc<dyn EnglishExemption>) -> Self {
    self.exemption = exemption;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        // One cached statement per record table, plus the read queries.
        conn.set_prepared_statement_cache_capacity(64);
        Ok(())
      })
      .await?;
    Ok(Self { conn, exemption: Arc::new(NoExemption) })
  }
}

// ─── Synchronous helpers (run inside `Connection::call`) ─────────────────────

/// Find the session for `key`, creating it on first sight.
fn resolve_session(
  conn: &Connection,
  key: &SessionKey,
  now: &str,
) -> rusqlite::Result<(i64, bool)> {
  let existing: Option<i64> = conn
    .query_row(
      "SELECT id FROM sessions
       WHERE program_code = ?1 AND year = ?2 AND session_abbrev = ?3 AND campus = ?4",
      rusqlite::params![key.program_code, key.year, key.session_abbrev, key.campus],
      |row| row.get(0),
    )
    .optional()?;
  if let Some(id) = existing {
    return Ok((id, false));
  }

  conn.execute(
    "INSERT INTO sessions (program_code, program, session_abbrev, year, campus, name, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      key.program_code,
      key.program,
      key.session_abbrev,
      key.year,
      key.campus,
      key.name(),
      now,
    ],
  )?;
  Ok((conn.last_insert_rowid(), true))
}

fn applicant_exists(conn: &Connection, user_code: &str) -> rusqlite::Result<bool> {
  Ok(conn
    .query_row("SELECT 1 FROM applicant_info WHERE user_code = ?1", [user_code], |_| Ok(()))
    .optional()?
    .is_some())
}

/// Write one uploaded record. Returns how many sub-records were new or
/// changed.
fn import_record(
  conn: &Connection,
  record: &ApplicantRecord,
  session_id: i64,
  today: NaiveDate,
  now: &str,
  exemption: &dyn EnglishExemption,
) -> rusqlite::Result<usize> {
  let user_code = record.user_code();

  let info_changed = upsert(conn, &record.info, now)?;
  let derived_changed = upsert(
    conn,
    &ApplicantDerived {
      user_code: user_code.to_owned(),
      session_id,
      age: record.info.birth_date.and_then(|b| age_on(b, today)),
      is_domestic: is_domestic(&record.info),
    },
    now,
  )?;
  let mut changed = usize::from(info_changed || derived_changed);

  changed += usize::from(upsert(conn, &record.status, now)?);
  for institution in &record.institutions {
    changed += usize::from(upsert(conn, institution, now)?);
  }
  changed += upsert_scores(conn, &record.scores, now)?;

  // Derived review columns look at everything stored, including sittings
  // and institutions from earlier uploads.
  let institutions: Vec<Institution> = load_all(conn, user_code)?;
  let degree = calculate_application_info_fields(&institutions);
  let scores = load_scores(conn, user_code)?;
  let outcome = evaluate(Some(&record.info), &scores, exemption);

  let (highest_degree, degree_area) = match degree {
    // GPA is entered by reviewers.
    Some(d) => (Some(d.highest_degree), d.degree_area),
    None => (None, None),
  };
  changed += usize::from(upsert(
    conn,
    &ApplicationDerived {
      user_code: user_code.to_owned(),
      highest_degree,
      degree_area,
      english: outcome.english(),
      english_status: outcome.status.to_string(),
      english_description: outcome.description,
    },
    now,
  )?);

  Ok(changed)
}

/// Evaluate and store one applicant's English status. `None` if the
/// applicant is unknown.
fn refresh_english(
  conn: &Connection,
  user_code: &str,
  now: &str,
  exemption: &dyn EnglishExemption,
) -> rusqlite::Result<Option<EnglishOutcome>> {
  let Some(info) = load_one::<ApplicantInfo>(conn, user_code)? else {
    return Ok(None);
  };
  let scores = load_scores(conn, user_code)?;
  let outcome = evaluate(Some(&info), &scores, exemption);

  upsert(
    conn,
    &EnglishFields {
      user_code:           user_code.to_owned(),
      english_status:      outcome.status.to_string(),
      english_description: outcome.description.clone(),
      english:             outcome.english(),
    },
    now,
  )?;
  Ok(Some(outcome))
}

/// Create the default `application_info` row if the applicant has none.
/// `false` if the applicant is unknown.
fn ensure_application(conn: &Connection, user_code: &str, now: &str) -> rusqlite::Result<bool> {
  if !applicant_exists(conn, user_code)? {
    return Ok(false);
  }
  conn.execute(
    "INSERT INTO application_info (user_code, created_at, updated_at) VALUES (?1, ?2, ?2)
     ON CONFLICT (user_code) DO NOTHING",
    rusqlite::params![user_code, now],
  )?;
  Ok(true)
}

fn select_application(
  conn: &Connection,
  user_code: &str,
) -> rusqlite::Result<Option<RawApplicationInfo>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM application_info WHERE user_code = ?1",
        RawApplicationInfo::COLUMNS
      ),
      [user_code],
      RawApplicationInfo::from_row,
    )
    .optional()
}

fn select_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {} FROM users u WHERE u.id = ?1", RawUser::COLUMNS),
      [id],
      RawUser::from_row,
    )
    .optional()
}

fn select_applicant(conn: &Connection, user_code: &str) -> rusqlite::Result<Option<RawApplicant>> {
  let Some(info) = load_one::<ApplicantInfo>(conn, user_code)? else {
    return Ok(None);
  };

  let (session_id, age, is_domestic, created_at, updated_at): (
    Option<i64>,
    Option<u32>,
    bool,
    String,
    String,
  ) = conn.query_row(
    "SELECT session_id, age, is_domestic, created_at, updated_at
     FROM applicant_info WHERE user_code = ?1",
    [user_code],
    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
  )?;

  let session = match session_id {
    Some(id) => conn
      .query_row(
        &format!("SELECT {} FROM sessions WHERE id = ?1", RawSession::COLUMNS),
        [id],
        RawSession::from_row,
      )
      .optional()?,
    None => None,
  };

  let mut stmt = conn.prepare_cached(&format!(
    "{} WHERE r.user_code = ?1 ORDER BY r.updated_at DESC",
    RawRating::SELECT
  ))?;
  let ratings = stmt
    .query_map([user_code], RawRating::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawApplicant {
    info,
    age,
    is_domestic,
    created_at,
    updated_at,
    session,
    status: load_one::<ApplicantStatus>(conn, user_code)?,
    institutions: load_all(conn, user_code)?,
    scores: load_scores(conn, user_code)?,
    application: select_application(conn, user_code)?,
    ratings,
  }))
}

// ─── AdmissionsStore impl ────────────────────────────────────────────────────

impl AdmissionsStore for SqliteStore {
  type Error = crate::Error;

  // ── Sessions & ingestion ──────────────────────────────────────────────────

  async fn list_sessions(&self) -> Result<Vec<Session>> {
    let raws: Vec<RawSession> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM sessions ORDER BY year DESC, session_abbrev, program_code, campus",
          RawSession::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawSession::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn import_batch(&self, batch: ImportBatch) -> Result<ImportSummary> {
    let exemption = Arc::clone(&self.exemption);
    let now = encode_dt(Utc::now());
    let today = Utc::now().date_naive();
    let session_name = batch.session.name();

    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let (session_id, session_created) = resolve_session(&tx, &batch.session, &now)?;

        let mut changed = 0;
        for record in &batch.records {
          changed += import_record(&tx, record, session_id, today, &now, exemption.as_ref())?;
        }
        tx.commit()?;

        Ok(ImportSummary {
          session_id,
          session_created,
          processed: batch.records.len(),
          dropped: batch.dropped_rows,
          changed,
        })
      })
      .await?;

    tracing::info!(
      session = %session_name,
      session_id = summary.session_id,
      created = summary.session_created,
      processed = summary.processed,
      dropped = summary.dropped,
      changed = summary.changed,
      "import committed"
    );
    Ok(summary)
  }

  // ── Applicants ────────────────────────────────────────────────────────────

  async fn list_applicants(&self, query: ApplicantQuery) -> Result<Vec<ApplicantOverview>> {
    let session_id = query.session_id;
    let status = query.status.map(|s| s.to_string());
    let english_status = query.english_status.map(|s| s.to_string());
    let pattern = query
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| format!("%{s}%"));
    // A negative LIMIT means no limit in SQLite.
    let limit = query.limit.map_or(-1, |l| l as i64);
    let offset = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawOverview> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{}
           WHERE (?1 IS NULL OR i.session_id = ?1)
             AND (?2 IS NULL OR COALESCE(a.sent, 'Not Reviewed') = ?2)
             AND (?3 IS NULL OR a.english_status = ?3)
             AND (?4 IS NULL
                  OR i.user_code      LIKE ?4
                  OR i.family_name    LIKE ?4
                  OR i.given_name     LIKE ?4
                  OR i.preferred_name LIKE ?4
                  OR i.email          LIKE ?4)
           ORDER BY i.family_name COLLATE NOCASE, i.given_name COLLATE NOCASE, i.user_code
           LIMIT ?5 OFFSET ?6",
          RawOverview::SELECT
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![session_id, status, english_status, pattern, limit, offset],
            RawOverview::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOverview::into_overview).collect()
  }

  async fn get_applicant(&self, user_code: String) -> Result<Option<ApplicantDetail>> {
    let raw: Option<RawApplicant> = self
      .conn
      .call(move |conn| Ok(select_applicant(conn, &user_code)?))
      .await?;

    raw.map(RawApplicant::into_detail).transpose()
  }

  async fn update_review(
    &self,
    user_code: String,
    update: ReviewUpdate,
  ) -> Result<Option<ApplicationInfo>> {
    let now = encode_dt(Utc::now());

    let raw: Option<RawApplicationInfo> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !ensure_application(&tx, &user_code, &now)? {
          return Ok(None);
        }
        tx.execute(
          "UPDATE application_info SET
             cs      = COALESCE(?2, cs),
             stat    = COALESCE(?3, stat),
             math    = COALESCE(?4, math),
             gpa     = COALESCE(?5, gpa),
             comment = COALESCE(?6, comment),
             updated_at = CASE WHEN COALESCE(?2, cs)      IS NOT cs
                                 OR COALESCE(?3, stat)    IS NOT stat
                                 OR COALESCE(?4, math)    IS NOT math
                                 OR COALESCE(?5, gpa)     IS NOT gpa
                                 OR COALESCE(?6, comment) IS NOT comment
                               THEN ?7 ELSE updated_at END
           WHERE user_code = ?1",
          rusqlite::params![
            user_code,
            update.cs,
            update.stat,
            update.math,
            update.gpa,
            update.comment,
            now,
          ],
        )?;
        let raw = select_application(&tx, &user_code)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawApplicationInfo::into_application_info).transpose()
  }

  async fn set_review_status(
    &self,
    user_code: String,
    status: ReviewStatus,
  ) -> Result<Option<ApplicationInfo>> {
    let now = encode_dt(Utc::now());
    let status_str = status.to_string();

    let raw: Option<RawApplicationInfo> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !ensure_application(&tx, &user_code, &now)? {
          return Ok(None);
        }
        tx.execute(
          "UPDATE application_info SET
             sent = ?2,
             updated_at = CASE WHEN sent IS NOT ?2 THEN ?3 ELSE updated_at END
           WHERE user_code = ?1",
          rusqlite::params![user_code, status_str, now],
        )?;
        let raw = select_application(&tx, &user_code)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawApplicationInfo::into_application_info).transpose()
  }

  // ── English ───────────────────────────────────────────────────────────────

  async fn compute_english_status(&self, user_code: String) -> Result<Option<EnglishOutcome>> {
    let exemption = Arc::clone(&self.exemption);
    let now = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| Ok(refresh_english(conn, &user_code, &now, exemption.as_ref())?))
      .await?;
    Ok(outcome)
  }

  async fn recompute_all_english(&self) -> Result<usize> {
    let exemption = Arc::clone(&self.exemption);
    let now = encode_dt(Utc::now());

    let count = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let codes = {
          let mut stmt = tx.prepare("SELECT user_code FROM applicant_info ORDER BY user_code")?;
          stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        for code in &codes {
          refresh_english(&tx, code, &now, exemption.as_ref())?;
        }
        tx.commit()?;
        Ok(codes.len())
      })
      .await?;

    tracing::info!(count, "recomputed english status");
    Ok(count)
  }

  // ── Ratings ───────────────────────────────────────────────────────────────

  async fn list_ratings(&self, user_code: String) -> Result<Vec<Rating>> {
    let raws: Vec<RawRating> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "{} WHERE r.user_code = ?1 ORDER BY r.updated_at DESC",
          RawRating::SELECT
        ))?;
        let rows = stmt
          .query_map([user_code], RawRating::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn upsert_rating(&self, rating: NewRating) -> Result<Option<Rating>> {
    let now = encode_dt(Utc::now());

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        if !applicant_exists(conn, &rating.user_code)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO ratings (user_id, user_code, rating, comment, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           ON CONFLICT (user_id, user_code) DO UPDATE SET
             rating     = excluded.rating,
             comment    = excluded.comment,
             updated_at = excluded.updated_at",
          rusqlite::params![rating.user_id, rating.user_code, rating.rating, rating.comment, now],
        )?;
        let raw = conn
          .query_row(
            &format!("{} WHERE r.user_id = ?1 AND r.user_code = ?2", RawRating::SELECT),
            rusqlite::params![rating.user_id, rating.user_code],
            RawRating::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn delete_rating(&self, user_id: i64, user_code: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM ratings WHERE user_id = ?1 AND user_code = ?2",
          rusqlite::params![user_id, user_code],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }

  // ── Users & auth sessions ─────────────────────────────────────────────────

  async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let role_str = user.role.to_string();
    let username = user.username.clone();
    let password_hash = user.password_hash.clone();

    let id = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (username, password_hash, role, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(username) DO NOTHING",
          rusqlite::params![username, password_hash, role_str, at_str],
        )?;
        Ok((inserted > 0).then(|| conn.last_insert_rowid()))
      })
      .await?;

    Ok(id.map(|id| User {
      id,
      username: user.username,
      password_hash: user.password_hash,
      role: user.role,
      created_at,
    }))
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, id)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user(&self, username: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM users u WHERE u.username = ?1", RawUser::COLUMNS),
            [username],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM users u ORDER BY u.username COLLATE NOCASE",
          RawUser::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_user_role(&self, id: i64, role: Role) -> Result<Option<User>> {
    let role_str = role.to_string();
    let raw = self
      .conn
      .call(move |conn| {
        conn.execute("UPDATE users SET role = ?2 WHERE id = ?1", rusqlite::params![id, role_str])?;
        Ok(select_user(conn, id)?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    // Auth sessions and ratings go with the user; activity rows keep a NULL
    // user id.
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
      .await?;
    Ok(removed)
  }

  async fn create_auth_session(
    &self,
    token_hash: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let now = encode_dt(Utc::now());
    let expires = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM auth_sessions WHERE expires_at <= ?1", [&now])?;
        conn.execute(
          "INSERT INTO auth_sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, user_id, now, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_for_session(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<User>> {
    let now = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM auth_sessions s
               JOIN users u ON u.id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2",
              RawUser::COLUMNS
            ),
            rusqlite::params![token_hash, now],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_auth_session(&self, token_hash: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM auth_sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Activity log ──────────────────────────────────────────────────────────

  async fn log_activity(&self, entry: NewActivity) -> Result<ActivityEntry> {
    let at_str = encode_dt(Utc::now());
    let action = entry.action.to_string();

    let raw: RawActivity = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_log (user_id, action, target, details, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![entry.user_id, action, entry.target, entry.details, at_str],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!("{} WHERE a.id = ?1", RawActivity::SELECT),
          [id],
          RawActivity::from_row,
        )?)
      })
      .await?;
    raw.into_entry()
  }

  async fn list_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    let limit = limit as i64;
    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("{} ORDER BY a.id DESC LIMIT ?1", RawActivity::SELECT))?;
        let rows = stmt
          .query_map([limit], RawActivity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawActivity::into_entry).collect()
  }
}
