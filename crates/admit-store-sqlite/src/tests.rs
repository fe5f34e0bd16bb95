//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use admit_core::{
  activity::{ActivityAction, NewActivity},
  applicant::{ApplicantInfo, ApplicantRecord, ApplicantStatus, Institution, SessionKey},
  english::{CitizenshipExemption, EnglishStatus, NO_TESTS_DESCRIPTION, NOT_REQUIRED_DESCRIPTION},
  review::{NewRating, ReviewStatus, ReviewUpdate},
  role::{NewUser, Role},
  scores::{IeltsScore, TestScores, ToeflScore},
  store::{AdmissionsStore, ApplicantQuery, ImportBatch},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn session(code: &str) -> SessionKey {
  let (year, session_abbrev) = admit_core::applicant::parse_session_code(code).unwrap();
  SessionKey {
    program_code: "VG01".into(),
    program: "Master of Data Science".into(),
    session_abbrev,
    year,
    campus: "Vancouver".into(),
  }
}

fn record(user_code: &str) -> ApplicantRecord {
  ApplicantRecord {
    info: ApplicantInfo {
      user_code: user_code.into(),
      family_name: Some(format!("Family {user_code}")),
      given_name: Some("Ada".into()),
      email: Some(format!("{}@example.com", user_code.to_lowercase())),
      ..Default::default()
    },
    status: ApplicantStatus { user_code: user_code.into(), ..Default::default() },
    institutions: vec![],
    scores: TestScores::default(),
  }
}

fn batch(code: &str, records: Vec<ApplicantRecord>) -> ImportBatch {
  ImportBatch { session: session(code), records, dropped_rows: 0 }
}

fn institution(user_code: &str, n: u8, credential: &str, area: &str) -> Institution {
  Institution {
    user_code: user_code.into(),
    institution_number: n,
    credential: Some(credential.into()),
    program_study: Some(area.into()),
    date_confer: NaiveDate::from_ymd_opt(2015 + i32::from(n), 6, 1),
    gpa: Some("3.9".into()),
    ..Default::default()
  }
}

async fn user(s: &SqliteStore, username: &str, role: Role) -> i64 {
  s.create_user(NewUser {
    username: username.into(),
    password_hash: "$argon2id$stub".into(),
    role,
  })
  .await
  .unwrap()
  .expect("username is free")
  .id
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_row_without_tests_is_not_met() {
  let s = store().await;

  let summary = s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();
  assert!(summary.session_created);
  assert_eq!(summary.processed, 1);
  // applicant_info, applicant_status, application_info
  assert_eq!(summary.changed, 3);

  let sessions = s.list_sessions().await.unwrap();
  assert_eq!(sessions.len(), 1);
  assert_eq!(sessions[0].id, summary.session_id);
  assert_eq!(sessions[0].name, "Master of Data Science 2025W");

  let detail = s.get_applicant("A1".into()).await.unwrap().unwrap();
  assert_eq!(detail.session.unwrap().year, 2025);
  let app = detail.application.unwrap();
  assert_eq!(app.sent, ReviewStatus::NotReviewed);
  assert_eq!(app.english_status, Some(EnglishStatus::NotMet));
  assert_eq!(app.english_description.as_deref(), Some(NO_TESTS_DESCRIPTION));
  assert!(!app.english);
}

#[tokio::test]
async fn identical_upload_changes_nothing() {
  let s = store().await;
  let mut rec = record("A1");
  rec.institutions = vec![institution("A1", 1, "Bachelor of Science", "Physics")];
  rec.scores.toefl = vec![ToeflScore {
    user_code: "A1".into(),
    toefl_number: 1,
    listening: Some(25),
    total: Some(80),
    ..Default::default()
  }];

  let first = s.import_batch(batch("2025W", vec![rec.clone()])).await.unwrap();
  let before = s.get_applicant("A1".into()).await.unwrap().unwrap();

  let second = s.import_batch(batch("2025W", vec![rec])).await.unwrap();
  let after = s.get_applicant("A1".into()).await.unwrap().unwrap();

  assert!(!second.session_created);
  assert_eq!(second.session_id, first.session_id);
  assert_eq!(second.changed, 0);
  assert_eq!(after.updated_at, before.updated_at);
  assert_eq!(
    after.application.unwrap().updated_at,
    before.application.unwrap().updated_at
  );
}

#[tokio::test]
async fn only_changed_sub_records_are_touched() {
  let s = store().await;
  s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();
  let before = s.get_applicant("A1".into()).await.unwrap().unwrap();

  let mut rec = record("A1");
  rec.info.email = Some("new@example.com".into());
  let summary = s.import_batch(batch("2025W", vec![rec])).await.unwrap();
  let after = s.get_applicant("A1".into()).await.unwrap().unwrap();

  assert_eq!(summary.changed, 1);
  assert!(after.updated_at > before.updated_at);
  assert_eq!(after.info.email.as_deref(), Some("new@example.com"));
  assert_eq!(
    after.application.unwrap().updated_at,
    before.application.unwrap().updated_at
  );
}

#[tokio::test]
async fn different_session_code_creates_new_session() {
  let s = store().await;
  let first = s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();
  let second = s.import_batch(batch("2026W", vec![record("B2")])).await.unwrap();

  assert!(second.session_created);
  assert_ne!(first.session_id, second.session_id);
  assert_eq!(s.list_sessions().await.unwrap().len(), 2);

  let in_first = s
    .list_applicants(ApplicantQuery { session_id: Some(first.session_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(in_first.len(), 1);
  assert_eq!(in_first[0].user_code, "A1");
}

#[tokio::test]
async fn campus_and_program_each_identify_a_session() {
  let s = store().await;
  let base = s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();

  let mut okanagan = batch("2025W", vec![record("B1")]);
  okanagan.session.campus = "Okanagan".into();
  let okanagan = s.import_batch(okanagan).await.unwrap();

  let mut other_program = batch("2025W", vec![record("C1")]);
  other_program.session.program_code = "VG02".into();
  other_program.session.program = "Master of Data Science - Computational Linguistics".into();
  let other_program = s.import_batch(other_program).await.unwrap();

  let mut both = batch("2025W", vec![record("D1")]);
  both.session.campus = "Okanagan".into();
  both.session.program_code = "VG02".into();
  let both = s.import_batch(both).await.unwrap();

  assert!(okanagan.session_created && other_program.session_created && both.session_created);
  let mut ids = vec![
    base.session_id,
    okanagan.session_id,
    other_program.session_id,
    both.session_id,
  ];
  ids.sort_unstable();
  ids.dedup();
  assert_eq!(ids.len(), 4);
  assert_eq!(s.list_sessions().await.unwrap().len(), 4);

  let mut again = batch("2025W", vec![record("B1")]);
  again.session.campus = "Okanagan".into();
  let again = s.import_batch(again).await.unwrap();
  assert!(!again.session_created);
  assert_eq!(again.session_id, okanagan.session_id);
}

#[tokio::test]
async fn age_refresh_is_not_a_change() {
  let s = store().await;
  let mut rec = record("A1");
  rec.info.birth_date = NaiveDate::from_ymd_opt(1990, 3, 14);

  s.import_batch(batch("2025W", vec![rec.clone()])).await.unwrap();
  let before = s.get_applicant("A1".into()).await.unwrap().unwrap();
  let age = before.age.expect("age from birth date");

  // Stand in for a birthday passing between two uploads.
  s.conn
    .call(|conn| {
      conn.execute("UPDATE applicant_info SET age = age - 1 WHERE user_code = 'A1'", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let summary = s.import_batch(batch("2025W", vec![rec])).await.unwrap();
  let after = s.get_applicant("A1".into()).await.unwrap().unwrap();

  assert_eq!(summary.changed, 0);
  assert_eq!(after.updated_at, before.updated_at);
  assert_eq!(after.age, Some(age));
}

#[tokio::test]
async fn highest_degree_ignores_institution_order() {
  let s = store().await;

  let mut forward = record("A1");
  forward.institutions = vec![
    institution("A1", 1, "Bachelor of Science", "Mathematics"),
    institution("A1", 2, "Master of Science", "Statistics"),
  ];
  let mut reversed = record("B2");
  reversed.institutions = vec![
    institution("B2", 1, "Master of Science", "Statistics"),
    institution("B2", 2, "Bachelor of Science", "Mathematics"),
  ];
  s.import_batch(batch("2025W", vec![forward, reversed])).await.unwrap();

  for code in ["A1", "B2"] {
    let app = s.get_applicant(code.into()).await.unwrap().unwrap().application.unwrap();
    assert_eq!(app.highest_degree.as_deref(), Some("Master of Science"));
    assert_eq!(app.degree_area.as_deref(), Some("Statistics"));
    // GPA is never filled in by an upload.
    assert_eq!(app.gpa, None);
  }
}

#[tokio::test]
async fn toefl_pass_short_circuits_failed_ielts() {
  let s = store().await;
  let mut rec = record("A1");
  rec.scores.toefl = vec![ToeflScore {
    user_code: "A1".into(),
    toefl_number: 1,
    listening: Some(22),
    reading: Some(22),
    writing: Some(21),
    speaking: Some(21),
    total: Some(90),
    ..Default::default()
  }];
  rec.scores.ielts = vec![IeltsScore {
    user_code: "A1".into(),
    ielts_number: 1,
    total: Some(5.0),
    ..Default::default()
  }];
  s.import_batch(batch("2025W", vec![rec])).await.unwrap();

  let app = s.get_applicant("A1".into()).await.unwrap().unwrap().application.unwrap();
  assert_eq!(app.english_status, Some(EnglishStatus::Passed));
  assert_eq!(app.english_description.as_deref(), Some("TOEFL requirements met"));
  assert!(app.english);
}

#[tokio::test]
async fn exemption_marks_english_not_required() {
  let s = store()
    .await
    .with_exemption(Arc::new(CitizenshipExemption::new(["Canada"])));
  let mut rec = record("A1");
  rec.info.citizenship_country = Some("canada".into());
  s.import_batch(batch("2025W", vec![rec, record("B2")])).await.unwrap();

  let a1 = s.get_applicant("A1".into()).await.unwrap().unwrap();
  assert!(a1.is_domestic);
  let app = a1.application.unwrap();
  assert_eq!(app.english_status, Some(EnglishStatus::NotRequired));
  assert_eq!(app.english_description.as_deref(), Some(NOT_REQUIRED_DESCRIPTION));

  let outcome = s.compute_english_status("B2".into()).await.unwrap().unwrap();
  assert_eq!(outcome.status, EnglishStatus::NotMet);
  assert!(s.compute_english_status("nobody".into()).await.unwrap().is_none());
  assert_eq!(s.recompute_all_english().await.unwrap(), 2);
}

#[tokio::test]
async fn upload_keeps_reviewer_fields() {
  let s = store().await;
  s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();

  let update = ReviewUpdate {
    cs: Some(true),
    gpa: Some("3.7".into()),
    comment: Some("strong".into()),
    ..Default::default()
  };
  let app = s.update_review("A1".into(), update).await.unwrap().unwrap();
  assert_eq!(app.cs, Some(true));
  assert_eq!(app.stat, None);

  s.set_review_status("A1".into(), ReviewStatus::Waitlist).await.unwrap().unwrap();

  let mut rec = record("A1");
  rec.institutions = vec![institution("A1", 1, "PhD", "Computer Science")];
  s.import_batch(batch("2025W", vec![rec])).await.unwrap();

  let app = s.get_applicant("A1".into()).await.unwrap().unwrap().application.unwrap();
  assert_eq!(app.sent, ReviewStatus::Waitlist);
  assert_eq!(app.cs, Some(true));
  assert_eq!(app.gpa.as_deref(), Some("3.7"));
  assert_eq!(app.comment.as_deref(), Some("strong"));
  assert_eq!(app.highest_degree.as_deref(), Some("PhD"));
}

#[tokio::test]
async fn review_of_unknown_applicant_is_none() {
  let s = store().await;
  assert!(s.update_review("X".into(), ReviewUpdate::default()).await.unwrap().is_none());
  assert!(s.set_review_status("X".into(), ReviewStatus::Reviewed).await.unwrap().is_none());
  assert!(s.get_applicant("X".into()).await.unwrap().is_none());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_status_and_search() {
  let s = store().await;
  s.import_batch(batch("2025W", vec![record("A1"), record("B2"), record("C3")]))
    .await
    .unwrap();
  s.set_review_status("B2".into(), ReviewStatus::OfferSent).await.unwrap();

  let offered = s
    .list_applicants(ApplicantQuery { status: Some(ReviewStatus::OfferSent), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(offered.len(), 1);
  assert_eq!(offered[0].user_code, "B2");

  let not_reviewed = s
    .list_applicants(ApplicantQuery {
      status: Some(ReviewStatus::NotReviewed),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(not_reviewed.len(), 2);

  let found = s
    .list_applicants(ApplicantQuery { search: Some("c3@".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].user_code, "C3");

  let page = s
    .list_applicants(ApplicantQuery { limit: Some(2), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  let codes: Vec<_> = page.iter().map(|o| o.user_code.as_str()).collect();
  assert_eq!(codes, ["B2", "C3"]);
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ratings_upsert_per_reviewer() {
  let s = store().await;
  s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();
  let alice = user(&s, "alice", Role::Faculty).await;
  let bob = user(&s, "bob", Role::Faculty).await;

  s.upsert_rating(NewRating::new(alice, "A1", 6.0, None).unwrap()).await.unwrap();
  let updated = s
    .upsert_rating(NewRating::new(alice, "A1", 8.0, Some("on reflection".into())).unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.rating, 8.0);
  assert_eq!(updated.username, "alice");
  s.upsert_rating(NewRating::new(bob, "A1", 7.0, None).unwrap()).await.unwrap();

  let ratings = s.list_ratings("A1".into()).await.unwrap();
  assert_eq!(ratings.len(), 2);

  let overview = &s.list_applicants(ApplicantQuery::default()).await.unwrap()[0];
  assert_eq!(overview.rating_count, 2);
  assert_eq!(overview.average_rating, Some(7.5));

  assert!(s.delete_rating(bob, "A1".into()).await.unwrap());
  assert!(!s.delete_rating(bob, "A1".into()).await.unwrap());
  assert_eq!(s.list_ratings("A1".into()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rating_unknown_applicant_is_none() {
  let s = store().await;
  let alice = user(&s, "alice", Role::Faculty).await;
  let result = s
    .upsert_rating(NewRating::new(alice, "nobody", 5.0, None).unwrap())
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Users & auth sessions ───────────────────────────────────────────────────

#[tokio::test]
async fn users_and_auth_sessions() {
  let s = store().await;
  let id = user(&s, "Admin", Role::Admin).await;

  let found = s.find_user("admin".into()).await.unwrap().unwrap();
  assert_eq!(found.id, id);
  assert_eq!(found.role, Role::Admin);

  let now = Utc::now();
  s.create_auth_session("live".into(), id, now + Duration::hours(1)).await.unwrap();
  s.create_auth_session("stale".into(), id, now - Duration::hours(1)).await.unwrap();

  assert_eq!(s.user_for_session("live".into(), now).await.unwrap().unwrap().id, id);
  assert!(s.user_for_session("stale".into(), now).await.unwrap().is_none());

  s.delete_auth_session("live".into()).await.unwrap();
  assert!(s.user_for_session("live".into(), now).await.unwrap().is_none());

  let demoted = s.set_user_role(id, Role::Viewer).await.unwrap().unwrap();
  assert_eq!(demoted.role, Role::Viewer);
  assert!(s.set_user_role(999, Role::Viewer).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_is_none() {
  let s = store().await;
  let id = user(&s, "Admin", Role::Admin).await;

  let again = s
    .create_user(NewUser {
      username: "ADMIN".into(),
      password_hash: "$argon2id$other".into(),
      role: Role::Viewer,
    })
    .await
    .unwrap();
  assert!(again.is_none());

  let found = s.find_user("admin".into()).await.unwrap().unwrap();
  assert_eq!(found.id, id);
  assert_eq!(found.role, Role::Admin);
}

#[tokio::test]
async fn deleting_user_drops_sessions_and_ratings() {
  let s = store().await;
  s.import_batch(batch("2025W", vec![record("A1")])).await.unwrap();
  let id = user(&s, "carol", Role::Faculty).await;
  s.create_auth_session("tok".into(), id, Utc::now() + Duration::hours(1)).await.unwrap();
  s.upsert_rating(NewRating::new(id, "A1", 9.0, None).unwrap()).await.unwrap();
  s.log_activity(NewActivity::new(Some(id), ActivityAction::Login)).await.unwrap();

  assert!(s.delete_user(id).await.unwrap());
  assert!(!s.delete_user(id).await.unwrap());
  assert!(s.get_user(id).await.unwrap().is_none());
  assert!(s.user_for_session("tok".into(), Utc::now()).await.unwrap().is_none());
  assert!(s.list_ratings("A1".into()).await.unwrap().is_empty());

  let log = s.list_activity(10).await.unwrap();
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].user_id, None);
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_is_listed_newest_first() {
  let s = store().await;
  let id = user(&s, "dave", Role::Admin).await;

  s.log_activity(NewActivity::new(Some(id), ActivityAction::Login)).await.unwrap();
  let entry = s
    .log_activity(
      NewActivity::new(Some(id), ActivityAction::StatusChange)
        .target("A1")
        .details("Offer Sent"),
    )
    .await
    .unwrap();
  assert_eq!(entry.username.as_deref(), Some("dave"));

  let log = s.list_activity(10).await.unwrap();
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].action, ActivityAction::StatusChange);
  assert_eq!(log[0].target.as_deref(), Some("A1"));
  assert_eq!(log[1].action, ActivityAction::Login);

  assert_eq!(s.list_activity(1).await.unwrap().len(), 1);
}
