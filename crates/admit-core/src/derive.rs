//! Fields computed from uploaded data rather than read from it.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::applicant::{ApplicantInfo, Institution};

// ─── Age ─────────────────────────────────────────────────────────────────────

/// Whole years between `birth_date` and `today`; `None` for future dates.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
  let mut years = today.year() - birth_date.year();
  if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
    years -= 1;
  }
  u32::try_from(years).ok()
}

// ─── Citizenship ─────────────────────────────────────────────────────────────

const DOMESTIC_COUNTRY: &str = "canada";

/// Canadian citizens and permanent residents are domestic applicants.
pub fn is_domestic(info: &ApplicantInfo) -> bool {
  let is_canada = |v: &Option<String>| {
    v.as_deref()
      .is_some_and(|c| c.trim().eq_ignore_ascii_case(DOMESTIC_COUNTRY))
  };
  if is_canada(&info.citizenship_country) || is_canada(&info.dual_citizenship) {
    return true;
  }
  info
    .citizenship_status
    .as_deref()
    .map(str::to_lowercase)
    .is_some_and(|s| s.contains("permanent resident") || s.contains("canadian citizen"))
}

// ─── Degree hierarchy ────────────────────────────────────────────────────────

/// Credential keywords and the level they imply. Matching is a
/// case-insensitive substring test; the highest matching level wins.
pub const DEGREE_HIERARCHY: &[(&str, u8)] = &[
  ("doctor", 4),
  ("phd", 4),
  ("ph.d", 4),
  ("master", 3),
  ("msc", 3),
  ("m.sc", 3),
  ("mba", 3),
  ("bachelor", 2),
  ("bsc", 2),
  ("b.sc", 2),
  ("baccalaureate", 2),
  ("associate", 1),
  ("diploma", 1),
];

/// The hierarchy level of a credential, or `None` if nothing matches.
pub fn degree_level(credential: &str) -> Option<u8> {
  let lowered = credential.to_lowercase();
  DEGREE_HIERARCHY
    .iter()
    .filter(|(keyword, _)| lowered.contains(keyword))
    .map(|(_, level)| *level)
    .max()
}

/// The degree-derived columns of `application_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeFields {
  /// Credential text of the selected institution.
  pub highest_degree: String,
  /// Program of study of the selected institution.
  pub degree_area:    Option<String>,
  /// GPA of the selected institution. Reviewers enter GPA by hand, so
  /// ingestion does not persist this value.
  pub gpa:            Option<String>,
}

/// Later conferral dates rank higher; a missing date ranks below any date.
fn confer_order(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => a.cmp(&b),
    (Some(_), None) => Ordering::Greater,
    (None, Some(_)) => Ordering::Less,
    (None, None) => Ordering::Equal,
  }
}

/// Pick the institution with the highest recognised degree, breaking ties
/// by the latest conferral date.
pub fn calculate_application_info_fields(institutions: &[Institution]) -> Option<DegreeFields> {
  institutions
    .iter()
    .filter_map(|inst| {
      let credential = inst.credential.as_deref()?.trim();
      if credential.is_empty() {
        return None;
      }
      Some((degree_level(credential)?, inst))
    })
    .max_by(|(la, a), (lb, b)| la.cmp(lb).then_with(|| confer_order(a.date_confer, b.date_confer)))
    .map(|(_, inst)| DegreeFields {
      highest_degree: inst.credential.as_deref().unwrap_or_default().trim().to_owned(),
      degree_area:    inst.program_study.clone(),
      gpa:            inst.gpa.clone(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn inst(n: u8, credential: &str, area: &str, confer: Option<NaiveDate>) -> Institution {
    Institution {
      user_code: "A1".into(),
      institution_number: n,
      credential: Some(credential.into()),
      program_study: Some(area.into()),
      date_confer: confer,
      gpa: Some(format!("{n}.0")),
      ..Default::default()
    }
  }

  #[test]
  fn age_counts_completed_years() {
    assert_eq!(age_on(date(2000, 6, 15), date(2025, 6, 14)), Some(24));
    assert_eq!(age_on(date(2000, 6, 15), date(2025, 6, 15)), Some(25));
    assert_eq!(age_on(date(2030, 1, 1), date(2025, 1, 1)), None);
  }

  #[test]
  fn domestic_by_country_or_status() {
    let mut info =
      ApplicantInfo { citizenship_country: Some("CANADA".into()), ..Default::default() };
    assert!(is_domestic(&info));

    info.citizenship_country = Some("India".into());
    assert!(!is_domestic(&info));

    info.citizenship_status = Some("Permanent Resident".into());
    assert!(is_domestic(&info));
  }

  #[test]
  fn degree_levels() {
    assert_eq!(degree_level("Doctor of Philosophy"), Some(4));
    assert_eq!(degree_level("MSc Statistics"), Some(3));
    assert_eq!(degree_level("Bachelor of Science"), Some(2));
    assert_eq!(degree_level("Diploma in Accounting"), Some(1));
    assert_eq!(degree_level("Certificate"), None);
  }

  #[test]
  fn master_beats_bachelor_in_any_order() {
    let bachelor = inst(1, "Bachelor of Science", "Mathematics", Some(date(2018, 5, 1)));
    let master = inst(2, "Master of Data Science", "Data Science", Some(date(2016, 5, 1)));

    for order in [vec![bachelor.clone(), master.clone()], vec![master.clone(), bachelor.clone()]] {
      let fields = calculate_application_info_fields(&order).unwrap();
      assert_eq!(fields.highest_degree, "Master of Data Science");
      assert_eq!(fields.degree_area.as_deref(), Some("Data Science"));
      assert_eq!(fields.gpa.as_deref(), Some("2.0"));
    }
  }

  #[test]
  fn ties_prefer_latest_conferral_then_any_date() {
    let older = inst(1, "Bachelor of Arts", "History", Some(date(2010, 1, 1)));
    let newer = inst(2, "Bachelor of Science", "Physics", Some(date(2015, 1, 1)));
    let undated = inst(3, "Bachelor of Commerce", "Business", None);

    let fields = calculate_application_info_fields(&[undated.clone(), older, newer]).unwrap();
    assert_eq!(fields.degree_area.as_deref(), Some("Physics"));

    let other_undated = inst(4, "Bachelor of Music", "Music", None);
    let dated = inst(5, "Bachelor", "Dated", Some(date(1990, 1, 1)));
    let fields = calculate_application_info_fields(&[undated, other_undated, dated]).unwrap();
    assert_eq!(fields.degree_area.as_deref(), Some("Dated"));
  }

  #[test]
  fn blank_and_unrecognised_credentials_are_skipped() {
    let blank = inst(1, "  ", "Nothing", None);
    let unknown = inst(2, "Certificate of Completion", "Welding", None);
    assert!(calculate_application_info_fields(&[blank, unknown]).is_none());
  }
}
