//! Reviewer-facing export rows with computed grouping columns.

use serde::Serialize;

use crate::{review::ReviewStatus, view::ApplicantOverview};

/// Bucket an age for the report.
pub fn age_range(age: Option<u32>) -> &'static str {
  match age {
    None => "",
    Some(a) if a < 25 => "<25",
    Some(25..=29) => "25-29",
    Some(30..=34) => "30-34",
    Some(_) => "35+",
  }
}

/// Subject groups in match order; the first group with a matching keyword
/// wins.
const SUBJECT_GROUPS: &[(&str, &[&str])] = &[
  ("Computer Science", &["computer", "software", "computing", "informatics", "data science"]),
  ("Statistics/Mathematics", &["statistic", "math", "actuarial"]),
  ("Engineering", &["engineer"]),
];

/// Group a program of study into a broad subject area.
pub fn subject_group(degree_area: Option<&str>) -> &'static str {
  let Some(area) = degree_area.map(str::to_lowercase) else {
    return "";
  };
  SUBJECT_GROUPS
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| area.contains(k)))
    .map_or("Other", |(group, _)| *group)
}

fn yes_no(value: Option<bool>) -> &'static str {
  match value {
    Some(true) => "Yes",
    Some(false) => "No",
    None => "",
  }
}

/// One flattened report line. Field order matches [`ExportRow::HEADERS`].
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
  pub user_code:          String,
  pub family_name:        String,
  pub given_name:         String,
  pub session:            String,
  pub email:              String,
  pub citizenship:        String,
  pub domestic:           &'static str,
  pub age_range:          &'static str,
  pub highest_degree:     String,
  pub degree_area:        String,
  pub subject_group:      &'static str,
  pub gpa:                String,
  pub cs:                 &'static str,
  pub stat:               &'static str,
  pub math:               &'static str,
  pub english_status:     String,
  pub review_status:      String,
  pub offer_sent:         &'static str,
  pub average_rating:     String,
  pub rating_count:       u32,
}

impl ExportRow {
  pub const HEADERS: [&'static str; 20] = [
    "User Code",
    "Family Name",
    "Given Name",
    "Session",
    "Email",
    "Citizenship",
    "Domestic",
    "Age Range",
    "Highest Degree",
    "Degree Area",
    "Subject Group",
    "GPA",
    "CS",
    "Stat",
    "Math",
    "English Status",
    "Review Status",
    "Offer Sent",
    "Average Rating",
    "Rating Count",
  ];
}

impl From<&ApplicantOverview> for ExportRow {
  fn from(o: &ApplicantOverview) -> Self {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    Self {
      user_code:      o.user_code.clone(),
      family_name:    text(&o.family_name),
      given_name:     text(&o.given_name),
      session:        text(&o.session_name),
      email:          text(&o.email),
      citizenship:    text(&o.citizenship_country),
      domestic:       if o.is_domestic { "Yes" } else { "No" },
      age_range:      age_range(o.age),
      highest_degree: text(&o.highest_degree),
      degree_area:    text(&o.degree_area),
      subject_group:  subject_group(o.degree_area.as_deref()),
      gpa:            text(&o.gpa),
      cs:             yes_no(o.cs),
      stat:           yes_no(o.stat),
      math:           yes_no(o.math),
      english_status: o.english_status.map(|s| s.to_string()).unwrap_or_default(),
      review_status:  o.sent.to_string(),
      offer_sent:     if o.sent == ReviewStatus::OfferSent { "Yes" } else { "No" },
      average_rating: o.average_rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
      rating_count:   o.rating_count,
    }
  }
}
