//! Read models assembled from several tables at query time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  applicant::{ApplicantInfo, ApplicantStatus, Institution, Session},
  english::EnglishStatus,
  review::{ApplicationInfo, Rating, ReviewStatus},
  scores::TestScores,
};

/// One line of the applicant list and of the export report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantOverview {
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
  pub sent:                ReviewStatus,
  pub english_status:      Option<EnglishStatus>,
  pub english:             bool,
  pub average_rating:      Option<f64>,
  pub rating_count:        u32,
  pub updated_at:          DateTime<Utc>,
}

/// Everything known about one applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantDetail {
  pub info:         ApplicantInfo,
  pub age:          Option<u32>,
  pub is_domestic:  bool,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub session:      Option<Session>,
  pub status:       Option<ApplicantStatus>,
  pub institutions: Vec<Institution>,
  pub scores:       TestScores,
  pub application:  Option<ApplicationInfo>,
  pub ratings:      Vec<Rating>,
}
