//! The reviewer-facing record: review status, prerequisites, ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result, english::EnglishStatus};

// ─── Review status ───────────────────────────────────────────────────────────

/// Where an applicant is in the review workflow (the `sent` column).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
pub enum ReviewStatus {
  #[default]
  #[strum(serialize = "Not Reviewed")]
  #[serde(rename = "Not Reviewed")]
  NotReviewed,
  #[strum(serialize = "Reviewed")]
  #[serde(rename = "Reviewed")]
  Reviewed,
  #[strum(serialize = "Waitlist")]
  #[serde(rename = "Waitlist")]
  Waitlist,
  #[strum(serialize = "Declined")]
  #[serde(rename = "Declined")]
  Declined,
  #[strum(serialize = "Send Offer to CoGS")]
  #[serde(rename = "Send Offer to CoGS")]
  SendOfferToCogs,
  #[strum(serialize = "Offer Sent")]
  #[serde(rename = "Offer Sent")]
  OfferSent,
}

impl ReviewStatus {
  /// Every status in workflow order.
  pub fn all() -> Vec<ReviewStatus> { ReviewStatus::iter().collect() }

  /// Parse a status string, reporting the offending value on failure.
  pub fn parse(s: &str) -> Result<Self> {
    s.trim().parse().map_err(|_| Error::InvalidStatus(s.to_owned()))
  }
}

// ─── Application info ────────────────────────────────────────────────────────

/// One row per applicant; reviewer-owned fields plus computed columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationInfo {
  pub user_code:           String,
  pub sent:                ReviewStatus,
  pub cs:                  Option<bool>,
  pub stat:                Option<bool>,
  pub math:                Option<bool>,
  pub gpa:                 Option<String>,
  pub highest_degree:      Option<String>,
  pub degree_area:         Option<String>,
  pub english_status:      Option<EnglishStatus>,
  pub english_description: Option<String>,
  pub english:             bool,
  pub comment:             Option<String>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

/// Fields a Faculty reviewer may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
  pub cs:      Option<bool>,
  pub stat:    Option<bool>,
  pub math:    Option<bool>,
  pub gpa:     Option<String>,
  pub comment: Option<String>,
}

impl ReviewUpdate {
  pub fn is_empty(&self) -> bool {
    self.cs.is_none()
      && self.stat.is_none()
      && self.math.is_none()
      && self.gpa.is_none()
      && self.comment.is_none()
  }
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

/// Accepts ratings in `0.0..=10.0` with at most one decimal place.
pub fn validate_rating(rating: f64) -> Result<f64> {
  if !rating.is_finite() {
    return Err(Error::RatingOutOfRange(rating));
  }
  let tenths = rating * 10.0;
  if (tenths - tenths.round()).abs() > 1e-6 {
    return Err(Error::RatingPrecision(rating));
  }
  if !(RATING_MIN..=RATING_MAX).contains(&rating) {
    return Err(Error::RatingOutOfRange(rating));
  }
  Ok(tenths.round() / 10.0)
}

/// A reviewer's score for an applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
  pub user_id:    i64,
  pub username:   String,
  pub user_code:  String,
  pub rating:     f64,
  pub comment:    Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::AdmissionsStore::upsert_rating`]; build it with
/// [`NewRating::new`] so the score is validated.
#[derive(Debug, Clone)]
pub struct NewRating {
  pub user_id:   i64,
  pub user_code: String,
  pub rating:    f64,
  pub comment:   Option<String>,
}

impl NewRating {
  pub fn new(
    user_id: i64,
    user_code: impl Into<String>,
    rating: f64,
    comment: Option<String>,
  ) -> Result<Self> {
    Ok(Self {
      user_id,
      user_code: user_code.into(),
      rating: validate_rating(rating)?,
      comment,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rating_bounds_and_precision() {
    assert_eq!(validate_rating(10.0).unwrap(), 10.0);
    assert_eq!(validate_rating(0.0).unwrap(), 0.0);
    assert_eq!(validate_rating(7.3).unwrap(), 7.3);
    assert!(matches!(validate_rating(10.05), Err(Error::RatingPrecision(_))));
    assert!(matches!(validate_rating(9.55), Err(Error::RatingPrecision(_))));
    assert!(matches!(validate_rating(-0.1), Err(Error::RatingOutOfRange(_))));
    assert!(matches!(validate_rating(10.1), Err(Error::RatingOutOfRange(_))));
    assert!(validate_rating(f64::NAN).is_err());
  }

  #[test]
  fn review_status_round_trips_through_strings() {
    for status in ReviewStatus::all() {
      assert_eq!(ReviewStatus::parse(&status.to_string()).unwrap(), status);
    }
    assert_eq!(ReviewStatus::default(), ReviewStatus::NotReviewed);
    assert!(matches!(ReviewStatus::parse("Accepted"), Err(Error::InvalidStatus(_))));
  }

  #[test]
  fn status_serialises_as_display_text() {
    let json = serde_json::to_string(&ReviewStatus::OfferSent).unwrap();
    assert_eq!(json, "\"Offer Sent\"");
  }
}
