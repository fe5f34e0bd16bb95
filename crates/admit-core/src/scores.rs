//! Standardised test score records.
//!
//! TOEFL and IELTS keep up to [`MAX_ATTEMPTS`] sittings each; every other
//! test keeps a single sitting. Scores are optional throughout because the
//! upstream extract leaves blank whatever the applicant did not report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sittings kept per applicant for TOEFL and IELTS.
pub const MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToeflScore {
  pub user_code:           String,
  pub toefl_number:        u8,
  pub registration_number: Option<String>,
  pub date_written:        Option<NaiveDate>,
  pub listening:           Option<i64>,
  pub reading:             Option<i64>,
  pub writing:             Option<i64>,
  pub speaking:            Option<i64>,
  pub total:               Option<i64>,
  pub mybest_listening:    Option<i64>,
  pub mybest_reading:      Option<i64>,
  pub mybest_writing:      Option<i64>,
  pub mybest_speaking:     Option<i64>,
  pub mybest_total:        Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IeltsScore {
  pub user_code:        String,
  pub ielts_number:     u8,
  pub candidate_number: Option<String>,
  pub date_written:     Option<NaiveDate>,
  pub listening:        Option<f64>,
  pub reading:          Option<f64>,
  pub writing:          Option<f64>,
  pub speaking:         Option<f64>,
  /// Overall band score.
  pub total:            Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MelabScore {
  pub user_code:        String,
  pub reference_number: Option<String>,
  pub date_written:     Option<NaiveDate>,
  pub listening:        Option<i64>,
  /// Grammar/cloze/vocabulary/reading section.
  pub gcvr:             Option<i64>,
  pub writing:          Option<i64>,
  pub speaking:         Option<i64>,
  pub total:            Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PteScore {
  pub user_code:        String,
  pub reference_number: Option<String>,
  pub date_written:     Option<NaiveDate>,
  pub listening:        Option<i64>,
  pub reading:          Option<i64>,
  pub speaking:         Option<i64>,
  pub writing:          Option<i64>,
  pub total:            Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaelScore {
  pub user_code:        String,
  pub reference_number: Option<String>,
  pub date_written:     Option<NaiveDate>,
  pub reading:          Option<i64>,
  pub listening:        Option<i64>,
  pub writing:          Option<i64>,
  pub speaking:         Option<i64>,
  pub total:            Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CelpipScore {
  pub user_code:       String,
  pub date_written:    Option<NaiveDate>,
  pub listening:       Option<i64>,
  pub speaking:        Option<i64>,
  pub reading_writing: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuolingoScore {
  pub user_code:     String,
  pub date_written:  Option<NaiveDate>,
  pub score:         Option<i64>,
  pub literacy:      Option<i64>,
  pub conversation:  Option<i64>,
  pub comprehension: Option<i64>,
  pub production:    Option<i64>,
}

/// An alternative English-language proficiency proof accepted case by case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AltElppScore {
  pub user_code:    String,
  pub test_type:    Option<String>,
  pub date_written: Option<NaiveDate>,
  pub total:        Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreScore {
  pub user_code:           String,
  pub registration_number: Option<String>,
  pub date_written:        Option<NaiveDate>,
  pub verbal:              Option<i64>,
  pub verbal_below:        Option<f64>,
  pub quantitative:        Option<i64>,
  pub quantitative_below:  Option<f64>,
  pub writing:             Option<f64>,
  pub writing_below:       Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GmatScore {
  pub user_code:            String,
  pub reference_number:     Option<String>,
  pub date_written:         Option<NaiveDate>,
  pub total:                Option<i64>,
  pub integrated_reasoning: Option<i64>,
  pub quantitative:         Option<i64>,
  pub verbal:               Option<i64>,
  pub writing:              Option<f64>,
}

/// Every score an applicant reported, grouped by test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestScores {
  pub toefl:    Vec<ToeflScore>,
  pub ielts:    Vec<IeltsScore>,
  pub melab:    Option<MelabScore>,
  pub pte:      Option<PteScore>,
  pub cael:     Option<CaelScore>,
  pub celpip:   Option<CelpipScore>,
  pub duolingo: Option<DuolingoScore>,
  pub alt_elpp: Option<AltElppScore>,
  pub gre:      Option<GreScore>,
  pub gmat:     Option<GmatScore>,
}

// ─── Emptiness ───────────────────────────────────────────────────────────────

/// Whether a score record carries any value beyond its key columns.
///
/// Empty records are never written; an upload that leaves a test blank does
/// not clear a sitting stored by an earlier upload.
pub trait Reported {
  fn is_reported(&self) -> bool;
}

macro_rules! reported_if_any {
  ($ty:ty => $($field:ident),+ $(,)?) => {
    impl Reported for $ty {
      fn is_reported(&self) -> bool {
        false $(|| self.$field.is_some())+
      }
    }
  };
}

reported_if_any!(ToeflScore => registration_number, date_written, listening,
  reading, writing, speaking, total, mybest_listening, mybest_reading,
  mybest_writing, mybest_speaking, mybest_total);
reported_if_any!(IeltsScore => candidate_number, date_written, listening,
  reading, writing, speaking, total);
reported_if_any!(MelabScore => reference_number, date_written, listening,
  gcvr, writing, speaking, total);
reported_if_any!(PteScore => reference_number, date_written, listening,
  reading, speaking, writing, total);
reported_if_any!(CaelScore => reference_number, date_written, reading,
  listening, writing, speaking, total);
reported_if_any!(CelpipScore => date_written, listening, speaking,
  reading_writing);
reported_if_any!(DuolingoScore => date_written, score, literacy, conversation,
  comprehension, production);
reported_if_any!(AltElppScore => test_type, date_written, total);
reported_if_any!(GreScore => registration_number, date_written, verbal,
  verbal_below, quantitative, quantitative_below, writing, writing_below);
reported_if_any!(GmatScore => reference_number, date_written, total,
  integrated_reasoning, quantitative, verbal, writing);
