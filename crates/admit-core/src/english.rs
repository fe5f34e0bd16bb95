//! English-language proficiency evaluation.
//!
//! Tests are examined in a fixed priority order (TOEFL, IELTS, MELAB, PTE,
//! CAEL). The first sitting that clears every minimum for its test decides
//! the outcome and no lower-priority test is looked at. A sitting with any
//! reported value counts as submitted; if a minimum-bearing score is missing
//! it cannot pass, but the test is still named among the failures.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  applicant::ApplicantInfo,
  scores::{CaelScore, IeltsScore, MelabScore, PteScore, Reported, TestScores, ToeflScore},
};

pub const NO_TESTS_DESCRIPTION: &str = "No English tests submitted";
pub const NOT_REQUIRED_DESCRIPTION: &str = "English test not required";

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum EnglishStatus {
  #[strum(serialize = "Passed")]
  #[serde(rename = "Passed")]
  Passed,
  #[strum(serialize = "Not Met")]
  #[serde(rename = "Not Met")]
  NotMet,
  #[strum(serialize = "Not Required")]
  #[serde(rename = "Not Required")]
  NotRequired,
}

/// The status/description pair written to `application_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnglishOutcome {
  pub status:      EnglishStatus,
  pub description: String,
}

impl EnglishOutcome {
  /// The boolean `english` column: the requirement is satisfied.
  pub fn english(&self) -> bool {
    matches!(self.status, EnglishStatus::Passed | EnglishStatus::NotRequired)
  }
}

// ─── Tests in priority order ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EnglishTest {
  #[strum(serialize = "TOEFL")]
  Toefl,
  #[strum(serialize = "IELTS")]
  Ielts,
  #[strum(serialize = "MELAB")]
  Melab,
  #[strum(serialize = "PTE")]
  Pte,
  #[strum(serialize = "CAEL")]
  Cael,
}

impl EnglishTest {
  pub const PRIORITY: [EnglishTest; 5] = [
    EnglishTest::Toefl,
    EnglishTest::Ielts,
    EnglishTest::Melab,
    EnglishTest::Pte,
    EnglishTest::Cael,
  ];
}

/// Result of looking at every sitting of one test.
enum TestResult {
  NotSubmitted,
  Failed,
  Passed(String),
}

fn at_least<T: Into<f64> + Copy>(score: Option<T>, min: f64) -> bool {
  score.is_some_and(|s| s.into() >= min)
}

fn as_f64(score: Option<i64>) -> Option<f64> { score.map(|s| s as f64) }

// ─── Per-test minimums ───────────────────────────────────────────────────────

const TOEFL_LISTENING: f64 = 22.0;
const TOEFL_READING: f64 = 22.0;
const TOEFL_WRITING: f64 = 21.0;
const TOEFL_SPEAKING: f64 = 21.0;
const TOEFL_TOTAL: f64 = 90.0;

const IELTS_SECTION: f64 = 6.0;
const IELTS_TOTAL: f64 = 6.5;

const MELAB_TOTAL: f64 = 64.0;
const PTE_TOTAL: f64 = 65.0;
const CAEL_SECTION: f64 = 60.0;

fn toefl_meets(
  l: Option<i64>,
  r: Option<i64>,
  w: Option<i64>,
  s: Option<i64>,
  t: Option<i64>,
) -> bool {
  at_least(as_f64(l), TOEFL_LISTENING)
    && at_least(as_f64(r), TOEFL_READING)
    && at_least(as_f64(w), TOEFL_WRITING)
    && at_least(as_f64(s), TOEFL_SPEAKING)
    && at_least(as_f64(t), TOEFL_TOTAL)
}

fn evaluate_toefl(sittings: &[ToeflScore]) -> TestResult {
  let mut submitted = false;
  for sitting in sittings.iter().filter(|s| s.is_reported()) {
    submitted = true;
    if toefl_meets(
      sitting.listening,
      sitting.reading,
      sitting.writing,
      sitting.speaking,
      sitting.total,
    ) {
      return TestResult::Passed(format!("{} requirements met", EnglishTest::Toefl));
    }
    if toefl_meets(
      sitting.mybest_listening,
      sitting.mybest_reading,
      sitting.mybest_writing,
      sitting.mybest_speaking,
      sitting.mybest_total,
    ) {
      return TestResult::Passed(format!("{} MyBest requirements met", EnglishTest::Toefl));
    }
  }
  if submitted { TestResult::Failed } else { TestResult::NotSubmitted }
}

fn evaluate_ielts(sittings: &[IeltsScore]) -> TestResult {
  let mut submitted = false;
  for sitting in sittings.iter().filter(|s| s.is_reported()) {
    submitted = true;
    let sections = [sitting.listening, sitting.reading, sitting.writing, sitting.speaking];
    if sections.iter().all(|s| at_least(*s, IELTS_SECTION))
      && at_least(sitting.total, IELTS_TOTAL)
    {
      return TestResult::Passed(format!("{} requirements met", EnglishTest::Ielts));
    }
  }
  if submitted { TestResult::Failed } else { TestResult::NotSubmitted }
}

/// Single-sitting tests share the same shape: absent, failed, or passed.
fn evaluate_single<T: Reported>(
  test: EnglishTest,
  sitting: Option<&T>,
  passes: impl Fn(&T) -> bool,
) -> TestResult {
  match sitting.filter(|s| s.is_reported()) {
    None => TestResult::NotSubmitted,
    Some(s) if passes(s) => TestResult::Passed(format!("{test} requirements met")),
    Some(_) => TestResult::Failed,
  }
}

fn melab_passes(s: &MelabScore) -> bool { at_least(as_f64(s.total), MELAB_TOTAL) }

fn pte_passes(s: &PteScore) -> bool { at_least(as_f64(s.total), PTE_TOTAL) }

fn cael_passes(s: &CaelScore) -> bool {
  [s.reading, s.listening, s.writing, s.speaking]
    .iter()
    .all(|section| at_least(as_f64(*section), CAEL_SECTION))
}

fn evaluate_test(test: EnglishTest, scores: &TestScores) -> TestResult {
  match test {
    EnglishTest::Toefl => evaluate_toefl(&scores.toefl),
    EnglishTest::Ielts => evaluate_ielts(&scores.ielts),
    EnglishTest::Melab => evaluate_single(test, scores.melab.as_ref(), melab_passes),
    EnglishTest::Pte => evaluate_single(test, scores.pte.as_ref(), pte_passes),
    EnglishTest::Cael => evaluate_single(test, scores.cael.as_ref(), cael_passes),
  }
}

// ─── Exemption ───────────────────────────────────────────────────────────────

/// Decides, before any score is examined, that an applicant does not need
/// to demonstrate English proficiency.
pub trait EnglishExemption: Send + Sync {
  fn is_exempt(&self, info: &ApplicantInfo) -> bool;
}

impl<F> EnglishExemption for F
where
  F: Fn(&ApplicantInfo) -> bool + Send + Sync,
{
  fn is_exempt(&self, info: &ApplicantInfo) -> bool { self(info) }
}

/// Nobody is exempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExemption;

impl EnglishExemption for NoExemption {
  fn is_exempt(&self, _: &ApplicantInfo) -> bool { false }
}

/// Exempts citizens of the listed countries (primary or dual citizenship),
/// compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CitizenshipExemption {
  countries: Vec<String>,
}

impl CitizenshipExemption {
  pub fn new<I, S>(countries: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      countries: countries
        .into_iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect(),
    }
  }
}

impl EnglishExemption for CitizenshipExemption {
  fn is_exempt(&self, info: &ApplicantInfo) -> bool {
    [&info.citizenship_country, &info.dual_citizenship]
      .into_iter()
      .flatten()
      .any(|c| self.countries.contains(&c.trim().to_lowercase()))
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Evaluate the English requirement for one applicant.
///
/// `info` is `None` when the applicant has scores but no identity record;
/// the exemption check is skipped in that case.
pub fn evaluate(
  info: Option<&ApplicantInfo>,
  scores: &TestScores,
  exemption: &dyn EnglishExemption,
) -> EnglishOutcome {
  if info.is_some_and(|i| exemption.is_exempt(i)) {
    return EnglishOutcome {
      status:      EnglishStatus::NotRequired,
      description: NOT_REQUIRED_DESCRIPTION.to_owned(),
    };
  }

  let mut failed = Vec::new();
  for test in EnglishTest::PRIORITY {
    match evaluate_test(test, scores) {
      TestResult::Passed(description) => {
        return EnglishOutcome { status: EnglishStatus::Passed, description };
      }
      TestResult::Failed => failed.push(test.to_string()),
      TestResult::NotSubmitted => {}
    }
  }

  let description = if failed.is_empty() {
    NO_TESTS_DESCRIPTION.to_owned()
  } else {
    format!("Failed: {}", failed.join(", "))
  };
  EnglishOutcome { status: EnglishStatus::NotMet, description }
}
