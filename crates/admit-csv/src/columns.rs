//! Column names of the admissions-system extract and typed cell access.
//!
//! Headers are matched trimmed and case-insensitively. Attempt- and
//! institution-numbered columns are built from the templates below, with
//! `{n}` standing for the number.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::StringRecord;

// ─── Session ─────────────────────────────────────────────────────────────────

pub const USER_CODE: &str = "User Code";
pub const PROGRAM_CODE: &str = "Program CODE";
pub const PROGRAM: &str = "Program";
pub const SESSION: &str = "Session";
pub const CAMPUS: &str = "Campus";

// ─── Identity ────────────────────────────────────────────────────────────────

pub const FAMILY_NAME: &str = "Family Name";
pub const GIVEN_NAME: &str = "Given Name";
pub const MIDDLE_NAME: &str = "Middle Name";
pub const PREFERRED_NAME: &str = "Preferred Name";
pub const EMAIL: &str = "Email";
pub const PHONE: &str = "Primary Telephone";
pub const ADDRESS_LINE: &str = "Address Line 1";
pub const CITY: &str = "City";
pub const PROVINCE: &str = "Province";
pub const POSTAL_CODE: &str = "Postal Code";
pub const COUNTRY: &str = "Country";
pub const BIRTH_DATE: &str = "Date of Birth";
pub const GENDER: &str = "Gender";
pub const CITIZENSHIP_COUNTRY: &str = "Country of Citizenship";
pub const CITIZENSHIP_STATUS: &str = "Citizenship Status";
pub const DUAL_CITIZENSHIP: &str = "Dual Citizenship";

// ─── Application status ──────────────────────────────────────────────────────

pub const APPLICATION_START: &str = "Application Start Date";
pub const SUBMIT_DATE: &str = "Submit Date";
pub const STATUS: &str = "Status";
pub const DETAILED_STATUS: &str = "Detailed Status";

// ─── Institutions (1..=6) ────────────────────────────────────────────────────

pub const INSTITUTION_NAME: &str = "Institution {n}";
pub const INSTITUTION_COUNTRY: &str = "Institution {n} Country";
pub const PROGRAM_STUDY: &str = "Program Study {n}";
pub const CREDENTIAL: &str = "Credential {n}";
pub const INSTITUTION_START: &str = "Start Date {n}";
pub const INSTITUTION_END: &str = "End Date {n}";
pub const DATE_CONFER: &str = "Date Confer {n}";
pub const INSTITUTION_GPA: &str = "GPA {n}";

// ─── TOEFL / IELTS (1..=3) ───────────────────────────────────────────────────

pub const TOEFL_REGISTRATION: &str = "TOEFL {n} Registration Number";
pub const TOEFL_DATE: &str = "TOEFL {n} Date";
pub const TOEFL_LISTENING: &str = "TOEFL {n} Listening";
pub const TOEFL_READING: &str = "TOEFL {n} Reading";
pub const TOEFL_WRITING: &str = "TOEFL {n} Writing";
pub const TOEFL_SPEAKING: &str = "TOEFL {n} Speaking";
pub const TOEFL_TOTAL: &str = "TOEFL {n} Total";
pub const TOEFL_MYBEST_LISTENING: &str = "TOEFL {n} MyBest Listening";
pub const TOEFL_MYBEST_READING: &str = "TOEFL {n} MyBest Reading";
pub const TOEFL_MYBEST_WRITING: &str = "TOEFL {n} MyBest Writing";
pub const TOEFL_MYBEST_SPEAKING: &str = "TOEFL {n} MyBest Speaking";
pub const TOEFL_MYBEST_TOTAL: &str = "TOEFL {n} MyBest Total";

pub const IELTS_CANDIDATE: &str = "IELTS {n} Candidate Number";
pub const IELTS_DATE: &str = "IELTS {n} Date";
pub const IELTS_LISTENING: &str = "IELTS {n} Listening";
pub const IELTS_READING: &str = "IELTS {n} Reading";
pub const IELTS_WRITING: &str = "IELTS {n} Writing";
pub const IELTS_SPEAKING: &str = "IELTS {n} Speaking";
pub const IELTS_BAND: &str = "IELTS {n} Band Score";

// ─── Single-sitting tests ────────────────────────────────────────────────────

pub const MELAB_REFERENCE: &str = "MELAB Reference Number";
pub const MELAB_DATE: &str = "MELAB Date";
pub const MELAB_LISTENING: &str = "MELAB Listening";
pub const MELAB_GCVR: &str = "MELAB GCVR";
pub const MELAB_WRITING: &str = "MELAB Writing";
pub const MELAB_SPEAKING: &str = "MELAB Speaking";
pub const MELAB_TOTAL: &str = "MELAB Total";

pub const PTE_REFERENCE: &str = "PTE Reference Number";
pub const PTE_DATE: &str = "PTE Date";
pub const PTE_LISTENING: &str = "PTE Listening";
pub const PTE_READING: &str = "PTE Reading";
pub const PTE_SPEAKING: &str = "PTE Speaking";
pub const PTE_WRITING: &str = "PTE Writing";
pub const PTE_TOTAL: &str = "PTE Total";

pub const CAEL_REFERENCE: &str = "CAEL Reference Number";
pub const CAEL_DATE: &str = "CAEL Date";
pub const CAEL_READING: &str = "CAEL Reading";
pub const CAEL_LISTENING: &str = "CAEL Listening";
pub const CAEL_WRITING: &str = "CAEL Writing";
pub const CAEL_SPEAKING: &str = "CAEL Speaking";
pub const CAEL_TOTAL: &str = "CAEL Total";

pub const CELPIP_DATE: &str = "CELPIP Date";
pub const CELPIP_LISTENING: &str = "CELPIP Listening";
pub const CELPIP_SPEAKING: &str = "CELPIP Speaking";
pub const CELPIP_READING_WRITING: &str = "CELPIP Reading Writing";

pub const DUOLINGO_DATE: &str = "Duolingo Date";
pub const DUOLINGO_SCORE: &str = "Duolingo Score";
pub const DUOLINGO_LITERACY: &str = "Duolingo Literacy";
pub const DUOLINGO_CONVERSATION: &str = "Duolingo Conversation";
pub const DUOLINGO_COMPREHENSION: &str = "Duolingo Comprehension";
pub const DUOLINGO_PRODUCTION: &str = "Duolingo Production";

pub const ALT_ELPP_TYPE: &str = "Alt ELPP Test Type";
pub const ALT_ELPP_DATE: &str = "Alt ELPP Date";
pub const ALT_ELPP_TOTAL: &str = "Alt ELPP Total";

pub const GRE_REGISTRATION: &str = "GRE Registration Number";
pub const GRE_DATE: &str = "GRE Date";
pub const GRE_VERBAL: &str = "GRE Verbal";
pub const GRE_VERBAL_BELOW: &str = "GRE Verbal Below";
pub const GRE_QUANTITATIVE: &str = "GRE Quantitative";
pub const GRE_QUANTITATIVE_BELOW: &str = "GRE Quantitative Below";
pub const GRE_WRITING: &str = "GRE Writing";
pub const GRE_WRITING_BELOW: &str = "GRE Writing Below";

pub const GMAT_REFERENCE: &str = "GMAT Reference Number";
pub const GMAT_DATE: &str = "GMAT Date";
pub const GMAT_TOTAL: &str = "GMAT Total";
pub const GMAT_INTEGRATED_REASONING: &str = "GMAT Integrated Reasoning";
pub const GMAT_QUANTITATIVE: &str = "GMAT Quantitative";
pub const GMAT_VERBAL: &str = "GMAT Verbal";
pub const GMAT_WRITING: &str = "GMAT Writing";

/// Fill the `{n}` placeholder of a numbered column template.
pub fn numbered(template: &str, n: u8) -> String { template.replace("{n}", &n.to_string()) }

fn normalise(header: &str) -> String {
  header.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

// ─── Header index ────────────────────────────────────────────────────────────

/// Position of every header in an upload.
pub struct Header {
  index: HashMap<String, usize>,
}

impl Header {
  pub fn new(headers: &StringRecord) -> Self {
    let mut index = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
      // First occurrence wins for duplicated headers.
      index.entry(normalise(h)).or_insert(i);
    }
    Self { index }
  }

  pub fn contains(&self, column: &str) -> bool { self.index.contains_key(&normalise(column)) }

  /// Typed view of one data row.
  pub fn row<'a>(&'a self, record: &'a StringRecord) -> Row<'a> { Row { header: self, record } }
}

// ─── Typed cell access ───────────────────────────────────────────────────────

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse a date in any of the formats the extract has been seen to use. A
/// trailing time component is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Parse a whole-number score; `"22.0"` is accepted, `"22.5"` is not.
pub fn parse_int(raw: &str) -> Option<i64> {
  let raw = raw.trim();
  raw.parse::<i64>().ok().or_else(|| {
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
  })
}

pub fn parse_float(raw: &str) -> Option<f64> {
  raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

pub struct Row<'a> {
  header: &'a Header,
  record: &'a StringRecord,
}

impl Row<'_> {
  /// Trimmed cell text; blank cells and unknown columns are `None`.
  pub fn text(&self, column: &str) -> Option<String> {
    let i = *self.header.index.get(&normalise(column))?;
    let value = self.record.get(i)?.trim();
    (!value.is_empty()).then(|| value.to_owned())
  }

  pub fn date(&self, column: &str) -> Option<NaiveDate> {
    let raw = self.text(column)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
      tracing::debug!(column, value = %raw, "ignoring unparseable date");
    }
    parsed
  }

  pub fn int(&self, column: &str) -> Option<i64> {
    let raw = self.text(column)?;
    let parsed = parse_int(&raw);
    if parsed.is_none() {
      tracing::debug!(column, value = %raw, "ignoring unparseable score");
    }
    parsed
  }

  pub fn float(&self, column: &str) -> Option<f64> {
    let raw = self.text(column)?;
    let parsed = parse_float(&raw);
    if parsed.is_none() {
      tracing::debug!(column, value = %raw, "ignoring unparseable score");
    }
    parsed
  }
}
