//! Turn an uploaded extract into an [`ImportBatch`].

use admit_core::{
  applicant::{
    ApplicantInfo, ApplicantRecord, ApplicantStatus, Institution, MAX_INSTITUTIONS, SessionKey,
    campus_from_program_code, parse_session_code,
  },
  scores::{
    AltElppScore, CaelScore, CelpipScore, DuolingoScore, GmatScore, GreScore, IeltsScore,
    MAX_ATTEMPTS, MelabScore, PteScore, Reported, TestScores, ToeflScore,
  },
  store::ImportBatch,
};
use csv::{ReaderBuilder, Trim};

use crate::{
  Error, Result,
  columns::{self as col, Header, Row, numbered},
};

/// Parse the bytes of an uploaded CSV.
///
/// Rows with a blank `User Code` and rows the reader cannot decode are
/// counted in [`ImportBatch::dropped_rows`]. The session every record
/// attaches to comes from the first row that survives.
pub fn parse_upload(bytes: &[u8]) -> Result<ImportBatch> {
  let mut reader = ReaderBuilder::new()
    .trim(Trim::All)
    .flexible(false)
    .from_reader(bytes);

  let header = Header::new(reader.headers()?);
  if !header.contains(col::USER_CODE) {
    return Err(Error::MissingColumn(col::USER_CODE));
  }

  let mut session = None;
  let mut records = Vec::new();
  let mut dropped_rows = 0;

  for (i, result) in reader.records().enumerate() {
    // Line 1 is the header.
    let line = i + 2;
    let record = match result {
      Ok(record) => record,
      Err(e) => {
        tracing::warn!(line, error = %e, "dropping undecodable row");
        dropped_rows += 1;
        continue;
      }
    };

    let row = header.row(&record);
    let Some(user_code) = row.text(col::USER_CODE) else {
      tracing::warn!(line, "dropping row without a user code");
      dropped_rows += 1;
      continue;
    };

    if session.is_none() {
      session = Some(session_key(&row)?);
    }

    tracing::debug!(line, %user_code, "parsed applicant row");
    records.push(applicant_record(&row, user_code));
  }

  let session = session.ok_or(Error::NoApplicants(col::USER_CODE))?;
  tracing::info!(
    session = %session.name(),
    rows = records.len(),
    dropped = dropped_rows,
    "parsed upload"
  );

  Ok(ImportBatch { session, records, dropped_rows })
}

// ─── Session ─────────────────────────────────────────────────────────────────

fn session_key(row: &Row<'_>) -> Result<SessionKey> {
  let program_code = row
    .text(col::PROGRAM_CODE)
    .ok_or(Error::MissingSessionField(col::PROGRAM_CODE))?;
  let code = row
    .text(col::SESSION)
    .ok_or(Error::MissingSessionField(col::SESSION))?;
  let (year, session_abbrev) = parse_session_code(&code)?;

  let program = row.text(col::PROGRAM).unwrap_or_else(|| program_code.clone());
  let campus = row
    .text(col::CAMPUS)
    .unwrap_or_else(|| campus_from_program_code(&program_code).to_owned());

  Ok(SessionKey { program_code, program, session_abbrev, year, campus })
}

// ─── Records ─────────────────────────────────────────────────────────────────

fn applicant_record(row: &Row<'_>, user_code: String) -> ApplicantRecord {
  ApplicantRecord {
    info:         applicant_info(row, &user_code),
    status:       applicant_status(row, &user_code),
    institutions: institutions(row, &user_code),
    scores:       test_scores(row, &user_code),
  }
}

fn applicant_info(row: &Row<'_>, user_code: &str) -> ApplicantInfo {
  ApplicantInfo {
    user_code:           user_code.to_owned(),
    family_name:         row.text(col::FAMILY_NAME),
    given_name:          row.text(col::GIVEN_NAME),
    middle_name:         row.text(col::MIDDLE_NAME),
    preferred_name:      row.text(col::PREFERRED_NAME),
    email:               row.text(col::EMAIL),
    phone:               row.text(col::PHONE),
    address_line:        row.text(col::ADDRESS_LINE),
    city:                row.text(col::CITY),
    province:            row.text(col::PROVINCE),
    postal_code:         row.text(col::POSTAL_CODE),
    country:             row.text(col::COUNTRY),
    birth_date:          row.date(col::BIRTH_DATE),
    gender:              row.text(col::GENDER),
    citizenship_country: row.text(col::CITIZENSHIP_COUNTRY),
    citizenship_status:  row.text(col::CITIZENSHIP_STATUS),
    dual_citizenship:    row.text(col::DUAL_CITIZENSHIP),
  }
}

fn applicant_status(row: &Row<'_>, user_code: &str) -> ApplicantStatus {
  ApplicantStatus {
    user_code:              user_code.to_owned(),
    application_start_date: row.date(col::APPLICATION_START),
    submit_date:            row.date(col::SUBMIT_DATE),
    status_code:            row.text(col::STATUS),
    detailed_status:        row.text(col::DETAILED_STATUS),
  }
}

fn institutions(row: &Row<'_>, user_code: &str) -> Vec<Institution> {
  (1..=MAX_INSTITUTIONS)
    .map(|n| Institution {
      user_code:          user_code.to_owned(),
      institution_number: n,
      institution_name:   row.text(&numbered(col::INSTITUTION_NAME, n)),
      country:            row.text(&numbered(col::INSTITUTION_COUNTRY, n)),
      program_study:      row.text(&numbered(col::PROGRAM_STUDY, n)),
      credential:         row.text(&numbered(col::CREDENTIAL, n)),
      start_date:         row.date(&numbered(col::INSTITUTION_START, n)),
      end_date:           row.date(&numbered(col::INSTITUTION_END, n)),
      date_confer:        row.date(&numbered(col::DATE_CONFER, n)),
      gpa:                row.text(&numbered(col::INSTITUTION_GPA, n)),
    })
    .filter(|inst| !inst.is_empty())
    .collect()
}

fn reported<T: Reported>(score: T) -> Option<T> { score.is_reported().then_some(score) }

fn test_scores(row: &Row<'_>, user_code: &str) -> TestScores {
  let uc = || user_code.to_owned();

  let toefl = (1..=MAX_ATTEMPTS)
    .filter_map(|n| {
      let c = |template: &str| numbered(template, n);
      reported(ToeflScore {
        user_code:           uc(),
        toefl_number:        n,
        registration_number: row.text(&c(col::TOEFL_REGISTRATION)),
        date_written:        row.date(&c(col::TOEFL_DATE)),
        listening:           row.int(&c(col::TOEFL_LISTENING)),
        reading:             row.int(&c(col::TOEFL_READING)),
        writing:             row.int(&c(col::TOEFL_WRITING)),
        speaking:            row.int(&c(col::TOEFL_SPEAKING)),
        total:               row.int(&c(col::TOEFL_TOTAL)),
        mybest_listening:    row.int(&c(col::TOEFL_MYBEST_LISTENING)),
        mybest_reading:      row.int(&c(col::TOEFL_MYBEST_READING)),
        mybest_writing:      row.int(&c(col::TOEFL_MYBEST_WRITING)),
        mybest_speaking:     row.int(&c(col::TOEFL_MYBEST_SPEAKING)),
        mybest_total:        row.int(&c(col::TOEFL_MYBEST_TOTAL)),
      })
    })
    .collect();

  let ielts = (1..=MAX_ATTEMPTS)
    .filter_map(|n| {
      let c = |template: &str| numbered(template, n);
      reported(IeltsScore {
        user_code:        uc(),
        ielts_number:     n,
        candidate_number: row.text(&c(col::IELTS_CANDIDATE)),
        date_written:     row.date(&c(col::IELTS_DATE)),
        listening:        row.float(&c(col::IELTS_LISTENING)),
        reading:          row.float(&c(col::IELTS_READING)),
        writing:          row.float(&c(col::IELTS_WRITING)),
        speaking:         row.float(&c(col::IELTS_SPEAKING)),
        total:            row.float(&c(col::IELTS_BAND)),
      })
    })
    .collect();

  TestScores {
    toefl,
    ielts,
    melab: reported(MelabScore {
      user_code:        uc(),
      reference_number: row.text(col::MELAB_REFERENCE),
      date_written:     row.date(col::MELAB_DATE),
      listening:        row.int(col::MELAB_LISTENING),
      gcvr:             row.int(col::MELAB_GCVR),
      writing:          row.int(col::MELAB_WRITING),
      speaking:         row.int(col::MELAB_SPEAKING),
      total:            row.int(col::MELAB_TOTAL),
    }),
    pte: reported(PteScore {
      user_code:        uc(),
      reference_number: row.text(col::PTE_REFERENCE),
      date_written:     row.date(col::PTE_DATE),
      listening:        row.int(col::PTE_LISTENING),
      reading:          row.int(col::PTE_READING),
      speaking:         row.int(col::PTE_SPEAKING),
      writing:          row.int(col::PTE_WRITING),
      total:            row.int(col::PTE_TOTAL),
    }),
    cael: reported(CaelScore {
      user_code:        uc(),
      reference_number: row.text(col::CAEL_REFERENCE),
      date_written:     row.date(col::CAEL_DATE),
      reading:          row.int(col::CAEL_READING),
      listening:        row.int(col::CAEL_LISTENING),
      writing:          row.int(col::CAEL_WRITING),
      speaking:         row.int(col::CAEL_SPEAKING),
      total:            row.int(col::CAEL_TOTAL),
    }),
    celpip: reported(CelpipScore {
      user_code:       uc(),
      date_written:    row.date(col::CELPIP_DATE),
      listening:       row.int(col::CELPIP_LISTENING),
      speaking:        row.int(col::CELPIP_SPEAKING),
      reading_writing: row.int(col::CELPIP_READING_WRITING),
    }),
    duolingo: reported(DuolingoScore {
      user_code:     uc(),
      date_written:  row.date(col::DUOLINGO_DATE),
      score:         row.int(col::DUOLINGO_SCORE),
      literacy:      row.int(col::DUOLINGO_LITERACY),
      conversation:  row.int(col::DUOLINGO_CONVERSATION),
      comprehension: row.int(col::DUOLINGO_COMPREHENSION),
      production:    row.int(col::DUOLINGO_PRODUCTION),
    }),
    alt_elpp: reported(AltElppScore {
      user_code:    uc(),
      test_type:    row.text(col::ALT_ELPP_TYPE),
      date_written: row.date(col::ALT_ELPP_DATE),
      total:        row.text(col::ALT_ELPP_TOTAL),
    }),
    gre: reported(GreScore {
      user_code:           uc(),
      registration_number: row.text(col::GRE_REGISTRATION),
      date_written:        row.date(col::GRE_DATE),
      verbal:              row.int(col::GRE_VERBAL),
      verbal_below:        row.float(col::GRE_VERBAL_BELOW),
      quantitative:        row.int(col::GRE_QUANTITATIVE),
      quantitative_below:  row.float(col::GRE_QUANTITATIVE_BELOW),
      writing:             row.float(col::GRE_WRITING),
      writing_below:       row.float(col::GRE_WRITING_BELOW),
    }),
    gmat: reported(GmatScore {
      user_code:            uc(),
      reference_number:     row.text(col::GMAT_REFERENCE),
      date_written:         row.date(col::GMAT_DATE),
      total:                row.int(col::GMAT_TOTAL),
      integrated_reasoning: row.int(col::GMAT_INTEGRATED_REASONING),
      quantitative:         row.int(col::GMAT_QUANTITATIVE),
      verbal:               row.int(col::GMAT_VERBAL),
      writing:              row.float(col::GMAT_WRITING),
    }),
  }
}
