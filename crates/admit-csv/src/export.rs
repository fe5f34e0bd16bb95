//! The applicant report, as CSV or as a single-sheet Excel workbook.

use admit_core::{report::ExportRow, view::ApplicantOverview};
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};

use crate::Result;

const SHEET_NAME: &str = "Applicants";
const AVERAGE_RATING_COL: u16 = 18;
const RATING_COUNT_COL: u16 = 19;

/// Render applicants as a CSV document with a header line, in the order
/// given.
pub fn write_report(applicants: &[ApplicantOverview]) -> Result<Vec<u8>> {
  let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
  writer.write_record(ExportRow::HEADERS)?;
  for applicant in applicants {
    writer.serialize(ExportRow::from(applicant))?;
  }
  writer.flush()?;
  writer.into_inner().map_err(|e| e.into_error().into())
}

/// Render applicants as an `.xlsx` workbook with the same columns as
/// [`write_report`]. The header row is bold and frozen; ratings are
/// numeric cells, everything else is text.
pub fn write_report_xlsx(applicants: &[ApplicantOverview]) -> Result<Vec<u8>> {
  let mut workbook = Workbook::new();
  let bold = Format::new().set_bold();
  let one_decimal = Format::new().set_num_format("0.0");

  let sheet = workbook.add_worksheet();
  sheet.set_name(SHEET_NAME)?;
  for (col, header) in (0u16..).zip(ExportRow::HEADERS) {
    sheet.write_string_with_format(0, col, header, &bold)?;
  }
  sheet.set_freeze_panes(1, 0)?;

  for (row, applicant) in (1u32..).zip(applicants) {
    let line = ExportRow::from(applicant);
    for (col, value) in (0u16..).zip(text_cells(&line)) {
      if !value.is_empty() {
        sheet.write_string(row, col, value)?;
      }
    }
    if let Some(average) = applicant.average_rating {
      sheet.write_number_with_format(row, AVERAGE_RATING_COL, average, &one_decimal)?;
    }
    sheet.write_number(row, RATING_COUNT_COL, line.rating_count)?;
  }

  Ok(workbook.save_to_buffer()?)
}

/// The text columns of a report line, in header order.
pub(crate) fn text_cells(line: &ExportRow) -> [&str; AVERAGE_RATING_COL as usize] {
  [
    line.user_code.as_str(),
    line.family_name.as_str(),
    line.given_name.as_str(),
    line.session.as_str(),
    line.email.as_str(),
    line.citizenship.as_str(),
    line.domestic,
    line.age_range,
    line.highest_degree.as_str(),
    line.degree_area.as_str(),
    line.subject_group,
    line.gpa.as_str(),
    line.cs,
    line.stat,
    line.math,
    line.english_status.as_str(),
    line.review_status.as_str(),
    line.offer_sent,
  ]
}
