//! CSV parsing of admissions-system extracts, and the applicant report
//! rendered as CSV or an Excel workbook.

pub mod columns;
pub mod error;
pub mod export;
pub mod import;

pub use error::{Error, Result};
pub use export::{write_report, write_report_xlsx};
pub use import::parse_upload;
