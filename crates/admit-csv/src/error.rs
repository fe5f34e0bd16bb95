//! Error type for `admit-csv`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required column: {0:?}")]
  MissingColumn(&'static str),

  #[error("no rows with a {0:?} value")]
  NoApplicants(&'static str),

  #[error("first applicant row has no {0:?} value")]
  MissingSessionField(&'static str),

  #[error("{0}")]
  Core(#[from] admit_core::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("csv writer error: {0}")]
  Flush(#[from] std::io::Error),

  #[error("xlsx writer error: {0}")]
  Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
  /// `true` for problems with the uploaded file rather than the system.
  /// Only meaningful for errors returned by [`crate::parse_upload`].
  pub fn is_validation(&self) -> bool {
    !matches!(self, Error::Flush(_) | Error::Xlsx(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
