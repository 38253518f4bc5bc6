//! Error type for `vigil-store-sqlite`.

use chrono::NaiveDate;
use rusqlite::ErrorCode;
use thiserror::Error;
use vigil_core::{
  store::{StoreError, StoreErrorKind},
  subject::SubjectName,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vigil_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A merge targeted a day that has no record.
  #[error("no record for {subject} on {date}")]
  DayNotFound {
    subject: SubjectName,
    date:    NaiveDate,
  },
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Self::Database(e) if is_unavailable(e) => StoreErrorKind::Unavailable,
      _ => StoreErrorKind::Query,
    }
  }
}

/// Failures that mean the database itself could not be used, as opposed to a
/// statement that was rejected.
fn is_unavailable(err: &tokio_rusqlite::Error) -> bool {
  match err {
    tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => {
      true
    }
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) => {
      matches!(
        e.code,
        ErrorCode::CannotOpen
          | ErrorCode::NotADatabase
          | ErrorCode::PermissionDenied
          | ErrorCode::DatabaseBusy
          | ErrorCode::DatabaseLocked
          | ErrorCode::SystemIoFailure
      )
    }
    _ => false,
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
