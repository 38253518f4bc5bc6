//! Error types for `vigil-core`.

use std::time::Duration;

use thiserror::Error;

use crate::store::{StoreError, StoreErrorKind};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The fact store could not be reached (connection, open or auth failure).
  #[error("fact store unavailable: {0}")]
  StoreUnavailable(#[source] BoxError),

  /// A store query was malformed or violated a constraint.
  #[error("fact store query failed: {0}")]
  StoreQuery(#[source] BoxError),

  /// The extractor produced output that could not be parsed.
  #[error("extraction failed: {0}")]
  Extraction(String),

  #[error("response generation failed: {0}")]
  Generation(#[source] BoxError),

  #[error("{operation} timed out after {after:?}")]
  Timeout {
    operation: &'static str,
    after:     Duration,
  },

  #[error("missing configuration: {0}")]
  ConfigurationMissing(String),

  #[error("invalid subject name: {0:?}")]
  InvalidSubject(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Classify a backend error into the store error kinds.
  pub fn store<E: StoreError>(err: E) -> Self {
    match err.kind() {
      StoreErrorKind::Unavailable => Self::StoreUnavailable(Box::new(err)),
      StoreErrorKind::Query => Self::StoreQuery(Box::new(err)),
    }
  }

  /// Whether the same turn may succeed if the user tries again later.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StoreUnavailable(_) | Self::Timeout { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
