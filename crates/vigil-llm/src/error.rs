//! Error type for `vigil-llm`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("API error (status {status}): {message}")]
  Api { status: u16, message: String },

  #[error("model returned no text")]
  EmptyResponse,

  #[error("invalid configuration: {0}")]
  Config(String),

  /// The model answered but its extraction could not be parsed.
  #[error(transparent)]
  Extraction(#[from] vigil_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
