//! Runtime configuration.
//!
//! `config.toml` (optional) is layered under `VIGIL_*` environment variables.
//! `GOOGLE_API_KEY` fills in the Gemini key when neither sets it.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use vigil_core::window::DEFAULT_WINDOW;
use vigil_llm::DEFAULT_MODEL;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path:       PathBuf,
  pub gemini_api_key:   Option<String>,
  pub model:            String,
  pub window_limit:     usize,
  pub llm_timeout_secs: u64,
  pub host:             String,
  pub port:             u16,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:       PathBuf::from("~/.local/share/vigil/vigil.db"),
      gemini_api_key:   None,
      model:            DEFAULT_MODEL.to_owned(),
      window_limit:     DEFAULT_WINDOW,
      llm_timeout_secs: 60,
      host:             "127.0.0.1".to_owned(),
      port:             8080,
    }
  }
}

impl AppConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("VIGIL").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;

    if cfg.gemini_api_key.is_none() {
      cfg.gemini_api_key = std::env::var("GOOGLE_API_KEY").ok();
    }
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  /// The Gemini key, required by anything that talks to the model.
  pub fn api_key(&self) -> vigil_core::Result<&str> {
    self
      .gemini_api_key
      .as_deref()
      .map(str::trim)
      .filter(|key| !key.is_empty())
      .ok_or_else(|| {
        vigil_core::Error::ConfigurationMissing(
          "gemini_api_key (set VIGIL_GEMINI_API_KEY or GOOGLE_API_KEY)".into(),
        )
      })
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
