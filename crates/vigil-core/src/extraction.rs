//! Extraction results and the normaliser that cleans them.
//!
//! The extractor is an external collaborator and its output is untrusted:
//! fields may be missing, null, or hold the wrong kind of value. Everything
//! it returns lands in a [`RawExtraction`] first and only reaches the upsert
//! engine after [`RawExtraction::normalize`] has turned it into an
//! [`Extraction`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::{Error, Result, record::VitalSet};

// ─── Raw ─────────────────────────────────────────────────────────────────────

/// A single scalar as the extractor produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
  Text(String),
  Number(serde_json::Number),
  /// Anything else (booleans, nested objects, arrays). Always dropped.
  Other(serde_json::Value),
}

impl RawScalar {
  fn as_symptom(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s.trim()),
      Self::Number(_) | Self::Other(_) => None,
    }
  }

  fn as_vital_value(&self) -> Option<String> {
    match self {
      Self::Text(s) => Some(s.trim().to_owned()),
      Self::Number(n) => Some(n.to_string()),
      Self::Other(_) => None,
    }
  }
}

impl From<&str> for RawScalar {
  fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for RawScalar {
  fn from(value: String) -> Self { Self::Text(value) }
}

/// Extractor output before validation. Absent, `null` and wrongly shaped
/// fields all become empty collections; one bad field never costs the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
  #[serde(
    default,
    alias = "medical_symptoms",
    deserialize_with = "lenient"
  )]
  pub symptoms: Vec<RawScalar>,
  #[serde(
    default,
    alias = "medical_vitals",
    deserialize_with = "lenient"
  )]
  pub vitals:   BTreeMap<String, RawScalar>,
}

/// Take any JSON value and keep it only if it has the expected shape.
fn lenient<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  let value = serde_json::Value::deserialize(de)?;
  Ok(serde_json::from_value(value).unwrap_or_default())
}

impl RawExtraction {
  /// Convenience constructor from plain strings.
  pub fn new<S, K, V>(
    symptoms: impl IntoIterator<Item = S>,
    vitals: impl IntoIterator<Item = (K, V)>,
  ) -> Self
  where
    S: Into<RawScalar>,
    K: Into<String>,
    V: Into<RawScalar>,
  {
    Self {
      symptoms: symptoms.into_iter().map(Into::into).collect(),
      vitals:   vitals
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    }
  }

  /// Validate and clean the raw output.
  ///
  /// - symptoms are trimmed, empty ones dropped, and repeats within this
  ///   extraction removed (case-insensitively, first spelling kept);
  /// - vital keys are canonicalised with [`canonical_vital_key`], values
  ///   trimmed, and entries with an empty key or value dropped;
  /// - scalars of the wrong kind are dropped.
  pub fn normalize(&self) -> Extraction {
    let mut seen = HashSet::new();
    let symptoms = self
      .symptoms
      .iter()
      .filter_map(RawScalar::as_symptom)
      .filter(|s| !s.is_empty())
      .filter(|s| seen.insert(s.to_lowercase()))
      .map(str::to_owned)
      .collect();

    let vitals = self
      .vitals
      .iter()
      .filter_map(|(key, value)| {
        let key = canonical_vital_key(key);
        let value = value.as_vital_value()?;
        (!key.is_empty() && !value.is_empty()).then_some((key, value))
      })
      .collect();

    Extraction { symptoms, vitals }
  }
}

/// Lowercase a vital name and join its whitespace-separated words with `_`.
///
/// `"Blood  Pressure "` becomes `"blood_pressure"`.
pub fn canonical_vital_key(raw: &str) -> String {
  raw
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("_")
    .to_lowercase()
}

// ─── Normalised ──────────────────────────────────────────────────────────────

/// A validated extraction, ready for the upsert engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
  pub symptoms: Vec<String>,
  pub vitals:   VitalSet,
}

impl Extraction {
  /// No observation this turn.
  pub fn is_empty(&self) -> bool {
    self.symptoms.is_empty() && self.vitals.is_empty()
  }
}

// ─── Parsing model output ────────────────────────────────────────────────────

/// Parse free-form model output into a [`RawExtraction`].
///
/// Models like to wrap JSON in Markdown fences or surround it with prose, so
/// this strips a leading fence and parses the outermost `{ … }` span.
pub fn parse_extraction(text: &str) -> Result<RawExtraction> {
  let body = strip_fences(text);
  let json = match (body.find('{'), body.rfind('}')) {
    (Some(start), Some(end)) if start < end => &body[start..=end],
    _ => {
      return Err(Error::Extraction(format!(
        "no JSON object in extractor output ({} bytes)",
        text.len()
      )));
    }
  };
  serde_json::from_str(json).map_err(|e| Error::Extraction(e.to_string()))
}

fn strip_fences(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  // The opening fence line may carry an info string such as `json`.
  let rest = rest.split_once('\n').map_or("", |(_, body)| body);
  rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim()
}
