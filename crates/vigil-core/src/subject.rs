//! Subject — the person whose health history is tracked.
//!
//! A subject holds only identity metadata. Observations hang off it as one
//! [`DayRecord`](crate::record::DayRecord) per calendar date.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The unique identifier of a subject: trimmed, lowercased, never empty.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectName(String);

impl SubjectName {
  pub fn parse(raw: &str) -> Result<Self> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
      return Err(Error::InvalidSubject(raw.to_owned()));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubjectName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for SubjectName {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<SubjectName> for String {
  fn from(value: SubjectName) -> Self { value.0 }
}

/// A thin envelope: the identifier plus a creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub name:       SubjectName,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_trimmed_and_lowercased() {
    let name = SubjectName::parse("  Alice ").unwrap();
    assert_eq!(name.as_str(), "alice");
  }

  #[test]
  fn blank_names_are_rejected() {
    assert!(matches!(
      SubjectName::parse("   "),
      Err(Error::InvalidSubject(_))
    ));
  }

  #[test]
  fn deserialising_goes_through_parse() {
    let name: SubjectName = serde_json::from_str("\"BOB\"").unwrap();
    assert_eq!(name.as_str(), "bob");
    assert!(serde_json::from_str::<SubjectName>("\"\"").is_err());
  }
}
