//! Day records — the observations attributed to one subject on one date.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::SubjectName;

/// Canonical vital name → latest value. Later writes win per key.
pub type VitalSet = BTreeMap<String, String>;

/// Symptoms in insertion order. Repeated appends are additive, so the same
/// symptom may appear more than once.
pub type SymptomSet = Vec<String>;

/// One record per (subject, calendar date). Identity never changes; the
/// symptom and vital sets are mutated in place for the rest of that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
  pub record_id:  Uuid,
  pub subject:    SubjectName,
  pub date:       NaiveDate,
  pub created_at: DateTime<Utc>,
  pub symptoms:   SymptomSet,
  pub vitals:     VitalSet,
}

impl DayRecord {
  pub fn snapshot(&self) -> DaySnapshot {
    DaySnapshot {
      date:     self.date,
      symptoms: self.symptoms.clone(),
      vitals:   self.vitals.clone(),
    }
  }
}

/// The read-only view of a day used for history windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
  pub date:     NaiveDate,
  pub symptoms: SymptomSet,
  pub vitals:   VitalSet,
}
