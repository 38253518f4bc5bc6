//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! (`YYYY-MM-DD`, which sorts correctly as text), UUIDs as hyphenated
//! lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use vigil_core::{
  record::{DayRecord, DaySnapshot},
  subject::{Subject, SubjectName},
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub name:       String,
  pub created_at: String,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      name:       SubjectName::parse(&self.name)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `day_records` row together with its symptom and vital rows.
pub struct RawDayRecord {
  pub record_id:    String,
  pub subject_name: String,
  pub day:          String,
  pub created_at:   String,
  /// Ordered by `position`.
  pub symptoms:     Vec<String>,
  pub vitals:       Vec<(String, String)>,
}

impl RawDayRecord {
  pub fn into_record(self) -> Result<DayRecord> {
    Ok(DayRecord {
      record_id:  decode_uuid(&self.record_id)?,
      subject:    SubjectName::parse(&self.subject_name)?,
      date:       decode_date(&self.day)?,
      created_at: decode_dt(&self.created_at)?,
      symptoms:   self.symptoms,
      vitals:     self.vitals.into_iter().collect(),
    })
  }

  pub fn into_snapshot(self) -> Result<DaySnapshot> {
    Ok(DaySnapshot {
      date:     decode_date(&self.day)?,
      symptoms: self.symptoms,
      vitals:   self.vitals.into_iter().collect(),
    })
  }
}
