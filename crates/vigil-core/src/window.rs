//! History windowing — the recent days handed to the response generator.

use std::fmt::Write as _;

use crate::{
  Error, Result,
  record::DaySnapshot,
  store::FactStore,
  subject::SubjectName,
};

/// How many days of history go into a prompt unless configured otherwise.
pub const DEFAULT_WINDOW: usize = 4;

/// Rendered in place of history when a subject has no records, so the
/// context section is never silently absent.
pub const NO_HISTORY: &str = "No historical data available for the patient.";

/// The last `limit` day records for `subject`, newest first. Read-only.
pub async fn window<S: FactStore>(
  store: &S,
  subject: &SubjectName,
  limit: usize,
) -> Result<Vec<DaySnapshot>> {
  if limit == 0 {
    return Ok(Vec::new());
  }
  store
    .fetch_recent_days(subject, limit)
    .await
    .map_err(Error::store)
}

/// Serialise a window into the context blob for the response generator.
pub fn render_context(days: &[DaySnapshot]) -> String {
  if days.is_empty() {
    return NO_HISTORY.to_owned();
  }

  let mut out = String::from("Patient's historical data:");
  for day in days {
    let symptoms = if day.symptoms.is_empty() {
      "none".to_owned()
    } else {
      day.symptoms.join(", ")
    };
    let vitals = if day.vitals.is_empty() {
      "none".to_owned()
    } else {
      day
        .vitals
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
    };
    // Writing to a String cannot fail.
    let _ = write!(
      out,
      "\n- {}: symptoms: {symptoms}; vitals: {vitals}",
      day.date.format("%Y-%m-%d")
    );
  }
  out
}
