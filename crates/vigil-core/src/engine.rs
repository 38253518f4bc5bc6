//! The subject-day upsert engine.
//!
//! For each turn the engine walks a small state machine against the store:
//!
//! ```text
//! SUBJECT_LOOKUP ── not found ──▶ CREATE_SUBJECT_AND_DAY ──▶ DONE
//!       │ found
//!       ▼
//!   DAY_LOOKUP ──── not found ──▶ CREATE_DAY ──────────────▶ DONE
//!       │ found
//!       ▼
//!     MERGE (append symptoms, overwrite vitals per key) ───▶ DONE
//! ```
//!
//! Any store error ends the walk and is returned as is. Writes committed by
//! earlier steps are not rolled back.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  extraction::Extraction,
  store::FactStore,
  subject::SubjectName,
};

/// What [`UpsertEngine::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpsertOutcome {
  /// First message from this subject: subject and day record created.
  CreatedSubject,
  /// Known subject, first message today: day record created.
  CreatedDay,
  /// Today's record already existed and received new facts.
  Merged {
    symptoms_appended: usize,
    vitals_merged:     usize,
  },
  /// Today's record already existed and the extraction was empty.
  Unchanged,
}

/// Cheap to construct: the per-subject locks live in the store, so any number
/// of engines over one store exclude each other.
pub struct UpsertEngine<S> {
  store: Arc<S>,
}

impl<S: FactStore> UpsertEngine<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Merge `extraction` into the subject's record for `date`, creating the
  /// subject and/or the record if needed.
  ///
  /// The whole lookup-then-write sequence runs under the subject's lock, so
  /// concurrent calls for one subject never create two records for a date.
  pub async fn apply(
    &self,
    subject: &SubjectName,
    extraction: &Extraction,
    date: NaiveDate,
  ) -> Result<UpsertOutcome> {
    let _guard = self.store.subject_locks().acquire(subject).await;

    let outcome = self.apply_locked(subject, extraction, date).await?;
    info!(%subject, %date, ?outcome, "applied extraction");
    Ok(outcome)
  }

  async fn apply_locked(
    &self,
    subject: &SubjectName,
    extraction: &Extraction,
    date: NaiveDate,
  ) -> Result<UpsertOutcome> {
    let store = &*self.store;

    if store.find_subject(subject).await.map_err(Error::store)?.is_none() {
      debug!(%subject, "unknown subject; creating subject and day");
      store
        .create_subject_with_day(subject, date, extraction)
        .await
        .map_err(Error::store)?;
      return Ok(UpsertOutcome::CreatedSubject);
    }

    if store
      .find_day_record(subject, date)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      debug!(%subject, %date, "no record for date; creating day");
      store
        .create_day_for_subject(subject, date, extraction)
        .await
        .map_err(Error::store)?;
      return Ok(UpsertOutcome::CreatedDay);
    }

    if extraction.is_empty() {
      return Ok(UpsertOutcome::Unchanged);
    }

    debug!(%subject, %date, "merging into existing day");
    if !extraction.symptoms.is_empty() {
      store
        .append_symptoms(subject, date, &extraction.symptoms)
        .await
        .map_err(Error::store)?;
    }
    if !extraction.vitals.is_empty() {
      store
        .merge_vitals(subject, date, &extraction.vitals)
        .await
        .map_err(Error::store)?;
    }

    Ok(UpsertOutcome::Merged {
      symptoms_appended: extraction.symptoms.len(),
      vitals_merged:     extraction.vitals.len(),
    })
  }
}
