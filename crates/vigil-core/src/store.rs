//! The `FactStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `vigil-store-sqlite`).
//! Higher layers (the upsert engine, `vigil-api`, `vigil-cli`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  extraction::Extraction,
  lock::SubjectLocks,
  record::{DayRecord, DaySnapshot, VitalSet},
  subject::{Subject, SubjectName},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  /// Connection, open or authentication failure. Nothing was executed.
  Unavailable,
  /// Malformed query or constraint violation.
  Query,
}

/// Implemented by each backend's error type so that the core can map it to
/// [`crate::Error::StoreUnavailable`] or [`crate::Error::StoreQuery`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Vigil fact store backend.
///
/// Each method is a single query; none of them retries. Sequences of calls are
/// not atomic, so callers that look up and then write must serialise per
/// subject through [`FactStore::subject_locks`] (see
/// [`crate::engine::UpsertEngine`]).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait FactStore: Send + Sync {
  type Error: StoreError;

  /// The lock registry for this store. Every writer that looks up and then
  /// writes takes the subject's lock from here, so all engines over one store
  /// serialise against each other.
  fn subject_locks(&self) -> &SubjectLocks;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn find_subject<'a>(
    &'a self,
    name: &'a SubjectName,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  fn find_day_record<'a>(
    &'a self,
    name: &'a SubjectName,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<DayRecord>, Self::Error>> + Send + 'a;

  /// All subjects, ordered by name.
  fn list_subjects(
    &self,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  // ── Creation ──────────────────────────────────────────────────────────

  /// Create the subject together with its first day record and both sets,
  /// in one atomic write. Fails if the subject already exists.
  fn create_subject_with_day<'a>(
    &'a self,
    name: &'a SubjectName,
    date: NaiveDate,
    extraction: &'a Extraction,
  ) -> impl Future<Output = Result<DayRecord, Self::Error>> + Send + 'a;

  /// Attach a new day record (and both sets) to an existing subject.
  fn create_day_for_subject<'a>(
    &'a self,
    name: &'a SubjectName,
    date: NaiveDate,
    extraction: &'a Extraction,
  ) -> impl Future<Output = Result<DayRecord, Self::Error>> + Send + 'a;

  // ── Merges into an existing day ───────────────────────────────────────

  /// Append to the day's symptom list. Existing entries are kept.
  fn append_symptoms<'a>(
    &'a self,
    name: &'a SubjectName,
    date: NaiveDate,
    symptoms: &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Overwrite the given keys in the day's vital set; other keys are kept.
  fn merge_vitals<'a>(
    &'a self,
    name: &'a SubjectName,
    date: NaiveDate,
    vitals: &'a VitalSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── History ───────────────────────────────────────────────────────────

  /// The most recent `limit` days for a subject, newest first.
  fn fetch_recent_days<'a>(
    &'a self,
    name: &'a SubjectName,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DaySnapshot>, Self::Error>> + Send + 'a;
}
