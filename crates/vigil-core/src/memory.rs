//! [`MemoryStore`] — a process-local [`FactStore`].
//!
//! Like a graph store without a composite constraint, it enforces subject
//! uniqueness but will happily hold two records for one date if asked to;
//! keeping that from happening is the engine's job. Every operation yields to
//! the scheduler before touching state so that racing callers interleave the
//! way they would against a remote store.

use std::{
  collections::BTreeMap,
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  extraction::Extraction,
  lock::SubjectLocks,
  record::{DayRecord, DaySnapshot, VitalSet},
  store::{FactStore, StoreError, StoreErrorKind},
  subject::{Subject, SubjectName},
};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("store is offline")]
  Offline,

  #[error("subject already exists: {0}")]
  DuplicateSubject(SubjectName),

  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectName),

  #[error("no record for {0} on {1}")]
  DayNotFound(SubjectName, NaiveDate),
}

impl StoreError for MemoryStoreError {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Self::Offline => StoreErrorKind::Unavailable,
      _ => StoreErrorKind::Query,
    }
  }
}

type Result<T, E = MemoryStoreError> = std::result::Result<T, E>;

#[derive(Debug, Default)]
struct State {
  subjects: BTreeMap<SubjectName, Subject>,
  /// Records per subject in creation order.
  days:     BTreeMap<SubjectName, Vec<DayRecord>>,
}

#[derive(Debug)]
pub struct MemoryStore {
  state:  Mutex<State>,
  online: AtomicBool,
  locks:  SubjectLocks,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self {
      state:  Mutex::default(),
      online: AtomicBool::new(true),
      locks:  SubjectLocks::new(),
    }
  }
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Simulate losing (or regaining) the connection to the store.
  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }

  /// Every record held for `name`, including duplicates for a date.
  pub fn records(&self, name: &SubjectName) -> Vec<DayRecord> {
    self.lock().days.get(name).cloned().unwrap_or_default()
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  async fn enter(&self) -> Result<MutexGuard<'_, State>> {
    tokio::task::yield_now().await;
    if !self.online.load(Ordering::SeqCst) {
      return Err(MemoryStoreError::Offline);
    }
    Ok(self.lock())
  }
}

fn new_record(
  name: &SubjectName,
  date: NaiveDate,
  extraction: &Extraction,
) -> DayRecord {
  DayRecord {
    record_id:  Uuid::new_v4(),
    subject:    name.clone(),
    date,
    created_at: Utc::now(),
    symptoms:   extraction.symptoms.clone(),
    vitals:     extraction.vitals.clone(),
  }
}

fn day_mut<'s>(
  state: &'s mut State,
  name: &SubjectName,
  date: NaiveDate,
) -> Result<&'s mut DayRecord> {
  state
    .days
    .get_mut(name)
    .and_then(|days| days.iter_mut().find(|d| d.date == date))
    .ok_or_else(|| MemoryStoreError::DayNotFound(name.clone(), date))
}

impl FactStore for MemoryStore {
  type Error = MemoryStoreError;

  fn subject_locks(&self) -> &SubjectLocks { &self.locks }

  async fn find_subject(&self, name: &SubjectName) -> Result<Option<Subject>> {
    Ok(self.enter().await?.subjects.get(name).cloned())
  }

  async fn find_day_record(
    &self,
    name: &SubjectName,
    date: NaiveDate,
  ) -> Result<Option<DayRecord>> {
    let state = self.enter().await?;
    Ok(
      state
        .days
        .get(name)
        .and_then(|days| days.iter().find(|d| d.date == date))
        .cloned(),
    )
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    Ok(self.enter().await?.subjects.values().cloned().collect())
  }

  async fn create_subject_with_day(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    extraction: &Extraction,
  ) -> Result<DayRecord> {
    let mut state = self.enter().await?;
    if state.subjects.contains_key(name) {
      return Err(MemoryStoreError::DuplicateSubject(name.clone()));
    }
    let record = new_record(name, date, extraction);
    state.subjects.insert(name.clone(), Subject {
      name:       name.clone(),
      created_at: record.created_at,
    });
    state.days.insert(name.clone(), vec![record.clone()]);
    Ok(record)
  }

  async fn create_day_for_subject(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    extraction: &Extraction,
  ) -> Result<DayRecord> {
    let mut state = self.enter().await?;
    if !state.subjects.contains_key(name) {
      return Err(MemoryStoreError::SubjectNotFound(name.clone()));
    }
    let record = new_record(name, date, extraction);
    state.days.entry(name.clone()).or_default().push(record.clone());
    Ok(record)
  }

  async fn append_symptoms(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    symptoms: &[String],
  ) -> Result<()> {
    let mut state = self.enter().await?;
    day_mut(&mut state, name, date)?
      .symptoms
      .extend_from_slice(symptoms);
    Ok(())
  }

  async fn merge_vitals(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    vitals: &VitalSet,
  ) -> Result<()> {
    let mut state = self.enter().await?;
    let day = day_mut(&mut state, name, date)?;
    day
      .vitals
      .extend(vitals.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(())
  }

  async fn fetch_recent_days(
    &self,
    name: &SubjectName,
    limit: usize,
  ) -> Result<Vec<DaySnapshot>> {
    let state = self.enter().await?;
    let mut days: Vec<DaySnapshot> = state
      .days
      .get(name)
      .map(|days| days.iter().map(DayRecord::snapshot).collect())
      .unwrap_or_default();
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days.truncate(limit);
    Ok(days)
  }
}
