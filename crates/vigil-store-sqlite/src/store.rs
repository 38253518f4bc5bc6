//! [`SqliteStore`] — the SQLite implementation of [`FactStore`].

use std::{path::Path, sync::Arc};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;
use vigil_core::{
  extraction::Extraction,
  lock::SubjectLocks,
  record::{DayRecord, DaySnapshot, VitalSet},
  store::FactStore,
  subject::{Subject, SubjectName},
};

use crate::{
  Error, Result,
  encode::{RawDayRecord, RawSubject, encode_date, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vigil fact store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and clones
/// share one set of subject locks.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  locks: Arc<SubjectLocks>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn, locks: Arc::default() };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, locks: Arc::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Shared body of the two creation operations. The subject row is written
  /// first when `with_subject` is set; everything commits together.
  async fn create_day(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    extraction: &Extraction,
    with_subject: bool,
  ) -> Result<DayRecord> {
    let record = DayRecord {
      record_id:  Uuid::new_v4(),
      subject:    name.clone(),
      date,
      created_at: Utc::now(),
      symptoms:   extraction.symptoms.clone(),
      vitals:     extraction.vitals.clone(),
    };

    let name_str   = name.as_str().to_owned();
    let id_str     = encode_uuid(record.record_id);
    let day_str    = encode_date(date);
    let at_str     = encode_dt(record.created_at);
    let symptoms   = record.symptoms.clone();
    let vitals     = record.vitals.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if with_subject {
          tx.execute(
            "INSERT INTO subjects (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name_str, at_str],
          )?;
        }
        tx.execute(
          "INSERT INTO day_records (record_id, subject_name, day, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name_str, day_str, at_str],
        )?;
        insert_symptoms(&tx, &id_str, 0, &symptoms)?;
        upsert_vitals(&tx, &id_str, &vitals)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(record)
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn record_id_for(
  conn: &Connection,
  name: &str,
  day: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT record_id FROM day_records WHERE subject_name = ?1 AND day = ?2",
      rusqlite::params![name, day],
      |row| row.get(0),
    )
    .optional()
}

fn insert_symptoms(
  conn: &Connection,
  record_id: &str,
  first_position: i64,
  symptoms: &[String],
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(
    "INSERT INTO symptoms (record_id, position, symptom) VALUES (?1, ?2, ?3)",
  )?;
  for (offset, symptom) in (0_i64..).zip(symptoms) {
    stmt.execute(rusqlite::params![record_id, first_position + offset, symptom])?;
  }
  Ok(())
}

fn upsert_vitals(
  conn: &Connection,
  record_id: &str,
  vitals: &VitalSet,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(
    "INSERT INTO vitals (record_id, name, value) VALUES (?1, ?2, ?3)
     ON CONFLICT (record_id, name) DO UPDATE SET value = excluded.value",
  )?;
  for (name, value) in vitals {
    stmt.execute(rusqlite::params![record_id, name, value])?;
  }
  Ok(())
}

fn load_day(
  conn: &Connection,
  record_id: String,
  subject_name: String,
  day: String,
  created_at: String,
) -> rusqlite::Result<RawDayRecord> {
  let symptoms = conn
    .prepare(
      "SELECT symptom FROM symptoms WHERE record_id = ?1 ORDER BY position",
    )?
    .query_map(rusqlite::params![record_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;

  let vitals = conn
    .prepare("SELECT name, value FROM vitals WHERE record_id = ?1 ORDER BY name")?
    .query_map(rusqlite::params![record_id], |row| {
      Ok((row.get(0)?, row.get(1)?))
    })?
    .collect::<rusqlite::Result<Vec<(String, String)>>>()?;

  Ok(RawDayRecord { record_id, subject_name, day, created_at, symptoms, vitals })
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  fn subject_locks(&self) -> &SubjectLocks { &self.locks }

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn find_subject(&self, name: &SubjectName) -> Result<Option<Subject>> {
    let name_str = name.as_str().to_owned();

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT name, created_at FROM subjects WHERE name = ?1",
              rusqlite::params![name_str],
              |row| {
                Ok(RawSubject { name: row.get(0)?, created_at: row.get(1)? })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn find_day_record(
    &self,
    name: &SubjectName,
    date: NaiveDate,
  ) -> Result<Option<DayRecord>> {
    let name_str = name.as_str().to_owned();
    let day_str  = encode_date(date);

    let raw: Option<RawDayRecord> = self
      .conn
      .call(move |conn| {
        let row: Option<(String, String)> = conn
          .query_row(
            "SELECT record_id, created_at FROM day_records
             WHERE subject_name = ?1 AND day = ?2",
            rusqlite::params![name_str, day_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        Ok(match row {
          Some((record_id, created_at)) => {
            Some(load_day(conn, record_id, name_str, day_str, created_at)?)
          }
          None => None,
        })
      })
      .await?;

    raw.map(RawDayRecord::into_record).transpose()
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawSubject> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT name, created_at FROM subjects ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSubject { name: row.get(0)?, created_at: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  async fn create_subject_with_day(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    extraction: &Extraction,
  ) -> Result<DayRecord> {
    self.create_day(name, date, extraction, true).await
  }

  async fn create_day_for_subject(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    extraction: &Extraction,
  ) -> Result<DayRecord> {
    self.create_day(name, date, extraction, false).await
  }

  // ── Merges ────────────────────────────────────────────────────────────────

  async fn append_symptoms(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    symptoms: &[String],
  ) -> Result<()> {
    let name_str = name.as_str().to_owned();
    let day_str  = encode_date(date);
    let symptoms = symptoms.to_vec();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(record_id) = record_id_for(&tx, &name_str, &day_str)? else {
          return Ok(false);
        };
        let next: i64 = tx.query_row(
          "SELECT COALESCE(MAX(position) + 1, 0) FROM symptoms WHERE record_id = ?1",
          rusqlite::params![record_id],
          |row| row.get(0),
        )?;
        insert_symptoms(&tx, &record_id, next, &symptoms)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::DayNotFound { subject: name.clone(), date });
    }
    Ok(())
  }

  async fn merge_vitals(
    &self,
    name: &SubjectName,
    date: NaiveDate,
    vitals: &VitalSet,
  ) -> Result<()> {
    let name_str = name.as_str().to_owned();
    let day_str  = encode_date(date);
    let vitals   = vitals.clone();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(record_id) = record_id_for(&tx, &name_str, &day_str)? else {
          return Ok(false);
        };
        upsert_vitals(&tx, &record_id, &vitals)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::DayNotFound { subject: name.clone(), date });
    }
    Ok(())
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn fetch_recent_days(
    &self,
    name: &SubjectName,
    limit: usize,
  ) -> Result<Vec<DaySnapshot>> {
    let name_str  = name.as_str().to_owned();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawDayRecord> = self
      .conn
      .call(move |conn| {
        let heads = conn
          .prepare(
            "SELECT record_id, day, created_at FROM day_records
             WHERE subject_name = ?1
             ORDER BY day DESC
             LIMIT ?2",
          )?
          .query_map(rusqlite::params![name_str, limit_val], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<(String, String, String)>>>()?;

        let days = heads
          .into_iter()
          .map(|(record_id, day, created_at)| {
            load_day(conn, record_id, name_str.clone(), day, created_at)
          })
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
      })
      .await?;

    raws.into_iter().map(RawDayRecord::into_snapshot).collect()
  }
}
