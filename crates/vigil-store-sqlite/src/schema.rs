//! SQL schema for the Vigil SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    name        TEXT PRIMARY KEY,   -- trimmed, lowercased identifier
    created_at  TEXT NOT NULL
);

-- One record per subject and calendar date.
CREATE TABLE IF NOT EXISTS day_records (
    record_id     TEXT PRIMARY KEY,
    subject_name  TEXT NOT NULL REFERENCES subjects(name),
    day           TEXT NOT NULL,    -- ISO 8601 calendar date
    created_at    TEXT NOT NULL,
    UNIQUE (subject_name, day)
);

-- A day's symptom list; `position` preserves append order.
CREATE TABLE IF NOT EXISTS symptoms (
    record_id  TEXT NOT NULL REFERENCES day_records(record_id),
    position   INTEGER NOT NULL,
    symptom    TEXT NOT NULL,
    PRIMARY KEY (record_id, position)
);

-- A day's vitals; one row per canonical key, overwritten on merge.
CREATE TABLE IF NOT EXISTS vitals (
    record_id  TEXT NOT NULL REFERENCES day_records(record_id),
    name       TEXT NOT NULL,
    value      TEXT NOT NULL,
    PRIMARY KEY (record_id, name)
);

CREATE INDEX IF NOT EXISTS day_records_day_idx ON day_records(day);

PRAGMA user_version = 1;
";
