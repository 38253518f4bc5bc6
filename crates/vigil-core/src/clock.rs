//! Where "today" comes from.

use chrono::{Local, NaiveDate};

/// Supplies the calendar date that a turn is filed under.
pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// The local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
  fn today(&self) -> NaiveDate { Local::now().date_naive() }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate { self.0 }
}
