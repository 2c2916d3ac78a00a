//! Youth-soccer seasons and the birth-year / age-group relation.
//!
//! A season runs 1 August through 31 July and is identified by the calendar
//! year it ends in. A player born in year `Y` plays `U(end_year - Y)` for the
//! whole season.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Youngest age group recognised by the extractor.
pub const MIN_AGE: u8 = 4;
/// Oldest age group recognised by the extractor.
pub const MAX_AGE: u8 = 19;

/// Month in which a new season starts.
const SEASON_START_MONTH: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season {
  end_year: i32,
}

impl Season {
  pub const fn ending(end_year: i32) -> Self { Self { end_year } }

  /// The season in progress on `date`.
  pub fn containing(date: NaiveDate) -> Self {
    let year = date.year();
    if date.month() >= SEASON_START_MONTH {
      Self::ending(year + 1)
    } else {
      Self::ending(year)
    }
  }

  pub fn current() -> Self { Self::containing(Utc::now().date_naive()) }

  pub fn end_year(self) -> i32 { self.end_year }

  /// Age group (in years) a player born in `birth_year` plays this season.
  pub fn age_of(self, birth_year: i32) -> i32 { self.end_year - birth_year }

  pub fn birth_year_for(self, age: u8) -> i32 { self.end_year - i32::from(age) }

  /// Whether `birth_year` maps to an age group between U4 and U19.
  pub fn is_plausible_birth_year(self, birth_year: i32) -> bool {
    let age = self.age_of(birth_year);
    (i32::from(MIN_AGE)..=i32::from(MAX_AGE)).contains(&age)
  }
}

impl Default for Season {
  fn default() -> Self { Self::current() }
}
