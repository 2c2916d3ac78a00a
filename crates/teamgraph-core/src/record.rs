//! Provider input and the structured fields extracted from it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::season::Season;

// ─── Raw input ───────────────────────────────────────────────────────────────

/// One provider-side observation of a team, as produced by ingestion.
/// Never modified; consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
  pub provider_id:         String,
  pub provider_record_id:  String,
  pub raw_name:            String,
  #[serde(default)]
  pub raw_club_name:       Option<String>,
  /// Provider's own age column (e.g. "U13" or "2012"), if any.
  #[serde(default)]
  pub source_age_field:    Option<String>,
  /// Provider's own gender column (e.g. "Boys"), if any.
  #[serde(default)]
  pub source_gender_field: Option<String>,
  #[serde(default)]
  pub state_code:          Option<String>,
}

impl RawRecord {
  /// Convenience constructor with all optional fields empty.
  pub fn new(
    provider_id: impl Into<String>,
    provider_record_id: impl Into<String>,
    raw_name: impl Into<String>,
  ) -> Self {
    Self {
      provider_id:         provider_id.into(),
      provider_record_id:  provider_record_id.into(),
      raw_name:            raw_name.into(),
      raw_club_name:       None,
      source_age_field:    None,
      source_gender_field: None,
      state_code:          None,
    }
  }

  pub fn with_club(mut self, club: impl Into<String>) -> Self {
    self.raw_club_name = Some(club.into());
    self
  }
}

// ─── Gender ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
  Male,
  Female,
}

impl Gender {
  /// Single-letter code used in canonical display strings.
  pub fn letter(self) -> char {
    match self {
      Self::Male => 'B',
      Self::Female => 'G',
    }
  }
}

// ─── Age groups ──────────────────────────────────────────────────────────────

/// Format an age in years as the normalized `u<N>` label.
pub fn format_age_group(age: u8) -> String { format!("u{age}") }

/// Parse a normalized `u<N>` label back to its age in years.
pub fn parse_age_group(label: &str) -> Option<u8> {
  label
    .strip_prefix('u')
    .or_else(|| label.strip_prefix('U'))
    .and_then(|n| n.parse().ok())
}

// ─── Extraction output ───────────────────────────────────────────────────────

/// A conflict found while extracting fields. Ambiguous records are never
/// resolved automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
  /// Both male and female tokens were present; gender is left unset.
  ConflictingGender,
  /// The explicit age group does not match the birth year for the season.
  AgeBirthYearMismatch { age_group: String, birth_year: i32 },
  /// The provider's age column disagrees with the name.
  ConflictingSourceAge { name_value: String, source_value: String },
}

impl std::fmt::Display for Ambiguity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ConflictingGender => f.write_str("conflicting gender tokens"),
      Self::AgeBirthYearMismatch { age_group, birth_year } => {
        write!(f, "age-group vs birth-year conflict ({age_group} vs {birth_year})")
      }
      Self::ConflictingSourceAge { name_value, source_value } => write!(
        f,
        "name age {name_value} conflicts with provider age field {source_value}"
      ),
    }
  }
}

/// Structured fields parsed out of a raw team string. Pure output of the
/// extractor; embedded in review items, never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
  pub birth_year:      Option<i32>,
  pub age_group:       Option<String>,
  pub gender:          Option<Gender>,
  pub tier:            Option<String>,
  pub branch:          Option<String>,
  pub normalized_name: String,
  #[serde(default)]
  pub ambiguities:     Vec<Ambiguity>,
}

impl ExtractedFields {
  pub fn is_ambiguous(&self) -> bool { !self.ambiguities.is_empty() }

  /// Age in years for `season`, preferring the explicit age group.
  pub fn age_in(&self, season: Season) -> Option<u8> {
    if let Some(age) = self.age_group.as_deref().and_then(parse_age_group) {
      return Some(age);
    }
    self
      .birth_year
      .map(|y| season.age_of(y))
      .and_then(|age| u8::try_from(age).ok())
  }

  /// Birth year, falling back to the one implied by the age group.
  pub fn birth_year_in(&self, season: Season) -> Option<i32> {
    self.birth_year.or_else(|| {
      self
        .age_group
        .as_deref()
        .and_then(parse_age_group)
        .map(|age| season.birth_year_for(age))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gender_parses_case_insensitively() {
    assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
    assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
    assert!("boys".parse::<Gender>().is_err());
    assert_eq!(Gender::Female.to_string(), "female");
  }

  #[test]
  fn age_prefers_explicit_group() {
    let season = Season::ending(2025);
    let fields = ExtractedFields {
      birth_year: Some(2012),
      age_group: Some("u14".into()),
      ..Default::default()
    };
    assert_eq!(fields.age_in(season), Some(14));
    assert_eq!(fields.birth_year_in(season), Some(2012));

    let only_group = ExtractedFields {
      age_group: Some("u14".into()),
      ..Default::default()
    };
    assert_eq!(only_group.birth_year_in(season), Some(2011));
  }
}
