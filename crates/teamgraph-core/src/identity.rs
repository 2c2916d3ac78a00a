//! Canonical identities: clubs, teams, and the provider aliases pointing at
//! them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{ExtractedFields, Gender, parse_age_group},
  season::Season,
};

// ─── Clubs ───────────────────────────────────────────────────────────────────

/// One real-world club. Never deleted; aliases only grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalClub {
  pub club_id:      Uuid,
  pub display_name: String,
  /// Normalized club keys (see `teamgraph_extract::normalize_club`).
  pub aliases:      BTreeSet<String>,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::CanonicalStore::create_club`].
#[derive(Debug, Clone)]
pub struct NewClub {
  pub display_name: String,
  pub aliases:      Vec<String>,
}

// ─── Teams ───────────────────────────────────────────────────────────────────

/// One real-world team-season cohort.
///
/// A deprecated team has been merged into another; it is kept for audit and
/// never physically removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTeam {
  pub team_id_master:  Uuid,
  pub club_id:         Uuid,
  pub display_name:    String,
  pub normalized_name: String,
  pub age_group:       String,
  pub gender:          Gender,
  pub birth_year:      Option<i32>,
  pub branch:          Option<String>,
  pub tier:            Option<String>,
  pub is_deprecated:   bool,
  pub created_at:      DateTime<Utc>,
}

impl CanonicalTeam {
  pub fn age(&self) -> Option<u8> { parse_age_group(&self.age_group) }

  /// Recorded birth year, or the one implied by the age group in `season`.
  pub fn birth_year_in(&self, season: Season) -> Option<i32> {
    self
      .birth_year
      .or_else(|| self.age().map(|age| season.birth_year_for(age)))
  }

  /// Compare a record's age signals with this team's.
  ///
  /// Like is compared with like first: an explicit age group against the
  /// team's age group, a birth year against the team's recorded birth year.
  /// Only when no such pair exists are birth years derived for `season`.
  pub fn age_fit(&self, fields: &ExtractedFields, season: Season) -> AgeFit {
    let explicit_age = fields.age_group.as_deref().and_then(parse_age_group);
    let same_age = match (explicit_age, self.age()) {
      (Some(ours), Some(theirs)) if ours != theirs => return AgeFit::Different,
      (Some(_), Some(_)) => true,
      _ => false,
    };
    if let (Some(ours), Some(theirs)) = (fields.birth_year, self.birth_year) {
      return if ours == theirs { AgeFit::Exact } else { AgeFit::Different };
    }
    if same_age {
      return AgeFit::Exact;
    }
    match (fields.birth_year_in(season), self.birth_year_in(season)) {
      (Some(ours), Some(theirs)) if ours == theirs => AgeFit::Exact,
      (Some(ours), Some(theirs)) => AgeFit::Derived { gap: ours.abs_diff(theirs) },
      _ => AgeFit::Unknown,
    }
  }
}

/// Outcome of [`CanonicalTeam::age_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeFit {
  /// One side carries no age at all.
  Unknown,
  Exact,
  /// Explicit values of the same kind disagree: a different cohort.
  Different,
  /// A birth year compared against an age group, `gap` years apart.
  Derived { gap: u32 },
}

/// Input to [`crate::store::CanonicalStore::create_team`].
/// `team_id_master` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTeam {
  pub club_id:         Uuid,
  pub display_name:    String,
  pub normalized_name: String,
  pub age_group:       String,
  pub gender:          Gender,
  pub birth_year:      Option<i32>,
  pub branch:          Option<String>,
  pub tier:            Option<String>,
}

// ─── Aliases ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchMethod {
  Exact,
  Fuzzy,
  Manual,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AliasStatus {
  /// Active, but linked by fuzzy matching and not yet audited.
  #[default]
  Pending,
  Approved,
  /// No longer resolves; the provider record goes back to review.
  Rejected,
}

impl AliasStatus {
  pub fn is_active(self) -> bool { !matches!(self, Self::Rejected) }
}

/// A provider-side team id mapped to a canonical team.
/// Unique on `(provider_id, provider_team_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasMapping {
  pub provider_id:      String,
  pub provider_team_id: String,
  pub team_id_master:   Uuid,
  pub match_method:     MatchMethod,
  pub confidence:       f64,
  pub review_status:    AliasStatus,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::CanonicalStore::link_alias`]; the target team is
/// passed separately.
#[derive(Debug, Clone)]
pub struct NewAlias {
  pub provider_id:      String,
  pub provider_team_id: String,
  pub match_method:     MatchMethod,
  pub confidence:       f64,
  pub review_status:    AliasStatus,
}

impl NewAlias {
  /// Build an alias, rejecting confidences outside `[0, 1]`.
  pub fn new(
    provider_id: impl Into<String>,
    provider_team_id: impl Into<String>,
    match_method: MatchMethod,
    confidence: f64,
  ) -> Result<Self> {
    if !(0.0..=1.0).contains(&confidence) {
      return Err(Error::ConfidenceOutOfRange(confidence));
    }
    let review_status = match match_method {
      MatchMethod::Fuzzy => AliasStatus::Pending,
      MatchMethod::Exact | MatchMethod::Manual => AliasStatus::Approved,
    };
    Ok(Self {
      provider_id: provider_id.into(),
      provider_team_id: provider_team_id.into(),
      match_method,
      confidence,
      review_status,
    })
  }
}
