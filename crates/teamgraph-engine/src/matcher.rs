//! Candidate search against the canonical store.
//!
//! Two passes: clubs are scored against the record's club key, then the live
//! teams of every surviving club are scored against the extracted fields.
//! A candidate's confidence is the product of the two.

use std::cmp::Ordering;

use teamgraph_core::{
  action::ScoredMatch,
  identity::{AgeFit, CanonicalClub, CanonicalTeam},
  record::ExtractedFields,
  season::Season,
  store::CanonicalStore,
};
use teamgraph_extract::{normalize_club, normalize_team_name};
use uuid::Uuid;

use crate::{
  Error, Result,
  config::Thresholds,
  similarity::{name_similarity, round4},
};

/// Highest score a fuzzy club match can reach; 1.0 is reserved for an exact
/// alias hit.
const FUZZY_CLUB_CAP: f64 = 0.99;

const NAME_WEIGHT: f64 = 0.5;
const STRUCTURE_WEIGHT: f64 = 0.5;

const AGE_WEIGHT: f64 = 0.35;
const GENDER_WEIGHT: f64 = 0.35;
const BRANCH_WEIGHT: f64 = 0.15;
const TIER_WEIGHT: f64 = 0.15;

/// A canonical team proposed for a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub team:            CanonicalTeam,
  pub confidence:      f64,
  pub club_confidence: f64,
  /// Games linked to the team, used by the duplicate tie-break.
  pub game_count:      u64,
}

impl Candidate {
  pub fn scored(&self) -> ScoredMatch {
    ScoredMatch {
      team_id_master: self.team.team_id_master,
      confidence:     self.confidence,
    }
  }

  pub fn team_id(&self) -> Uuid { self.team.team_id_master }
}

/// Descending confidence, then ascending team id.
pub fn rank(a: &Candidate, b: &Candidate) -> Ordering {
  b.confidence
    .total_cmp(&a.confidence)
    .then_with(|| a.team_id().cmp(&b.team_id()))
}

/// The comparison key for a record's club: the explicit club name when the
/// provider supplied one, otherwise the residual team name.
pub fn club_key(fields: &ExtractedFields, club_hint: Option<&str>) -> String {
  match club_hint.map(str::trim).filter(|hint| !hint.is_empty()) {
    Some(hint) => normalize_club(hint),
    None => normalize_club(&fields.normalized_name),
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
  season:     Season,
  thresholds: Thresholds,
}

impl Matcher {
  pub fn new(season: Season, thresholds: Thresholds) -> Self { Self { season, thresholds } }

  /// Score every live team of every plausible club. Read-only.
  pub async fn find_candidates<S: CanonicalStore>(
    &self,
    fields: &ExtractedFields,
    club_hint: Option<&str>,
    store: &S,
  ) -> Result<Vec<Candidate>> {
    let key = club_key(fields, club_hint);
    let clubs = store.list_clubs().await.map_err(Error::store)?;

    let mut candidates = Vec::new();
    for (club, club_confidence) in self.score_clubs(&key, &clubs) {
      let teams = store
        .list_teams(Some(club.club_id), false)
        .await
        .map_err(Error::store)?;
      for team in teams {
        let confidence = round4(club_confidence * self.score_team(fields, &team));
        let game_count = store
          .count_games(team.team_id_master)
          .await
          .map_err(Error::store)?;
        candidates.push(Candidate { team, confidence, club_confidence, game_count });
      }
    }

    candidates.sort_by(rank);
    Ok(candidates)
  }

  /// Clubs whose similarity to `key` reaches the club floor, best first.
  pub fn score_clubs<'c>(
    &self,
    key: &str,
    clubs: &'c [CanonicalClub],
  ) -> Vec<(&'c CanonicalClub, f64)> {
    if key.is_empty() {
      return Vec::new();
    }
    let mut scored: Vec<_> = clubs
      .iter()
      .map(|club| (club, club_similarity(key, club)))
      .filter(|(_, score)| *score >= self.thresholds.club_floor)
      .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.club_id.cmp(&b.0.club_id)));
    scored
  }

  /// `0.5 · name similarity + 0.5 · structural agreement`.
  pub fn score_team(&self, fields: &ExtractedFields, team: &CanonicalTeam) -> f64 {
    let name = name_similarity(&normalize_team_name(&fields.normalized_name), &team.normalized_name);

    let age = match team.age_fit(fields, self.season) {
      AgeFit::Exact => 1.0,
      AgeFit::Derived { gap: 1 } | AgeFit::Unknown => 0.5,
      AgeFit::Derived { .. } | AgeFit::Different => 0.0,
    };
    let gender = agreement(fields.gender.as_ref(), Some(&team.gender));
    let branch = agreement(lower(&fields.branch).as_ref(), lower(&team.branch).as_ref());
    let tier = agreement(lower(&fields.tier).as_ref(), lower(&team.tier).as_ref());

    let structural =
      AGE_WEIGHT * age + GENDER_WEIGHT * gender + BRANCH_WEIGHT * branch + TIER_WEIGHT * tier;
    NAME_WEIGHT * name + STRUCTURE_WEIGHT * structural
  }
}

fn club_similarity(key: &str, club: &CanonicalClub) -> f64 {
  if club.aliases.contains(key) {
    return 1.0;
  }
  club
    .aliases
    .iter()
    .cloned()
    .chain(std::iter::once(normalize_club(&club.display_name)))
    .map(|alias| name_similarity(key, &alias))
    .fold(0.0, f64::max)
    .min(FUZZY_CLUB_CAP)
}

/// 1 when equal (including absent on both sides), 0.5 when only one side is
/// known, 0 when they differ.
fn agreement<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> f64 {
  match (a, b) {
    (Some(a), Some(b)) if a == b => 1.0,
    (Some(_), Some(_)) => 0.0,
    (None, None) => 1.0,
    _ => 0.5,
  }
}

fn lower(value: &Option<String>) -> Option<String> { value.as_deref().map(str::to_lowercase) }

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use chrono::Utc;
  use teamgraph_core::record::Gender;

  use super::*;

  const SEASON: Season = Season::ending(2025);

  fn club(name: &str, aliases: &[&str]) -> CanonicalClub {
    CanonicalClub {
      club_id:      Uuid::new_v4(),
      display_name: name.into(),
      aliases:      aliases.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>(),
      created_at:   Utc::now(),
    }
  }

  fn team(name: &str, age: &str, gender: Gender, tier: Option<&str>) -> CanonicalTeam {
    CanonicalTeam {
      team_id_master:  Uuid::new_v4(),
      club_id:         Uuid::new_v4(),
      display_name:    name.into(),
      normalized_name: normalize_team_name(name),
      age_group:       age.into(),
      gender,
      birth_year:      None,
      branch:          None,
      tier:            tier.map(Into::into),
      is_deprecated:   false,
      created_at:      Utc::now(),
    }
  }

  fn fields(name: &str, age: Option<&str>, gender: Option<Gender>) -> ExtractedFields {
    ExtractedFields {
      age_group: age.map(Into::into),
      gender,
      normalized_name: name.into(),
      ..Default::default()
    }
  }

  fn matcher() -> Matcher { Matcher::new(SEASON, Thresholds::default()) }

  #[test]
  fn exact_alias_scores_one() {
    let clubs = [club("FC Dallas", &["dallas"])];
    let scored = matcher().score_clubs("dallas", &clubs);
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].1, 1.0);
  }

  #[test]
  fn fuzzy_club_is_capped_and_floored() {
    let clubs = [club("Solar SC", &["solar"]), club("Sting", &["sting"])];
    let scored = matcher().score_clubs("solars", &clubs);
    assert_eq!(scored.len(), 1);
    assert!(scored[0].1 < 1.0);
    assert_eq!(scored[0].0.display_name, "Solar SC");
  }

  #[test]
  fn club_key_prefers_hint() {
    let f = fields("Dallas Blue", None, None);
    assert_eq!(club_key(&f, Some("FC Dallas")), "dallas");
    assert_eq!(club_key(&f, Some("  ")), "dallas blue");
    assert_eq!(club_key(&f, None), "dallas blue");
  }

  #[test]
  fn full_agreement_scores_one() {
    let t = team("FC Dallas", "u13", Gender::Male, Some("ECNL"));
    let mut f = fields("FC Dallas", None, Some(Gender::Male));
    f.birth_year = Some(2012);
    f.tier = Some("ECNL".into());
    assert!((matcher().score_team(&f, &t) - 1.0).abs() < 1e-9);
  }

  #[test]
  fn unknown_fields_score_half() {
    let t = team("FC Dallas", "u13", Gender::Male, None);
    let f = fields("FC Dallas", None, None);
    // name 1.0; age 0.5, gender 0.5, branch 1, tier 1
    let expected = 0.5 + 0.5 * (0.35 * 0.5 + 0.35 * 0.5 + 0.15 + 0.15);
    assert!((matcher().score_team(&f, &t) - expected).abs() < 1e-9);
  }

  #[test]
  fn gender_mismatch_loses_gender_weight() {
    let t = team("FC Dallas", "u13", Gender::Female, None);
    let f = fields("FC Dallas", Some("u13"), Some(Gender::Male));
    let expected = 0.5 + 0.5 * (0.35 + 0.15 + 0.15);
    assert!((matcher().score_team(&f, &t) - expected).abs() < 1e-9);
  }

  #[test]
  fn birth_year_one_off_an_age_group_scores_half() {
    let t = team("FC Dallas", "u12", Gender::Male, None);
    let mut f = fields("FC Dallas", None, Some(Gender::Male));
    f.birth_year = Some(2012);
    let expected = 0.5 + 0.5 * (0.35 * 0.5 + 0.35 + 0.15 + 0.15);
    assert!((matcher().score_team(&f, &t) - expected).abs() < 1e-9);
  }

  #[test]
  fn different_age_group_loses_age_weight() {
    let t = team("Solar SC", "u14", Gender::Female, Some("Premier"));
    let mut f = fields("Solar SC", Some("u13"), Some(Gender::Female));
    f.tier = Some("Premier".into());
    let expected = 0.5 + 0.5 * (0.35 + 0.15 + 0.15);
    assert!((matcher().score_team(&f, &t) - expected).abs() < 1e-9);
  }

  #[test]
  fn ranking_breaks_ties_by_team_id() {
    let mut a = Candidate {
      team:            team("A", "u13", Gender::Male, None),
      confidence:      0.9,
      club_confidence: 1.0,
      game_count:      0,
    };
    let mut b = a.clone();
    a.team.team_id_master = Uuid::from_u128(2);
    b.team.team_id_master = Uuid::from_u128(1);
    let mut all = vec![a, b];
    all.sort_by(rank);
    assert_eq!(all[0].team_id(), Uuid::from_u128(1));
  }
}
