//! The decision table: turns extracted fields and ranked candidates into an
//! [`Action`].
//!
//! Candidates that are plainly a different cohort are set aside first: an
//! explicit age group or birth year that disagrees with the team's, or a
//! different gender on a team the club, branch and tier do not corroborate.
//! The rules then run over what is left, in order, and the first one that
//! applies wins:
//!
//! | # | condition                                                  | action                          |
//! |---|------------------------------------------------------------|---------------------------------|
//! | 0 | extraction reported ambiguities                            | review (`extraction_ambiguous`) |
//! | 1 | top ≥ auto-link, no conflict, runner-up outside the margin | auto-link                       |
//! | 2 | top two ≥ auto-merge and duplicates of each other          | auto-merge                      |
//! | 3 | gender or derived birth year conflicts with the top one    | review (`conflict_detected`)    |
//! | 4 | nothing above the candidate floor                          | create-new, if gender and age   |
//! | 5 | otherwise                                                  | review                          |

use std::collections::HashMap;

use serde::Serialize;
use teamgraph_core::{
  action::{Action, ReviewReason, ScoredMatch},
  identity::{AgeFit, CanonicalTeam},
  record::ExtractedFields,
  season::Season,
};
use uuid::Uuid;

use crate::{
  config::Thresholds,
  matcher::Candidate,
  similarity::{name_similarity, round4},
};

/// Largest tolerated gap between a record's birth year and the one derived
/// from a team's age group.
const BIRTH_YEAR_TOLERANCE: u32 = 1;

/// A proposed merge of two duplicate teams.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeProposal {
  pub deprecated_team_id: Uuid,
  pub canonical_team_id:  Uuid,
  pub name_similarity:    f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionEngine {
  season:     Season,
  thresholds: Thresholds,
}

impl DecisionEngine {
  pub fn new(season: Season, thresholds: Thresholds) -> Self { Self { season, thresholds } }

  pub fn thresholds(&self) -> &Thresholds { &self.thresholds }

  /// Decide what to do with a record. `candidates` must be ranked.
  pub fn decide(&self, fields: &ExtractedFields, candidates: &[Candidate]) -> Action {
    if fields.is_ambiguous() {
      return Action::NeedsReview {
        candidates: candidates.iter().map(Candidate::scored).collect(),
        reason:     ReviewReason::ExtractionAmbiguous {
          ambiguities: fields.ambiguities.clone(),
        },
      };
    }

    let plausible: Vec<Candidate> = candidates
      .iter()
      .filter(|c| !self.is_other_cohort(fields, c))
      .cloned()
      .collect();
    if plausible.len() < candidates.len() {
      tracing::debug!(
        name = %fields.normalized_name,
        set_aside = candidates.len() - plausible.len(),
        "candidates from other cohorts set aside",
      );
    }
    self.decide_plausible(fields, &plausible)
  }

  fn decide_plausible(&self, fields: &ExtractedFields, candidates: &[Candidate]) -> Action {
    let t = &self.thresholds;
    let scored = || candidates.iter().map(Candidate::scored).collect::<Vec<ScoredMatch>>();

    let Some(top) = candidates.first() else {
      return self.create_or_review(fields, Vec::new());
    };
    let runner_up = candidates.get(1);
    let contested = runner_up
      .is_some_and(|r| round4(top.confidence - r.confidence) <= t.ambiguity_margin);
    let conflicts = self.conflicts(fields, &top.team);

    if top.confidence >= t.auto_link && conflicts.is_empty() && !contested {
      return Action::AutoLink { team_id: top.team_id() };
    }

    if let Some(runner_up) = runner_up
      && conflicts.is_empty()
      && top.confidence >= t.auto_merge
      && runner_up.confidence >= t.auto_merge
      && self.duplicate_similarity(&top.team, &runner_up.team).is_some()
    {
      let (deprecated, canonical) = self.choose_canonical(
        (&top.team, top.game_count),
        (&runner_up.team, runner_up.game_count),
      );
      return Action::AutoMerge { deprecated_id: deprecated, canonical_id: canonical };
    }

    if !conflicts.is_empty() {
      let corroborated = self.corroborates(fields, top);
      tracing::warn!(
        team_id = %top.team_id(),
        name = %fields.normalized_name,
        conflicts = ?conflicts,
        corroborated,
        confidence = top.confidence,
        "record conflicts with best candidate",
      );
      return Action::NeedsReview {
        candidates: scored(),
        reason:     ReviewReason::ConflictDetected { fields: conflicts, corroborated },
      };
    }

    if top.confidence < t.candidate_floor {
      return self.create_or_review(fields, scored());
    }

    let reason = if contested {
      ReviewReason::AmbiguousCandidates
    } else {
      ReviewReason::LowConfidence
    };
    Action::NeedsReview { candidates: scored(), reason }
  }

  fn create_or_review(&self, fields: &ExtractedFields, candidates: Vec<ScoredMatch>) -> Action {
    let mut missing = Vec::new();
    if fields.gender.is_none() {
      missing.push("gender".to_owned());
    }
    if fields.age_in(self.season).is_none() {
      missing.push("age_group".to_owned());
    }
    if missing.is_empty() {
      Action::CreateNew
    } else {
      Action::NeedsReview {
        candidates,
        reason: ReviewReason::InsufficientFields { missing },
      }
    }
  }

  /// Whether `candidate` is certainly a different team from the record.
  pub fn is_other_cohort(&self, fields: &ExtractedFields, candidate: &Candidate) -> bool {
    if candidate.team.age_fit(fields, self.season) == AgeFit::Different {
      return true;
    }
    fields.gender.is_some_and(|g| g != candidate.team.gender)
      && !self.corroborates(fields, candidate)
  }

  /// The club matches outright and branch and tier are identical.
  fn corroborates(&self, fields: &ExtractedFields, candidate: &Candidate) -> bool {
    candidate.club_confidence >= self.thresholds.auto_link
      && lower(&fields.branch) == lower(&candidate.team.branch)
      && lower(&fields.tier) == lower(&candidate.team.tier)
  }

  /// Names of the strong signals on which `fields` disagrees with `team`.
  ///
  /// A derived birth-year gap beyond the tolerance is always a conflict, even
  /// when club, branch and tier corroborate.
  pub fn conflicts(&self, fields: &ExtractedFields, team: &CanonicalTeam) -> Vec<String> {
    let mut found = Vec::new();
    if fields.gender.is_some_and(|g| g != team.gender) {
      found.push("gender".to_owned());
    }
    match team.age_fit(fields, self.season) {
      AgeFit::Different => found.push("age_group".to_owned()),
      AgeFit::Derived { gap } if gap > BIRTH_YEAR_TOLERANCE => {
        found.push("birth_year".to_owned());
      }
      _ => {}
    }
    found
  }

  /// Name similarity of two teams if they look like the same real team:
  /// same club, age group, gender and branch, and names at least as similar
  /// as the auto-merge threshold.
  pub fn duplicate_similarity(&self, a: &CanonicalTeam, b: &CanonicalTeam) -> Option<f64> {
    if a.team_id_master == b.team_id_master
      || a.club_id != b.club_id
      || a.age_group != b.age_group
      || a.gender != b.gender
      || a.branch != b.branch
    {
      return None;
    }
    let similarity = round4(name_similarity(&a.normalized_name, &b.normalized_name));
    (similarity >= self.thresholds.auto_merge).then_some(similarity)
  }

  /// Pick the surviving side of a duplicate pair, returning
  /// `(deprecated, canonical)`.
  ///
  /// The side with materially more game history wins; otherwise the older
  /// team, then the lower id.
  pub fn choose_canonical(
    &self,
    a: (&CanonicalTeam, u64),
    b: (&CanonicalTeam, u64),
  ) -> (Uuid, Uuid) {
    let ratio = self.thresholds.history_ratio;
    let dominates =
      |ours: u64, theirs: u64| ours > theirs && ours as f64 >= ratio * theirs as f64;

    let a_wins = if dominates(a.1, b.1) {
      true
    } else if dominates(b.1, a.1) {
      false
    } else {
      (a.0.created_at, a.0.team_id_master) <= (b.0.created_at, b.0.team_id_master)
    };

    if a_wins {
      (b.0.team_id_master, a.0.team_id_master)
    } else {
      (a.0.team_id_master, b.0.team_id_master)
    }
  }

  /// Sweep live teams for duplicate pairs, one proposal per deprecated team.
  /// Teams already chosen as the deprecated side of an earlier pair are
  /// skipped.
  pub fn find_duplicates(
    &self,
    teams: &[CanonicalTeam],
    game_counts: &HashMap<Uuid, u64>,
  ) -> Vec<MergeProposal> {
    let mut live: Vec<&CanonicalTeam> = teams.iter().filter(|t| !t.is_deprecated).collect();
    live.sort_by_key(|t| (t.club_id, t.created_at, t.team_id_master));
    let games = |team: &CanonicalTeam| game_counts.get(&team.team_id_master).copied().unwrap_or(0);

    let mut deprecated = std::collections::HashSet::new();
    let mut proposals = Vec::new();
    for (i, a) in live.iter().enumerate() {
      for b in &live[i + 1..] {
        if a.club_id != b.club_id {
          break;
        }
        if deprecated.contains(&a.team_id_master) || deprecated.contains(&b.team_id_master) {
          continue;
        }
        let Some(similarity) = self.duplicate_similarity(a, b) else { continue };
        let (loser, winner) = self.choose_canonical((a, games(a)), (b, games(b)));
        deprecated.insert(loser);
        proposals.push(MergeProposal {
          deprecated_team_id: loser,
          canonical_team_id:  winner,
          name_similarity:    similarity,
        });
      }
    }
    proposals
  }
}

fn lower(value: &Option<String>) -> Option<String> { value.as_deref().map(str::to_lowercase) }

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use teamgraph_core::record::{Ambiguity, Gender};

  use super::*;

  const SEASON: Season = Season::ending(2025);

  fn engine() -> DecisionEngine { DecisionEngine::new(SEASON, Thresholds::default()) }

  fn team(id: u128, name: &str) -> CanonicalTeam {
    CanonicalTeam {
      team_id_master:  Uuid::from_u128(id),
      club_id:         Uuid::from_u128(100),
      display_name:    name.into(),
      normalized_name: name.to_lowercase(),
      age_group:       "u13".into(),
      gender:          Gender::Male,
      birth_year:      Some(2012),
      branch:          None,
      tier:            Some("ECNL".into()),
      is_deprecated:   false,
      created_at:      Utc::now(),
    }
  }

  fn candidate(team: CanonicalTeam, confidence: f64) -> Candidate {
    Candidate { team, confidence, club_confidence: 1.0, game_count: 0 }
  }

  fn fields() -> ExtractedFields {
    ExtractedFields {
      birth_year: Some(2012),
      gender: Some(Gender::Male),
      tier: Some("ECNL".into()),
      normalized_name: "FC Dallas".into(),
      ..Default::default()
    }
  }

  #[test]
  fn ambiguous_extraction_goes_to_review_first() {
    let mut f = fields();
    f.gender = None;
    f.ambiguities.push(Ambiguity::ConflictingGender);
    let action = engine().decide(&f, &[candidate(team(1, "FC Dallas"), 0.99)]);
    assert!(matches!(
      action,
      Action::NeedsReview { reason: ReviewReason::ExtractionAmbiguous { .. }, .. }
    ));
  }

  #[test]
  fn strong_unique_match_links() {
    let action = engine().decide(&fields(), &[candidate(team(1, "FC Dallas"), 0.92)]);
    assert_eq!(action, Action::AutoLink { team_id: Uuid::from_u128(1) });
  }

  #[test]
  fn close_runner_up_blocks_link() {
    let candidates = [
      candidate(team(1, "FC Dallas"), 0.88),
      {
        let mut other = team(2, "Sting Dallas");
        other.club_id = Uuid::from_u128(200);
        candidate(other, 0.86)
      },
    ];
    let action = engine().decide(&fields(), &candidates);
    assert!(matches!(
      action,
      Action::NeedsReview { reason: ReviewReason::AmbiguousCandidates, ref candidates }
        if candidates.len() == 2
    ));
  }

  #[test]
  fn near_identical_duplicates_merge() {
    let older = team(2, "FC Dallas");
    let mut newer = team(1, "FC Dallas.");
    newer.normalized_name = "fc dallas".into();
    newer.created_at = older.created_at + Duration::days(1);
    let candidates = [candidate(newer, 0.95), candidate(older, 0.94)];
    let action = engine().decide(&fields(), &candidates);
    assert_eq!(
      action,
      Action::AutoMerge {
        deprecated_id: Uuid::from_u128(1),
        canonical_id:  Uuid::from_u128(2),
      }
    );
  }

  #[test]
  fn duplicates_below_merge_threshold_go_to_review() {
    let candidates = [candidate(team(1, "FC Dallas"), 0.87), candidate(team(2, "FC Dallas"), 0.86)];
    let action = engine().decide(&fields(), &candidates);
    assert!(matches!(
      action,
      Action::NeedsReview { reason: ReviewReason::AmbiguousCandidates, ref candidates }
        if candidates.len() == 2
    ));
  }

  #[test]
  fn gender_conflict_never_links() {
    let mut girls = team(1, "FC Dallas");
    girls.gender = Gender::Female;
    let action = engine().decide(&fields(), &[candidate(girls, 0.9)]);
    let Action::NeedsReview { reason: ReviewReason::ConflictDetected { fields, corroborated }, .. } =
      action
    else {
      panic!("expected conflict review");
    };
    assert_eq!(fields, vec!["gender".to_owned()]);
    assert!(corroborated);
  }

  #[test]
  fn derived_birth_year_gap_is_a_conflict() {
    let mut older = team(1, "FC Dallas");
    older.birth_year = None;
    older.age_group = "u16".into();
    let action = engine().decide(&fields(), &[candidate(older, 0.7)]);
    let Action::NeedsReview { reason: ReviewReason::ConflictDetected { fields, corroborated }, .. } =
      action
    else {
      panic!("expected conflict review");
    };
    assert_eq!(fields, vec!["birth_year".to_owned()]);
    assert!(corroborated);
  }

  #[test]
  fn adjacent_derived_birth_year_is_tolerated() {
    let mut f = fields();
    f.birth_year = Some(2013);
    let mut u13 = team(1, "FC Dallas");
    u13.birth_year = None;
    assert!(engine().conflicts(&f, &u13).is_empty());
  }

  #[test]
  fn other_age_group_never_links() {
    let mut u14 = team(1, "FC Dallas");
    u14.age_group = "u14".into();
    u14.birth_year = None;
    let mut f = fields();
    f.birth_year = None;
    f.age_group = Some("u13".into());

    assert!(engine().is_other_cohort(&f, &candidate(u14.clone(), 0.95)));
    assert_eq!(engine().decide(&f, &[candidate(u14, 0.95)]), Action::CreateNew);
  }

  #[test]
  fn explicit_birth_years_must_agree() {
    let mut f = fields();
    f.birth_year = Some(2013);
    let action = engine().decide(&f, &[candidate(team(1, "FC Dallas"), 0.9)]);
    assert_eq!(action, Action::CreateNew);
  }

  #[test]
  fn other_gender_in_another_tier_is_a_new_team() {
    let mut girls = team(1, "FC Dallas");
    girls.gender = Gender::Female;
    girls.tier = Some("Premier".into());
    let action = engine().decide(&fields(), &[candidate(girls, 0.7)]);
    assert_eq!(action, Action::CreateNew);
  }

  #[test]
  fn no_candidates_creates_new() {
    assert_eq!(engine().decide(&fields(), &[]), Action::CreateNew);
    let weak = [candidate(team(1, "Sting"), 0.3)];
    assert_eq!(engine().decide(&fields(), &weak), Action::CreateNew);
  }

  #[test]
  fn missing_gender_blocks_create_new() {
    let mut f = fields();
    f.gender = None;
    let action = engine().decide(&f, &[]);
    assert!(matches!(
      action,
      Action::NeedsReview { reason: ReviewReason::InsufficientFields { ref missing }, .. }
        if missing == &vec!["gender".to_owned()]
    ));
  }

  #[test]
  fn mid_confidence_is_low_confidence_review() {
    let action = engine().decide(&fields(), &[candidate(team(1, "FC Dallas"), 0.7)]);
    assert!(matches!(
      action,
      Action::NeedsReview { reason: ReviewReason::LowConfidence, .. }
    ));
  }

  #[test]
  fn history_outweighs_age() {
    let older = team(1, "FC Dallas");
    let mut newer = team(2, "FC Dallas");
    newer.created_at = older.created_at + Duration::days(30);
    assert_eq!(
      engine().choose_canonical((&older, 3), (&newer, 10)),
      (older.team_id_master, newer.team_id_master)
    );
    // 10 vs 6 is not a 2x lead, so age decides.
    assert_eq!(
      engine().choose_canonical((&older, 6), (&newer, 10)),
      (newer.team_id_master, older.team_id_master)
    );
  }

  #[test]
  fn sweep_proposes_each_duplicate_once() {
    let a = team(1, "FC Dallas");
    let mut b = team(2, "FC Dallas");
    b.created_at = a.created_at + Duration::days(1);
    let mut c = team(3, "FC Dallas");
    c.created_at = a.created_at + Duration::days(2);
    let mut girls = team(4, "FC Dallas");
    girls.gender = Gender::Female;

    let proposals = engine().find_duplicates(&[c.clone(), b.clone(), a.clone(), girls], &HashMap::new());
    assert_eq!(proposals.len(), 2);
    assert!(proposals.iter().all(|p| p.canonical_team_id == a.team_id_master));
    let deprecated: Vec<_> = proposals.iter().map(|p| p.deprecated_team_id).collect();
    assert!(deprecated.contains(&b.team_id_master));
    assert!(deprecated.contains(&c.team_id_master));
  }
}
