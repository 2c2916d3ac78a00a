//! Merge requests, their audit trail, and the external game facts a merge
//! redirects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─── Games ───────────────────────────────────────────────────────────────────

/// A recorded game, owned by the ranking system. Merges rewrite only the two
/// team foreign keys; `game_uid` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFact {
  pub id:                  Uuid,
  pub game_uid:            String,
  pub home_team_master_id: Uuid,
  pub away_team_master_id: Uuid,
  pub played_on:           Option<NaiveDate>,
  pub home_score:          Option<u16>,
  pub away_score:          Option<u16>,
}

/// Input to [`crate::store::CanonicalStore::insert_game`].
#[derive(Debug, Clone)]
pub struct NewGame {
  pub game_uid:            String,
  pub home_team_master_id: Uuid,
  pub away_team_master_id: Uuid,
  pub played_on:           Option<NaiveDate>,
  pub home_score:          Option<u16>,
  pub away_score:          Option<u16>,
}

impl NewGame {
  pub fn new(game_uid: impl Into<String>, home: Uuid, away: Uuid) -> Self {
    Self {
      game_uid:            game_uid.into(),
      home_team_master_id: home,
      away_team_master_id: away,
      played_on:           None,
      home_score:          None,
      away_score:          None,
    }
  }
}

// ─── Merge requests ──────────────────────────────────────────────────────────

/// An approved request to fold `deprecated_team_id` into
/// `canonical_team_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
  pub deprecated_team_id: Uuid,
  pub canonical_team_id:  Uuid,
  pub merged_by:          String,
  pub reason:             String,
}

/// Append-only audit entry for an applied merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
  pub merge_id:           Uuid,
  pub deprecated_team_id: Uuid,
  pub canonical_team_id:  Uuid,
  pub merged_at:          DateTime<Utc>,
  pub merged_by:          String,
  pub reason:             String,
  pub games_affected:     u64,
  pub aliases_redirected: u64,
}

/// Result of a successful (or already applied) merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
  pub deprecated_team_id: Uuid,
  /// The terminal canonical id the merge resolved to.
  pub canonical_team_id:  Uuid,
  pub games_affected:     u64,
  pub aliases_redirected: u64,
  /// `true` when an earlier merge already did the work.
  pub already_applied:    bool,
}

/// Why a merge was refused. A rejected merge leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeRejection {
  #[error("cannot merge team {team_id} into itself")]
  SelfMerge { team_id: Uuid },

  #[error("team not found: {team_id}")]
  TeamNotFound { team_id: Uuid },

  #[error("team {team_id} was already merged into {into}")]
  AlreadyMerged { team_id: Uuid, into: Uuid },

  #[error("merging {deprecated} into {canonical} would form a cycle")]
  Cycle { deprecated: Uuid, canonical: Uuid },
}

/// What [`crate::store::CanonicalStore::execute_merge`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
  Merged(MergeResult),
  Rejected(MergeRejection),
}
