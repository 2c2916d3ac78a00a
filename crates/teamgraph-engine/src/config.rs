//! Engine tuning knobs. Every field has a default so partial configuration
//! files deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use teamgraph_core::season::Season;

/// Score thresholds for the matcher and the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
  /// Minimum top score for an automatic link.
  pub auto_link:        f64,
  /// Minimum score of both candidates, and of their pairwise name
  /// similarity, for an automatic merge.
  pub auto_merge:       f64,
  /// Below this no candidate counts and a new team may be created.
  pub candidate_floor:  f64,
  /// Club similarities under this are discarded.
  pub club_floor:       f64,
  /// A runner-up this close to the top makes the match ambiguous.
  pub ambiguity_margin: f64,
  /// How many times more games one duplicate needs to win the tie-break.
  pub history_ratio:    f64,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      auto_link:        0.85,
      auto_merge:       0.90,
      candidate_floor:  0.50,
      club_floor:       0.40,
      ambiguity_margin: 0.05,
      history_ratio:    2.0,
    }
  }
}

/// Runtime configuration shared by the pipeline, the merge executor and the
/// review queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
  pub season:        Season,
  pub thresholds:    Thresholds,
  /// Records processed concurrently by [`crate::Pipeline::run_batch`].
  pub workers:       usize,
  /// Retries per record after a store failure.
  pub max_retries:   u32,
  /// Base delay between retries; doubled on every attempt.
  pub retry_backoff: Duration,
  pub merge_timeout: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      season:        Season::current(),
      thresholds:    Thresholds::default(),
      workers:       4,
      max_retries:   3,
      retry_backoff: Duration::from_millis(100),
      merge_timeout: Duration::from_secs(30),
    }
  }
}
