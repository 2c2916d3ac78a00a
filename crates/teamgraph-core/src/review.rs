//! Review queue items.
//!
//! An item moves `open → resolved` exactly once. A resolution that later
//! proves wrong is corrected by a fresh merge or relink, never by editing
//! the item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  action::{Action, ReviewReason, ScoredMatch},
  record::{ExtractedFields, RawRecord},
};

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
pub enum ReviewState {
  Open,
  Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
  pub review_id:         Uuid,
  pub record:            RawRecord,
  pub fields:            ExtractedFields,
  /// Ordered by descending confidence.
  pub candidate_matches: Vec<ScoredMatch>,
  pub reason:            ReviewReason,
  pub status:            ReviewState,
  pub notes:             String,
  pub created_at:        DateTime<Utc>,
  pub resolved_at:       Option<DateTime<Utc>>,
  pub resolved_by:       Option<String>,
  pub resolution:        Option<Action>,
}

/// Input to [`crate::store::CanonicalStore::enqueue_review`].
#[derive(Debug, Clone)]
pub struct NewReviewItem {
  pub record:            RawRecord,
  pub fields:            ExtractedFields,
  pub candidate_matches: Vec<ScoredMatch>,
  pub reason:            ReviewReason,
}

impl NewReviewItem {
  /// Notes default to the rendered reason.
  pub fn notes(&self) -> String { self.reason.to_string() }
}
