//! Decision outcomes. Automatic and reviewed decisions share this type, so
//! both run through the same execution path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Ambiguity;

/// A canonical team proposed for a record, with its match confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
  pub team_id_master: Uuid,
  pub confidence:     f64,
}

/// Why a record was routed to the review queue. Rendered into the `notes`
/// column of the batch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewReason {
  /// The extractor found conflicting tokens.
  ExtractionAmbiguous { ambiguities: Vec<Ambiguity> },
  /// A strong signal (gender, birth year) disagrees with the best candidate.
  ConflictDetected { fields: Vec<String>, corroborated: bool },
  /// Two or more candidates are too close to pick one.
  AmbiguousCandidates,
  /// The best candidate is above the floor but below the link threshold.
  LowConfidence,
  /// Gender or age is unknown, so a new team cannot be minted.
  InsufficientFields { missing: Vec<String> },
  /// The provider id was linked before and the link was rejected.
  AliasRejected,
  /// Enqueued directly by an operator.
  Manual { note: String },
}

impl std::fmt::Display for ReviewReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ExtractionAmbiguous { ambiguities } => {
        let parts: Vec<String> = ambiguities.iter().map(ToString::to_string).collect();
        write!(f, "ambiguous extraction: {}", parts.join("; "))
      }
      Self::ConflictDetected { fields, corroborated } => {
        write!(f, "{} conflict with best candidate", fields.join("+"))?;
        if *corroborated {
          f.write_str(" (club, branch and tier agree)")?;
        }
        Ok(())
      }
      Self::AmbiguousCandidates => f.write_str("multiple candidates within margin"),
      Self::LowConfidence => f.write_str("best candidate below auto-link threshold"),
      Self::InsufficientFields { missing } => {
        write!(f, "missing {} for a new team", missing.join(" and "))
      }
      Self::AliasRejected => f.write_str("existing alias was rejected"),
      Self::Manual { note } => f.write_str(note),
    }
  }
}

/// The classification of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
  AutoLink { team_id: Uuid },
  AutoMerge { deprecated_id: Uuid, canonical_id: Uuid },
  NeedsReview { candidates: Vec<ScoredMatch>, reason: ReviewReason },
  CreateNew,
}

impl Action {
  /// The label written to the `action` column.
  pub fn label(&self) -> &'static str {
    match self {
      Self::AutoLink { .. } => "auto-link",
      Self::AutoMerge { .. } => "auto-merge",
      Self::NeedsReview { .. } => "needs-review",
      Self::CreateNew => "create-new",
    }
  }

  pub fn is_review(&self) -> bool { matches!(self, Self::NeedsReview { .. }) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn action_serializes_with_kebab_tag() {
    let id = Uuid::nil();
    let json = serde_json::to_value(Action::AutoLink { team_id: id }).unwrap();
    assert_eq!(json["action"], "auto-link");
    let back: Action = serde_json::from_value(json).unwrap();
    assert_eq!(back, Action::AutoLink { team_id: id });
    assert_eq!(Action::CreateNew.label(), "create-new");
  }

  #[test]
  fn conflict_reason_names_fields() {
    let reason = ReviewReason::ConflictDetected {
      fields:       vec!["gender".into()],
      corroborated: false,
    };
    assert_eq!(reason.to_string(), "gender conflict with best candidate");
  }
}
