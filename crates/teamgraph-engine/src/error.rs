//! Error type for `teamgraph-engine`.
//!
//! Routing outcomes (ambiguous extraction, conflicts, no candidate) are
//! [`Action`](teamgraph_core::action::Action)s, not errors.

use std::time::Duration;

use teamgraph_core::merge::MergeRejection;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The canonical store failed. Safe to retry.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("merge rejected: {0}")]
  MergeRejected(#[from] MergeRejection),

  /// The caller stopped waiting; the merge itself either committed or
  /// rolled back.
  #[error("merge did not finish within {0:?}")]
  MergeTimeout(Duration),

  #[error("team not found: {0}")]
  TeamNotFound(Uuid),

  #[error("review item not found: {0}")]
  ReviewNotFound(Uuid),

  #[error("review item {0} is already resolved")]
  ReviewAlreadyResolved(Uuid),

  #[error("invalid resolution: {0}")]
  InvalidResolution(String),

  #[error("core error: {0}")]
  Core(#[from] teamgraph_core::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  /// Wrap a store error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::StoreUnavailable(Box::new(err))
  }

  /// Whether the batch runner should try the record again.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StoreUnavailable(_) | Self::MergeTimeout(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
