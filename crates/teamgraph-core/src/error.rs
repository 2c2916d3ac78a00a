//! Error types for `teamgraph-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("confidence {0} is outside [0, 1]")]
  ConfidenceOutOfRange(f64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
