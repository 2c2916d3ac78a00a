//! Error type for `teamgraph-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] teamgraph_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("team not found: {0}")]
  TeamNotFound(uuid::Uuid),

  #[error("club not found: {0}")]
  ClubNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
