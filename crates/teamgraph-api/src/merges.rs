//! Handlers for `/merges` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/merges` | The merge log, oldest first |
//! | `POST` | `/merges` | Body: [`MergeRequest`]; idempotent |

use std::sync::Arc;

use axum::{Json, extract::State};
use teamgraph_core::{
  merge::{MergeRecord, MergeRequest, MergeResult},
  store::CanonicalStore,
};
use teamgraph_engine::{Engine, Error};

use crate::error::ApiError;

/// `GET /merges`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<Vec<MergeRecord>>, ApiError>
where
  S: CanonicalStore + 'static,
{
  let merges = engine.store().list_merges().await.map_err(Error::store)?;
  Ok(Json(merges))
}

/// `POST /merges`
///
/// Repeating a merge that already happened returns `200` with
/// `games_affected: 0` and `already_applied: true`.
pub async fn execute<S>(
  State(engine): State<Arc<Engine<S>>>,
  Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResult>, ApiError>
where
  S: CanonicalStore + 'static,
{
  if req.merged_by.trim().is_empty() {
    return Err(ApiError::BadRequest("merged_by must not be empty".into()));
  }
  let result = engine.merges().execute(req).await?;
  Ok(Json(result))
}
