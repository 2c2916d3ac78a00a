//! Handlers for `/reviews` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reviews` | Optional `?status=open\|resolved` |
//! | `GET`  | `/reviews/:id` | Single review item |
//! | `POST` | `/reviews/:id/resolve` | Body: [`ResolveBody`]; `409` once resolved |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use teamgraph_core::{
  action::Action,
  review::{ReviewItem, ReviewState},
  store::CanonicalStore,
};
use teamgraph_engine::{Engine, Resolution};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If unset, every item is returned.
  pub status: Option<ReviewState>,
}

/// `GET /reviews[?status=open]`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReviewItem>>, ApiError>
where
  S: CanonicalStore + 'static,
{
  Ok(Json(engine.reviews().list(params.status).await?))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /reviews/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReviewItem>, ApiError>
where
  S: CanonicalStore + 'static,
{
  Ok(Json(engine.reviews().get(id).await?))
}

// ─── Resolve ──────────────────────────────────────────────────────────────────

/// The reviewer's answer, in the same shape as a decided action:
///
/// ```json
/// {"resolved_by": "alice", "action": "auto-link", "team_id": "..."}
/// ```
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub resolved_by: String,
  #[serde(flatten)]
  pub resolution:  Action,
}

/// `POST /reviews/:id/resolve`
pub async fn resolve<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<Resolution>, ApiError>
where
  S: CanonicalStore + 'static,
{
  if body.resolved_by.trim().is_empty() {
    return Err(ApiError::BadRequest("resolved_by must not be empty".into()));
  }
  let resolution = engine
    .reviews()
    .resolve(id, body.resolution, &body.resolved_by)
    .await?;
  Ok(Json(resolution))
}
