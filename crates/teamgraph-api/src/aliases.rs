//! Handlers for `/aliases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/aliases/:provider/:id` | Terminal team of a provider team id |
//! | `POST` | `/aliases/:provider/:id/status` | Body: `{"status":"approved"\|"rejected"\|"pending"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use teamgraph_core::{
  identity::{AliasMapping, AliasStatus},
  store::CanonicalStore,
};
use teamgraph_engine::Engine;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Lookup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Resolved {
  pub provider_id:      String,
  pub provider_team_id: String,
  /// Always the current terminal team, never a deprecated one.
  pub team_id_master:   Uuid,
}

/// `GET /aliases/:provider/:id`
pub async fn resolve<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path((provider_id, provider_team_id)): Path<(String, String)>,
) -> Result<Json<Resolved>, ApiError>
where
  S: CanonicalStore + 'static,
{
  let team_id_master = engine
    .lookup(&provider_id, &provider_team_id)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no active alias for {provider_id}/{provider_team_id}"))
    })?;
  Ok(Json(Resolved { provider_id, provider_team_id, team_id_master }))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: AliasStatus,
}

/// `POST /aliases/:provider/:id/status`
pub async fn set_status<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path((provider_id, provider_team_id)): Path<(String, String)>,
  Json(body): Json<StatusBody>,
) -> Result<Json<AliasMapping>, ApiError>
where
  S: CanonicalStore + 'static,
{
  let alias = engine
    .set_alias_status(&provider_id, &provider_team_id, body.status)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("alias {provider_id}/{provider_team_id} not found")))?;
  Ok(Json(alias))
}
