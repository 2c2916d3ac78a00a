//! Handlers for `/teams` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/teams/:id` | Team row plus its terminal id and game count |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Serialize;
use teamgraph_core::{identity::CanonicalTeam, store::CanonicalStore};
use teamgraph_engine::{Engine, Error};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct TeamView {
  #[serde(flatten)]
  pub team:             CanonicalTeam,
  /// Equal to `team_id_master` unless the team was merged away.
  pub terminal_team_id: Uuid,
  pub game_count:       u64,
}

/// `GET /teams/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TeamView>, ApiError>
where
  S: CanonicalStore + 'static,
{
  let store = engine.store();
  let team = store
    .get_team(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| ApiError::NotFound(format!("team {id} not found")))?;
  let terminal_team_id = store.resolve_team(id).await.map_err(Error::store)?.unwrap_or(id);
  let game_count = store.count_games(terminal_team_id).await.map_err(Error::store)?;
  Ok(Json(TeamView { team, terminal_team_id, game_count }))
}
