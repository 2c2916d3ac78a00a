//! [`Engine`] wires the components over one store and exposes the
//! operations the CLI and HTTP surfaces call.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use teamgraph_core::{
  identity::{AliasMapping, AliasStatus},
  merge::{MergeRequest, MergeResult, NewGame},
  store::CanonicalStore,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  apply::Applier,
  config::EngineConfig,
  csv_io::GameRow,
  decision::MergeProposal,
  lock::LockTable,
  merge::MergeExecutor,
  pipeline::Pipeline,
  review::ReviewQueue,
};

/// Counts from a game import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameImport {
  pub inserted:   usize,
  /// `game_uid`s already recorded by an earlier import.
  pub duplicates: Vec<String>,
  /// `game_uid`s whose home or away provider id has no active alias.
  pub unresolved: Vec<String>,
}

pub struct Engine<S> {
  store:    Arc<S>,
  config:   EngineConfig,
  merges:   MergeExecutor<S>,
  pipeline: Pipeline<S>,
  reviews:  ReviewQueue<S>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      config:   self.config,
      merges:   self.merges.clone(),
      pipeline: self.pipeline.clone(),
      reviews:  self.reviews.clone(),
    }
  }
}

impl<S: CanonicalStore> Engine<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
    let team_locks = Arc::new(LockTable::new());
    let merges = MergeExecutor::new(Arc::clone(&store), team_locks, config.merge_timeout);
    let applier = Applier::new(Arc::clone(&store), merges.clone(), config.season);
    Self {
      pipeline: Pipeline::new(Arc::clone(&store), applier.clone(), config),
      reviews: ReviewQueue::new(Arc::clone(&store), applier),
      merges,
      store,
      config,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn pipeline(&self) -> &Pipeline<S> { &self.pipeline }

  pub fn reviews(&self) -> &ReviewQueue<S> { &self.reviews }

  pub fn merges(&self) -> &MergeExecutor<S> { &self.merges }

  /// The current terminal team of a provider team id.
  pub async fn lookup(&self, provider_id: &str, provider_team_id: &str) -> Result<Option<Uuid>> {
    self
      .store
      .resolve_alias(provider_id, provider_team_id)
      .await
      .map_err(Error::store)
  }

  /// Approve or reject an alias. A rejected alias stops resolving and the
  /// next time its record arrives it goes to review.
  pub async fn set_alias_status(
    &self,
    provider_id: &str,
    provider_team_id: &str,
    status: AliasStatus,
  ) -> Result<Option<AliasMapping>> {
    let alias = self
      .store
      .set_alias_status(provider_id, provider_team_id, status)
      .await
      .map_err(Error::store)?;
    if alias.is_some() {
      tracing::info!(provider_id, provider_team_id, %status, "alias status changed");
    }
    Ok(alias)
  }

  /// Fold `deprecated` into `canonical`, returning the redirect counts.
  pub async fn execute_team_merge(
    &self,
    deprecated: Uuid,
    canonical: Uuid,
    merged_by: &str,
    reason: &str,
  ) -> Result<MergeResult> {
    self
      .merges
      .execute(MergeRequest {
        deprecated_team_id: deprecated,
        canonical_team_id:  canonical,
        merged_by:          merged_by.to_owned(),
        reason:             reason.to_owned(),
      })
      .await
  }

  /// Duplicate pairs among the live teams.
  pub async fn find_duplicates(&self) -> Result<Vec<MergeProposal>> {
    let teams = self.store.list_teams(None, false).await.map_err(Error::store)?;
    let mut game_counts = HashMap::with_capacity(teams.len());
    for team in &teams {
      let count = self
        .store
        .count_games(team.team_id_master)
        .await
        .map_err(Error::store)?;
      game_counts.insert(team.team_id_master, count);
    }
    Ok(self.pipeline.decisions().find_duplicates(&teams, &game_counts))
  }

  /// Execute proposals in order. A proposal rejected because an earlier one
  /// already moved its teams is skipped.
  pub async fn apply_duplicates(
    &self,
    proposals: &[MergeProposal],
    merged_by: &str,
  ) -> Result<Vec<MergeResult>> {
    let mut applied = Vec::new();
    for proposal in proposals {
      let reason = format!("duplicate sweep (name similarity {:.4})", proposal.name_similarity);
      match self
        .execute_team_merge(
          proposal.deprecated_team_id,
          proposal.canonical_team_id,
          merged_by,
          &reason,
        )
        .await
      {
        Ok(result) => applied.push(result),
        Err(Error::MergeRejected(rejection)) => {
          tracing::warn!(%rejection, "skipping duplicate proposal");
        }
        Err(err) => return Err(err),
      }
    }
    Ok(applied)
  }

  /// Insert provider games, resolving both teams through their aliases.
  /// Games already recorded are skipped, so a file can be imported again.
  pub async fn import_games(&self, rows: Vec<GameRow>) -> Result<GameImport> {
    let mut report = GameImport::default();
    for row in rows {
      let home = self.lookup(&row.provider_id, &row.home_provider_id).await?;
      let away = self.lookup(&row.provider_id, &row.away_provider_id).await?;
      let (Some(home), Some(away)) = (home, away) else {
        tracing::warn!(game_uid = %row.game_uid, "game references an unknown team");
        report.unresolved.push(row.game_uid);
        continue;
      };
      let game = NewGame {
        played_on: row.played_on,
        home_score: row.home_score,
        away_score: row.away_score,
        ..NewGame::new(row.game_uid, home, away)
      };
      let uid = game.game_uid.clone();
      match self.store.insert_game(game).await.map_err(Error::store)? {
        Some(_) => report.inserted += 1,
        None => {
          tracing::debug!(game_uid = %uid, "game already recorded");
          report.duplicates.push(uid);
        }
      }
    }
    Ok(report)
  }
}
