//! [`MergeExecutor`] serializes merges per set of team ids and bounds how
//! long a caller waits for one.

use std::{sync::Arc, time::Duration};

use teamgraph_core::{
  merge::{MergeOutcome, MergeRejection, MergeRequest, MergeResult},
  store::CanonicalStore,
};
use uuid::Uuid;

use crate::{Error, Result, lock::LockTable};

pub struct MergeExecutor<S> {
  store:   Arc<S>,
  locks:   Arc<LockTable<Uuid>>,
  timeout: Duration,
}

impl<S> Clone for MergeExecutor<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      locks:   Arc::clone(&self.locks),
      timeout: self.timeout,
    }
  }
}

impl<S: CanonicalStore> MergeExecutor<S> {
  pub fn new(store: Arc<S>, locks: Arc<LockTable<Uuid>>, timeout: Duration) -> Self {
    Self { store, locks, timeout }
  }

  /// Apply `request` atomically.
  ///
  /// Locks the two teams and their current terminals, so merges over
  /// disjoint teams run in parallel while overlapping ones queue. Terminals
  /// are resolved again once the locks are held and the wait restarts if
  /// they moved. Exceeding
  /// the timeout abandons the wait only; the store transaction has either
  /// committed or rolled back, and the request can be retried.
  pub async fn execute(&self, request: MergeRequest) -> Result<MergeResult> {
    let deprecated = request.deprecated_team_id;
    let canonical = request.canonical_team_id;

    let outcome = tokio::time::timeout(self.timeout, async {
      loop {
        let terminals = (self.terminal(deprecated).await?, self.terminal(canonical).await?);
        let _guard = self
          .locks
          .acquire([deprecated, canonical, terminals.0, terminals.1])
          .await;
        // A merge that finished while we waited may have moved a terminal.
        if (self.terminal(deprecated).await?, self.terminal(canonical).await?) != terminals {
          continue;
        }
        break self.store.execute_merge(request).await.map_err(Error::store);
      }
    })
    .await
    .map_err(|_| Error::MergeTimeout(self.timeout))??;

    match outcome {
      MergeOutcome::Merged(result) => {
        if result.already_applied {
          tracing::debug!(%deprecated, canonical = %result.canonical_team_id, "merge already applied");
        } else {
          tracing::info!(
            %deprecated,
            canonical = %result.canonical_team_id,
            games = result.games_affected,
            aliases = result.aliases_redirected,
            "merged teams",
          );
        }
        Ok(result)
      }
      MergeOutcome::Rejected(rejection) => {
        tracing::warn!(%deprecated, %canonical, %rejection, "merge rejected");
        Err(Error::MergeRejected(rejection))
      }
    }
  }

  async fn terminal(&self, team_id: Uuid) -> Result<Uuid> {
    self
      .store
      .resolve_team(team_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::MergeRejected(MergeRejection::TeamNotFound { team_id }))
  }
}
