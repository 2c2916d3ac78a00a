//! The per-record pipeline and the parallel batch runner.
//!
//! ```text
//! RawRecord ─ extract ─┬─ active alias ──────────────────────▶ auto-link
//!                      ├─ rejected alias ─ match ────────────▶ needs-review
//!                      └─ match ─ decide ─┬─ create-new ─ lock club ─ match ─ decide ─ apply
//!                                         └─ other ──────────────────────────────────  apply
//! ```

use std::{sync::Arc, time::Duration};

use teamgraph_core::{
  action::{Action, ReviewReason},
  record::{ExtractedFields, RawRecord},
  store::CanonicalStore,
};
use teamgraph_extract::Extractor;
use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

use crate::{
  Error, Result,
  apply::{Applier, Provenance},
  config::EngineConfig,
  decision::DecisionEngine,
  lock::LockTable,
  matcher::{Candidate, Matcher, club_key},
};

/// The result of processing one record; one row of the batch output.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
  pub record:     RawRecord,
  pub fields:     ExtractedFields,
  pub action:     Action,
  pub confidence: Option<f64>,
  pub club_id:    Option<Uuid>,
  pub team_id:    Option<Uuid>,
  pub review_id:  Option<Uuid>,
}

impl Outcome {
  /// Review notes; only review outcomes carry them.
  pub fn notes(&self) -> Option<String> {
    match &self.action {
      Action::NeedsReview { reason, .. } => Some(reason.to_string()),
      _ => None,
    }
  }
}

/// A record that still failed after every retry.
#[derive(Debug, Clone, PartialEq)]
pub struct Failed {
  pub record: RawRecord,
  pub error:  String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
  /// In input order.
  pub outcomes: Vec<Outcome>,
  /// Records to feed into the next run.
  pub requeue:  Vec<Failed>,
}

impl BatchReport {
  /// Number of outcomes whose action has `label` (`"auto-link"`, ...).
  pub fn count(&self, label: &str) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| o.action.label() == label)
      .count()
  }
}

pub struct Pipeline<S> {
  store:      Arc<S>,
  extractor:  Extractor,
  matcher:    Matcher,
  decisions:  DecisionEngine,
  applier:    Applier<S>,
  club_locks: Arc<LockTable<String>>,
  config:     EngineConfig,
}

impl<S> Clone for Pipeline<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      extractor:  self.extractor,
      matcher:    self.matcher,
      decisions:  self.decisions,
      applier:    self.applier.clone(),
      club_locks: Arc::clone(&self.club_locks),
      config:     self.config,
    }
  }
}

impl<S: CanonicalStore> Pipeline<S> {
  pub fn new(store: Arc<S>, applier: Applier<S>, config: EngineConfig) -> Self {
    Self {
      store,
      extractor: Extractor::new(config.season),
      matcher: Matcher::new(config.season, config.thresholds),
      decisions: DecisionEngine::new(config.season, config.thresholds),
      applier,
      club_locks: Arc::new(LockTable::new()),
      config,
    }
  }

  pub fn extractor(&self) -> &Extractor { &self.extractor }

  pub fn decisions(&self) -> &DecisionEngine { &self.decisions }

  /// Resolve one record and apply the decision.
  pub async fn process(&self, record: &RawRecord) -> Result<Outcome> {
    let fields = self.extractor.extract_record(record);

    let existing = self
      .store
      .get_alias(&record.provider_id, &record.provider_record_id)
      .await
      .map_err(Error::store)?;
    if let Some(alias) = existing {
      if alias.review_status.is_active() {
        return self.relink(record, fields, alias.team_id_master, alias.confidence).await;
      }
      let candidates = self.candidates(&fields, record).await?;
      let action = Action::NeedsReview {
        candidates: candidates.iter().map(Candidate::scored).collect(),
        reason:     ReviewReason::AliasRejected,
      };
      return self.apply(record, fields, action, &candidates).await;
    }

    let candidates = self.candidates(&fields, record).await?;
    let action = self.decisions.decide(&fields, &candidates);
    if action == Action::CreateNew {
      return self.create_new(record, fields).await;
    }
    self.apply(record, fields, action, &candidates).await
  }

  /// Process `records` on up to `workers` concurrent tasks. Store failures
  /// are retried with exponential backoff; records that still fail are
  /// returned for requeueing.
  pub async fn run_batch(&self, records: Vec<RawRecord>) -> BatchReport
  where
    S: 'static,
  {
    let workers = self.config.workers.max(1);
    let mut results: Vec<Option<Result<Outcome, String>>> = records.iter().map(|_| None).collect();
    let mut tasks = JoinSet::new();

    for (index, record) in records.iter().enumerate() {
      while tasks.len() >= workers {
        if let Some(joined) = tasks.join_next().await {
          collect(joined, &mut results);
        }
      }
      let pipeline = self.clone();
      let record = record.clone();
      tasks.spawn(async move { (index, pipeline.process_with_retry(&record).await) });
    }
    while let Some(joined) = tasks.join_next().await {
      collect(joined, &mut results);
    }

    let mut report = BatchReport::default();
    for (record, result) in records.into_iter().zip(results) {
      match result {
        Some(Ok(outcome)) => report.outcomes.push(outcome),
        Some(Err(error)) => report.requeue.push(Failed { record, error }),
        None => report.requeue.push(Failed {
          record,
          error: "worker task aborted".to_owned(),
        }),
      }
    }

    tracing::info!(
      records = report.outcomes.len() + report.requeue.len(),
      auto_link = report.count("auto-link"),
      auto_merge = report.count("auto-merge"),
      create_new = report.count("create-new"),
      needs_review = report.count("needs-review"),
      requeued = report.requeue.len(),
      "batch finished",
    );
    report
  }

  async fn process_with_retry(&self, record: &RawRecord) -> Result<Outcome> {
    let mut attempt = 0;
    loop {
      match self.process(record).await {
        Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
          let delay = backoff(self.config.retry_backoff, attempt);
          tracing::warn!(
            provider = %record.provider_id,
            record_id = %record.provider_record_id,
            attempt = attempt + 1,
            ?delay,
            error = %err,
            "retrying record",
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(err) => {
          tracing::warn!(
            provider = %record.provider_id,
            record_id = %record.provider_record_id,
            error = %err,
            "record failed, requeueing",
          );
          return Err(err);
        }
        Ok(outcome) => return Ok(outcome),
      }
    }
  }

  async fn candidates(&self, fields: &ExtractedFields, record: &RawRecord) -> Result<Vec<Candidate>> {
    self
      .matcher
      .find_candidates(fields, record.raw_club_name.as_deref(), self.store.as_ref())
      .await
  }

  /// Mint a new team while holding the club's lock. The match is redone
  /// under the lock: a worker that waited may now find the team another
  /// worker just created.
  async fn create_new(&self, record: &RawRecord, fields: ExtractedFields) -> Result<Outcome> {
    let key = club_key(&fields, record.raw_club_name.as_deref());
    let _guard = self.club_locks.acquire([key]).await;

    let candidates = self.candidates(&fields, record).await?;
    let action = self.decisions.decide(&fields, &candidates);
    self.apply(record, fields, action, &candidates).await
  }

  async fn relink(
    &self,
    record: &RawRecord,
    fields: ExtractedFields,
    team_id: Uuid,
    confidence: f64,
  ) -> Result<Outcome> {
    let team_id = self
      .store
      .resolve_team(team_id)
      .await
      .map_err(Error::store)?
      .unwrap_or(team_id);
    let club_id = self
      .store
      .get_team(team_id)
      .await
      .map_err(Error::store)?
      .map(|team| team.club_id);
    tracing::debug!(%team_id, record_id = %record.provider_record_id, "known alias");

    Ok(Outcome {
      record: record.clone(),
      fields,
      action: Action::AutoLink { team_id },
      confidence: Some(confidence),
      club_id,
      team_id: Some(team_id),
      review_id: None,
    })
  }

  async fn apply(
    &self,
    record: &RawRecord,
    fields: ExtractedFields,
    action: Action,
    candidates: &[Candidate],
  ) -> Result<Outcome> {
    let confidence = match action {
      Action::CreateNew => Some(1.0),
      _ => candidates.first().map(|c| c.confidence),
    };
    let applied = self
      .applier
      .apply(record, &fields, &action, confidence.unwrap_or(0.0), Provenance::Automatic)
      .await?;
    tracing::debug!(
      record_id = %record.provider_record_id,
      name = %record.raw_name,
      action = action.label(),
      ?confidence,
      "decided",
    );

    Ok(Outcome {
      record: record.clone(),
      fields,
      action,
      confidence,
      club_id: applied.club_id,
      team_id: applied.team_id,
      review_id: applied.review.map(|r| r.review_id),
    })
  }
}

fn collect(
  joined: Result<(usize, Result<Outcome>), JoinError>,
  results: &mut [Option<Result<Outcome, String>>],
) {
  match joined {
    Ok((index, result)) => results[index] = Some(result.map_err(|err| err.to_string())),
    Err(err) => tracing::warn!(error = %err, "worker task failed"),
  }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles() {
    let base = Duration::from_millis(100);
    assert_eq!(backoff(base, 0), base);
    assert_eq!(backoff(base, 3), Duration::from_millis(800));
  }
}
