//! Subcommand implementations. Results go to stdout as JSON; progress and
//! diagnostics go to the log on stderr.

use std::{fs::File, io, path::Path};

use anyhow::Context as _;
use serde::Serialize;
use teamgraph_core::{action::Action, identity::AliasStatus, review::ReviewState};
use teamgraph_engine::{Engine, csv_io};
use teamgraph_store_sqlite::SqliteStore;
use uuid::Uuid;

type TeamEngine = Engine<SqliteStore>;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn create(path: &Path) -> anyhow::Result<io::BufWriter<File>> {
  let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
  Ok(io::BufWriter::new(file))
}

// ─── Batch ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct BatchSummary {
  records:      usize,
  auto_link:    usize,
  auto_merge:   usize,
  create_new:   usize,
  needs_review: usize,
  requeued:     usize,
}

pub async fn process(
  engine: &TeamEngine,
  input: &Path,
  output: &Path,
  review_queue: &Path,
  requeue: &Path,
) -> anyhow::Result<()> {
  let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
  let records = csv_io::read_records(file)
    .with_context(|| format!("failed to read records from {}", input.display()))?;
  tracing::info!(records = records.len(), input = %input.display(), "processing batch");

  let report = engine.pipeline().run_batch(records).await;

  csv_io::write_outcomes(create(output)?, &report.outcomes).context("failed to write output")?;
  csv_io::write_review_queue(create(review_queue)?, &report.outcomes)
    .context("failed to write review queue")?;
  if !report.requeue.is_empty() {
    csv_io::write_records(create(requeue)?, report.requeue.iter().map(|failed| &failed.record))
      .context("failed to write requeue file")?;
    tracing::warn!(
      count = report.requeue.len(),
      path = %requeue.display(),
      "some records failed and were written for requeueing",
    );
  }

  print_json(&BatchSummary {
    records:      report.outcomes.len() + report.requeue.len(),
    auto_link:    report.count("auto-link"),
    auto_merge:   report.count("auto-merge"),
    create_new:   report.count("create-new"),
    needs_review: report.count("needs-review"),
    requeued:     report.requeue.len(),
  })
}

pub async fn import_games(engine: &TeamEngine, input: &Path) -> anyhow::Result<()> {
  let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
  let rows = csv_io::read_games(file)
    .with_context(|| format!("failed to read games from {}", input.display()))?;
  print_json(&engine.import_games(rows).await?)
}

// ─── Reviews ──────────────────────────────────────────────────────────────────

pub async fn list_reviews(engine: &TeamEngine, status: Option<ReviewState>) -> anyhow::Result<()> {
  for item in engine.reviews().list(status).await? {
    println!("{}", serde_json::to_string(&item)?);
  }
  Ok(())
}

pub async fn export_reviews(engine: &TeamEngine, output: &Path, status: ReviewState) -> anyhow::Result<()> {
  let written = engine
    .reviews()
    .export(create(output)?, Some(status))
    .await
    .context("failed to export review queue")?;
  tracing::info!(written, path = %output.display(), "exported review items");
  Ok(())
}

pub async fn resolve_review(
  engine: &TeamEngine,
  review_id: Uuid,
  answer: Action,
  by: &str,
) -> anyhow::Result<()> {
  let resolution = engine
    .reviews()
    .resolve(review_id, answer, by)
    .await
    .with_context(|| format!("failed to resolve review {review_id}"))?;
  print_json(&resolution)
}

// ─── Identity ─────────────────────────────────────────────────────────────────

pub async fn merge(
  engine: &TeamEngine,
  deprecated: Uuid,
  canonical: Uuid,
  by: &str,
  reason: &str,
) -> anyhow::Result<()> {
  let result = engine
    .execute_team_merge(deprecated, canonical, by, reason)
    .await
    .with_context(|| format!("failed to merge {deprecated} into {canonical}"))?;
  print_json(&result)
}

pub async fn lookup(engine: &TeamEngine, provider: &str, provider_team_id: &str) -> anyhow::Result<()> {
  match engine.lookup(provider, provider_team_id).await? {
    Some(team_id) => {
      println!("{team_id}");
      Ok(())
    }
    None => anyhow::bail!("no active alias for {provider}/{provider_team_id}"),
  }
}

pub async fn set_alias_status(
  engine: &TeamEngine,
  provider: &str,
  provider_team_id: &str,
  status: AliasStatus,
) -> anyhow::Result<()> {
  let alias = engine
    .set_alias_status(provider, provider_team_id, status)
    .await?
    .with_context(|| format!("alias {provider}/{provider_team_id} not found"))?;
  print_json(&alias)
}

pub async fn dedupe(engine: &TeamEngine, apply: bool, by: &str) -> anyhow::Result<()> {
  let proposals = engine.find_duplicates().await?;
  tracing::info!(proposals = proposals.len(), apply, "duplicate sweep");
  if apply {
    print_json(&engine.apply_duplicates(&proposals, by).await?)
  } else {
    print_json(&proposals)
  }
}
