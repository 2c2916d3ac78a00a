//! `teamgraph` — batch team resolution and the HTTP server.
//!
//! # Usage
//!
//! ```text
//! teamgraph process teams.csv --output resolved.csv --review-queue review.csv
//! teamgraph reviews list --status open
//! teamgraph reviews resolve <review-id> --by alice link <team-id>
//! teamgraph merge <deprecated-id> <canonical-id> --by alice --reason "duplicate"
//! teamgraph dedupe --apply
//! teamgraph serve
//! ```

mod commands;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use teamgraph_core::{identity::AliasStatus, review::ReviewState};
use teamgraph_engine::Engine;
use teamgraph_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use settings::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "teamgraph", version, about = "Canonical team identity resolution")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "teamgraph.toml")]
  config: PathBuf,

  /// Override `store_path` from the configuration.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Resolve a CSV of raw team records.
  Process {
    /// Input CSV (`provider_id,provider_record_id,raw_name,...`).
    input:        PathBuf,
    /// Where to write one output row per record.
    #[arg(short, long, default_value = "resolved.csv")]
    output:       PathBuf,
    /// Where to write the `needs-review` rows.
    #[arg(long, default_value = "review_queue.csv")]
    review_queue: PathBuf,
    /// Where to write records that failed after every retry.
    #[arg(long, default_value = "requeue.csv")]
    requeue:      PathBuf,
  },

  /// Inspect and resolve the persisted review queue.
  Reviews {
    #[command(subcommand)]
    command: ReviewCommand,
  },

  /// Fold one team into another.
  Merge {
    deprecated: Uuid,
    canonical:  Uuid,
    #[arg(long)]
    by:         String,
    #[arg(long, default_value = "manual merge")]
    reason:     String,
  },

  /// Print the current team of a provider team id.
  Lookup { provider: String, provider_team_id: String },

  /// Change the audit status of an alias.
  Alias {
    provider:         String,
    provider_team_id: String,
    status:           AliasStatus,
  },

  /// Find duplicate teams, and merge them with `--apply`.
  Dedupe {
    #[arg(long)]
    apply: bool,
    #[arg(long, default_value = "duplicate-sweep")]
    by:    String,
  },

  /// Import provider games, resolving both teams through their aliases.
  ImportGames { input: PathBuf },

  /// Serve the JSON API.
  Serve,
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
  /// Print review items as JSON lines.
  List {
    #[arg(long)]
    status: Option<ReviewState>,
  },
  /// Write review items as CSV.
  Export {
    #[arg(short, long, default_value = "review_queue.csv")]
    output: PathBuf,
    #[arg(long, default_value = "open")]
    status: ReviewState,
  },
  /// Answer an open review item.
  Resolve {
    review_id: Uuid,
    #[arg(long)]
    by:        String,
    #[command(subcommand)]
    answer:    Answer,
  },
}

/// A reviewer's answer.
#[derive(Subcommand, Debug, Clone, Copy)]
enum Answer {
  /// Link the record to an existing team.
  Link { team_id: Uuid },
  /// Merge two teams and link the record to the canonical one.
  Merge { deprecated: Uuid, canonical: Uuid },
  /// Create a new team from the record.
  CreateNew,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut settings = Settings::load(&cli.config)?;
  if let Some(store) = cli.store {
    settings.store_path = store;
  }

  let store_path = settings.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let engine = Arc::new(Engine::new(Arc::new(store), settings.engine_config()));

  match cli.command {
    Command::Process { input, output, review_queue, requeue } => {
      commands::process(&engine, &input, &output, &review_queue, &requeue).await
    }
    Command::Reviews { command } => match command {
      ReviewCommand::List { status } => commands::list_reviews(&engine, status).await,
      ReviewCommand::Export { output, status } => {
        commands::export_reviews(&engine, &output, status).await
      }
      ReviewCommand::Resolve { review_id, by, answer } => {
        commands::resolve_review(&engine, review_id, answer.into(), &by).await
      }
    },
    Command::Merge { deprecated, canonical, by, reason } => {
      commands::merge(&engine, deprecated, canonical, &by, &reason).await
    }
    Command::Lookup { provider, provider_team_id } => {
      commands::lookup(&engine, &provider, &provider_team_id).await
    }
    Command::Alias { provider, provider_team_id, status } => {
      commands::set_alias_status(&engine, &provider, &provider_team_id, status).await
    }
    Command::Dedupe { apply, by } => commands::dedupe(&engine, apply, &by).await,
    Command::ImportGames { input } => commands::import_games(&engine, &input).await,
    Command::Serve => serve(engine, &settings.address()).await,
  }
}

impl From<Answer> for teamgraph_core::action::Action {
  fn from(answer: Answer) -> Self {
    match answer {
      Answer::Link { team_id } => Self::AutoLink { team_id },
      Answer::Merge { deprecated, canonical } => {
        Self::AutoMerge { deprecated_id: deprecated, canonical_id: canonical }
      }
      Answer::CreateNew => Self::CreateNew,
    }
  }
}

async fn serve(engine: Arc<Engine<SqliteStore>>, address: &str) -> anyhow::Result<()> {
  let app = teamgraph_api::api_router(engine);

  tracing::info!("Listening on http://{address}");
  let listener = tokio::net::TcpListener::bind(address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("server error")?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn resolve_parses_a_link_answer() {
    let team = Uuid::new_v4();
    let review = Uuid::new_v4();
    let (team_arg, review_arg) = (team.to_string(), review.to_string());
    let cli = Cli::try_parse_from([
      "teamgraph",
      "reviews",
      "resolve",
      review_arg.as_str(),
      "--by",
      "alice",
      "link",
      team_arg.as_str(),
    ])
    .unwrap();
    let Command::Reviews { command: ReviewCommand::Resolve { review_id, by, answer } } = cli.command
    else {
      panic!("expected reviews resolve");
    };
    assert_eq!(review_id, review);
    assert_eq!(by, "alice");
    assert_eq!(
      teamgraph_core::action::Action::from(answer),
      teamgraph_core::action::Action::AutoLink { team_id: team }
    );
  }

  #[test]
  fn alias_status_parses_lowercase() {
    let cli =
      Cli::try_parse_from(["teamgraph", "alias", "gotsport", "123", "rejected"]).unwrap();
    assert!(matches!(cli.command, Command::Alias { status: AliasStatus::Rejected, .. }));
  }
}
