//! Layered runtime settings: defaults, then `teamgraph.toml`, then
//! `TEAMGRAPH_*` environment variables (`__` separates nested keys, e.g.
//! `TEAMGRAPH_THRESHOLDS__AUTO_LINK=0.9`).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;
use teamgraph_core::season::Season;
use teamgraph_engine::{EngineConfig, Thresholds};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path:         PathBuf,
  pub host:               String,
  pub port:               u16,
  pub workers:            usize,
  pub max_retries:        u32,
  pub retry_backoff_ms:   u64,
  pub merge_timeout_secs: u64,
  /// Season used for age and birth-year conversion. Defaults to the season
  /// containing today.
  pub season_end_year:    Option<i32>,
  pub thresholds:         Thresholds,
}

impl Default for Settings {
  fn default() -> Self {
    let engine = EngineConfig::default();
    Self {
      store_path:         PathBuf::from("teamgraph.db"),
      host:               "127.0.0.1".to_string(),
      port:               8080,
      workers:            engine.workers,
      max_retries:        engine.max_retries,
      retry_backoff_ms:   100,
      merge_timeout_secs: engine.merge_timeout.as_secs(),
      season_end_year:    None,
      thresholds:         Thresholds::default(),
    }
  }
}

impl Settings {
  /// Load settings; a missing file is not an error.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TEAMGRAPH")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      season:        self.season_end_year.map_or_else(Season::current, Season::ending),
      thresholds:    self.thresholds,
      workers:       self.workers.max(1),
      max_retries:   self.max_retries,
      retry_backoff: Duration::from_millis(self.retry_backoff_ms),
      merge_timeout: Duration::from_secs(self.merge_timeout_secs),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.store_path, PathBuf::from("teamgraph.db"));
    assert_eq!(settings.thresholds, Thresholds::default());
  }

  #[test]
  fn partial_file_overrides_only_what_it_names() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      "store_path = \"/tmp/tg.db\"\nseason_end_year = 2025\n\n[thresholds]\nauto_link = 0.9"
    )
    .unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.store_path, PathBuf::from("/tmp/tg.db"));
    assert_eq!(settings.thresholds.auto_link, 0.9);
    assert_eq!(settings.thresholds.auto_merge, Thresholds::default().auto_merge);
    assert_eq!(settings.port, 8080);

    let config = settings.engine_config();
    assert_eq!(config.season, Season::ending(2025));
    assert_eq!(config.merge_timeout, Duration::from_secs(30));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/tg/teamgraph.db")),
      PathBuf::from(home).join("tg/teamgraph.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
