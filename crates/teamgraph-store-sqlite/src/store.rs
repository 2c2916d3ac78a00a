//! [`SqliteStore`] — the SQLite implementation of [`CanonicalStore`].

use std::{
  collections::{HashMap, HashSet},
  path::Path,
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use teamgraph_core::{
  action::Action,
  identity::{
    AliasMapping, AliasStatus, CanonicalClub, CanonicalTeam, NewAlias, NewClub,
    NewTeam,
  },
  merge::{
    GameFact, MergeOutcome, MergeRecord, MergeRejection, MergeRequest, MergeResult,
    NewGame,
  },
  review::{NewReviewItem, ReviewItem, ReviewState},
  store::CanonicalStore,
};

use crate::{
  Error, Result,
  encode::{
    ALIAS_COLUMNS, GAME_COLUMNS, MERGE_COLUMNS, REVIEW_COLUMNS, RawAlias, RawClub,
    RawGame, RawMerge, RawReview, RawTeam, TEAM_COLUMNS, decode_uuid, encode_date,
    encode_dt, encode_uuid, read_alias, read_game, read_merge, read_review, read_team,
  },
  schema::SCHEMA,
};

const UPSERT_ALIAS: &str = "
  INSERT INTO aliases (
    provider_id, provider_team_id, team_id, match_method,
    confidence, review_status, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
  ON CONFLICT (provider_id, provider_team_id) DO UPDATE SET
    team_id       = excluded.team_id,
    match_method  = excluded.match_method,
    confidence    = excluded.confidence,
    review_status = excluded.review_status,
    updated_at    = excluded.updated_at";

fn now_str() -> String { encode_dt(Utc::now()) }

// ─── Transaction helpers ─────────────────────────────────────────────────────

fn team_exists(conn: &rusqlite::Connection, team_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM teams WHERE team_id = ?1",
        rusqlite::params![team_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Follow the merge chain from `team_id` to the team it finally resolves to.
fn terminal_of(conn: &rusqlite::Connection, team_id: &str) -> rusqlite::Result<String> {
  let mut current = team_id.to_owned();
  let mut seen = HashSet::new();
  while seen.insert(current.clone()) {
    let next: Option<String> = conn
      .query_row(
        "SELECT canonical_team_id FROM merges WHERE deprecated_team_id = ?1",
        rusqlite::params![current],
        |r| r.get(0),
      )
      .optional()?;
    match next {
      Some(next) => current = next,
      None => break,
    }
  }
  Ok(current)
}

fn upsert_alias(
  conn: &rusqlite::Connection,
  team_id: &str,
  alias: &NewAlias,
  at: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    UPSERT_ALIAS,
    rusqlite::params![
      alias.provider_id,
      alias.provider_team_id,
      team_id,
      alias.match_method.as_ref(),
      alias.confidence,
      alias.review_status.as_ref(),
      at,
    ],
  )?;
  Ok(())
}

/// What happened inside the merge transaction, before UUID decoding.
enum RawMergeOutcome {
  Merged {
    canonical:       String,
    games:           i64,
    aliases:         i64,
    already_applied: bool,
  },
  NotFound(String),
  AlreadyMerged(String),
  Cycle(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A canonical store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_review(&self, review_id: Uuid) -> Result<Option<ReviewItem>> {
    let id_str = encode_uuid(review_id);
    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REVIEW_COLUMNS} FROM review_items WHERE review_id = ?1"),
              rusqlite::params![id_str],
              read_review,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawReview::into_review).transpose()
  }
}

// ─── CanonicalStore impl ─────────────────────────────────────────────────────

impl CanonicalStore for SqliteStore {
  type Error = Error;

  // ── Clubs ─────────────────────────────────────────────────────────────────

  async fn create_club(&self, input: NewClub) -> Result<CanonicalClub> {
    let club_id = Uuid::new_v4();
    let id_str = encode_uuid(club_id);
    let at_str = now_str();
    let NewClub { display_name, aliases } = input;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO clubs (club_id, display_name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, display_name, at_str],
        )?;
        let mut stored = Vec::new();
        for alias in aliases {
          let inserted = tx.execute(
            "INSERT OR IGNORE INTO club_aliases (alias, club_id) VALUES (?1, ?2)",
            rusqlite::params![alias, id_str],
          )?;
          if inserted > 0 {
            stored.push(alias);
          }
        }
        tx.commit()?;
        Ok(RawClub {
          club_id: id_str,
          display_name,
          created_at: at_str,
          aliases: stored,
        })
      })
      .await?;

    raw.into_club()
  }

  async fn add_club_alias(&self, club_id: Uuid, alias: String) -> Result<()> {
    let id_str = encode_uuid(club_id);
    let found = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM clubs WHERE club_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          conn.execute(
            "INSERT OR IGNORE INTO club_aliases (alias, club_id) VALUES (?1, ?2)",
            rusqlite::params![alias, id_str],
          )?;
        }
        Ok(exists)
      })
      .await?;

    if !found {
      return Err(Error::ClubNotFound(club_id));
    }
    Ok(())
  }

  async fn get_club(&self, club_id: Uuid) -> Result<Option<CanonicalClub>> {
    let id_str = encode_uuid(club_id);
    let raw: Option<RawClub> = self
      .conn
      .call(move |conn| {
        let head: Option<(String, String)> = conn
          .query_row(
            "SELECT display_name, created_at FROM clubs WHERE club_id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((display_name, created_at)) = head else {
          return Ok(None);
        };
        let mut stmt =
          conn.prepare("SELECT alias FROM club_aliases WHERE club_id = ?1 ORDER BY alias")?;
        let aliases = stmt
          .query_map(rusqlite::params![id_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(Some(RawClub { club_id: id_str, display_name, created_at, aliases }))
      })
      .await?;

    raw.map(RawClub::into_club).transpose()
  }

  async fn list_clubs(&self) -> Result<Vec<CanonicalClub>> {
    let raws: Vec<RawClub> = self
      .conn
      .call(|conn| {
        let mut by_club: HashMap<String, Vec<String>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT club_id, alias FROM club_aliases ORDER BY alias")?;
        let pairs = stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for (club_id, alias) in pairs {
          by_club.entry(club_id).or_default().push(alias);
        }

        let mut stmt = conn.prepare(
          "SELECT club_id, display_name, created_at FROM clubs ORDER BY created_at, club_id",
        )?;
        let clubs = stmt
          .query_map([], |r| {
            Ok(RawClub {
              club_id:      r.get(0)?,
              display_name: r.get(1)?,
              created_at:   r.get(2)?,
              aliases:      Vec::new(),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(
          clubs
            .into_iter()
            .map(|mut club| {
              club.aliases = by_club.remove(&club.club_id).unwrap_or_default();
              club
            })
            .collect(),
        )
      })
      .await?;

    raws.into_iter().map(RawClub::into_club).collect()
  }

  // ── Teams ─────────────────────────────────────────────────────────────────

  async fn create_team(
    &self,
    input: NewTeam,
    alias: Option<NewAlias>,
  ) -> Result<(CanonicalTeam, Option<AliasMapping>)> {
    let now = Utc::now();
    let team = CanonicalTeam {
      team_id_master:  Uuid::new_v4(),
      club_id:         input.club_id,
      display_name:    input.display_name,
      normalized_name: input.normalized_name,
      age_group:       input.age_group,
      gender:          input.gender,
      birth_year:      input.birth_year,
      branch:          input.branch,
      tier:            input.tier,
      is_deprecated:   false,
      created_at:      now,
    };

    let team_id_str = encode_uuid(team.team_id_master);
    let club_id_str = encode_uuid(team.club_id);
    let at_str = encode_dt(now);
    let row = (
      team.display_name.clone(),
      team.normalized_name.clone(),
      team.age_group.clone(),
      team.gender.as_ref().to_owned(),
      team.birth_year,
      team.branch.clone(),
      team.tier.clone(),
    );
    let alias_row = alias.clone();

    let club_found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let club_exists = tx
          .query_row(
            "SELECT 1 FROM clubs WHERE club_id = ?1",
            rusqlite::params![club_id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !club_exists {
          return Ok(false);
        }
        let (display_name, normalized_name, age_group, gender, birth_year, branch, tier) = row;
        tx.execute(
          "INSERT INTO teams (
             team_id, club_id, display_name, normalized_name, age_group,
             gender, birth_year, branch, tier, is_deprecated, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)",
          rusqlite::params![
            team_id_str,
            club_id_str,
            display_name,
            normalized_name,
            age_group,
            gender,
            birth_year,
            branch,
            tier,
            at_str,
          ],
        )?;
        if let Some(alias) = &alias_row {
          upsert_alias(&tx, &team_id_str, alias, &at_str)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !club_found {
      return Err(Error::ClubNotFound(team.club_id));
    }

    let mapping = alias.map(|alias| AliasMapping {
      provider_id:      alias.provider_id,
      provider_team_id: alias.provider_team_id,
      team_id_master:   team.team_id_master,
      match_method:     alias.match_method,
      confidence:       alias.confidence,
      review_status:    alias.review_status,
      updated_at:       now,
    });
    Ok((team, mapping))
  }

  async fn get_team(&self, team_id: Uuid) -> Result<Option<CanonicalTeam>> {
    let id_str = encode_uuid(team_id);
    let raw: Option<RawTeam> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = ?1"),
              rusqlite::params![id_str],
              read_team,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTeam::into_team).transpose()
  }

  async fn list_teams(
    &self,
    club_id: Option<Uuid>,
    include_deprecated: bool,
  ) -> Result<Vec<CanonicalTeam>> {
    let club_str = club_id.map(encode_uuid);
    let raws: Vec<RawTeam> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TEAM_COLUMNS} FROM teams
           WHERE (?1 IS NULL OR club_id = ?1)
             AND (?2 OR is_deprecated = 0)
           ORDER BY created_at, team_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![club_str, include_deprecated], read_team)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTeam::into_team).collect()
  }

  async fn resolve_team(&self, team_id: Uuid) -> Result<Option<Uuid>> {
    let id_str = encode_uuid(team_id);
    let terminal: Option<String> = self
      .conn
      .call(move |conn| {
        if !team_exists(conn, &id_str)? {
          return Ok(None);
        }
        Ok(Some(terminal_of(conn, &id_str)?))
      })
      .await?;

    terminal.as_deref().map(decode_uuid).transpose()
  }

  // ── Aliases ───────────────────────────────────────────────────────────────

  async fn link_alias(&self, team_id: Uuid, alias: NewAlias) -> Result<AliasMapping> {
    let id_str = encode_uuid(team_id);
    let now = Utc::now();
    let at_str = encode_dt(now);
    let alias_row = alias.clone();

    let terminal: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !team_exists(&tx, &id_str)? {
          return Ok(None);
        }
        // Never point a fresh alias at a deprecated team.
        let terminal = terminal_of(&tx, &id_str)?;
        upsert_alias(&tx, &terminal, &alias_row, &at_str)?;
        tx.commit()?;
        Ok(Some(terminal))
      })
      .await?;

    let Some(terminal) = terminal else {
      return Err(Error::TeamNotFound(team_id));
    };

    Ok(AliasMapping {
      provider_id:      alias.provider_id,
      provider_team_id: alias.provider_team_id,
      team_id_master:   decode_uuid(&terminal)?,
      match_method:     alias.match_method,
      confidence:       alias.confidence,
      review_status:    alias.review_status,
      updated_at:       now,
    })
  }

  async fn get_alias(
    &self,
    provider_id: &str,
    provider_team_id: &str,
  ) -> Result<Option<AliasMapping>> {
    let provider = provider_id.to_owned();
    let provider_team = provider_team_id.to_owned();
    let raw: Option<RawAlias> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ALIAS_COLUMNS} FROM aliases
                 WHERE provider_id = ?1 AND provider_team_id = ?2"
              ),
              rusqlite::params![provider, provider_team],
              read_alias,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlias::into_alias).transpose()
  }

  async fn resolve_alias(
    &self,
    provider_id: &str,
    provider_team_id: &str,
  ) -> Result<Option<Uuid>> {
    let provider = provider_id.to_owned();
    let provider_team = provider_team_id.to_owned();
    let rejected = AliasStatus::Rejected.as_ref().to_owned();
    let terminal: Option<String> = self
      .conn
      .call(move |conn| {
        let team: Option<String> = conn
          .query_row(
            "SELECT team_id FROM aliases
             WHERE provider_id = ?1 AND provider_team_id = ?2 AND review_status != ?3",
            rusqlite::params![provider, provider_team, rejected],
            |r| r.get(0),
          )
          .optional()?;
        team.map(|team| terminal_of(conn, &team)).transpose().map_err(Into::into)
      })
      .await?;

    terminal.as_deref().map(decode_uuid).transpose()
  }

  async fn set_alias_status(
    &self,
    provider_id: &str,
    provider_team_id: &str,
    status: AliasStatus,
  ) -> Result<Option<AliasMapping>> {
    let provider = provider_id.to_owned();
    let provider_team = provider_team_id.to_owned();
    let status_str = status.as_ref().to_owned();
    let at_str = now_str();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE aliases SET review_status = ?3, updated_at = ?4
           WHERE provider_id = ?1 AND provider_team_id = ?2",
          rusqlite::params![provider, provider_team, status_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_alias(provider_id, provider_team_id).await
  }

  async fn list_aliases(&self, team_id: Uuid) -> Result<Vec<AliasMapping>> {
    let id_str = encode_uuid(team_id);
    let raws: Vec<RawAlias> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALIAS_COLUMNS} FROM aliases WHERE team_id = ?1
           ORDER BY provider_id, provider_team_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_alias)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlias::into_alias).collect()
  }

  // ── Merges ────────────────────────────────────────────────────────────────

  async fn execute_merge(&self, request: MergeRequest) -> Result<MergeOutcome> {
    let MergeRequest {
      deprecated_team_id: deprecated,
      canonical_team_id: canonical,
      merged_by,
      reason,
    } = request;

    if deprecated == canonical {
      return Ok(MergeOutcome::Rejected(MergeRejection::SelfMerge { team_id: deprecated }));
    }

    let deprecated_str = encode_uuid(deprecated);
    let canonical_str = encode_uuid(canonical);
    let merge_id_str = encode_uuid(Uuid::new_v4());
    let at_str = now_str();

    let raw = self
      .conn
      .call(move |conn| {
        // Dropping `tx` without commit rolls everything back.
        let tx = conn.transaction()?;

        for id in [&deprecated_str, &canonical_str] {
          if !team_exists(&tx, id)? {
            return Ok(RawMergeOutcome::NotFound(id.clone()));
          }
        }

        let target = terminal_of(&tx, &canonical_str)?;
        let source_terminal = terminal_of(&tx, &deprecated_str)?;
        if source_terminal != deprecated_str {
          return Ok(if source_terminal == target {
            RawMergeOutcome::Merged {
              canonical:       target,
              games:           0,
              aliases:         0,
              already_applied: true,
            }
          } else {
            RawMergeOutcome::AlreadyMerged(source_terminal)
          });
        }
        if target == deprecated_str {
          return Ok(RawMergeOutcome::Cycle(target));
        }

        tx.execute(
          "UPDATE teams SET is_deprecated = 1 WHERE team_id = ?1",
          rusqlite::params![deprecated_str],
        )?;
        let aliases = tx.execute(
          "UPDATE aliases SET team_id = ?2, updated_at = ?3 WHERE team_id = ?1",
          rusqlite::params![deprecated_str, target, at_str],
        )?;
        let games: i64 = tx.query_row(
          "SELECT COUNT(*) FROM games WHERE home_team_id = ?1 OR away_team_id = ?1",
          rusqlite::params![deprecated_str],
          |r| r.get(0),
        )?;
        tx.execute(
          "UPDATE games SET home_team_id = ?2 WHERE home_team_id = ?1",
          rusqlite::params![deprecated_str, target],
        )?;
        tx.execute(
          "UPDATE games SET away_team_id = ?2 WHERE away_team_id = ?1",
          rusqlite::params![deprecated_str, target],
        )?;
        let aliases = i64::try_from(aliases).unwrap_or(i64::MAX);
        tx.execute(
          &format!("INSERT INTO merges ({MERGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
          rusqlite::params![
            merge_id_str,
            deprecated_str,
            target,
            at_str,
            merged_by,
            reason,
            games,
            aliases,
          ],
        )?;
        tx.commit()?;

        Ok(RawMergeOutcome::Merged {
          canonical: target,
          games,
          aliases,
          already_applied: false,
        })
      })
      .await?;

    Ok(match raw {
      RawMergeOutcome::Merged { canonical, games, aliases, already_applied } => {
        MergeOutcome::Merged(MergeResult {
          deprecated_team_id: deprecated,
          canonical_team_id:  decode_uuid(&canonical)?,
          games_affected:     u64::try_from(games).unwrap_or_default(),
          aliases_redirected: u64::try_from(aliases).unwrap_or_default(),
          already_applied,
        })
      }
      RawMergeOutcome::NotFound(id) => {
        MergeOutcome::Rejected(MergeRejection::TeamNotFound { team_id: decode_uuid(&id)? })
      }
      RawMergeOutcome::AlreadyMerged(into) => MergeOutcome::Rejected(MergeRejection::AlreadyMerged {
        team_id: deprecated,
        into:    decode_uuid(&into)?,
      }),
      RawMergeOutcome::Cycle(_) => {
        MergeOutcome::Rejected(MergeRejection::Cycle { deprecated, canonical })
      }
    })
  }

  async fn list_merges(&self) -> Result<Vec<MergeRecord>> {
    let raws: Vec<RawMerge> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MERGE_COLUMNS} FROM merges ORDER BY merged_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], read_merge)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMerge::into_merge).collect()
  }

  // ── Games ─────────────────────────────────────────────────────────────────

  async fn insert_game(&self, input: NewGame) -> Result<Option<GameFact>> {
    let game = GameFact {
      id:                  Uuid::new_v4(),
      game_uid:            input.game_uid,
      home_team_master_id: input.home_team_master_id,
      away_team_master_id: input.away_team_master_id,
      played_on:           input.played_on,
      home_score:          input.home_score,
      away_score:          input.away_score,
    };

    let id_str = encode_uuid(game.id);
    let uid = game.game_uid.clone();
    let home_str = encode_uuid(game.home_team_master_id);
    let away_str = encode_uuid(game.away_team_master_id);
    let played_str = game.played_on.map(encode_date);
    let (home_score, away_score) = (game.home_score, game.away_score);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "INSERT INTO games ({GAME_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (game_uid) DO NOTHING"
          ),
          rusqlite::params![id_str, uid, home_str, away_str, played_str, home_score, away_score],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(game))
  }

  async fn list_games(&self, team_id: Uuid) -> Result<Vec<GameFact>> {
    let id_str = encode_uuid(team_id);
    let raws: Vec<RawGame> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GAME_COLUMNS} FROM games
           WHERE home_team_id = ?1 OR away_team_id = ?1
           ORDER BY played_on, game_uid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_game)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGame::into_game).collect()
  }

  async fn count_games(&self, team_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(team_id);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM games WHERE home_team_id = ?1 OR away_team_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }

  // ── Review queue ──────────────────────────────────────────────────────────

  /// Queue `input`, or refresh the open item already queued for the same
  /// provider record. A refreshed item keeps its id and creation time.
  async fn enqueue_review(&self, input: NewReviewItem) -> Result<ReviewItem> {
    let notes = input.notes();
    let id_str = encode_uuid(Uuid::new_v4());
    let provider = input.record.provider_id.clone();
    let provider_record = input.record.provider_record_id.clone();
    let record_json = serde_json::to_string(&input.record)?;
    let fields_json = serde_json::to_string(&input.fields)?;
    let candidates_json = serde_json::to_string(&input.candidate_matches)?;
    let reason_json = serde_json::to_string(&input.reason)?;
    let status_str = ReviewState::Open.as_ref().to_owned();
    let at_str = now_str();

    let raw: RawReview = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO review_items (
               review_id, provider_id, provider_record_id, record_json, fields_json,
               candidates_json, reason_json, status, notes, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (provider_id, provider_record_id) WHERE status = 'open'
             DO UPDATE SET
               record_json     = excluded.record_json,
               fields_json     = excluded.fields_json,
               candidates_json = excluded.candidates_json,
               reason_json     = excluded.reason_json,
               notes           = excluded.notes
             RETURNING {REVIEW_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            provider,
            provider_record,
            record_json,
            fields_json,
            candidates_json,
            reason_json,
            status_str,
            notes,
            at_str,
          ],
          read_review,
        )?)
      })
      .await?;

    raw.into_review()
  }

  async fn get_review(&self, review_id: Uuid) -> Result<Option<ReviewItem>> {
    self.fetch_review(review_id).await
  }

  async fn list_reviews(&self, status: Option<ReviewState>) -> Result<Vec<ReviewItem>> {
    let status_str = status.map(|s| s.as_ref().to_owned());
    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLUMNS} FROM review_items
           WHERE (?1 IS NULL OR status = ?1)
           ORDER BY created_at, review_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status_str], read_review)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }

  async fn close_review(
    &self,
    review_id: Uuid,
    resolution: Action,
    resolved_by: String,
  ) -> Result<Option<ReviewItem>> {
    let id_str = encode_uuid(review_id);
    let resolution_json = serde_json::to_string(&resolution)?;
    let resolved = ReviewState::Resolved.as_ref().to_owned();
    let open = ReviewState::Open.as_ref().to_owned();
    let at_str = now_str();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE review_items
           SET status = ?2, resolved_at = ?3, resolved_by = ?4, resolution_json = ?5
           WHERE review_id = ?1 AND status = ?6",
          rusqlite::params![id_str, resolved, at_str, resolved_by, resolution_json, open],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_review(review_id).await
  }

  async fn reopen_review(&self, review_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(review_id);
    let resolved = ReviewState::Resolved.as_ref().to_owned();
    let open = ReviewState::Open.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE review_items
           SET status = ?2, resolved_at = NULL, resolved_by = NULL, resolution_json = NULL
           WHERE review_id = ?1 AND status = ?3",
          rusqlite::params![id_str, open, resolved],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}
