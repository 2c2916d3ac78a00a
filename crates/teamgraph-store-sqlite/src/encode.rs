//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase strings, enums use their lowercase names, and
//! nested review payloads are compact JSON.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use teamgraph_core::{
  identity::{AliasMapping, CanonicalClub, CanonicalTeam},
  merge::{GameFact, MergeRecord},
  review::ReviewItem,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width timestamps keep `ORDER BY created_at` chronological.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a lowercase enum column through its `FromStr` impl.
pub fn decode_variant<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    Error::Core(teamgraph_core::Error::UnknownVariant {
      kind,
      value: s.to_owned(),
    })
  })
}

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by [`read_team`], in order.
pub const TEAM_COLUMNS: &str = "team_id, club_id, display_name, normalized_name, age_group, \
                                gender, birth_year, branch, tier, is_deprecated, created_at";

/// Raw values read directly from a `teams` row.
pub struct RawTeam {
  pub team_id:         String,
  pub club_id:         String,
  pub display_name:    String,
  pub normalized_name: String,
  pub age_group:       String,
  pub gender:          String,
  pub birth_year:      Option<i32>,
  pub branch:          Option<String>,
  pub tier:            Option<String>,
  pub is_deprecated:   bool,
  pub created_at:      String,
}

pub fn read_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTeam> {
  Ok(RawTeam {
    team_id:         row.get(0)?,
    club_id:         row.get(1)?,
    display_name:    row.get(2)?,
    normalized_name: row.get(3)?,
    age_group:       row.get(4)?,
    gender:          row.get(5)?,
    birth_year:      row.get(6)?,
    branch:          row.get(7)?,
    tier:            row.get(8)?,
    is_deprecated:   row.get(9)?,
    created_at:      row.get(10)?,
  })
}

impl RawTeam {
  pub fn into_team(self) -> Result<CanonicalTeam> {
    Ok(CanonicalTeam {
      team_id_master:  decode_uuid(&self.team_id)?,
      club_id:         decode_uuid(&self.club_id)?,
      display_name:    self.display_name,
      normalized_name: self.normalized_name,
      age_group:       self.age_group,
      gender:          decode_variant("gender", &self.gender)?,
      birth_year:      self.birth_year,
      branch:          self.branch,
      tier:            self.tier,
      is_deprecated:   self.is_deprecated,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// A `clubs` row plus its aliases.
pub struct RawClub {
  pub club_id:      String,
  pub display_name: String,
  pub created_at:   String,
  pub aliases:      Vec<String>,
}

impl RawClub {
  pub fn into_club(self) -> Result<CanonicalClub> {
    Ok(CanonicalClub {
      club_id:      decode_uuid(&self.club_id)?,
      display_name: self.display_name,
      aliases:      self.aliases.into_iter().collect::<BTreeSet<_>>(),
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const ALIAS_COLUMNS: &str = "provider_id, provider_team_id, team_id, match_method, \
                                 confidence, review_status, updated_at";

pub struct RawAlias {
  pub provider_id:      String,
  pub provider_team_id: String,
  pub team_id:          String,
  pub match_method:     String,
  pub confidence:       f64,
  pub review_status:    String,
  pub updated_at:       String,
}

pub fn read_alias(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlias> {
  Ok(RawAlias {
    provider_id:      row.get(0)?,
    provider_team_id: row.get(1)?,
    team_id:          row.get(2)?,
    match_method:     row.get(3)?,
    confidence:       row.get(4)?,
    review_status:    row.get(5)?,
    updated_at:       row.get(6)?,
  })
}

impl RawAlias {
  pub fn into_alias(self) -> Result<AliasMapping> {
    Ok(AliasMapping {
      provider_id:      self.provider_id,
      provider_team_id: self.provider_team_id,
      team_id_master:   decode_uuid(&self.team_id)?,
      match_method:     decode_variant("match method", &self.match_method)?,
      confidence:       self.confidence,
      review_status:    decode_variant("review status", &self.review_status)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const MERGE_COLUMNS: &str = "merge_id, deprecated_team_id, canonical_team_id, merged_at, \
                                 merged_by, reason, games_affected, aliases_redirected";

pub struct RawMerge {
  pub merge_id:           String,
  pub deprecated_team_id: String,
  pub canonical_team_id:  String,
  pub merged_at:          String,
  pub merged_by:          String,
  pub reason:             String,
  pub games_affected:     i64,
  pub aliases_redirected: i64,
}

pub fn read_merge(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMerge> {
  Ok(RawMerge {
    merge_id:           row.get(0)?,
    deprecated_team_id: row.get(1)?,
    canonical_team_id:  row.get(2)?,
    merged_at:          row.get(3)?,
    merged_by:          row.get(4)?,
    reason:             row.get(5)?,
    games_affected:     row.get(6)?,
    aliases_redirected: row.get(7)?,
  })
}

impl RawMerge {
  pub fn into_merge(self) -> Result<MergeRecord> {
    Ok(MergeRecord {
      merge_id:           decode_uuid(&self.merge_id)?,
      deprecated_team_id: decode_uuid(&self.deprecated_team_id)?,
      canonical_team_id:  decode_uuid(&self.canonical_team_id)?,
      merged_at:          decode_dt(&self.merged_at)?,
      merged_by:          self.merged_by,
      reason:             self.reason,
      games_affected:     count(self.games_affected),
      aliases_redirected: count(self.aliases_redirected),
    })
  }
}

pub const GAME_COLUMNS: &str =
  "game_id, game_uid, home_team_id, away_team_id, played_on, home_score, away_score";

pub struct RawGame {
  pub game_id:      String,
  pub game_uid:     String,
  pub home_team_id: String,
  pub away_team_id: String,
  pub played_on:    Option<String>,
  pub home_score:   Option<u16>,
  pub away_score:   Option<u16>,
}

pub fn read_game(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGame> {
  Ok(RawGame {
    game_id:      row.get(0)?,
    game_uid:     row.get(1)?,
    home_team_id: row.get(2)?,
    away_team_id: row.get(3)?,
    played_on:    row.get(4)?,
    home_score:   row.get(5)?,
    away_score:   row.get(6)?,
  })
}

impl RawGame {
  pub fn into_game(self) -> Result<GameFact> {
    Ok(GameFact {
      id:                  decode_uuid(&self.game_id)?,
      game_uid:            self.game_uid,
      home_team_master_id: decode_uuid(&self.home_team_id)?,
      away_team_master_id: decode_uuid(&self.away_team_id)?,
      played_on:           self.played_on.as_deref().map(decode_date).transpose()?,
      home_score:          self.home_score,
      away_score:          self.away_score,
    })
  }
}

pub const REVIEW_COLUMNS: &str = "review_id, record_json, fields_json, candidates_json, \
                                  reason_json, status, notes, created_at, resolved_at, \
                                  resolved_by, resolution_json";

pub struct RawReview {
  pub review_id:       String,
  pub record_json:     String,
  pub fields_json:     String,
  pub candidates_json: String,
  pub reason_json:     String,
  pub status:          String,
  pub notes:           String,
  pub created_at:      String,
  pub resolved_at:     Option<String>,
  pub resolved_by:     Option<String>,
  pub resolution_json: Option<String>,
}

pub fn read_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReview> {
  Ok(RawReview {
    review_id:       row.get(0)?,
    record_json:     row.get(1)?,
    fields_json:     row.get(2)?,
    candidates_json: row.get(3)?,
    reason_json:     row.get(4)?,
    status:          row.get(5)?,
    notes:           row.get(6)?,
    created_at:      row.get(7)?,
    resolved_at:     row.get(8)?,
    resolved_by:     row.get(9)?,
    resolution_json: row.get(10)?,
  })
}

impl RawReview {
  pub fn into_review(self) -> Result<ReviewItem> {
    Ok(ReviewItem {
      review_id:         decode_uuid(&self.review_id)?,
      record:            serde_json::from_str(&self.record_json)?,
      fields:            serde_json::from_str(&self.fields_json)?,
      candidate_matches: serde_json::from_str(&self.candidates_json)?,
      reason:            serde_json::from_str(&self.reason_json)?,
      status:            decode_variant("review state", &self.status)?,
      notes:             self.notes,
      created_at:        decode_dt(&self.created_at)?,
      resolved_at:       self.resolved_at.as_deref().map(decode_dt).transpose()?,
      resolved_by:       self.resolved_by,
      resolution:        self
        .resolution_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
    })
  }
}
