//! SQL schema for the teamgraph SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS clubs (
    club_id      TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- Normalized club keys; one club per key.
CREATE TABLE IF NOT EXISTS club_aliases (
    alias   TEXT PRIMARY KEY,
    club_id TEXT NOT NULL REFERENCES clubs(club_id)
);

-- Teams are never deleted; merged teams are flagged deprecated.
CREATE TABLE IF NOT EXISTS teams (
    team_id         TEXT PRIMARY KEY,
    club_id         TEXT NOT NULL REFERENCES clubs(club_id),
    display_name    TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    age_group       TEXT NOT NULL,   -- 'u13'
    gender          TEXT NOT NULL,   -- 'male' | 'female'
    birth_year      INTEGER,
    branch          TEXT,
    tier            TEXT,
    is_deprecated   INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS aliases (
    provider_id      TEXT NOT NULL,
    provider_team_id TEXT NOT NULL,
    team_id          TEXT NOT NULL REFERENCES teams(team_id),
    match_method     TEXT NOT NULL,  -- 'exact' | 'fuzzy' | 'manual'
    confidence       REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    review_status    TEXT NOT NULL,  -- 'pending' | 'approved' | 'rejected'
    updated_at       TEXT NOT NULL,
    PRIMARY KEY (provider_id, provider_team_id)
);

-- Append-only. A team is deprecated at most once and never into itself.
CREATE TABLE IF NOT EXISTS merges (
    merge_id           TEXT PRIMARY KEY,
    deprecated_team_id TEXT NOT NULL REFERENCES teams(team_id),
    canonical_team_id  TEXT NOT NULL REFERENCES teams(team_id),
    merged_at          TEXT NOT NULL,
    merged_by          TEXT NOT NULL,
    reason             TEXT NOT NULL,
    games_affected     INTEGER NOT NULL,
    aliases_redirected INTEGER NOT NULL,
    UNIQUE (deprecated_team_id),
    CHECK  (deprecated_team_id != canonical_team_id)
);

-- Owned by the ranking system; merges only rewrite the two team columns.
CREATE TABLE IF NOT EXISTS games (
    game_id      TEXT PRIMARY KEY,
    game_uid     TEXT NOT NULL UNIQUE,
    home_team_id TEXT NOT NULL REFERENCES teams(team_id),
    away_team_id TEXT NOT NULL REFERENCES teams(team_id),
    played_on    TEXT,               -- YYYY-MM-DD
    home_score   INTEGER,
    away_score   INTEGER
);

CREATE TABLE IF NOT EXISTS review_items (
    review_id          TEXT PRIMARY KEY,
    provider_id        TEXT NOT NULL,
    provider_record_id TEXT NOT NULL,
    record_json        TEXT NOT NULL,
    fields_json        TEXT NOT NULL,
    candidates_json    TEXT NOT NULL,
    reason_json        TEXT NOT NULL,
    status             TEXT NOT NULL,  -- 'open' | 'resolved'
    notes              TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    resolved_at        TEXT,
    resolved_by        TEXT,
    resolution_json    TEXT
);

CREATE INDEX IF NOT EXISTS teams_club_idx     ON teams(club_id);
CREATE INDEX IF NOT EXISTS aliases_team_idx   ON aliases(team_id);
CREATE INDEX IF NOT EXISTS merges_target_idx  ON merges(canonical_team_id);
CREATE INDEX IF NOT EXISTS games_home_idx     ON games(home_team_id);
CREATE INDEX IF NOT EXISTS games_away_idx     ON games(away_team_id);
CREATE INDEX IF NOT EXISTS reviews_status_idx ON review_items(status);

-- At most one open item per provider record.
CREATE UNIQUE INDEX IF NOT EXISTS reviews_open_record_idx
    ON review_items(provider_id, provider_record_id) WHERE status = 'open';

PRAGMA user_version = 1;
";
