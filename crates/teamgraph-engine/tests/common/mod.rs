#![allow(dead_code)]

use std::sync::Arc;

use teamgraph_core::{
  identity::{NewClub, NewTeam},
  record::{Gender, RawRecord},
  season::Season,
  store::CanonicalStore,
};
use teamgraph_engine::{Engine, EngineConfig};
use teamgraph_store_sqlite::SqliteStore;
use uuid::Uuid;

pub const SEASON: Season = Season::ending(2025);

pub async fn engine() -> Engine<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let config = EngineConfig { season: SEASON, ..Default::default() };
  Engine::new(Arc::new(store), config)
}

pub async fn club(engine: &Engine<SqliteStore>, name: &str, alias: &str) -> Uuid {
  engine
    .store()
    .create_club(NewClub {
      display_name: name.into(),
      aliases:      vec![alias.into()],
    })
    .await
    .unwrap()
    .club_id
}

pub async fn team(
  engine: &Engine<SqliteStore>,
  club_id: Uuid,
  name: &str,
  age_group: &str,
  gender: Gender,
  tier: Option<&str>,
) -> Uuid {
  engine
    .store()
    .create_team(
      NewTeam {
        club_id,
        display_name: name.into(),
        normalized_name: name.to_lowercase(),
        age_group: age_group.into(),
        gender,
        birth_year: None,
        branch: None,
        tier: tier.map(Into::into),
      },
      None,
    )
    .await
    .unwrap()
    .0
    .team_id_master
}

pub fn record(id: &str, name: &str) -> RawRecord { RawRecord::new("gotsport", id, name) }
