//! A batch run over files on disk against a file-backed store.

use std::{fs, sync::Arc};

use teamgraph_core::season::Season;
use teamgraph_engine::{Engine, EngineConfig, csv_io};
use teamgraph_store_sqlite::SqliteStore;

const INPUT: &str = "\
provider_id,provider_record_id,raw_name,raw_club_name,source_age_field,source_gender_field,state_code
gotsport,1,Solar SC G14 Premier,,,,TX
gotsport,2,Solar SC G14 Premier,Solar SC,,,TX
gotsport,3,FC Dallas U13,,,,TX
";

async fn open(path: &std::path::Path) -> Engine<SqliteStore> {
  let store = SqliteStore::open(path).await.unwrap();
  let config = EngineConfig { season: Season::ending(2025), workers: 2, ..Default::default() };
  Engine::new(Arc::new(store), config)
}

#[tokio::test]
async fn batch_outputs_and_aliases_survive_a_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let db = dir.path().join("teamgraph.db");
  let input = dir.path().join("input.csv");
  let output = dir.path().join("resolved.csv");
  let review = dir.path().join("review_queue.csv");
  fs::write(&input, INPUT).unwrap();

  let team_id = {
    let engine = open(&db).await;
    let records = csv_io::read_records(fs::File::open(&input).unwrap()).unwrap();
    let report = engine.pipeline().run_batch(records).await;
    assert!(report.requeue.is_empty());

    csv_io::write_outcomes(fs::File::create(&output).unwrap(), &report.outcomes).unwrap();
    csv_io::write_review_queue(fs::File::create(&review).unwrap(), &report.outcomes).unwrap();
    report.outcomes[0].team_id.unwrap()
  };

  let resolved = fs::read_to_string(&output).unwrap();
  assert_eq!(resolved.lines().count(), 4);
  assert!(resolved.contains(",create-new,"));
  assert!(resolved.contains(",auto-link,"));

  // Missing gender: the Dallas record cannot mint a team and waits for review.
  let queued = fs::read_to_string(&review).unwrap();
  assert_eq!(queued.lines().count(), 2);
  assert!(queued.contains("FC Dallas U13"));

  let engine = open(&db).await;
  assert_eq!(engine.lookup("gotsport", "1").await.unwrap(), Some(team_id));
  assert_eq!(engine.lookup("gotsport", "2").await.unwrap(), Some(team_id));
  assert!(engine.lookup("gotsport", "3").await.unwrap().is_none());
  assert_eq!(engine.reviews().list(None).await.unwrap().len(), 1);
}
