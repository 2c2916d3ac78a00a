//! End-to-end record processing against an in-memory store.

mod common;

use common::{SEASON, club, engine, record, team};
use teamgraph_core::{
  action::{Action, ReviewReason},
  identity::{AliasStatus, MatchMethod},
  record::Gender,
  review::ReviewState,
  store::CanonicalStore,
};

#[tokio::test]
async fn known_team_is_auto_linked() {
  let engine = engine().await;
  let dallas = club(&engine, "FC Dallas", "dallas").await;
  let team_id = team(&engine, dallas, "FC Dallas", "u13", Gender::Male, Some("ECNL")).await;

  let outcome = engine
    .pipeline()
    .process(&record("r-1", "FC Dallas 2012B ECNL"))
    .await
    .unwrap();

  assert_eq!(outcome.fields.birth_year, Some(2012));
  assert_eq!(outcome.fields.gender, Some(Gender::Male));
  assert_eq!(outcome.fields.tier.as_deref(), Some("ECNL"));
  assert_eq!(outcome.fields.normalized_name, "FC Dallas");
  assert_eq!(outcome.action, Action::AutoLink { team_id });
  assert_eq!(outcome.club_id, Some(dallas));

  let alias = engine.store().get_alias("gotsport", "r-1").await.unwrap().unwrap();
  assert_eq!(alias.team_id_master, team_id);
  assert_eq!(alias.match_method, MatchMethod::Exact);
  assert_eq!(engine.lookup("gotsport", "r-1").await.unwrap(), Some(team_id));
}

#[tokio::test]
async fn unseen_team_is_created_once() {
  let engine = engine().await;
  let first = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();

  assert_eq!(first.action, Action::CreateNew);
  assert_eq!(first.fields.age_group.as_deref(), Some("u14"));
  assert_eq!(first.fields.gender, Some(Gender::Female));
  assert_eq!(first.fields.tier.as_deref(), Some("Premier"));
  assert_eq!(first.fields.normalized_name, "Solar SC");

  let team_id = first.team_id.unwrap();
  let created = engine.store().get_team(team_id).await.unwrap().unwrap();
  assert_eq!(created.age_group, "u14");
  assert_eq!(created.gender, Gender::Female);
  assert_eq!(engine.lookup("gotsport", "r-1").await.unwrap(), Some(team_id));

  // Another provider id for the same team links to it instead.
  let second = engine
    .pipeline()
    .process(&record("r-2", "Solar SC G14 Premier"))
    .await
    .unwrap();
  assert_eq!(second.action, Action::AutoLink { team_id });
  assert_eq!(engine.store().list_teams(None, true).await.unwrap().len(), 1);
  assert_eq!(engine.store().list_clubs().await.unwrap().len(), 1);
}

#[tokio::test]
async fn repeated_record_reuses_its_alias() {
  let engine = engine().await;
  let first = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();
  let again = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();
  assert_eq!(again.action, Action::AutoLink { team_id: first.team_id.unwrap() });
  assert_eq!(again.confidence, Some(1.0));
}

#[tokio::test]
async fn gender_conflict_goes_to_review() {
  let engine = engine().await;
  let dallas = club(&engine, "FC Dallas", "dallas").await;
  team(&engine, dallas, "FC Dallas", "u13", Gender::Female, Some("ECNL")).await;

  let outcome = engine
    .pipeline()
    .process(&record("r-1", "FC Dallas 2012B ECNL"))
    .await
    .unwrap();

  let Action::NeedsReview { reason: ReviewReason::ConflictDetected { fields, .. }, candidates } =
    &outcome.action
  else {
    panic!("expected a conflict review");
  };
  assert_eq!(fields, &vec!["gender".to_owned()]);
  assert_eq!(candidates.len(), 1);
  assert!(outcome.notes().unwrap().contains("gender"));

  let open = engine.reviews().list(Some(ReviewState::Open)).await.unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(Some(open[0].review_id), outcome.review_id);
  assert!(engine.lookup("gotsport", "r-1").await.unwrap().is_none());
}

#[tokio::test]
async fn neighbouring_age_group_gets_its_own_team() {
  let engine = engine().await;
  let u14 = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap()
    .team_id
    .unwrap();

  let outcome = engine
    .pipeline()
    .process(&record("r-2", "Solar SC G13 Premier"))
    .await
    .unwrap();

  assert_eq!(outcome.action, Action::CreateNew);
  assert_ne!(outcome.team_id, Some(u14));
  assert_eq!(engine.store().list_teams(None, false).await.unwrap().len(), 2);
  assert_eq!(engine.lookup("gotsport", "r-1").await.unwrap(), Some(u14));
}

#[tokio::test]
async fn new_cohort_in_a_known_club_is_created() {
  let engine = engine().await;
  let girls = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();

  let boys = engine
    .pipeline()
    .process(&record("r-2", "Solar SC B10"))
    .await
    .unwrap();

  assert_eq!(boys.action, Action::CreateNew);
  assert_eq!(boys.club_id, girls.club_id);
  assert_eq!(engine.store().list_clubs().await.unwrap().len(), 1);
  assert!(engine.reviews().list(Some(ReviewState::Open)).await.unwrap().is_empty());

  let created = engine.store().get_team(boys.team_id.unwrap()).await.unwrap().unwrap();
  assert_eq!(created.age_group, "u10");
  assert_eq!(created.gender, Gender::Male);
}

#[tokio::test]
async fn near_identical_duplicates_are_merged() {
  let engine = engine().await;
  let dallas = club(&engine, "FC Dallas", "dallas").await;
  let older = team(&engine, dallas, "FC Dallas", "u13", Gender::Male, Some("ECNL")).await;
  let busier = team(&engine, dallas, "FC Dallas", "u13", Gender::Male, Some("ECNL")).await;
  let opponent_club = club(&engine, "Solar SC", "solar").await;
  let opponent = team(&engine, opponent_club, "Solar SC", "u13", Gender::Male, None).await;
  for uid in ["g-1", "g-2"] {
    engine
      .store()
      .insert_game(teamgraph_core::merge::NewGame::new(uid, busier, opponent))
      .await
      .unwrap();
  }

  let outcome = engine
    .pipeline()
    .process(&record("r-1", "FC Dallas 2012B ECNL"))
    .await
    .unwrap();

  assert_eq!(
    outcome.action,
    Action::AutoMerge { deprecated_id: older, canonical_id: busier }
  );
  assert_eq!(outcome.team_id, Some(busier));
  assert_eq!(engine.store().resolve_team(older).await.unwrap(), Some(busier));
  assert_eq!(engine.lookup("gotsport", "r-1").await.unwrap(), Some(busier));
  assert_eq!(engine.store().list_merges().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_gender_is_not_created() {
  let engine = engine().await;
  let outcome = engine
    .pipeline()
    .process(&record("r-1", "Solar SC U14"))
    .await
    .unwrap();
  assert!(matches!(
    outcome.action,
    Action::NeedsReview { reason: ReviewReason::InsufficientFields { .. }, .. }
  ));
  assert!(engine.store().list_teams(None, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn source_columns_fill_gaps() {
  let engine = engine().await;
  let mut raw = record("r-1", "Solar SC Premier");
  raw.source_age_field = Some("U14".into());
  raw.source_gender_field = Some("Girls".into());

  let outcome = engine.pipeline().process(&raw).await.unwrap();
  assert_eq!(outcome.action, Action::CreateNew);
  assert_eq!(outcome.fields.gender, Some(Gender::Female));
  assert_eq!(outcome.fields.age_in(SEASON), Some(14));
}

#[tokio::test]
async fn rejected_alias_sends_record_back_to_review() {
  let engine = engine().await;
  engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();
  engine
    .set_alias_status("gotsport", "r-1", AliasStatus::Rejected)
    .await
    .unwrap()
    .unwrap();
  assert!(engine.lookup("gotsport", "r-1").await.unwrap().is_none());

  let outcome = engine
    .pipeline()
    .process(&record("r-1", "Solar SC G14 Premier"))
    .await
    .unwrap();
  assert!(matches!(
    outcome.action,
    Action::NeedsReview { reason: ReviewReason::AliasRejected, ref candidates } if candidates.len() == 1
  ));
}

#[tokio::test]
async fn batch_preserves_order_and_mints_one_team() {
  let engine = engine().await;
  let records: Vec<_> = (0..8)
    .map(|i| record(&format!("r-{i}"), "Solar SC G14 Premier"))
    .collect();

  let report = engine.pipeline().run_batch(records).await;

  assert!(report.requeue.is_empty());
  assert_eq!(report.outcomes.len(), 8);
  for (i, outcome) in report.outcomes.iter().enumerate() {
    assert_eq!(outcome.record.provider_record_id, format!("r-{i}"));
  }
  assert_eq!(report.count("create-new"), 1);
  assert_eq!(report.count("auto-link"), 7);
  assert_eq!(engine.store().list_teams(None, true).await.unwrap().len(), 1);
}
