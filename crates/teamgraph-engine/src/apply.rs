//! [`Applier`] carries out an [`Action`] against the store.
//!
//! The automatic pipeline and the review queue both end here, so a reviewed
//! decision has exactly the effects an automatic one would have.

use std::sync::Arc;

use serde::Serialize;
use teamgraph_core::{
  action::Action,
  identity::{AliasMapping, MatchMethod, NewAlias, NewClub, NewTeam},
  merge::{MergeRequest, MergeResult},
  record::{ExtractedFields, RawRecord, format_age_group},
  review::{NewReviewItem, ReviewItem},
  season::Season,
  store::CanonicalStore,
};
use teamgraph_extract::{display, normalize_team_name};
use uuid::Uuid;

use crate::{Error, Result, matcher::club_key, merge::MergeExecutor};

const AUTOMATIC_ACTOR: &str = "teamgraph";

/// Who made the decision being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance<'a> {
  Automatic,
  Reviewed { by: &'a str },
}

impl Provenance<'_> {
  fn actor(&self) -> &str {
    match self {
      Self::Automatic => AUTOMATIC_ACTOR,
      Self::Reviewed { by } => by,
    }
  }
}

/// What applying an action changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Applied {
  pub club_id: Option<Uuid>,
  pub team_id: Option<Uuid>,
  pub alias:   Option<AliasMapping>,
  pub merge:   Option<MergeResult>,
  pub review:  Option<ReviewItem>,
}

pub struct Applier<S> {
  store:  Arc<S>,
  merges: MergeExecutor<S>,
  season: Season,
}

impl<S> Clone for Applier<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      merges: self.merges.clone(),
      season: self.season,
    }
  }
}

impl<S: CanonicalStore> Applier<S> {
  pub fn new(store: Arc<S>, merges: MergeExecutor<S>, season: Season) -> Self {
    Self { store, merges, season }
  }

  /// Apply `action` for `record`. `confidence` is recorded on any alias
  /// written by an automatic decision; reviewed links always carry 1.0.
  pub async fn apply(
    &self,
    record: &RawRecord,
    fields: &ExtractedFields,
    action: &Action,
    confidence: f64,
    provenance: Provenance<'_>,
  ) -> Result<Applied> {
    match action {
      Action::AutoLink { team_id } => {
        let alias = self.link(record, *team_id, confidence, provenance).await?;
        Ok(Applied {
          club_id: self.club_of(alias.team_id_master).await?,
          team_id: Some(alias.team_id_master),
          alias: Some(alias),
          ..Default::default()
        })
      }
      Action::AutoMerge { deprecated_id, canonical_id } => {
        let merge = self
          .merges
          .execute(MergeRequest {
            deprecated_team_id: *deprecated_id,
            canonical_team_id:  *canonical_id,
            merged_by:          provenance.actor().to_owned(),
            reason:             format!(
              "duplicate of {} seen from {}:{}",
              canonical_id, record.provider_id, record.provider_record_id
            ),
          })
          .await?;
        let alias = self
          .link(record, merge.canonical_team_id, confidence, provenance)
          .await?;
        Ok(Applied {
          club_id: self.club_of(alias.team_id_master).await?,
          team_id: Some(alias.team_id_master),
          alias: Some(alias),
          merge: Some(merge),
          ..Default::default()
        })
      }
      Action::CreateNew => self.create_new(record, fields, provenance).await,
      Action::NeedsReview { candidates, reason } => {
        let review = self
          .store
          .enqueue_review(NewReviewItem {
            record:            record.clone(),
            fields:            fields.clone(),
            candidate_matches: candidates.clone(),
            reason:            reason.clone(),
          })
          .await
          .map_err(Error::store)?;
        tracing::debug!(review_id = %review.review_id, reason = %review.reason, "queued for review");
        Ok(Applied { review: Some(review), ..Default::default() })
      }
    }
  }

  async fn link(
    &self,
    record: &RawRecord,
    team_id: Uuid,
    confidence: f64,
    provenance: Provenance<'_>,
  ) -> Result<AliasMapping> {
    let (method, confidence) = match provenance {
      Provenance::Reviewed { .. } => (MatchMethod::Manual, 1.0),
      Provenance::Automatic if confidence >= 1.0 => (MatchMethod::Exact, 1.0),
      Provenance::Automatic => (MatchMethod::Fuzzy, confidence),
    };
    let alias = NewAlias::new(&record.provider_id, &record.provider_record_id, method, confidence)?;
    if self.store.get_team(team_id).await.map_err(Error::store)?.is_none() {
      return Err(Error::TeamNotFound(team_id));
    }
    self.store.link_alias(team_id, alias).await.map_err(Error::store)
  }

  async fn create_new(
    &self,
    record: &RawRecord,
    fields: &ExtractedFields,
    provenance: Provenance<'_>,
  ) -> Result<Applied> {
    let (Some(gender), Some(age)) = (fields.gender, fields.age_in(self.season)) else {
      return Err(Error::InvalidResolution(
        "create-new needs a gender and an age group".to_owned(),
      ));
    };
    let key = club_key(fields, record.raw_club_name.as_deref());
    if key.is_empty() {
      return Err(Error::InvalidResolution("create-new needs a club or team name".to_owned()));
    }

    let club_name = record
      .raw_club_name
      .clone()
      .filter(|name| !name.trim().is_empty())
      .unwrap_or_else(|| fields.normalized_name.clone());
    let club_id = self.ensure_club(key, club_name).await?;

    let method = match provenance {
      Provenance::Automatic => MatchMethod::Exact,
      Provenance::Reviewed { .. } => MatchMethod::Manual,
    };
    let alias = NewAlias::new(&record.provider_id, &record.provider_record_id, method, 1.0)?;
    let input = NewTeam {
      club_id,
      display_name: display(fields),
      normalized_name: normalize_team_name(&fields.normalized_name),
      age_group: format_age_group(age),
      gender,
      birth_year: fields.birth_year,
      branch: fields.branch.clone(),
      tier: fields.tier.clone(),
    };

    let (team, alias) = self
      .store
      .create_team(input, Some(alias))
      .await
      .map_err(Error::store)?;
    tracing::info!(
      team_id = %team.team_id_master,
      %club_id,
      name = %team.display_name,
      "created canonical team",
    );

    Ok(Applied {
      club_id: Some(club_id),
      team_id: Some(team.team_id_master),
      alias,
      ..Default::default()
    })
  }

  /// The club owning `key`, created on first sight.
  async fn ensure_club(&self, key: String, display_name: String) -> Result<Uuid> {
    let clubs = self.store.list_clubs().await.map_err(Error::store)?;
    if let Some(club) = clubs.iter().find(|club| club.aliases.contains(&key)) {
      return Ok(club.club_id);
    }
    let club = self
      .store
      .create_club(NewClub { display_name, aliases: vec![key] })
      .await
      .map_err(Error::store)?;
    tracing::info!(club_id = %club.club_id, name = %club.display_name, "created canonical club");
    Ok(club.club_id)
  }

  async fn club_of(&self, team_id: Uuid) -> Result<Option<Uuid>> {
    Ok(
      self
        .store
        .get_team(team_id)
        .await
        .map_err(Error::store)?
        .map(|team| team.club_id),
    )
  }
}
