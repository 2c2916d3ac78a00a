//! [`ReviewQueue`] — human decisions over records the engine would not
//! decide alone.
//!
//! A reviewer answers with the same [`Action`] values the decision table
//! produces. The item is closed first and the answer then applied through
//! the shared [`Applier`]; an answer that fails to apply reopens the item.
//! Closed items are history and are never edited.

use std::{io, sync::Arc};

use serde::Serialize;
use teamgraph_core::{
  action::Action,
  review::{NewReviewItem, ReviewItem, ReviewState},
  store::CanonicalStore,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  apply::{Applied, Applier, Provenance},
  csv_io,
  lock::LockTable,
};

/// A closed review item and the effects of its resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
  pub item:    ReviewItem,
  pub applied: Applied,
}

pub struct ReviewQueue<S> {
  store:   Arc<S>,
  applier: Applier<S>,
  locks:   Arc<LockTable<Uuid>>,
}

impl<S> Clone for ReviewQueue<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      applier: self.applier.clone(),
      locks:   Arc::clone(&self.locks),
    }
  }
}

impl<S: CanonicalStore> ReviewQueue<S> {
  pub fn new(store: Arc<S>, applier: Applier<S>) -> Self {
    Self { store, applier, locks: Arc::new(LockTable::new()) }
  }

  pub async fn enqueue(&self, item: NewReviewItem) -> Result<ReviewItem> {
    self.store.enqueue_review(item).await.map_err(Error::store)
  }

  pub async fn get(&self, review_id: Uuid) -> Result<ReviewItem> {
    self
      .store
      .get_review(review_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ReviewNotFound(review_id))
  }

  pub async fn list(&self, status: Option<ReviewState>) -> Result<Vec<ReviewItem>> {
    self.store.list_reviews(status).await.map_err(Error::store)
  }

  /// Close an open item and apply `resolution` to it.
  ///
  /// Only `auto-link`, `auto-merge` and `create-new` are accepted. A second
  /// resolution of the same item fails with
  /// [`Error::ReviewAlreadyResolved`] and changes nothing. When the answer
  /// cannot be applied the item is reopened and the error returned.
  pub async fn resolve(
    &self,
    review_id: Uuid,
    resolution: Action,
    resolved_by: &str,
  ) -> Result<Resolution> {
    if resolution.is_review() {
      return Err(Error::InvalidResolution(
        "a review must resolve to auto-link, auto-merge or create-new".to_owned(),
      ));
    }

    let _guard = self.locks.acquire([review_id]).await;
    let item = self.get(review_id).await?;
    if item.status == ReviewState::Resolved {
      return Err(Error::ReviewAlreadyResolved(review_id));
    }

    // Close before applying: an answer is applied at most once.
    let item = self
      .store
      .close_review(review_id, resolution.clone(), resolved_by.to_owned())
      .await
      .map_err(Error::store)?
      .ok_or(Error::ReviewAlreadyResolved(review_id))?;

    let applied = match self
      .applier
      .apply(
        &item.record,
        &item.fields,
        &resolution,
        1.0,
        Provenance::Reviewed { by: resolved_by },
      )
      .await
    {
      Ok(applied) => applied,
      Err(err) => {
        match self.store.reopen_review(review_id).await {
          Ok(_) => tracing::warn!(%review_id, error = %err, "resolution failed, item reopened"),
          Err(reopen) => tracing::error!(
            %review_id,
            error = %err,
            reopen_error = %reopen,
            "resolution failed and the item could not be reopened",
          ),
        }
        return Err(err);
      }
    };

    tracing::info!(
      %review_id,
      resolved_by,
      team_id = ?applied.team_id,
      "resolved review item",
    );
    Ok(Resolution { item, applied })
  }

  /// Write items with `status` as CSV.
  pub async fn export<W: io::Write>(&self, writer: W, status: Option<ReviewState>) -> Result<usize> {
    let items = self.list(status).await?;
    csv_io::write_review_items(writer, &items)?;
    Ok(items.len())
  }
}
