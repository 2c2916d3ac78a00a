//! The `CanonicalStore` trait.
//!
//! Implemented by storage backends (e.g. `teamgraph-store-sqlite`). The
//! engine and the surfaces depend on this abstraction only.
//!
//! Every mutation is transactional: either a single-row upsert or the merge
//! transaction. A reader never observes a half-applied merge.

use std::future::Future;

use uuid::Uuid;

use crate::{
  action::Action,
  identity::{
    AliasMapping, AliasStatus, CanonicalClub, CanonicalTeam, NewAlias, NewClub,
    NewTeam,
  },
  merge::{GameFact, MergeOutcome, MergeRecord, MergeRequest, NewGame},
  review::{NewReviewItem, ReviewItem, ReviewState},
};

/// Abstraction over the canonical identity store.
///
/// All methods return `Send` futures so the store can be shared across
/// worker tasks on a multi-threaded runtime.
pub trait CanonicalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Clubs ─────────────────────────────────────────────────────────────

  /// Create a club with its initial normalized aliases.
  fn create_club(
    &self,
    input: NewClub,
  ) -> impl Future<Output = Result<CanonicalClub, Self::Error>> + Send + '_;

  /// Attach another normalized alias to a club. Adding an existing alias is
  /// a no-op.
  fn add_club_alias(
    &self,
    club_id: Uuid,
    alias: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_club(
    &self,
    club_id: Uuid,
  ) -> impl Future<Output = Result<Option<CanonicalClub>, Self::Error>> + Send + '_;

  fn list_clubs(
    &self,
  ) -> impl Future<Output = Result<Vec<CanonicalClub>, Self::Error>> + Send + '_;

  // ── Teams ─────────────────────────────────────────────────────────────

  /// Insert a team and, in the same transaction, the alias that produced
  /// it.
  fn create_team(
    &self,
    input: NewTeam,
    alias: Option<NewAlias>,
  ) -> impl Future<Output = Result<(CanonicalTeam, Option<AliasMapping>), Self::Error>>
  + Send
  + '_;

  fn get_team(
    &self,
    team_id: Uuid,
  ) -> impl Future<Output = Result<Option<CanonicalTeam>, Self::Error>> + Send + '_;

  /// List teams, optionally scoped to a club, ordered by creation time.
  fn list_teams(
    &self,
    club_id: Option<Uuid>,
    include_deprecated: bool,
  ) -> impl Future<Output = Result<Vec<CanonicalTeam>, Self::Error>> + Send + '_;

  /// Follow the merge chain from `team_id` to its terminal canonical id.
  /// Returns `None` if the team does not exist.
  fn resolve_team(
    &self,
    team_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  // ── Aliases ───────────────────────────────────────────────────────────

  /// Upsert the alias keyed by `(provider_id, provider_team_id)` to point at
  /// `team_id`.
  fn link_alias(
    &self,
    team_id: Uuid,
    alias: NewAlias,
  ) -> impl Future<Output = Result<AliasMapping, Self::Error>> + Send + '_;

  fn get_alias<'a>(
    &'a self,
    provider_id: &'a str,
    provider_team_id: &'a str,
  ) -> impl Future<Output = Result<Option<AliasMapping>, Self::Error>> + Send + 'a;

  /// The current canonical id for a provider team, after all merges.
  /// Rejected aliases do not resolve.
  fn resolve_alias<'a>(
    &'a self,
    provider_id: &'a str,
    provider_team_id: &'a str,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;

  fn set_alias_status<'a>(
    &'a self,
    provider_id: &'a str,
    provider_team_id: &'a str,
    status: AliasStatus,
  ) -> impl Future<Output = Result<Option<AliasMapping>, Self::Error>> + Send + 'a;

  fn list_aliases(
    &self,
    team_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AliasMapping>, Self::Error>> + Send + '_;

  // ── Merges ────────────────────────────────────────────────────────────

  /// Atomically deprecate a team and redirect every alias and game that
  /// points at it. Precondition failures come back as
  /// [`MergeOutcome::Rejected`] with no state change.
  fn execute_merge(
    &self,
    request: MergeRequest,
  ) -> impl Future<Output = Result<MergeOutcome, Self::Error>> + Send + '_;

  /// The merge log, oldest first.
  fn list_merges(
    &self,
  ) -> impl Future<Output = Result<Vec<MergeRecord>, Self::Error>> + Send + '_;

  // ── Games ─────────────────────────────────────────────────────────────

  /// Record a game. Returns `None`, changing nothing, when a game with the
  /// same `game_uid` is already recorded.
  fn insert_game(
    &self,
    input: NewGame,
  ) -> impl Future<Output = Result<Option<GameFact>, Self::Error>> + Send + '_;

  /// Games in which `team_id` played on either side.
  fn list_games(
    &self,
    team_id: Uuid,
  ) -> impl Future<Output = Result<Vec<GameFact>, Self::Error>> + Send + '_;

  fn count_games(
    &self,
    team_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Review queue ──────────────────────────────────────────────────────

  fn enqueue_review(
    &self,
    input: NewReviewItem,
  ) -> impl Future<Output = Result<ReviewItem, Self::Error>> + Send + '_;

  fn get_review(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewItem>, Self::Error>> + Send + '_;

  fn list_reviews(
    &self,
    status: Option<ReviewState>,
  ) -> impl Future<Output = Result<Vec<ReviewItem>, Self::Error>> + Send + '_;

  /// Move an open item to `resolved`. Returns `None` when no open item with
  /// that id exists.
  fn close_review(
    &self,
    review_id: Uuid,
    resolution: Action,
    resolved_by: String,
  ) -> impl Future<Output = Result<Option<ReviewItem>, Self::Error>> + Send + '_;

  /// Return a resolved item to `open` and clear its resolution. Returns
  /// whether an item changed.
  fn reopen_review(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
