//! JSON REST API for teamgraph.
//!
//! Exposes an axum [`Router`] over an [`Engine`] backed by any
//! [`CanonicalStore`]: alias lookup, the merge RPC, team inspection and the
//! review queue. Auth and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", teamgraph_api::api_router(engine.clone()))
//! ```

pub mod aliases;
pub mod error;
pub mod merges;
pub mod reviews;
pub mod teams;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use teamgraph_core::store::CanonicalStore;
use teamgraph_engine::Engine;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: CanonicalStore + 'static,
{
  Router::new()
    // Aliases
    .route("/aliases/{provider}/{id}", get(aliases::resolve::<S>))
    .route("/aliases/{provider}/{id}/status", post(aliases::set_status::<S>))
    // Merges
    .route("/merges", get(merges::list::<S>).post(merges::execute::<S>))
    // Teams
    .route("/teams/{id}", get(teams::get_one::<S>))
    // Reviews
    .route("/reviews", get(reviews::list::<S>))
    .route("/reviews/{id}", get(reviews::get_one::<S>))
    .route("/reviews/{id}/resolve", post(reviews::resolve::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}
