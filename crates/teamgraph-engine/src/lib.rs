//! Matching, decision and merge engine for canonical team identities.
//!
//! ```text
//! RawRecord ─ Extractor ─ Matcher ─ DecisionEngine ─┬─ auto-link    ─ alias upsert
//!                            ▲                      ├─ auto-merge   ─ MergeExecutor
//!                            │                      ├─ needs-review ─ ReviewQueue
//!                     CanonicalStore                └─ create-new   ─ team + alias
//! ```
//!
//! [`Engine`] wires every component over a single
//! [`CanonicalStore`](teamgraph_core::store::CanonicalStore).

pub mod apply;
pub mod config;
pub mod csv_io;
pub mod decision;
pub mod engine;
pub mod error;
pub mod lock;
pub mod matcher;
pub mod merge;
pub mod pipeline;
pub mod review;
pub mod similarity;

pub use config::{EngineConfig, Thresholds};
pub use decision::{DecisionEngine, MergeProposal};
pub use engine::{Engine, GameImport};
pub use error::{Error, Result};
pub use matcher::{Candidate, Matcher};
pub use merge::MergeExecutor;
pub use pipeline::{BatchReport, Failed, Outcome, Pipeline};
pub use review::{Resolution, ReviewQueue};
