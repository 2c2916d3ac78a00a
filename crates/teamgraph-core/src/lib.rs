//! Core types and trait definitions for the teamgraph identity engine.
//!
//! This crate is deliberately free of database and HTTP dependencies. The
//! extractor, store backends, engine and surfaces all depend on it.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod action;
pub mod error;
pub mod identity;
pub mod merge;
pub mod record;
pub mod review;
pub mod season;
pub mod store;

pub use error::{Error, Result};
