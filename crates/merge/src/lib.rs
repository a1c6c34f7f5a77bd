//! `tokengrid-merge` — key derivation and batch import merge.
//!
//! Pure engine crate: receives a base table and an incoming batch, merges
//! in place, returns a per-row report. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod report;

pub use config::MergeConfig;
pub use engine::merge;
pub use error::MergeError;
pub use locator::{parse_locator, TokenKey};
pub use report::{MergeReport, RowAction, RowOutcome};
