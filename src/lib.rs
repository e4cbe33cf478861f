//! # Pint Tracker
//!
//! A local drinking-session tracker with ranked statistics.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (records, reports, coordinates)
//! - **ingest**: Spreadsheet-row normalization into session records
//! - **calculate**: Report sections, ranking, and the aggregation engine
//! - **geocode**: Coordinate enrichment with a persistent lookup cache
//! - **ledger**: Incremental per-friend running totals
//! - **storage**: Filesystem data lake operations (JSONL, snapshots)
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod geocode;
pub mod ingest;
pub mod ledger;
pub mod models;
pub mod storage;

pub use models::*;
