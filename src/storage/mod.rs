//! Filesystem persistence.
//!
//! JSONL files are the source of truth for session records and friend
//! totals; the geocoordinate snapshot is a single pretty-printed JSON
//! map carried from one report run to the next.

mod jsonl;

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::models::GeoSnapshot;

pub use jsonl::{EntityType, JsonlReader, JsonlWriter};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join("records.jsonl")
    }

    pub fn friend_totals_path(&self) -> PathBuf {
        self.data_dir.join("friend_totals.jsonl")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn geo_snapshot_path(&self) -> PathBuf {
        self.state_dir().join("geo_snapshot.json")
    }

    /// Batch outputs (the full report JSON) land here.
    pub fn derived_dir(&self) -> PathBuf {
        self.data_dir.join("derived")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Read the persisted geocoordinate snapshot; an absent file is an empty
/// snapshot, not an error.
pub fn read_geo_snapshot(config: &StorageConfig) -> Result<GeoSnapshot, StorageError> {
    let path = config.geo_snapshot_path();
    if !path.exists() {
        return Ok(GeoSnapshot::new());
    }

    let contents = fs::read_to_string(&path)?;
    let snapshot: GeoSnapshot = serde_json::from_str(&contents)?;
    debug!("Read {} cached locations from {:?}", snapshot.len(), path);
    Ok(snapshot)
}

/// Persist the geocoordinate snapshot for the next run.
pub fn write_geo_snapshot(
    config: &StorageConfig,
    snapshot: &GeoSnapshot,
) -> Result<(), StorageError> {
    let path = config.geo_snapshot_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, json)?;
    debug!("Wrote {} cached locations to {:?}", snapshot.len(), path);
    Ok(())
}
