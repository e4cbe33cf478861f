//! Incremental per-friend running totals.
//!
//! The live-append path: one record at a time, each participant's total
//! bumped by the record's quantity, no batch recompute. The record ID
//! doubles as a commit identifier so a retried `apply` never
//! double-counts.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{FriendTotal, SessionRecord};

/// Running pint totals keyed by friend name.
///
/// Shared behind `Arc<tokio::sync::RwLock<_>>` in the API state so
/// concurrent applies serialize and readers only observe fully committed
/// records.
#[derive(Debug, Default)]
pub struct FriendLedger {
    totals: HashMap<String, f64>,
    applied: HashSet<String>,
}

impl FriendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted totals (the applied-record set starts
    /// empty; only records submitted after the rebuild are tracked).
    pub fn from_entries(entries: Vec<FriendTotal>) -> Self {
        Self {
            totals: entries
                .into_iter()
                .map(|e| (e.name, e.total_pints))
                .collect(),
            applied: HashSet::new(),
        }
    }

    /// Rebuild from scratch over a full record batch.
    pub fn from_records(records: &[SessionRecord]) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.apply(record);
        }
        ledger
    }

    /// Apply one record: create missing entries at zero, then add the
    /// record's quantity for every participant.
    ///
    /// All-or-nothing: the update set is computed in full before any
    /// total is written. Re-applying an already-committed record is a
    /// no-op, so a caller may safely retry after a conflict.
    ///
    /// Returns the updated totals for the affected friends.
    pub fn apply(&mut self, record: &SessionRecord) -> Vec<FriendTotal> {
        let commit_id = record.id.as_str().to_string();

        if self.applied.contains(&commit_id) {
            debug!("Record {} already applied, skipping", commit_id);
            return self.totals_for(&record.participants);
        }

        let updates: Vec<(String, f64)> = record
            .participants
            .iter()
            .map(|name| {
                let current = self.totals.get(name).copied().unwrap_or(0.0);
                (name.clone(), current + record.quantity)
            })
            .collect();

        for (name, total) in updates {
            self.totals.insert(name, total);
        }
        self.applied.insert(commit_id);

        self.totals_for(&record.participants)
    }

    /// Current total for one friend.
    pub fn total_for(&self, name: &str) -> Option<f64> {
        self.totals.get(name).copied()
    }

    /// All entries, sorted by name for stable output.
    pub fn entries(&self) -> Vec<FriendTotal> {
        let mut entries: Vec<FriendTotal> = self
            .totals
            .iter()
            .map(|(name, total)| FriendTotal::new(name.clone(), *total))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn totals_for(&self, names: &[String]) -> Vec<FriendTotal> {
        names
            .iter()
            .filter_map(|name| {
                self.total_for(name)
                    .map(|total| FriendTotal::new(name.clone(), total))
            })
            .collect()
    }
}
