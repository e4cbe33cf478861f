//! Persisted per-friend running totals.

use serde::{Deserialize, Serialize};

/// Running pint total for one friend.
///
/// `total_pints` is the sum of `quantity` over every session record the
/// friend participated in. Under the append-only ledger it only ever
/// grows; it is never recomputed from scratch on the live path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendTotal {
    /// Friend name (unique key)
    pub name: String,

    /// Cumulative pints across all sessions
    pub total_pints: f64,
}

impl FriendTotal {
    pub fn new(name: String, total_pints: f64) -> Self {
        Self { name, total_pints }
    }
}
