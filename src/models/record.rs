//! Session record model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, RecordId};

/// One logged drinking session.
///
/// `quantity` is the number of pints consumed over the whole session,
/// shared across participants (never divided per head). Records are
/// constructed once from cleaned input and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique identifier (content hash salted with creation time)
    pub id: RecordId,

    /// Date of the session (no time component)
    pub date: NaiveDate,

    /// Pub or venue name; acts as a join key, not a normalized ID
    pub location: String,

    /// Friends present, duplicates collapsed, sorted. May be empty
    /// (a solo session).
    pub participants: Vec<String>,

    /// Pints consumed across the session
    pub quantity: f64,

    /// Brand of drink, if recorded
    pub brand: Option<String>,

    /// Cost per pint
    pub unit_cost: Option<f64>,

    /// Total cost, when supplied independently of `unit_cost`
    pub total_cost: Option<f64>,

    /// Free-form comment
    pub comment: Option<String>,

    /// When this record was created
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new SessionRecord with an auto-generated ID.
    ///
    /// Participants are deduplicated and sorted so the participant set is
    /// a stable aggregation key.
    pub fn new(
        date: NaiveDate,
        location: String,
        participants: Vec<String>,
        quantity: f64,
    ) -> Self {
        let mut participants = participants;
        participants.sort();
        participants.dedup();

        let created_at = Utc::now();
        let id = EntityId::generate(&[
            &date.to_string(),
            &location,
            &participants.join(","),
            &quantity.to_string(),
            &created_at.to_rfc3339(),
        ]);

        Self {
            id,
            date,
            location,
            participants,
            quantity,
            brand: None,
            unit_cost: None,
            total_cost: None,
            comment: None,
            created_at,
        }
    }

    /// Builder method to set the drink brand.
    pub fn with_brand(mut self, brand: String) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Builder method to set costs.
    pub fn with_costs(mut self, unit_cost: Option<f64>, total_cost: Option<f64>) -> Self {
        self.unit_cost = unit_cost;
        self.total_cost = total_cost;
        self
    }

    /// Builder method to set a comment.
    pub fn with_comment(mut self, comment: String) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Total cost of the session.
    ///
    /// A supplied `total_cost` is authoritative; it is derived as
    /// `quantity * unit_cost` only when absent.
    pub fn effective_total_cost(&self) -> Option<f64> {
        self.total_cost
            .or_else(|| self.unit_cost.map(|c| self.quantity * c))
    }
}
