//! Report models: the five sections produced by the statistics engine.
//!
//! Field names and nesting follow the shape the dashboard consumes, so a
//! `Report` serializes directly into the persisted/transmitted form.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Total pints for one drink brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandTotal {
    pub name: String,
    pub count: f64,
}

/// Per-location visit and volume summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Distinct dates with at least one session at this location
    pub number_of_visits: u32,

    /// Pints consumed at this location
    pub number_of_pints: f64,

    /// Minimum rank over `number_of_pints` descending
    pub number_of_pints_rank: u32,

    /// Resolved coordinate, when the geocode cache has one
    pub coordinates: Option<Coordinate>,
}

/// Sum and modal drink for one calendar bucket (weekday, week, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarBucket {
    pub name: String,
    pub number_of_pints: f64,
    pub most_popular_drink: Option<String>,
}

/// One point in the chronological session time series, keyed by
/// `(date, sorted distinct participant set)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub date: NaiveDate,
    pub participants: Vec<String>,
    pub number_of_pints: f64,

    /// Running total across the whole series in date order
    pub cumulative_pints: f64,
}

/// Same-day rollup of the time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRollup {
    pub number_of_pints: f64,

    /// Cumulative total as of end of day
    pub cumulative_pints: f64,

    /// Union of participants active that day, sorted
    pub participants: Vec<String>,
}

/// Calendar-bucketed rollups plus the chronological time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateInfo {
    pub pints_per_day_of_the_week: Vec<CalendarBucket>,
    pub pints_per_week_of_the_year: Vec<CalendarBucket>,
    pub pints_per_month_of_the_year: Vec<CalendarBucket>,
    pub time_series_entry_info: Vec<TimeSeriesEntry>,
    pub time_series_date_info: BTreeMap<NaiveDate, DayRollup>,
}

/// Per-friend totals, rank, and friend-by-location cross-tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendInfo {
    /// Pints over every record this friend participated in
    pub pint_count: f64,

    /// Minimum rank over `pint_count` descending
    pub pint_count_rank: u32,

    /// Location name to pints consumed there with this friend present
    pub pub_frequency: BTreeMap<String, f64>,
}

/// The full statistics report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_quantity: f64,
    pub brand_totals: Vec<BrandTotal>,
    pub location_info: BTreeMap<String, LocationInfo>,
    pub date_info: DateInfo,
    pub friends_info: BTreeMap<String, FriendInfo>,
}
