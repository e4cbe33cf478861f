//! Statistics calculation engine.
//!
//! Turns a flat batch of session records into the five report sections:
//! totals, brand totals, location summaries, calendar/time-series rollups,
//! and per-friend statistics. All computation here is deterministic and
//! pure; the only I/O is the geocode resolution step in
//! [`generate_report`], which consults the prior snapshot before touching
//! the network.

pub mod aggregate;
pub mod rank;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::geocode::{self, Geocoder};
use crate::models::{
    BrandTotal, CalendarBucket, DateInfo, DayRollup, FriendInfo, GeoSnapshot, LocationInfo,
    Report, SessionRecord, TimeSeriesEntry,
};

pub use aggregate::{aggregate, GroupRow, Reduced, Reducer};
pub use rank::{rank_descending, Ranked};

/// Errors from report computation.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// A computed report together with the snapshot to persist for the next
/// run and any geocode degradation that occurred.
#[derive(Debug)]
pub struct ReportOutcome {
    pub report: Report,

    /// The new authoritative geocoordinate snapshot
    pub geo_snapshot: GeoSnapshot,

    /// Set when coordinate enrichment was degraded by a provider error;
    /// the report still carries whatever the prior snapshot held.
    pub geocode_error: Option<String>,
}

/// Validate a batch before aggregation.
///
/// A malformed record fails the whole batch with its position; partial
/// aggregation over a corrupt batch is never produced.
pub fn validate(records: &[SessionRecord]) -> Result<(), ReportError> {
    for (index, record) in records.iter().enumerate() {
        let fail = |reason: &str| ReportError::InvalidRecord {
            index,
            reason: reason.to_string(),
        };

        if record.location.trim().is_empty() {
            return Err(fail("blank location"));
        }
        if !record.quantity.is_finite() {
            return Err(fail("quantity is not finite"));
        }
        if record.quantity < 0.0 {
            return Err(fail("negative quantity"));
        }
        if record.participants.iter().any(|p| p.trim().is_empty()) {
            return Err(fail("blank participant name"));
        }
        if record.unit_cost.is_some_and(|c| c < 0.0) {
            return Err(fail("negative unit cost"));
        }
        if record.total_cost.is_some_and(|c| c < 0.0) {
            return Err(fail("negative total cost"));
        }
    }
    Ok(())
}

/// Compute the full report from a validated batch and an already-resolved
/// geocoordinate snapshot. Pure; no network calls.
pub fn compute_report(
    records: &[SessionRecord],
    geo: &GeoSnapshot,
) -> Result<Report, ReportError> {
    validate(records)?;

    Ok(Report {
        total_quantity: records.iter().map(|r| r.quantity).sum(),
        brand_totals: compute_brand_totals(records),
        location_info: compute_location_info(records, geo),
        date_info: compute_date_info(records),
        friends_info: compute_friends_info(records),
    })
}

/// Orchestrated report run: validate, resolve coordinates through the
/// cache, compute. A geocode provider error degrades enrichment to the
/// cached snapshot instead of blanking out the whole report.
pub async fn generate_report(
    records: &[SessionRecord],
    snapshot: &GeoSnapshot,
    geocoder: &dyn Geocoder,
) -> Result<ReportOutcome, ReportError> {
    validate(records)?;

    let locations: BTreeSet<String> = records.iter().map(|r| r.location.clone()).collect();
    let (geo_snapshot, geocode_error) =
        match geocode::resolve(&locations, snapshot, geocoder).await {
            Ok(updated) => (updated, None),
            Err(e) => {
                warn!("geocode resolution failed, using cached coordinates: {}", e);
                (snapshot.clone(), Some(e.to_string()))
            }
        };

    let report = compute_report(records, &geo_snapshot)?;
    Ok(ReportOutcome {
        report,
        geo_snapshot,
        geocode_error,
    })
}

// ── Section helpers ─────────────────────────────────────────────

struct BrandRow {
    brand: String,
    quantity: f64,
}

fn compute_brand_totals(records: &[SessionRecord]) -> Vec<BrandTotal> {
    let rows: Vec<BrandRow> = records
        .iter()
        .filter_map(|r| {
            r.brand.as_ref().map(|brand| BrandRow {
                brand: brand.clone(),
                quantity: r.quantity,
            })
        })
        .collect();

    let groups = aggregate(
        &rows,
        |r| r.brand.clone(),
        &[Reducer::sum(|r: &BrandRow| r.quantity)],
    );

    let mut totals: Vec<BrandTotal> = groups
        .into_iter()
        .map(|g| BrandTotal {
            count: g.values[0].as_sum(),
            name: g.key,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.count
            .partial_cmp(&a.count)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    totals
}

struct LocationRow {
    location: String,
    date: NaiveDate,
    quantity: f64,
}

fn compute_location_info(
    records: &[SessionRecord],
    geo: &GeoSnapshot,
) -> BTreeMap<String, LocationInfo> {
    let rows: Vec<LocationRow> = records
        .iter()
        .map(|r| LocationRow {
            location: r.location.clone(),
            date: r.date,
            quantity: r.quantity,
        })
        .collect();

    let groups = aggregate(
        &rows,
        |r| r.location.clone(),
        &[
            Reducer::count_distinct(|r: &LocationRow| r.date.to_string()),
            Reducer::sum(|r: &LocationRow| r.quantity),
        ],
    );

    let mut visits: BTreeMap<String, u32> = BTreeMap::new();
    let mut pints: Vec<(String, f64)> = Vec::with_capacity(groups.len());
    for group in groups {
        visits.insert(group.key.clone(), group.values[0].as_count());
        pints.push((group.key, group.values[1].as_sum()));
    }

    rank_descending(pints)
        .into_iter()
        .map(|ranked| {
            let coordinates = geo.get(&ranked.key).and_then(|res| res.coordinate());
            let info = LocationInfo {
                number_of_visits: visits[&ranked.key],
                number_of_pints: ranked.value,
                number_of_pints_rank: ranked.rank,
                coordinates,
            };
            (ranked.key, info)
        })
        .collect()
}

struct BucketRow {
    name: String,
    quantity: f64,
    brand: Option<String>,
}

fn compute_date_info(records: &[SessionRecord]) -> DateInfo {
    DateInfo {
        pints_per_day_of_the_week: calendar_buckets(records, "%A"),
        pints_per_week_of_the_year: calendar_buckets(records, "%U"),
        pints_per_month_of_the_year: calendar_buckets(records, "%B"),
        time_series_entry_info: time_series(records),
        time_series_date_info: day_rollups(&time_series(records)),
    }
}

fn calendar_buckets(records: &[SessionRecord], format: &str) -> Vec<CalendarBucket> {
    let rows: Vec<BucketRow> = records
        .iter()
        .map(|r| BucketRow {
            name: r.date.format(format).to_string(),
            quantity: r.quantity,
            brand: r.brand.clone(),
        })
        .collect();

    let groups = aggregate(
        &rows,
        |r| r.name.clone(),
        &[
            Reducer::sum(|r: &BucketRow| r.quantity),
            Reducer::mode(|r: &BucketRow| r.brand.clone()),
        ],
    );

    let mut buckets: Vec<CalendarBucket> = groups
        .into_iter()
        .map(|g| CalendarBucket {
            number_of_pints: g.values[0].as_sum(),
            most_popular_drink: g.values[1].as_mode().map(str::to_string),
            name: g.key,
        })
        .collect();
    buckets.sort_by(|a, b| a.name.cmp(&b.name));
    buckets
}

struct SeriesRow {
    date: NaiveDate,
    participants: Vec<String>,
    quantity: f64,
}

fn time_series(records: &[SessionRecord]) -> Vec<TimeSeriesEntry> {
    let mut rows: Vec<SeriesRow> = records
        .iter()
        .map(|r| SeriesRow {
            date: r.date,
            participants: r.participants.clone(),
            quantity: r.quantity,
        })
        .collect();
    // Aggregate emits groups in first-seen order, so sorting the rows here
    // fixes both the series order and the running total.
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.participants.cmp(&b.participants))
    });

    let groups = aggregate(
        &rows,
        |r| (r.date, r.participants.clone()),
        &[
            Reducer::sum(|r: &SeriesRow| r.quantity),
            Reducer::running_sum(|r: &SeriesRow| r.quantity),
        ],
    );

    groups
        .into_iter()
        .map(|g| TimeSeriesEntry {
            date: g.key.0,
            participants: g.key.1,
            number_of_pints: g.values[0].as_sum(),
            cumulative_pints: g.values[1].as_sum(),
        })
        .collect()
}

fn day_rollups(series: &[TimeSeriesEntry]) -> BTreeMap<NaiveDate, DayRollup> {
    let mut rollups: BTreeMap<NaiveDate, DayRollup> = BTreeMap::new();

    for entry in series {
        let rollup = rollups.entry(entry.date).or_insert_with(|| DayRollup {
            number_of_pints: 0.0,
            cumulative_pints: 0.0,
            participants: Vec::new(),
        });
        rollup.number_of_pints += entry.number_of_pints;
        // Entries arrive in series order, so the last one seen for a date
        // carries the cumulative total as of end of day.
        rollup.cumulative_pints = entry.cumulative_pints;
        rollup.participants.extend(entry.participants.clone());
    }

    for rollup in rollups.values_mut() {
        rollup.participants.sort();
        rollup.participants.dedup();
    }
    rollups
}

struct FriendRow {
    friend: String,
    location: String,
    quantity: f64,
}

fn compute_friends_info(records: &[SessionRecord]) -> BTreeMap<String, FriendInfo> {
    // Explode each record into one row per participant; the quantity is
    // shared, not divided.
    let rows: Vec<FriendRow> = records
        .iter()
        .flat_map(|r| {
            r.participants.iter().map(|friend| FriendRow {
                friend: friend.clone(),
                location: r.location.clone(),
                quantity: r.quantity,
            })
        })
        .collect();

    // Friend x location cross-tab first, then regroup by friend.
    let pair_groups = aggregate(
        &rows,
        |r| (r.friend.clone(), r.location.clone()),
        &[Reducer::sum(|r: &FriendRow| r.quantity)],
    );
    let mut pub_frequency: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for group in pair_groups {
        let (friend, location) = group.key;
        pub_frequency
            .entry(friend)
            .or_default()
            .insert(location, group.values[0].as_sum());
    }

    let friend_groups = aggregate(
        &rows,
        |r| r.friend.clone(),
        &[Reducer::sum(|r: &FriendRow| r.quantity)],
    );
    let counts: Vec<(String, f64)> = friend_groups
        .into_iter()
        .map(|g| (g.key, g.values[0].as_sum()))
        .collect();

    rank_descending(counts)
        .into_iter()
        .map(|ranked| {
            let frequency = pub_frequency.remove(&ranked.key).unwrap_or_default();
            let info = FriendInfo {
                pint_count: ranked.value,
                pint_count_rank: ranked.rank,
                pub_frequency: frequency,
            };
            (ranked.key, info)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoResolution;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(
        date_str: &str,
        location: &str,
        participants: &[&str],
        quantity: f64,
    ) -> SessionRecord {
        SessionRecord::new(
            date(date_str),
            location.to_string(),
            participants.iter().map(|s| s.to_string()).collect(),
            quantity,
        )
    }

    fn sample_batch() -> Vec<SessionRecord> {
        vec![
            record("2024-01-01", "Pub A", &["Alice", "Bob"], 4.0),
            record("2024-01-02", "Pub A", &["Alice"], 2.0),
        ]
    }

    #[test]
    fn test_two_record_scenario() {
        let report = compute_report(&sample_batch(), &GeoSnapshot::new()).unwrap();

        assert_eq!(report.total_quantity, 6.0);

        let pub_a = &report.location_info["Pub A"];
        assert_eq!(pub_a.number_of_visits, 2);
        assert_eq!(pub_a.number_of_pints, 6.0);
        assert_eq!(pub_a.number_of_pints_rank, 1);

        let alice = &report.friends_info["Alice"];
        assert_eq!(alice.pint_count, 6.0);
        assert_eq!(alice.pint_count_rank, 1);
        assert_eq!(alice.pub_frequency["Pub A"], 6.0);

        let bob = &report.friends_info["Bob"];
        assert_eq!(bob.pint_count, 4.0);
        assert_eq!(bob.pint_count_rank, 2);
        assert_eq!(bob.pub_frequency["Pub A"], 4.0);
    }

    #[test]
    fn test_location_pints_sum_to_total() {
        let records = vec![
            record("2024-01-01", "Pub A", &["Alice"], 4.0),
            record("2024-01-02", "Pub B", &["Bob"], 2.5),
            record("2024-01-03", "Pub C", &[], 1.0),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();

        let location_sum: f64 = report
            .location_info
            .values()
            .map(|l| l.number_of_pints)
            .sum();
        assert_eq!(location_sum, report.total_quantity);
    }

    #[test]
    fn test_friend_totals_consistent_with_records() {
        let records = vec![
            record("2024-01-01", "Pub A", &["Alice", "Bob"], 3.0),
            record("2024-01-05", "Pub B", &["Alice", "Carol"], 2.0),
            record("2024-01-06", "Pub B", &["Carol"], 1.5),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();

        for (name, info) in &report.friends_info {
            let expected: f64 = records
                .iter()
                .filter(|r| r.participants.iter().any(|p| p == name))
                .map(|r| r.quantity)
                .sum();
            assert_eq!(info.pint_count, expected, "mismatch for {}", name);
        }
    }

    #[test]
    fn test_brand_totals_sorted_descending() {
        let records = vec![
            record("2024-01-01", "Pub A", &[], 1.0).with_brand("IPA".to_string()),
            record("2024-01-02", "Pub A", &[], 5.0).with_brand("Stout".to_string()),
            record("2024-01-03", "Pub A", &[], 2.0).with_brand("IPA".to_string()),
            record("2024-01-04", "Pub A", &[], 1.5),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();

        assert_eq!(report.brand_totals.len(), 2);
        assert_eq!(report.brand_totals[0].name, "Stout");
        assert_eq!(report.brand_totals[0].count, 5.0);
        assert_eq!(report.brand_totals[1].name, "IPA");
        assert_eq!(report.brand_totals[1].count, 3.0);
    }

    #[test]
    fn test_brand_total_ties_ordered_by_name() {
        let records = vec![
            record("2024-01-01", "Pub A", &[], 2.0).with_brand("Zeta".to_string()),
            record("2024-01-02", "Pub A", &[], 2.0).with_brand("Alpha".to_string()),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        assert_eq!(report.brand_totals[0].name, "Alpha");
        assert_eq!(report.brand_totals[1].name, "Zeta");
    }

    #[test]
    fn test_location_visits_count_distinct_dates() {
        let records = vec![
            record("2024-01-01", "Pub A", &[], 1.0),
            record("2024-01-01", "Pub A", &[], 2.0),
            record("2024-01-02", "Pub A", &[], 1.0),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        assert_eq!(report.location_info["Pub A"].number_of_visits, 2);
    }

    #[test]
    fn test_location_coordinates_from_snapshot() {
        let mut geo = GeoSnapshot::new();
        geo.insert(
            "Pub A".to_string(),
            GeoResolution::Found {
                longitude: -0.12,
                latitude: 51.51,
            },
        );
        geo.insert("Pub B".to_string(), GeoResolution::NotFound);

        let records = vec![
            record("2024-01-01", "Pub A", &[], 1.0),
            record("2024-01-02", "Pub B", &[], 1.0),
            record("2024-01-03", "Pub C", &[], 1.0),
        ];
        let report = compute_report(&records, &geo).unwrap();

        assert!(report.location_info["Pub A"].coordinates.is_some());
        assert!(report.location_info["Pub B"].coordinates.is_none());
        assert!(report.location_info["Pub C"].coordinates.is_none());
    }

    #[test]
    fn test_calendar_buckets() {
        // 2024-01-01 is a Monday; 2024-01-06 is a Saturday.
        let records = vec![
            record("2024-01-01", "Pub A", &[], 2.0).with_brand("IPA".to_string()),
            record("2024-01-06", "Pub A", &[], 3.0).with_brand("Stout".to_string()),
            record("2024-01-08", "Pub A", &[], 1.0).with_brand("IPA".to_string()),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        let days = &report.date_info.pints_per_day_of_the_week;

        let monday = days.iter().find(|b| b.name == "Monday").unwrap();
        assert_eq!(monday.number_of_pints, 3.0);
        assert_eq!(monday.most_popular_drink.as_deref(), Some("IPA"));

        let saturday = days.iter().find(|b| b.name == "Saturday").unwrap();
        assert_eq!(saturday.number_of_pints, 3.0);

        let months = &report.date_info.pints_per_month_of_the_year;
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].name, "January");
        assert_eq!(months[0].number_of_pints, 6.0);
    }

    #[test]
    fn test_time_series_cumulative_in_date_order() {
        let records = vec![
            record("2024-01-03", "Pub B", &["Alice"], 1.0),
            record("2024-01-01", "Pub A", &["Alice", "Bob"], 4.0),
            record("2024-01-02", "Pub A", &["Alice"], 2.0),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        let series = &report.date_info.time_series_entry_info;

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, date("2024-01-01"));
        assert_eq!(series[0].cumulative_pints, 4.0);
        assert_eq!(series[1].cumulative_pints, 6.0);
        assert_eq!(series[2].cumulative_pints, 7.0);
    }

    #[test]
    fn test_time_series_groups_same_day_same_company() {
        let records = vec![
            record("2024-01-01", "Pub A", &["Alice"], 1.0),
            record("2024-01-01", "Pub B", &["Alice"], 2.0),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        let series = &report.date_info.time_series_entry_info;

        // Same date and participant set collapse into one entry.
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].number_of_pints, 3.0);
    }

    #[test]
    fn test_day_rollup_union_and_end_of_day_cumulative() {
        let records = vec![
            record("2024-01-01", "Pub A", &["Alice"], 1.0),
            record("2024-01-01", "Pub B", &["Bob"], 2.0),
            record("2024-01-02", "Pub A", &["Carol"], 3.0),
        ];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();
        let rollups = &report.date_info.time_series_date_info;

        let day1 = &rollups[&date("2024-01-01")];
        assert_eq!(day1.number_of_pints, 3.0);
        assert_eq!(day1.cumulative_pints, 3.0);
        assert_eq!(day1.participants, vec!["Alice", "Bob"]);

        let day2 = &rollups[&date("2024-01-02")];
        assert_eq!(day2.number_of_pints, 3.0);
        assert_eq!(day2.cumulative_pints, 6.0);
    }

    #[test]
    fn test_validation_rejects_blank_location() {
        let mut records = sample_batch();
        records[1].location = "  ".to_string();

        let err = compute_report(&records, &GeoSnapshot::new()).unwrap_err();
        let ReportError::InvalidRecord { index, reason } = err;
        assert_eq!(index, 1);
        assert!(reason.contains("location"));
    }

    #[test]
    fn test_validation_rejects_negative_quantity() {
        let mut records = sample_batch();
        records[0].quantity = -1.0;

        let err = validate(&records).unwrap_err();
        let ReportError::InvalidRecord { index, .. } = err;
        assert_eq!(index, 0);
    }

    #[test]
    fn test_validation_rejects_non_finite_quantity() {
        let mut records = sample_batch();
        records[0].quantity = f64::NAN;
        assert!(validate(&records).is_err());
    }

    #[test]
    fn test_empty_batch_produces_empty_report() {
        let report = compute_report(&[], &GeoSnapshot::new()).unwrap();

        assert_eq!(report.total_quantity, 0.0);
        assert!(report.brand_totals.is_empty());
        assert!(report.location_info.is_empty());
        assert!(report.friends_info.is_empty());
        assert!(report.date_info.time_series_entry_info.is_empty());
    }

    #[test]
    fn test_solo_sessions_count_toward_totals_not_friends() {
        let records = vec![record("2024-01-01", "Pub A", &[], 2.0)];
        let report = compute_report(&records, &GeoSnapshot::new()).unwrap();

        assert_eq!(report.total_quantity, 2.0);
        assert!(report.friends_info.is_empty());
        assert_eq!(report.location_info["Pub A"].number_of_pints, 2.0);
    }

    #[tokio::test]
    async fn test_generate_report_degrades_on_provider_error() {
        let mut snapshot = GeoSnapshot::new();
        snapshot.insert(
            "Pub A".to_string(),
            GeoResolution::Found {
                longitude: -0.1,
                latitude: 51.5,
            },
        );

        let geocoder = crate::geocode::testing::FailingGeocoder;
        let records = vec![
            record("2024-01-01", "Pub A", &["Alice"], 1.0),
            record("2024-01-02", "Pub B", &["Alice"], 1.0),
        ];

        let outcome = generate_report(&records, &snapshot, &geocoder)
            .await
            .unwrap();

        assert!(outcome.geocode_error.is_some());
        // Cached coordinate survives; the unknown location stays bare.
        assert!(outcome.report.location_info["Pub A"].coordinates.is_some());
        assert!(outcome.report.location_info["Pub B"].coordinates.is_none());
        assert_eq!(outcome.geo_snapshot, snapshot);
    }

    #[tokio::test]
    async fn test_generate_report_returns_updated_snapshot() {
        let geocoder = crate::geocode::testing::MockGeocoder::with_found("Pub A", -0.1, 51.5);
        let records = vec![record("2024-01-01", "Pub A", &["Alice"], 1.0)];

        let outcome = generate_report(&records, &GeoSnapshot::new(), &geocoder)
            .await
            .unwrap();

        assert!(outcome.geocode_error.is_none());
        assert!(outcome.geo_snapshot.contains_key("Pub A"));
        assert!(outcome.report.location_info["Pub A"].coordinates.is_some());
    }
}
