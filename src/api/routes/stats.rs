use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{self, ReportOutcome};
use crate::models::{FriendInfo, LocationInfo, Report, SessionRecord};
use crate::storage::{self, EntityType, JsonlReader};

#[derive(Debug, Serialize)]
pub struct FriendsStatsResponse {
    pub friends_info: BTreeMap<String, FriendInfo>,
}

#[derive(Debug, Serialize)]
pub struct LocationStatsResponse {
    pub location_info: BTreeMap<String, LocationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocode_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FullReportResponse {
    #[serde(flatten)]
    pub report: Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocode_error: Option<String>,
}

fn load_records(state: &AppState) -> Result<Vec<SessionRecord>, ApiError> {
    let reader = JsonlReader::<SessionRecord>::for_entity(&state.storage, EntityType::Record);
    Ok(reader.read_all()?)
}

/// Runs a full enrichment pass and persists whatever the snapshot learned,
/// so later reports skip lookups for locations already resolved.
async fn enriched_report(state: &AppState) -> Result<ReportOutcome, ApiError> {
    let records = load_records(state)?;

    let mut geo = state.geo.write().await;
    let outcome = calculate::generate_report(&records, &geo, state.geocoder.as_ref()).await?;

    if outcome.geo_snapshot != *geo {
        *geo = outcome.geo_snapshot.clone();
        storage::write_geo_snapshot(&state.storage, &geo)?;
    }

    Ok(outcome)
}

/// GET /api/stats/friends
///
/// Friend totals, ranks, and per-pub frequencies. Never touches the
/// geocoding provider.
pub async fn friends_stats(
    State(state): State<AppState>,
) -> Result<Json<FriendsStatsResponse>, ApiError> {
    let records = load_records(&state)?;
    let geo = state.geo.read().await;
    let report = calculate::compute_report(&records, &geo)?;

    Ok(Json(FriendsStatsResponse {
        friends_info: report.friends_info,
    }))
}

/// GET /api/stats/location
pub async fn location_stats(
    State(state): State<AppState>,
) -> Result<Json<LocationStatsResponse>, ApiError> {
    let outcome = enriched_report(&state).await?;

    Ok(Json(LocationStatsResponse {
        location_info: outcome.report.location_info,
        geocode_error: outcome.geocode_error,
    }))
}

/// GET /api/stats/report
pub async fn full_report(
    State(state): State<AppState>,
) -> Result<Json<FullReportResponse>, ApiError> {
    let outcome = enriched_report(&state).await?;
    info!(
        "Generated full report: {} total pints across {} locations",
        outcome.report.total_quantity,
        outcome.report.location_info.len()
    );

    Ok(Json(FullReportResponse {
        report: outcome.report,
        geocode_error: outcome.geocode_error,
    }))
}
