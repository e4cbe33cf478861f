//! Raw spreadsheet-row normalization.
//!
//! The source data is a shared spreadsheet export: stringly-typed rows
//! with a `DD/MM/YYYY` date, a comma-separated company column, and
//! free-form cost cells. This module turns those rows into clean
//! [`SessionRecord`]s; everything downstream assumes its output.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::IngestSettings;
use crate::models::SessionRecord;

/// Errors from raw-row normalization.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Row {row}: invalid date '{value}' (expected DD/MM/YYYY)")]
    BadDate { row: usize, value: String },

    #[error("Row {row}: invalid number in column '{column}': '{value}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// One raw spreadsheet row, named after the sheet's column headers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date", default)]
    pub date: String,

    #[serde(rename = "Location", default)]
    pub location: String,

    /// Comma-separated friend names
    #[serde(rename = "Company", default)]
    pub company: String,

    #[serde(rename = "Number", default)]
    pub number: String,

    /// Drink brand
    #[serde(rename = "Pint", default)]
    pub pint: String,

    #[serde(rename = "Pint Cost", default)]
    pub pint_cost: String,

    #[serde(rename = "Total Cost", default)]
    pub total_cost: String,

    #[serde(rename = "Comment", default)]
    pub comment: String,
}

/// Normalize raw rows into session records.
///
/// Rows with a blank date are spreadsheet padding and are skipped;
/// every other malformation fails the batch with its row number.
/// Participant names are split on commas, trimmed, renamed through the
/// configured canonical map, and deduplicated.
pub fn normalize_rows(
    rows: &[RawRow],
    settings: &IngestSettings,
) -> Result<Vec<SessionRecord>, IngestError> {
    let mut records = Vec::with_capacity(rows.len());

    for (i, raw) in rows.iter().enumerate() {
        let row = i + 1;

        if raw.date.trim().is_empty() {
            debug!("Skipping row {} with blank date", row);
            continue;
        }

        let date = NaiveDate::parse_from_str(raw.date.trim(), "%d/%m/%Y").map_err(|_| {
            IngestError::BadDate {
                row,
                value: raw.date.clone(),
            }
        })?;

        let quantity = parse_number(&raw.number, row, "Number")?;
        let unit_cost = parse_optional_number(&raw.pint_cost, row, "Pint Cost")?;
        let total_cost = parse_optional_number(&raw.total_cost, row, "Total Cost")?;

        let participants: Vec<String> = raw
            .company
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                settings
                    .friend_renames
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            })
            .collect();

        let mut record = SessionRecord::new(
            date,
            raw.location.trim().to_string(),
            participants,
            quantity,
        )
        .with_costs(unit_cost, total_cost);

        let brand = raw.pint.trim();
        if !brand.is_empty() {
            record = record.with_brand(brand.to_string());
        }
        let comment = raw.comment.trim();
        if !comment.is_empty() {
            record = record.with_comment(comment.to_string());
        }

        records.push(record);
    }

    Ok(records)
}

fn parse_number(value: &str, row: usize, column: &'static str) -> Result<f64, IngestError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| IngestError::BadNumber {
            row,
            column,
            value: value.to_string(),
        })
}

fn parse_optional_number(
    value: &str,
    row: usize,
    column: &'static str,
) -> Result<Option<f64>, IngestError> {
    let trimmed = value.trim().trim_start_matches('£');
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| IngestError::BadNumber {
            row,
            column,
            value: value.to_string(),
        })
}
