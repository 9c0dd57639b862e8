//! Picking the ground-truth rows that belong to one evaluation unit.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::config::{SelectionConfig, UnitConfig};
use crate::error::LinkageError;
use crate::ingest::GroundTruthRow;
use crate::model::Record;

/// Parse with a `chrono` format. Date-only formats resolve to midnight.
pub fn parse_timestamp(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, format).ok().or_else(|| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Records whose raw cells match the unit key, in input order.
///
/// A row is selected when it equals the key on every `all_of` column, on at
/// least one `any_of` column (if any are configured), and on the timestamp
/// column once both sides are parsed. Ground-truth timestamps that fail to
/// parse never match.
pub fn select_ground_truth(
    rows: &[GroundTruthRow],
    unit: &UnitConfig,
    selection: &SelectionConfig,
) -> Result<Vec<Record>, LinkageError> {
    let target = match &selection.timestamp {
        Some(ts) => {
            let raw = unit.key.get(&ts.column).ok_or_else(|| {
                LinkageError::ConfigValidation(format!(
                    "unit '{}': key is missing '{}'",
                    unit.name, ts.column
                ))
            })?;
            let parsed = parse_timestamp(raw, &ts.unit_format).ok_or_else(|| {
                LinkageError::ConfigValidation(format!(
                    "unit '{}': cannot parse '{raw}' with format '{}'",
                    unit.name, ts.unit_format
                ))
            })?;
            Some((ts, parsed + Duration::hours(ts.offset_hours)))
        }
        None => None,
    };

    let cell_matches = |row: &GroundTruthRow, column: &String| match (
        row.raw_fields.get(column),
        unit.key.get(column),
    ) {
        (Some(cell), Some(key)) => cell.trim() == key.trim(),
        _ => false,
    };

    let selected: Vec<Record> = rows
        .iter()
        .filter(|row| selection.all_of.iter().all(|c| cell_matches(*row, c)))
        .filter(|row| {
            selection.any_of.is_empty() || selection.any_of.iter().any(|c| cell_matches(*row, c))
        })
        .filter(|row| match &target {
            Some((ts, when)) => row
                .raw_fields
                .get(&ts.column)
                .and_then(|cell| parse_timestamp(cell, &ts.format))
                .is_some_and(|t| t == *when),
            None => true,
        })
        .map(|row| row.record.clone())
        .collect();

    if selected.is_empty() {
        return Err(LinkageError::Selection {
            unit: unit.name.clone(),
        });
    }

    tracing::debug!(unit = %unit.name, rows = selected.len(), "ground truth selected");
    Ok(selected)
}
