//! Turning raw inputs into typed records.
//!
//! Ground truth arrives as CSV, candidates as the extraction service's JSON
//! payload. Both go through the same per-kind coercion, so the core only ever
//! sees numbers, text, and the two missing-value sentinels.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{NormalizeConfig, ScoringConfig};
use crate::error::LinkageError;
use crate::model::{FieldKind, FieldValue, Record, Role};

/// A ground-truth CSV row: the typed record plus every raw cell, which unit
/// selection reads.
#[derive(Debug, Clone)]
pub struct GroundTruthRow {
    pub record: Record,
    pub raw_fields: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce one raw cell to a typed value.
///
/// Numeric: empty, placeholder, unparsable and non-finite cells become Absent.
/// Text: empty and placeholder cells become Unspecified; real text is trimmed.
pub fn coerce_cell(cell: &str, kind: FieldKind, role: Role, normalize: &NormalizeConfig) -> FieldValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() || normalize.is_placeholder(trimmed) {
        return FieldValue::missing(kind);
    }

    match kind {
        FieldKind::Numeric => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => number(n, role, normalize),
            _ => FieldValue::Absent,
        },
        FieldKind::Text => FieldValue::text(trimmed),
    }
}

fn number(n: f64, role: Role, normalize: &NormalizeConfig) -> FieldValue {
    if role == Role::Candidate && normalize.candidate_zero_as_absent && n == 0.0 {
        FieldValue::Absent
    } else {
        FieldValue::Number(n)
    }
}

fn coerce_json(
    value: &Value,
    kind: FieldKind,
    normalize: &NormalizeConfig,
    row: usize,
    field: &str,
) -> Result<FieldValue, LinkageError> {
    let coerced = match value {
        Value::Null => FieldValue::missing(kind),
        Value::String(s) => coerce_cell(s, kind, Role::Candidate, normalize),
        Value::Number(n) => match kind {
            FieldKind::Numeric => n
                .as_f64()
                .filter(|x| x.is_finite())
                .map(|x| number(x, Role::Candidate, normalize))
                .unwrap_or(FieldValue::Absent),
            FieldKind::Text => FieldValue::text(n.to_string()),
        },
        Value::Bool(b) => match kind {
            FieldKind::Numeric => FieldValue::Absent,
            FieldKind::Text => FieldValue::text(b.to_string()),
        },
        Value::Array(_) | Value::Object(_) => {
            return Err(LinkageError::Decode(format!(
                "offer {row}, field '{field}': nested values are not supported"
            )));
        }
    };
    Ok(coerced)
}

// ---------------------------------------------------------------------------
// Ground truth (CSV)
// ---------------------------------------------------------------------------

/// Load labeled rows. Headers must include every scoring field and every
/// column in `extra_columns` (the selection keys).
pub fn load_ground_truth(
    csv_data: &str,
    scoring: &ScoringConfig,
    normalize: &NormalizeConfig,
    extra_columns: &[&str],
) -> Result<Vec<GroundTruthRow>, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let idx = |name: &str| -> Result<usize, LinkageError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LinkageError::MissingColumn {
                role: Role::GroundTruth,
                column: name.into(),
            })
    };

    let fields: Vec<(String, FieldKind, usize)> = scoring
        .resolved_fields()?
        .into_iter()
        .map(|(name, kind, _)| Ok((name.to_string(), kind, idx(name)?)))
        .collect::<Result<_, LinkageError>>()?;

    for column in extra_columns {
        idx(column)?;
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;

        let typed: Record = fields
            .iter()
            .map(|(name, kind, i)| {
                let cell = record.get(*i).unwrap_or("");
                (name.clone(), coerce_cell(cell, *kind, Role::GroundTruth, normalize))
            })
            .collect();

        let raw_fields = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| record.get(i).map(|v| (h.clone(), v.to_string())))
            .collect();

        rows.push(GroundTruthRow {
            record: typed,
            raw_fields,
        });
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Candidates (JSON)
// ---------------------------------------------------------------------------

/// Decode an extraction payload: a JSON object holding an array of offer
/// objects under `offers_key`.
pub fn decode_candidates(
    payload: &str,
    offers_key: &str,
    scoring: &ScoringConfig,
    normalize: &NormalizeConfig,
) -> Result<Vec<Record>, LinkageError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| LinkageError::Decode(format!("invalid JSON: {e}")))?;
    decode_candidate_value(&value, offers_key, scoring, normalize)
}

/// Same as [`decode_candidates`] for an already-parsed payload.
pub fn decode_candidate_value(
    value: &Value,
    offers_key: &str,
    scoring: &ScoringConfig,
    normalize: &NormalizeConfig,
) -> Result<Vec<Record>, LinkageError> {
    let object = value
        .as_object()
        .ok_or_else(|| LinkageError::Decode("payload is not a JSON object".into()))?;
    let offers = object
        .get(offers_key)
        .ok_or_else(|| LinkageError::Decode(format!("missing key '{offers_key}'")))?
        .as_array()
        .ok_or_else(|| LinkageError::Decode(format!("'{offers_key}' is not an array")))?;

    let fields = scoring.resolved_fields()?;

    offers
        .iter()
        .enumerate()
        .map(|(row, offer)| {
            let offer = offer
                .as_object()
                .ok_or_else(|| LinkageError::Decode(format!("offer {row} is not an object")))?;
            fields
                .iter()
                .map(|&(field, kind, _)| {
                    let raw = offer.get(field).ok_or_else(|| LinkageError::MissingField {
                        role: Role::Candidate,
                        row,
                        field: field.to_string(),
                    })?;
                    Ok((field.to_string(), coerce_json(raw, kind, normalize, row, field)?))
                })
                .collect::<Result<Record, LinkageError>>()
        })
        .collect()
}
