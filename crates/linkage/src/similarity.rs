//! Field-level similarity.
//!
//! Scores are in `[0, 1]`. Missing values follow a fixed ladder: both sides
//! missing is a match (1.0), a candidate that omits a value the ground truth has
//! earns half credit (0.5), and a candidate that fills a value the ground truth
//! lacks earns nothing (0.0).

use crate::error::LinkageError;
use crate::model::{FieldKind, FieldValue};

const PARTIAL: f64 = 0.5;

/// Similarity of one field value pair.
///
/// Fails with [`LinkageError::KindMismatch`] when either value's variant does
/// not belong to `kind`.
pub fn field_similarity(
    field: &str,
    kind: FieldKind,
    ground_truth: &FieldValue,
    candidate: &FieldValue,
) -> Result<f64, LinkageError> {
    if ground_truth.kind() != kind || candidate.kind() != kind {
        return Err(LinkageError::KindMismatch {
            field: field.to_string(),
            kind,
        });
    }

    let score = match (ground_truth, candidate) {
        (FieldValue::Absent, FieldValue::Absent) => 1.0,
        (FieldValue::Number(_), FieldValue::Absent) => PARTIAL,
        (FieldValue::Absent, FieldValue::Number(_)) => 0.0,
        (FieldValue::Number(a), FieldValue::Number(b)) => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }

        (FieldValue::Unspecified, FieldValue::Unspecified) => 1.0,
        (FieldValue::Text(_), FieldValue::Unspecified) => PARTIAL,
        (FieldValue::Unspecified, FieldValue::Text(_)) => 0.0,
        (FieldValue::Text(a), FieldValue::Text(b)) => text_similarity(a, b),

        _ => {
            return Err(LinkageError::KindMismatch {
                field: field.to_string(),
                kind,
            })
        }
    };

    Ok(score)
}

/// `1 - distance / max_len` over normalized forms, where distance is the
/// optimal string alignment distance (an adjacent transposition costs one edit).
/// Lengths count chars. Two empty strings score 1.0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::osa_distance(&a, &b) as f64 / max_len as f64
}

/// Lowercase, trim, collapse inner whitespace runs to one space.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
