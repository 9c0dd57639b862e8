use crate::config::ScoringConfig;
use crate::matcher::MatchOutcome;
use crate::model::{BatchSummary, Comparison, FieldMean, UnitSummary};

/// Compute summary statistics for one evaluated unit.
///
/// Means over an empty set are reported as 0.
pub fn compute_summary(
    outcome: &MatchOutcome,
    comparisons: &[Comparison],
    scoring: &ScoringConfig,
) -> UnitSummary {
    let linkage = &outcome.linkage;
    let matched_rows = linkage.matched_count();
    let unmatched_candidates = linkage.unmatched_candidates().len();

    let mean_similarity = mean(comparisons.iter().map(|c| c.similarity));

    let field_means = scoring
        .fields
        .iter()
        .map(|field| FieldMean {
            field: field.clone(),
            mean: mean(
                comparisons
                    .iter()
                    .filter(|c| &c.field == field)
                    .map(|c| c.similarity),
            ),
        })
        .collect();

    let mean_row_score = if matched_rows == 0 {
        None
    } else {
        Some(mean(
            linkage.matched_pairs().map(|(i, j)| outcome.matrix.get(i, j)),
        ))
    };

    UnitSummary {
        ground_truth_rows: linkage.links.len(),
        candidate_rows: linkage.candidate_count,
        matched_rows,
        unmatched_ground_truth: linkage.links.len() - matched_rows,
        unmatched_candidates,
        comparisons: comparisons.len(),
        mean_similarity,
        mean_row_score,
        field_means,
    }
}

/// Roll unit summaries up; the overall mean weighs each unit by its comparison count.
pub fn summarize_batch(units: &[UnitSummary]) -> BatchSummary {
    let comparisons: usize = units.iter().map(|u| u.comparisons).sum();
    let weighted: f64 = units
        .iter()
        .map(|u| u.mean_similarity * u.comparisons as f64)
        .sum();

    BatchSummary {
        units: units.len(),
        comparisons,
        mean_similarity: if comparisons == 0 {
            0.0
        } else {
            weighted / comparisons as f64
        },
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
