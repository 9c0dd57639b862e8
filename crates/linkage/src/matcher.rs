use rayon::prelude::*;

use crate::assignment::{max_weight_assignment, ScoreMatrix};
use crate::config::ScoringConfig;
use crate::error::LinkageError;
use crate::model::{Linkage, Record};
use crate::row::{row_similarity, RowScore};

/// Above this many rows on either side the O(n²·m) solve gets slow; callers are
/// expected to split such inputs before they reach the matcher.
pub const CAPACITY_WARN_ROWS: usize = 1_000;

/// Linkage plus the pairwise scores it was solved from.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub linkage: Linkage,
    pub matrix: ScoreMatrix,
    /// Row-major `n × m` per-field breakdowns behind `matrix`.
    pub row_scores: Vec<RowScore>,
}

impl MatchOutcome {
    pub fn row_score(&self, ground_truth: usize, candidate: usize) -> &RowScore {
        &self.row_scores[ground_truth * self.matrix.cols() + candidate]
    }
}

/// Score every (ground truth, candidate) pair. Cells are independent and are
/// computed in parallel.
pub fn build_matrix(
    ground_truth: &[Record],
    candidates: &[Record],
    scoring: &ScoringConfig,
) -> Result<(ScoreMatrix, Vec<RowScore>), LinkageError> {
    let n = ground_truth.len();
    let m = candidates.len();

    if n > CAPACITY_WARN_ROWS || m > CAPACITY_WARN_ROWS {
        tracing::warn!(
            ground_truth = n,
            candidates = m,
            "large evaluation unit; assignment cost grows cubically"
        );
    }

    let row_scores: Vec<RowScore> = (0..n * m)
        .into_par_iter()
        .map(|k| row_similarity(&ground_truth[k / m], &candidates[k % m], scoring))
        .collect::<Result<_, _>>()?;

    let cells = row_scores.iter().map(|s| s.score).collect();
    Ok((ScoreMatrix::new(n, m, cells), row_scores))
}

/// Link ground-truth rows to candidates one-to-one, maximizing total similarity.
///
/// Pairs the solver picks with a score below `min_score` are demoted to
/// unmatched afterwards; the threshold never constrains the solve itself.
pub fn match_records(
    ground_truth: &[Record],
    candidates: &[Record],
    scoring: &ScoringConfig,
) -> Result<MatchOutcome, LinkageError> {
    let n = ground_truth.len();
    let m = candidates.len();

    if n == 0 || m == 0 {
        return Ok(MatchOutcome {
            linkage: Linkage::unmatched(n, m),
            matrix: ScoreMatrix::new(n, m, Vec::new()),
            row_scores: Vec::new(),
        });
    }

    let (matrix, row_scores) = build_matrix(ground_truth, candidates, scoring)?;
    let solved = max_weight_assignment(&matrix);

    let mut demoted = 0usize;
    let links = solved
        .into_iter()
        .enumerate()
        .map(|(i, link)| match link {
            Some(j) if matrix.get(i, j) < scoring.min_score => {
                demoted += 1;
                None
            }
            other => other,
        })
        .collect();

    let linkage = Linkage {
        links,
        candidate_count: m,
    };

    tracing::debug!(
        ground_truth = n,
        candidates = m,
        matched = linkage.matched_count(),
        demoted,
        total = matrix.total(&linkage.links),
        "assignment solved"
    );

    Ok(MatchOutcome {
        linkage,
        matrix,
        row_scores,
    })
}
