use crate::config::ScoringConfig;
use crate::error::LinkageError;
use crate::model::{Comparison, FieldValue, Linkage, Record, Role};
use crate::similarity::field_similarity;

/// Flatten a linkage into one comparison row per (row, field).
///
/// Ordering: every ground-truth row in input order (matched or not), fields in
/// configured order; then every candidate no ground-truth row links to, in input
/// order.
///
/// An unlinked ground-truth row is compared against the field's missing sentinel,
/// so it earns the usual partial credit. An unlinked candidate row is extraction
/// noise and scores 0 on every field.
pub fn build_report(
    ground_truth: &[Record],
    candidates: &[Record],
    linkage: &Linkage,
    scoring: &ScoringConfig,
) -> Result<Vec<Comparison>, LinkageError> {
    check_linkage(linkage, ground_truth.len(), candidates.len())?;

    let fields = scoring.resolved_fields()?;
    let unmatched = linkage.unmatched_candidates();
    let mut out = Vec::with_capacity((ground_truth.len() + unmatched.len()) * fields.len());

    for (i, link) in linkage.links.iter().enumerate() {
        let gt_row = ground_truth.get(i).ok_or_else(|| {
            LinkageError::InvalidLinkage(format!("ground-truth row {i} does not exist"))
        })?;
        let cand_row = match link {
            Some(j) => Some(candidates.get(*j).ok_or_else(|| {
                LinkageError::InvalidLinkage(format!("candidate row {j} does not exist"))
            })?),
            None => None,
        };

        for &(field, kind, _) in &fields {
            let gt_value = value(gt_row, Role::GroundTruth, i, field)?;
            let cand_value = match (cand_row, link) {
                (Some(row), Some(j)) => value(row, Role::Candidate, *j, field)?,
                _ => FieldValue::missing(kind),
            };
            let similarity = field_similarity(field, kind, &gt_value, &cand_value)?;

            out.push(Comparison {
                ground_truth_index: Some(i),
                candidate_index: *link,
                field: field.to_string(),
                ground_truth_value: gt_value,
                candidate_value: cand_value,
                similarity,
            });
        }
    }

    for k in unmatched {
        let cand_row = candidates.get(k).ok_or_else(|| {
            LinkageError::InvalidLinkage(format!("candidate row {k} does not exist"))
        })?;
        for &(field, kind, _) in &fields {
            let cand_value = value(cand_row, Role::Candidate, k, field)?;
            if cand_value.kind() != kind {
                return Err(LinkageError::KindMismatch {
                    field: field.to_string(),
                    kind,
                });
            }
            out.push(Comparison {
                ground_truth_index: None,
                candidate_index: Some(k),
                field: field.to_string(),
                ground_truth_value: FieldValue::missing(kind),
                candidate_value: cand_value,
                similarity: 0.0,
            });
        }
    }

    Ok(out)
}

/// A linkage must cover exactly these collections and use each candidate at
/// most once.
fn check_linkage(
    linkage: &Linkage,
    ground_truth_rows: usize,
    candidate_rows: usize,
) -> Result<(), LinkageError> {
    if linkage.links.len() != ground_truth_rows {
        return Err(LinkageError::InvalidLinkage(format!(
            "{} link(s) for {ground_truth_rows} ground-truth row(s)",
            linkage.links.len()
        )));
    }
    if linkage.candidate_count != candidate_rows {
        return Err(LinkageError::InvalidLinkage(format!(
            "linkage counts {} candidate(s), collection has {candidate_rows}",
            linkage.candidate_count
        )));
    }

    let mut used = vec![false; candidate_rows];
    for (i, j) in linkage.matched_pairs() {
        match used.get_mut(j) {
            None => {
                return Err(LinkageError::InvalidLinkage(format!(
                    "candidate row {j} does not exist"
                )))
            }
            Some(true) => {
                return Err(LinkageError::InvalidLinkage(format!(
                    "candidate row {j} linked twice (again from ground-truth row {i})"
                )))
            }
            Some(slot) => *slot = true,
        }
    }
    Ok(())
}

fn value(record: &Record, role: Role, row: usize, field: &str) -> Result<FieldValue, LinkageError> {
    record
        .get(field)
        .cloned()
        .ok_or_else(|| LinkageError::MissingField {
            role,
            row,
            field: field.to_string(),
        })
}
