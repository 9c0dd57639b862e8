use crate::config::{EvalConfig, ScoringConfig, UnitConfig};
use crate::error::LinkageError;
use crate::ingest::{decode_candidates, GroundTruthRow};
use crate::matcher::match_records;
use crate::model::{BatchReport, Evaluation, Record, Role, UnitMeta, UnitReport};
use crate::report::build_report;
use crate::select::select_ground_truth;
use crate::summary::{compute_summary, summarize_batch};

/// Check that every record carries every scoring field with a value of the
/// field's kind.
pub fn validate_collection(
    records: &[Record],
    role: Role,
    scoring: &ScoringConfig,
) -> Result<(), LinkageError> {
    let fields = scoring.resolved_fields()?;
    for (row, record) in records.iter().enumerate() {
        for &(field, kind, _) in &fields {
            let value = record.get(field).ok_or_else(|| LinkageError::MissingField {
                role,
                row,
                field: field.to_string(),
            })?;
            if value.kind() != kind {
                return Err(LinkageError::KindMismatch {
                    field: field.to_string(),
                    kind,
                });
            }
        }
    }
    Ok(())
}

/// Link and score two collections. Either side may be empty.
pub fn evaluate(
    ground_truth: &[Record],
    candidates: &[Record],
    scoring: &ScoringConfig,
) -> Result<Evaluation, LinkageError> {
    scoring.validate()?;
    validate_collection(ground_truth, Role::GroundTruth, scoring)?;
    validate_collection(candidates, Role::Candidate, scoring)?;

    let outcome = match_records(ground_truth, candidates, scoring)?;
    let comparisons = build_report(ground_truth, candidates, &outcome.linkage, scoring)?;
    let summary = compute_summary(&outcome, &comparisons, scoring);

    Ok(Evaluation {
        linkage: outcome.linkage,
        comparisons,
        summary,
    })
}

/// Evaluate one configured unit: decode its candidate payload, select its
/// ground-truth rows, then link and score.
pub fn run_unit(
    config: &EvalConfig,
    rows: &[GroundTruthRow],
    unit: &UnitConfig,
    candidates_json: &str,
) -> Result<UnitReport, LinkageError> {
    let candidates = decode_candidates(
        candidates_json,
        &config.candidates.offers_key,
        &config.scoring,
        &config.normalize,
    )?;
    let ground_truth = select_ground_truth(rows, unit, &config.selection)?;

    let evaluation = evaluate(&ground_truth, &candidates, &config.scoring)?;
    let s = &evaluation.summary;

    tracing::info!(
        unit = %unit.name,
        ground_truth = s.ground_truth_rows,
        candidates = s.candidate_rows,
        matched = s.matched_rows,
        mean_similarity = s.mean_similarity,
        "unit evaluated"
    );

    Ok(UnitReport {
        meta: meta(&config.name, &unit.name),
        summary: evaluation.summary,
        links: evaluation.linkage.links,
        comparisons: evaluation.comparisons,
    })
}

/// Report for an ad-hoc evaluation that bypasses unit selection.
pub fn unit_report(config_name: &str, unit: &str, evaluation: Evaluation) -> UnitReport {
    UnitReport {
        meta: meta(config_name, unit),
        summary: evaluation.summary,
        links: evaluation.linkage.links,
        comparisons: evaluation.comparisons,
    }
}

/// Wrap unit reports, in the order given, with a batch summary.
pub fn batch_report(config: &EvalConfig, units: Vec<UnitReport>) -> BatchReport {
    let summaries: Vec<_> = units.iter().map(|u| u.summary.clone()).collect();
    BatchReport {
        name: config.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        summary: summarize_batch(&summaries),
        units,
    }
}

fn meta(config_name: &str, unit: &str) -> UnitMeta {
    UnitMeta {
        config_name: config_name.to_string(),
        unit: unit.to_string(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    }
}
