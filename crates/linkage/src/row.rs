use crate::config::ScoringConfig;
use crate::error::LinkageError;
use crate::model::{Record, Role};
use crate::similarity::field_similarity;

/// Weighted row score plus the per-field scores it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RowScore {
    pub score: f64,
    /// One score per configured field, in field-list order.
    pub fields: Vec<f64>,
}

/// Weighted mean of field similarities over the configured field list.
///
/// Fields without a weight count with weight 1.0. An empty field list (or a zero
/// total weight) scores 0. Weights are scaled by the largest one before
/// summing, so very large weights cannot overflow the sums.
pub fn row_similarity(
    ground_truth: &Record,
    candidate: &Record,
    scoring: &ScoringConfig,
) -> Result<RowScore, LinkageError> {
    let resolved = scoring.resolved_fields()?;
    let scale = resolved.iter().map(|&(_, _, w)| w).fold(0.0, f64::max);

    let mut fields = Vec::with_capacity(resolved.len());
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (field, kind, weight) in resolved {
        let gt = ground_truth.get(field).ok_or_else(|| missing(Role::GroundTruth, field))?;
        let cand = candidate.get(field).ok_or_else(|| missing(Role::Candidate, field))?;

        let sim = field_similarity(field, kind, gt, cand)?;
        fields.push(sim);
        if scale > 0.0 {
            weighted_sum += weight / scale * sim;
            total_weight += weight / scale;
        }
    }

    let score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    Ok(RowScore { score, fields })
}

fn missing(role: Role, field: &str) -> LinkageError {
    LinkageError::MissingRecordField {
        role,
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, FieldValue};

    fn scoring() -> ScoringConfig {
        ScoringConfig::new([
            ("type", FieldKind::Text),
            ("variety", FieldKind::Text),
            ("price", FieldKind::Numeric),
        ])
    }

    fn record(ty: &str, variety: &str, price: f64) -> Record {
        Record::new()
            .with("type", FieldValue::text(ty))
            .with("variety", FieldValue::text(variety))
            .with("price", FieldValue::Number(price))
    }

    fn empty_candidate() -> Record {
        Record::new()
            .with("type", FieldValue::Unspecified)
            .with("variety", FieldValue::Unspecified)
            .with("price", FieldValue::Absent)
    }

    #[test]
    fn identical_rows_score_one() {
        let r = record("Tomato", "Roma", 10.5);
        let s = row_similarity(&r, &r.clone(), &scoring()).unwrap();
        assert_eq!(s.score, 1.0);
        assert_eq!(s.fields, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn all_sentinel_candidate_scores_half() {
        let gt = record("Tomato", "Roma", 10.5);
        let s = row_similarity(&gt, &empty_candidate(), &scoring()).unwrap();
        assert_eq!(s.score, 0.5);
    }

    #[test]
    fn weights_shift_the_mean() {
        let gt = record("Tomato", "Roma", 10.5);
        let cand = record("Tomato", "Roma", 9.0);
        let unweighted = row_similarity(&gt, &cand, &scoring()).unwrap();
        assert!((unweighted.score - 2.0 / 3.0).abs() < 1e-12);

        let weighted = row_similarity(&gt, &cand, &scoring().with_weight("price", 2.0)).unwrap();
        // (1 + 1 + 2*0) / 4
        assert!((weighted.score - 0.5).abs() < 1e-12);
        assert_eq!(weighted.fields, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_field_list_scores_zero() {
        let empty = ScoringConfig::new(Vec::<(String, FieldKind)>::new());
        let r = record("Tomato", "Roma", 1.0);
        let s = row_similarity(&r, &r, &empty).unwrap();
        assert_eq!(s.score, 0.0);
        assert!(s.fields.is_empty());
    }

    #[test]
    fn zero_total_weight_scores_zero() {
        let scoring = ScoringConfig::new([("price", FieldKind::Numeric)]).with_weight("price", 0.0);
        let r = Record::new().with("price", FieldValue::Number(1.0));
        assert_eq!(row_similarity(&r, &r, &scoring).unwrap().score, 0.0);
    }

    #[test]
    fn missing_field_is_schema_error() {
        let gt = record("Tomato", "Roma", 1.0);
        let cand = Record::new().with("type", FieldValue::text("Tomato"));
        let err = row_similarity(&gt, &cand, &scoring()).unwrap_err();
        assert!(matches!(
            err,
            LinkageError::MissingRecordField { role: Role::Candidate, ref field } if field == "variety"
        ));
    }

    #[test]
    fn huge_weights_keep_score_in_range() {
        let scoring = scoring()
            .with_weight("type", 1e308)
            .with_weight("variety", 1e308)
            .with_weight("price", 1e308);
        let r = record("Tomato", "Roma", 10.5);
        assert_eq!(row_similarity(&r, &r, &scoring).unwrap().score, 1.0);

        let cand = record("Tomato", "Roma", 9.0);
        let s = row_similarity(&r, &cand, &scoring).unwrap().score;
        assert!((s - 2.0 / 3.0).abs() < 1e-12, "got {s}");
    }
}
