// Property-based tests for the matcher and the report builder.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use offergrade_linkage::assignment::{max_weight_assignment, ScoreMatrix};
use offergrade_linkage::engine::evaluate;
use offergrade_linkage::model::{FieldKind, FieldValue, Record};
use offergrade_linkage::ScoringConfig;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn scoring() -> ScoringConfig {
    ScoringConfig::new([
        ("product_type", FieldKind::Text),
        ("package_type", FieldKind::Text),
        ("price", FieldKind::Numeric),
    ])
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Scores on a quarter grid, so ties are common.
fn arb_matrix(max: usize) -> impl Strategy<Value = ScoreMatrix> {
    (0..=max, 0..=max).prop_flat_map(|(r, c)| {
        proptest::collection::vec(0u8..=4, r * c)
            .prop_map(move |cells| {
                ScoreMatrix::new(r, c, cells.into_iter().map(|v| v as f64 / 4.0).collect())
            })
    })
}

fn arb_text() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        4 => r"[A-Za-z]{1,8}( [A-Za-z]{1,6})?".prop_map(FieldValue::text),
        1 => Just(FieldValue::Unspecified),
    ]
}

fn arb_number() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        4 => (0u32..50).prop_map(|n| FieldValue::Number(n as f64 / 2.0)),
        1 => Just(FieldValue::Absent),
    ]
}

fn arb_record() -> impl Strategy<Value = Record> {
    (arb_text(), arb_text(), arb_number()).prop_map(|(product, package, price)| {
        Record::new()
            .with("product_type", product)
            .with("package_type", package)
            .with("price", price)
    })
}

fn arb_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
    proptest::collection::vec(arb_record(), 0..=max)
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// Exhaustive best total, rows may stay unassigned only when rows > cols.
fn brute_force_best(m: &ScoreMatrix) -> f64 {
    fn go(m: &ScoreMatrix, row: usize, used: &mut [bool], acc: f64, best: &mut f64) {
        if row == m.rows() {
            *best = best.max(acc);
            return;
        }
        let free = used.iter().filter(|u| !**u).count();
        if m.rows() - row > free {
            go(m, row + 1, used, acc, best);
        }
        for c in 0..m.cols() {
            if !used[c] {
                used[c] = true;
                go(m, row + 1, used, acc + m.get(row, c), best);
                used[c] = false;
            }
        }
    }
    let mut best = f64::NEG_INFINITY;
    go(m, 0, &mut vec![false; m.cols()], 0.0, &mut best);
    best
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn assignment_is_optimal(m in arb_matrix(5)) {
        let links = max_weight_assignment(&m);
        prop_assert_eq!(links.len(), m.rows());
        let total = m.total(&links);
        prop_assert!((total - brute_force_best(&m)).abs() < 1e-9);
    }

    #[test]
    fn assignment_is_injective_and_complete(m in arb_matrix(6)) {
        let links = max_weight_assignment(&m);
        let used: Vec<usize> = links.iter().flatten().copied().collect();
        let distinct: HashSet<usize> = used.iter().copied().collect();
        prop_assert_eq!(used.len(), distinct.len());
        prop_assert!(used.iter().all(|&c| c < m.cols()));
        prop_assert_eq!(used.len(), m.rows().min(m.cols()));
    }

    #[test]
    fn assignment_is_deterministic(m in arb_matrix(6)) {
        prop_assert_eq!(max_weight_assignment(&m), max_weight_assignment(&m));
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn report_covers_both_sides(gt in arb_records(5), cand in arb_records(5)) {
        let eval = evaluate(&gt, &cand, &scoring()).unwrap();
        let fields = 3;
        let unmatched = eval.linkage.unmatched_candidates().len();

        prop_assert_eq!(eval.comparisons.len(), (gt.len() + unmatched) * fields);
        prop_assert!(eval.comparisons.iter().all(|c| (0.0..=1.0).contains(&c.similarity)));

        // Every ground-truth index appears, in order, before any noise row.
        let gt_side: Vec<usize> = eval
            .comparisons
            .iter()
            .filter_map(|c| c.ground_truth_index)
            .collect();
        let expected: Vec<usize> = (0..gt.len()).flat_map(|i| std::iter::repeat(i).take(fields)).collect();
        prop_assert_eq!(gt_side, expected);

        for c in eval.comparisons.iter().filter(|c| c.ground_truth_index.is_none()) {
            prop_assert_eq!(c.similarity, 0.0);
        }
    }

    #[test]
    fn self_evaluation_is_perfect(gt in arb_records(5)) {
        let eval = evaluate(&gt, &gt, &scoring()).unwrap();
        prop_assert!(eval.comparisons.iter().all(|c| c.similarity == 1.0));
        prop_assert_eq!(eval.linkage.matched_count(), gt.len());
    }

    #[test]
    fn sentinel_candidates_earn_half_credit_on_present_fields(gt in arb_records(4)) {
        let blank = Record::new()
            .with("product_type", FieldValue::Unspecified)
            .with("package_type", FieldValue::Unspecified)
            .with("price", FieldValue::Absent);
        let cand = vec![blank; gt.len()];
        let eval = evaluate(&gt, &cand, &scoring()).unwrap();

        for c in &eval.comparisons {
            let expected = if c.ground_truth_value.is_missing() { 1.0 } else { 0.5 };
            prop_assert_eq!(c.similarity, expected);
        }
    }

    #[test]
    fn evaluation_is_deterministic(gt in arb_records(5), cand in arb_records(5)) {
        let a = evaluate(&gt, &cand, &scoring()).unwrap();
        let b = evaluate(&gt, &cand, &scoring()).unwrap();
        prop_assert_eq!(a, b);
    }
}
