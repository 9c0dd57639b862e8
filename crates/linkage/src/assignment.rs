//! Maximum-weight one-to-one assignment over a dense rectangular matrix.
//!
//! Shortest-augmenting-path Hungarian method with row/column potentials,
//! O(r²·c) for an r×c matrix with r <= c (taller matrices are solved
//! transposed). The result is globally optimal; it is not a greedy pairing.
//!
//! Tie-break: rows are inserted in ascending index order and columns are
//! scanned in ascending index order with strict comparisons, so among equally
//! cheap choices the lowest column index wins. No randomness is involved, and
//! identical input always yields an identical assignment.

/// Dense row-major score matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl ScoreMatrix {
    /// Panics if `cells.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, cells: Vec<f64>) -> Self {
        assert_eq!(cells.len(), rows * cols, "matrix shape mismatch");
        Self { rows, cols, cells }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let r = rows.len();
        let c = rows.first().map_or(0, Vec::len);
        let cells: Vec<f64> = rows.into_iter().flatten().collect();
        Self::new(r, c, cells)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    fn transposed(&self) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                cells.push(self.get(r, c));
            }
        }
        Self::new(self.cols, self.rows, cells)
    }

    /// Sum of the cells selected by `links` (row -> column).
    pub fn total(&self, links: &[Option<usize>]) -> f64 {
        links
            .iter()
            .enumerate()
            .filter_map(|(r, c)| c.map(|c| self.get(r, c)))
            .sum()
    }
}

/// Assign rows to columns maximizing the summed score.
///
/// Every row gets a column when `rows <= cols`; otherwise exactly `cols` rows
/// are assigned and the rest map to `None`. No column is used twice.
pub fn max_weight_assignment(matrix: &ScoreMatrix) -> Vec<Option<usize>> {
    if matrix.rows == 0 || matrix.cols == 0 {
        return vec![None; matrix.rows];
    }

    if matrix.rows <= matrix.cols {
        solve(matrix)
            .into_iter()
            .map(Some)
            .collect()
    } else {
        let t = matrix.transposed();
        let col_to_row = solve(&t);
        let mut links = vec![None; matrix.rows];
        for (c, r) in col_to_row.into_iter().enumerate() {
            links[r] = Some(c);
        }
        links
    }
}

/// Hungarian method for `rows <= cols`. Returns the column of each row.
/// Scores are maximized by minimizing their negation.
fn solve(matrix: &ScoreMatrix) -> Vec<usize> {
    let n = matrix.rows;
    let m = matrix.cols;
    let cost = |i: usize, j: usize| -matrix.get(i - 1, j - 1);

    // 1-based; column 0 and row 0 are virtual.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0, j) - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            // n <= m and finite cells guarantee a free column was seen.
            debug_assert!(j1 != 0, "no augmenting column found");

            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path.
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=m {
        if owner[j] != 0 {
            assignment[owner[j] - 1] = j - 1;
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Best total over all injective row->column maps (rows <= cols) or
    /// column->row maps (rows > cols).
    fn brute_force_best(matrix: &ScoreMatrix) -> f64 {
        fn go(m: &ScoreMatrix, row: usize, used: &mut Vec<bool>, acc: f64, best: &mut f64) {
            if row == m.rows() {
                *best = best.max(acc);
                return;
            }
            let assigned_so_far = used.iter().filter(|u| **u).count();
            let remaining_rows = m.rows() - row;
            let free_cols = m.cols() - assigned_so_far;
            // Row may stay unassigned only when there are more rows than columns.
            if remaining_rows > free_cols {
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
        go(matrix, 0, &mut vec![false; matrix.cols()], 0.0, &mut best);
        best
    }

    #[test]
    fn square_prefers_global_optimum_over_greedy() {
        // Greedy would take (0,0)=0.9 then (1,1)=0.1 -> 1.0.
        // Optimum is (0,1)+(1,0) = 0.8 + 0.85 = 1.65.
        let m = ScoreMatrix::from_rows(vec![vec![0.9, 0.8], vec![0.85, 0.1]]);
        let links = max_weight_assignment(&m);
        assert_eq!(links, vec![Some(1), Some(0)]);
        assert!((m.total(&links) - 1.65).abs() < 1e-12);
    }

    #[test]
    fn wide_matrix_assigns_every_row() {
        let m = ScoreMatrix::from_rows(vec![
            vec![0.1, 0.2, 1.0],
            vec![1.0, 0.3, 0.2],
        ]);
        let links = max_weight_assignment(&m);
        assert_eq!(links, vec![Some(2), Some(0)]);
    }

    #[test]
    fn tall_matrix_leaves_rows_unassigned() {
        let m = ScoreMatrix::from_rows(vec![vec![0.2], vec![0.9], vec![0.5]]);
        let links = max_weight_assignment(&m);
        assert_eq!(links, vec![None, Some(0), None]);
    }

    #[test]
    fn empty_shapes() {
        assert_eq!(max_weight_assignment(&ScoreMatrix::new(0, 3, vec![])), Vec::<Option<usize>>::new());
        assert_eq!(max_weight_assignment(&ScoreMatrix::new(2, 0, vec![])), vec![None, None]);
    }

    #[test]
    fn ties_resolve_deterministically() {
        let m = ScoreMatrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let first = max_weight_assignment(&m);
        for _ in 0..10 {
            assert_eq!(max_weight_assignment(&m), first);
        }
        assert_eq!(m.total(&first), 2.0);
    }

    #[test]
    fn matches_brute_force_on_fixed_cases() {
        let cases = vec![
            vec![vec![0.4, 0.6, 0.1], vec![0.7, 0.2, 0.9], vec![0.3, 0.8, 0.5]],
            vec![vec![0.5, 0.5, 0.5, 0.9], vec![0.1, 0.95, 0.2, 0.8]],
            vec![vec![0.3, 0.2], vec![0.9, 0.6], vec![0.8, 0.1], vec![0.0, 0.7]],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        ];
        for rows in cases {
            let m = ScoreMatrix::from_rows(rows);
            let links = max_weight_assignment(&m);
            assert!((m.total(&links) - brute_force_best(&m)).abs() < 1e-9);
        }
    }
}
