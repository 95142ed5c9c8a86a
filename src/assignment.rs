//! Weighted bipartite assignment (Hungarian / Kuhn-Munkres)
//!
//! [`solve_square`] is the O(n^3) primal-dual solver over a square cost
//! matrix. [`max_weight_assignment`] adapts it to rectangular similarity
//! matrices by padding and flipping the objective.

/// One row-to-column pairing inside the real (unpadded) region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub row: usize,
    pub col: usize,
    pub weight: f64,
}

/// Minimize total cost over a square matrix.
///
/// Returns `assignment[row] = column`, a permutation of `0..n`. Costs must be
/// finite. Ties resolve by column scan order, so the result is deterministic.
pub fn solve_square(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    debug_assert!(cost.iter().all(|row| row.len() == n), "cost matrix must be square");

    // 1-based potentials and links; index 0 is the virtual source column
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut p = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];
    let mut minv = vec![f64::INFINITY; n + 1];
    let mut used = vec![false; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        minv.fill(f64::INFINITY);
        used.fill(false);

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // augment along the alternating path
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for j in 1..=n {
        if p[j] != 0 {
            assignment[p[j] - 1] = j - 1;
        }
    }
    assignment
}

/// Maximize total weight over a rows-by-columns matrix.
///
/// The matrix is padded to a square of `max(rows, cols)`. Padding cells cost
/// `max_weight + 1` and real cells `max_weight + 1 - weight`. Pairs landing in
/// the padding are dropped. The result is sorted by row.
pub fn max_weight_assignment(weights: &[Vec<f64>]) -> Vec<Assignment> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, Vec::len);
    let n = rows.max(cols);
    if n == 0 {
        return Vec::new();
    }

    let max_weight = weights
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);
    let big = max_weight + 1.0;

    let cost: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i < rows && j < cols {
                        big - weights[i][j]
                    } else {
                        big
                    }
                })
                .collect()
        })
        .collect();

    solve_square(&cost)
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| row < rows && col < cols)
        .map(|(row, col)| Assignment {
            row,
            col,
            weight: weights[row][col],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_cost(cost: &[Vec<f64>], assignment: &[usize]) -> f64 {
        assignment.iter().enumerate().map(|(i, &j)| cost[i][j]).sum()
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for perm in permutations(n - 1) {
            for pos in 0..=perm.len() {
                let mut next = perm.clone();
                next.insert(pos, n - 1);
                out.push(next);
            }
        }
        out
    }

    /// Small deterministic generator so the brute-force check is reproducible
    fn pseudo_random_matrix(n: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                (0..n)
                    .map(|_| {
                        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                        ((state >> 33) % 1000) as f64 / 1000.0
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(solve_square(&[]).is_empty());
        assert!(max_weight_assignment(&[]).is_empty());
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(solve_square(&[vec![3.0]]), vec![0]);
    }

    #[test]
    fn test_known_minimum() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let assignment = solve_square(&cost);
        assert_eq!(total_cost(&cost, &assignment), 5.0);
    }

    #[test]
    fn test_result_is_permutation() {
        let cost = pseudo_random_matrix(7, 42);
        let mut assignment = solve_square(&cost);
        assignment.sort_unstable();
        assert_eq!(assignment, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_matches_brute_force() {
        for seed in 1..20 {
            for n in 1..=5 {
                let cost = pseudo_random_matrix(n, seed);
                let best = permutations(n)
                    .iter()
                    .map(|perm| total_cost(&cost, perm))
                    .fold(f64::INFINITY, f64::min);
                let found = total_cost(&cost, &solve_square(&cost));
                assert!((found - best).abs() < 1e-9, "n={n} seed={seed}: {found} vs {best}");
            }
        }
    }

    #[test]
    fn test_identity_is_preferred() {
        let weights = vec![
            vec![1.0, 0.2, 0.0],
            vec![0.1, 1.0, 0.3],
            vec![0.0, 0.4, 1.0],
        ];
        let pairs = max_weight_assignment(&weights);
        let cols: Vec<usize> = pairs.iter().map(|a| a.col).collect();
        assert_eq!(cols, vec![0, 1, 2]);
    }

    #[test]
    fn test_swapped_pairs() {
        let weights = vec![vec![0.1, 0.9], vec![0.8, 0.2]];
        let pairs = max_weight_assignment(&weights);
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].row, pairs[0].col), (0, 1));
        assert_eq!((pairs[1].row, pairs[1].col), (1, 0));
        assert_eq!(pairs[0].weight, 0.9);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let weights = vec![vec![0.2], vec![0.9], vec![0.5]];
        let pairs = max_weight_assignment(&weights);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].row, 1);
    }

    #[test]
    fn test_more_columns_than_rows() {
        let weights = vec![vec![0.1, 0.3, 0.95, 0.4]];
        let pairs = max_weight_assignment(&weights);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].col, 2);
    }

    #[test]
    fn test_maximizes_total_not_greedy() {
        // greedy would take (0,0)=0.9 and leave (1,1)=0.1
        let weights = vec![vec![0.9, 0.8], vec![0.85, 0.1]];
        let pairs = max_weight_assignment(&weights);
        let total: f64 = pairs.iter().map(|a| a.weight).sum();
        assert!((total - 1.65).abs() < 1e-9);
    }
}
