use crate::error::ComparisonError;
use crate::types::{AlignmentPath, CostMatrix, DtwAlignment, FeatureMatrix};

const STEP_DIAGONAL: u8 = 0;
const STEP_VERTICAL: u8 = 1;
const STEP_HORIZONTAL: u8 = 2;

/// Dynamic time warping between two feature sequences with Euclidean local cost.
///
/// Backtracking follows the predecessor chosen during the forward pass. Ties are
/// broken diagonal first, then vertical `(i-1, j)`, then horizontal `(i, j-1)`.
/// The total distance does not depend on the tie-break, only the path does.
pub fn dtw_align(a: &FeatureMatrix, b: &FeatureMatrix) -> Result<DtwAlignment, ComparisonError> {
    let n = a.num_frames();
    let m = b.num_frames();
    if n == 0 || m == 0 {
        return Err(ComparisonError::empty_segment(
            "cannot align an empty feature sequence",
        ));
    }
    if a.dim() != b.dim() {
        return Err(ComparisonError::DimensionMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }

    let cost = euclidean_cost_matrix(a, b);
    let (accumulated, bp) = accumulate(&cost);
    let path = backtrack(&bp, n, m);
    let distance = accumulated.get(n - 1, m - 1);

    tracing::debug!(
        student_frames = n,
        reference_frames = m,
        path_len = path.len(),
        distance,
        "dtw: aligned feature sequences"
    );

    Ok(DtwAlignment {
        distance,
        cost,
        accumulated,
        path,
    })
}

pub fn euclidean_cost_matrix(a: &FeatureMatrix, b: &FeatureMatrix) -> CostMatrix {
    let mut cost = CostMatrix::filled(a.num_frames(), b.num_frames(), 0.0);
    for (i, fa) in a.frames().enumerate() {
        for (j, fb) in b.frames().enumerate() {
            cost.set(i, j, euclidean(fa, fb));
        }
    }
    cost
}

#[inline(always)]
fn euclidean(x: &[f32], y: &[f32]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&p, &q)| {
            let d = p as f64 - q as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn accumulate(cost: &CostMatrix) -> (CostMatrix, Vec<u8>) {
    let n = cost.rows();
    let m = cost.cols();
    let mut acc = CostMatrix::filled(n, m, 0.0);
    let mut bp = vec![STEP_DIAGONAL; n * m];

    acc.set(0, 0, cost.get(0, 0));
    for j in 1..m {
        acc.set(0, j, acc.get(0, j - 1) + cost.get(0, j));
        bp[j] = STEP_HORIZONTAL;
    }
    for i in 1..n {
        acc.set(i, 0, acc.get(i - 1, 0) + cost.get(i, 0));
        bp[i * m] = STEP_VERTICAL;

        for j in 1..m {
            let (best, step) = best_predecessor(
                acc.get(i - 1, j - 1),
                acc.get(i - 1, j),
                acc.get(i, j - 1),
            );
            acc.set(i, j, cost.get(i, j) + best);
            bp[i * m + j] = step;
        }
    }
    (acc, bp)
}

#[inline(always)]
fn best_predecessor(diagonal: f64, vertical: f64, horizontal: f64) -> (f64, u8) {
    let mut best = diagonal;
    let mut step = STEP_DIAGONAL;
    if vertical < best {
        best = vertical;
        step = STEP_VERTICAL;
    }
    if horizontal < best {
        best = horizontal;
        step = STEP_HORIZONTAL;
    }
    (best, step)
}

fn backtrack(bp: &[u8], n: usize, m: usize) -> AlignmentPath {
    let mut i = n - 1;
    let mut j = m - 1;
    let mut path = Vec::with_capacity(n + m - 1);
    path.push((i, j));
    while i > 0 || j > 0 {
        match bp[i * m + j] {
            STEP_VERTICAL => {
                debug_assert!(i >= 1);
                i -= 1;
            }
            STEP_HORIZONTAL => {
                debug_assert!(j >= 1);
                j -= 1;
            }
            _ => {
                debug_assert!(i >= 1 && j >= 1);
                i -= 1;
                j -= 1;
            }
        }
        path.push((i, j));
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn matrix(frames: &[&[f32]]) -> FeatureMatrix {
        FeatureMatrix::from_frames(frames.iter().map(|f| f.to_vec()).collect()).unwrap()
    }

    fn random_matrix(rng: &mut StdRng, frames: usize, dim: usize) -> FeatureMatrix {
        FeatureMatrix::from_frames(
            (0..frames)
                .map(|_| (0..dim).map(|_| rng.gen_range(-50.0f32..50.0)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn assert_valid_path(path: &[(usize, usize)], n: usize, m: usize) {
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(n - 1, m - 1)));
        for w in path.windows(2) {
            let step = (w[1].0 - w[0].0, w[1].1 - w[0].1);
            assert!(
                matches!(step, (1, 0) | (0, 1) | (1, 1)),
                "illegal step {:?} -> {:?}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn self_alignment_is_zero_and_diagonal() {
        let mut rng = StdRng::seed_from_u64(7);
        for frames in [1, 2, 5, 17] {
            let a = random_matrix(&mut rng, frames, 13);
            let out = dtw_align(&a, &a).unwrap();
            assert_eq!(out.distance, 0.0);
            let diagonal: Vec<_> = (0..frames).map(|i| (i, i)).collect();
            assert_eq!(out.path, diagonal);
        }
    }

    #[test]
    fn repeated_frames_still_align_diagonally_with_itself() {
        // Every cell is zero, so every predecessor ties.
        let a = matrix(&[&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]]);
        let out = dtw_align(&a, &a).unwrap();
        assert_eq!(out.path, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn distance_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let n = rng.gen_range(1..30);
            let m = rng.gen_range(1..30);
            let a = random_matrix(&mut rng, n, 13);
            let b = random_matrix(&mut rng, m, 13);
            let ab = dtw_align(&a, &b).unwrap().distance;
            let ba = dtw_align(&b, &a).unwrap().distance;
            assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{ab} != {ba}");
            assert!(ab >= 0.0);
        }
    }

    #[test]
    fn random_paths_are_monotonic_and_complete() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let n = rng.gen_range(1..25);
            let m = rng.gen_range(1..25);
            let a = random_matrix(&mut rng, n, 4);
            let b = random_matrix(&mut rng, m, 4);
            let out = dtw_align(&a, &b).unwrap();
            assert_valid_path(&out.path, n, m);
            let along_path: f64 = out.path.iter().map(|&(i, j)| out.cost.get(i, j)).sum();
            assert!((along_path - out.distance).abs() < 1e-6 * out.distance.max(1.0));
        }
    }

    #[test]
    fn recurrence_matches_hand_computed_table() {
        let a = matrix(&[&[0.0], &[1.0], &[2.0]]);
        let b = matrix(&[&[0.0], &[2.0]]);
        let out = dtw_align(&a, &b).unwrap();
        // cost = [[0,2],[1,1],[2,0]]
        assert_eq!(out.cost.row(0), &[0.0, 2.0]);
        assert_eq!(out.cost.row(1), &[1.0, 1.0]);
        assert_eq!(out.cost.row(2), &[2.0, 0.0]);
        // acc = [[0,2],[1,1],[3,1]]
        assert_eq!(out.accumulated.row(0), &[0.0, 2.0]);
        assert_eq!(out.accumulated.row(1), &[1.0, 1.0]);
        assert_eq!(out.accumulated.row(2), &[3.0, 1.0]);
        assert_eq!(out.distance, 1.0);
        // At (2,1) the diagonal (1,0) and vertical (1,1) predecessors tie at 1.0.
        assert_eq!(out.path, vec![(0, 0), (1, 0), (2, 1)]);
    }

    #[test]
    fn tie_break_order_is_diagonal_vertical_horizontal() {
        assert_eq!(best_predecessor(1.0, 0.5, 0.5), (0.5, STEP_VERTICAL));
        assert_eq!(best_predecessor(0.5, 0.5, 0.5), (0.5, STEP_DIAGONAL));
        assert_eq!(best_predecessor(1.0, 1.0, 0.5), (0.5, STEP_HORIZONTAL));
    }

    #[test]
    fn single_row_walks_horizontally() {
        let a = matrix(&[&[0.0]]);
        let b = matrix(&[&[1.0], &[2.0], &[3.0]]);
        let out = dtw_align(&a, &b).unwrap();
        assert_eq!(out.path, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(out.distance, 6.0);
    }

    #[test]
    fn empty_sequences_are_rejected() {
        let empty = FeatureMatrix::from_frames(Vec::new()).unwrap();
        let a = matrix(&[&[0.0]]);
        assert!(matches!(
            dtw_align(&empty, &a),
            Err(ComparisonError::EmptySegment { .. })
        ));
        assert!(matches!(
            dtw_align(&a, &empty),
            Err(ComparisonError::EmptySegment { .. })
        ));
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let a = matrix(&[&[0.0, 1.0]]);
        let b = matrix(&[&[0.0, 1.0, 2.0]]);
        let err = dtw_align(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            ComparisonError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(!err.is_recoverable());
    }
}
