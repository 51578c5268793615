//! Dense LU solve of the Newton step.

use faer::{prelude::*, solvers::PartialPivLu, Mat};
use sprs::CsMat;

/// Solves `matrix · x = rhs` with partial-pivoting LU.
///
/// Returns `None` when the matrix is singular: an empty row or column, or a
/// factorization that yields a non-finite solution.
pub fn solve_linear_system(matrix: &CsMat<f64>, rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    if matrix.rows() != n || matrix.cols() != n {
        return None;
    }
    if n == 0 {
        return Some(Vec::new());
    }

    let mut dense = Mat::<f64>::zeros(n, n);
    let mut row_used = vec![false; n];
    let mut col_used = vec![false; n];
    for (&value, (i, j)) in matrix.iter() {
        if value != 0.0 {
            row_used[i] = true;
            col_used[j] = true;
        }
        dense.write(i, j, dense.read(i, j) + value);
    }
    if row_used.iter().chain(&col_used).any(|used| !used) {
        return None;
    }

    let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
    let lu = PartialPivLu::new(dense.as_ref());
    let sol = lu.solve(&rhs_mat);

    let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
    solution.iter().all(|x| x.is_finite()).then_some(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn csr(n: usize, entries: &[(usize, usize, f64)]) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for &(i, j, v) in entries {
            tri.add_triplet(i, j, v);
        }
        tri.to_csr()
    }

    #[test]
    fn test_solve_2x2() {
        let a = csr(2, &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 3.0)]);
        let x = solve_linear_system(&a, &[1.0, 2.0]).unwrap();
        assert!((x[0] - 0.1).abs() < 1e-12);
        assert!((x[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_pivoting_required() {
        let a = csr(2, &[(0, 1, 1.0), (1, 0, 1.0)]);
        let x = solve_linear_system(&a, &[3.0, 5.0]).unwrap();
        assert!((x[0] - 5.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_row_is_singular() {
        let a = csr(2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        assert!(solve_linear_system(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = csr(2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        assert!(solve_linear_system(&a, &[1.0]).is_none());
        assert_eq!(solve_linear_system(&csr(0, &[]), &[]), Some(Vec::new()));
    }
}
