//! Direct linear-equation collaborators for the assembled stiffness system.
//!
//! The constraint layer depends only on [`LinearSolver`]; the default
//! backend factors the dense matrix with a pivoted LU after row
//! equilibration, and [`SparseCholesky`] substitutes a CSC Cholesky
//! factorization for meshes where the dense factor gets expensive.

use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{csc::CscMatrix, factorization::CscCholesky};

/// Factor-and-solve interface over a square system.
pub trait LinearSolver {
    /// Solve `K·x = b`, consuming the assembled matrix.
    fn solve(&self, matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Dense LU factorization with partial pivoting and optional row
/// equilibration.
#[derive(Debug, Clone)]
pub struct DenseLu {
    /// Scale each row by its largest magnitude before factoring.
    pub equilibrate: bool,
}

impl Default for DenseLu {
    fn default() -> Self {
        Self { equilibrate: true }
    }
}

impl LinearSolver for DenseLu {
    fn solve(&self, matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: matrix.ncols(),
            });
        }
        if rhs.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: rhs.len(),
            });
        }
        let mut k = matrix;
        let mut b = rhs.clone();
        if self.equilibrate {
            // Row scaling leaves the solution unchanged as long as the rhs
            // is scaled identically.
            for i in 0..n {
                let scale = (0..n).map(|j| k[(i, j)].abs()).fold(0.0, f64::max);
                if scale > 0.0 {
                    let inv = 1.0 / scale;
                    for j in 0..n {
                        k[(i, j)] *= inv;
                    }
                    b[i] *= inv;
                }
            }
        }
        k.lu()
            .solve(&b)
            .ok_or_else(|| Error::SingularSystem("LU factorization failed".to_owned()))
    }

    fn name(&self) -> &str {
        "dense-lu"
    }
}

/// Sparse Cholesky factorization of the (symmetric positive definite)
/// stiffness system in CSC form.
#[derive(Debug, Clone, Default)]
pub struct SparseCholesky;

impl LinearSolver for SparseCholesky {
    fn solve(&self, matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: matrix.ncols(),
            });
        }
        if rhs.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: rhs.len(),
            });
        }
        let sparse = CscMatrix::from(&matrix);
        let factorization = CscCholesky::factor(&sparse)
            .map_err(|err| Error::SingularSystem(format!("Cholesky factorization failed: {err:?}")))?;
        let solution = factorization.solve(rhs);
        Ok(DVector::from_fn(solution.nrows(), |i, _| solution[(i, 0)]))
    }

    fn name(&self) -> &str {
        "sparse-cholesky"
    }
}
