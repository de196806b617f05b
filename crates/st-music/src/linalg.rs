// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense decompositions shared by the localisation stages.
//!
//! nalgebra's `SymmetricEigen` returns eigenpairs in no particular order and its
//! SVD-based solvers take an absolute singular-value threshold. The helpers
//! here sort eigenpairs ascending and derive the threshold relative to the
//! largest singular value, `max(rows, cols) · ε · σ_max`.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector, SymmetricEigen, SVD};

use crate::{MusicError, MusicResult};

/// Eigenpairs of a symmetric matrix, eigenvalues ascending.
#[derive(Clone, Debug)]
pub struct EigenPairs {
    pub values: DVector<f64>,
    /// Column `i` belongs to `values[i]`.
    pub vectors: DMatrix<f64>,
}

impl EigenPairs {
    /// The eigenpair with the largest eigenvalue.
    pub fn top(&self) -> Option<(f64, DVector<f64>)> {
        let last = self.values.len().checked_sub(1)?;
        Some((self.values[last], self.vectors.column(last).clone_owned()))
    }
}

/// Eigendecomposition of a symmetric matrix with ascending eigenvalues.
///
/// Only the lower triangle of `matrix` is read.
pub fn symmetric_eigen_ascending(matrix: DMatrix<f64>) -> MusicResult<EigenPairs> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(MusicError::ShapeMismatch {
            context: "symmetric eigendecomposition",
            left: (rows, cols),
            right: (cols, rows),
        });
    }
    if rows == 0 {
        return Err(MusicError::EmptyInput("symmetric eigendecomposition"));
    }
    let eigen = SymmetricEigen::new(matrix);
    let mut order: Vec<usize> = (0..rows).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    let values = DVector::from_iterator(rows, order.iter().map(|&idx| eigen.eigenvalues[idx]));
    let vectors = DMatrix::from_fn(rows, rows, |r, c| eigen.eigenvectors[(r, order[c])]);
    Ok(EigenPairs { values, vectors })
}

pub(crate) fn singular_cutoff(singular_values: &DVector<f64>, rows: usize, cols: usize) -> f64 {
    let largest = singular_values.iter().fold(0.0f64, |acc, &s| acc.max(s));
    largest * rows.max(cols) as f64 * f64::EPSILON
}

/// Moore–Penrose pseudoinverse.
pub fn pseudo_inverse(matrix: DMatrix<f64>) -> MusicResult<DMatrix<f64>> {
    let (rows, cols) = matrix.shape();
    if rows == 0 || cols == 0 {
        return Ok(DMatrix::zeros(cols, rows));
    }
    let svd = SVD::new(matrix, true, true);
    let eps = singular_cutoff(&svd.singular_values, rows, cols);
    svd.pseudo_inverse(eps)
        .map_err(|message| MusicError::Decomposition {
            stage: "pseudo-inverse",
            message,
        })
}

/// Minimum-norm least-squares solution of `lhs · X = rhs`.
pub fn least_squares(lhs: &DMatrix<f64>, rhs: &DMatrix<f64>) -> MusicResult<DMatrix<f64>> {
    if lhs.nrows() != rhs.nrows() {
        return Err(MusicError::ShapeMismatch {
            context: "least squares",
            left: lhs.shape(),
            right: rhs.shape(),
        });
    }
    if lhs.ncols() == 0 {
        return Err(MusicError::EmptyInput("least squares"));
    }
    if lhs.nrows() == 0 || rhs.ncols() == 0 {
        return Ok(DMatrix::zeros(lhs.ncols(), rhs.ncols()));
    }
    let (rows, cols) = lhs.shape();
    let svd = SVD::new(lhs.clone(), true, true);
    let eps = singular_cutoff(&svd.singular_values, rows, cols);
    svd.solve(rhs, eps).map_err(|message| MusicError::Decomposition {
        stage: "least squares",
        message,
    })
}
