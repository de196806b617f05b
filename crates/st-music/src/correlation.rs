// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Subspace correlation between one candidate block and a signal subspace.
//!
//! The metric is the largest principal (canonical) correlation between the
//! span of the candidate's leadfield columns and the span of the subspace
//! basis. For a single column this reduces to the cosine of the angle between
//! the topography and the subspace:
//!
//! ```text
//! subcorr = sqrt( gᵀ Φ Φᵀ g / gᵀ g )
//! ```
//!
//! For a three-column free-orientation block the columns are orthonormalised
//! by QR (`G = Q R`) and the correlation is the square root of the largest
//! eigenvalue of `Qᵀ Φ Φᵀ Q`. The matching eigenvector `v` is expressed in
//! `Q` coordinates; since `Q v = G R⁺ v`, the dipole orientation in the
//! candidate's own x/y/z frame is `R⁺ v`, normalised. Rank-deficient blocks
//! use the left singular vectors `U_k = G V_k Σ_k⁻¹` in place of `Q`.

use nalgebra::{DMatrix, DMatrixView, DVector, SVD};

use crate::forward::SourceOrientation;
use crate::linalg::{pseudo_inverse, singular_cutoff, symmetric_eigen_ascending};
use crate::{MusicError, MusicResult};

/// Correlation of a candidate with the subspace plus the orientation that
/// attains it.
#[derive(Clone, Debug, PartialEq)]
pub struct SubspaceCorrelation {
    /// In `[0, 1]`.
    pub value: f64,
    /// Unit vector with one entry per block column.
    pub orientation: DVector<f64>,
}

/// Dispatches on the orientation model of the block.
pub fn subspace_correlation(
    orientation: SourceOrientation,
    block: DMatrixView<'_, f64>,
    basis: &DMatrix<f64>,
) -> MusicResult<SubspaceCorrelation> {
    if block.nrows() != basis.nrows() {
        return Err(MusicError::ShapeMismatch {
            context: "subspace correlation",
            left: block.shape(),
            right: basis.shape(),
        });
    }
    match orientation {
        SourceOrientation::Fixed => Ok(fixed_orientation_correlation(block, basis)),
        SourceOrientation::Free => free_orientation_correlation(block, basis),
    }
}

/// Single-column case. A zero column has no defined direction; its inverse
/// energy is taken as the pseudoinverse of zero and the correlation is 0.
pub fn fixed_orientation_correlation(
    block: DMatrixView<'_, f64>,
    basis: &DMatrix<f64>,
) -> SubspaceCorrelation {
    let column = block.column(0);
    let energy = column.norm_squared();
    let captured = basis.tr_mul(&column).norm_squared();
    let ratio = if energy > 0.0 && energy.is_finite() {
        captured / energy
    } else {
        0.0
    };
    SubspaceCorrelation {
        value: clamp_unit(ratio.sqrt()),
        orientation: DVector::from_element(1, 1.0),
    }
}

/// Multi-column case via QR and the eigendecomposition of the projected Gram
/// matrix.
///
/// A block whose QR diagonal falls below the relative cut-off is
/// rank-deficient and its `Q` columns no longer span the block; the range is
/// then taken from the SVD instead. A numerically zero block scores 0.
pub fn free_orientation_correlation(
    block: DMatrixView<'_, f64>,
    basis: &DMatrix<f64>,
) -> MusicResult<SubspaceCorrelation> {
    let width = block.ncols();
    if block.iter().any(|x| !x.is_finite()) {
        return Ok(SubspaceCorrelation {
            value: f64::NAN,
            orientation: first_axis(width),
        });
    }
    let Some(range) = block_range(block)? else {
        return Ok(SubspaceCorrelation {
            value: 0.0,
            orientation: first_axis(width),
        });
    };

    let projected = basis.tr_mul(&range.frame);
    let gram = projected.tr_mul(&projected);
    let pairs = symmetric_eigen_ascending(gram)?;
    let (lambda, direction) = pairs
        .top()
        .ok_or(MusicError::EmptyInput("free orientation correlation"))?;

    let coords = &range.to_candidate * direction;
    let norm = coords.norm();
    if !(norm.is_finite() && norm > 0.0) {
        return Err(MusicError::Decomposition {
            stage: "free orientation correlation",
            message: "orientation collapsed onto the null space of the block",
        });
    }
    Ok(SubspaceCorrelation {
        value: clamp_unit(lambda.max(0.0).sqrt()),
        orientation: coords / norm,
    })
}

/// Orthonormal basis of a block's column space, with `frame = block · to_candidate`.
struct BlockRange {
    frame: DMatrix<f64>,
    to_candidate: DMatrix<f64>,
}

fn block_range(block: DMatrixView<'_, f64>) -> MusicResult<Option<BlockRange>> {
    let (rows, cols) = block.shape();
    let qr = block.clone_owned().qr();
    let r = qr.r();
    let diagonal = r.diagonal().map(f64::abs);
    let cutoff = singular_cutoff(&diagonal, rows, cols);
    if diagonal.iter().all(|&d| d == 0.0) {
        return Ok(None);
    }
    // Q · R⁺ = G · R⁺ only holds when R has full row rank
    if diagonal.iter().all(|&d| d > cutoff) {
        return Ok(Some(BlockRange {
            frame: qr.q(),
            to_candidate: pseudo_inverse(r)?,
        }));
    }

    let svd = SVD::new(block.clone_owned(), true, true);
    let cutoff = singular_cutoff(&svd.singular_values, rows, cols);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(MusicError::Decomposition {
                stage: "free orientation correlation",
                message: "SVD did not return singular vectors",
            })
        }
    };
    let kept: Vec<usize> = (0..svd.singular_values.len())
        .filter(|&idx| svd.singular_values[idx] > cutoff)
        .collect();
    if kept.is_empty() {
        return Ok(None);
    }
    let frame = u.select_columns(kept.iter());
    let to_candidate = DMatrix::from_fn(cols, kept.len(), |row, col| {
        v_t[(kept[col], row)] / svd.singular_values[kept[col]]
    });
    Ok(Some(BlockRange {
        frame,
        to_candidate,
    }))
}

fn first_axis(width: usize) -> DVector<f64> {
    let mut axis = DVector::zeros(width);
    if width > 0 {
        axis[0] = 1.0;
    }
    axis
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn axis_basis(channels: usize, axes: &[usize]) -> DMatrix<f64> {
        let mut basis = DMatrix::zeros(channels, axes.len());
        for (col, &axis) in axes.iter().enumerate() {
            basis[(axis, col)] = 1.0;
        }
        basis
    }

    #[test]
    fn column_inside_subspace_correlates_fully() {
        let basis = axis_basis(4, &[0, 1]);
        let g = DMatrix::from_column_slice(4, 1, &[3.0, -4.0, 0.0, 0.0]);
        let corr = fixed_orientation_correlation(g.columns(0, 1), &basis);
        assert_relative_eq!(corr.value, 1.0, epsilon = 1e-12);
        assert_eq!(corr.orientation, DVector::from_element(1, 1.0));
    }

    #[test]
    fn column_at_forty_five_degrees() {
        let basis = axis_basis(3, &[0]);
        let g = DMatrix::from_column_slice(3, 1, &[1.0, 1.0, 0.0]);
        let corr = fixed_orientation_correlation(g.columns(0, 1), &basis);
        assert_relative_eq!(corr.value, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn orthogonal_and_zero_columns_score_zero() {
        let basis = axis_basis(3, &[0]);
        let orthogonal = DMatrix::from_column_slice(3, 1, &[0.0, 2.0, 0.0]);
        let zero = DMatrix::zeros(3, 1);
        assert_eq!(fixed_orientation_correlation(orthogonal.columns(0, 1), &basis).value, 0.0);
        assert_eq!(fixed_orientation_correlation(zero.columns(0, 1), &basis).value, 0.0);
    }

    #[test]
    fn free_block_recovers_planted_orientation() {
        // the subspace holds exactly G · u for a known unit u
        let g: DMatrix<f64> = DMatrix::from_row_slice(
            5,
            3,
            &[
                1.0, 0.2, 0.0, //
                0.0, 1.0, 0.3, //
                0.4, 0.0, 1.0, //
                0.1, 0.5, 0.2, //
                0.3, 0.1, 0.6,
            ],
        );
        let u = DVector::from_column_slice(&[0.48, 0.6, 0.64]);
        let topography = &g * &u;
        let basis = DMatrix::from_column_slice(5, 1, (topography.clone() / topography.norm()).as_slice());

        let corr = free_orientation_correlation(g.columns(0, 3), &basis).unwrap();
        assert_relative_eq!(corr.value, 1.0, epsilon = 1e-10);
        assert_relative_eq!(corr.orientation.norm(), 1.0, epsilon = 1e-12);
        let sign = corr.orientation.dot(&u).signum();
        assert_relative_eq!(corr.orientation * sign, u, epsilon = 1e-8);
    }

    #[test]
    fn free_correlation_is_largest_principal_cosine() {
        // block spans e0, e1, e2; subspace spans (e0 + e3) / sqrt(2)
        let g = axis_basis(4, &[0, 1, 2]) * 2.0;
        let mut basis = DMatrix::zeros(4, 1);
        basis[(0, 0)] = std::f64::consts::FRAC_1_SQRT_2;
        basis[(3, 0)] = std::f64::consts::FRAC_1_SQRT_2;
        let corr = subspace_correlation(SourceOrientation::Free, g.columns(0, 3), &basis).unwrap();
        assert_relative_eq!(corr.value, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_relative_eq!(corr.orientation[0].abs(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn zero_free_block_scores_zero() {
        let basis = axis_basis(5, &[0, 1]);
        let zero = DMatrix::zeros(5, 3);
        let corr = free_orientation_correlation(zero.columns(0, 3), &basis).unwrap();
        assert_eq!(corr.value, 0.0);
        assert_relative_eq!(corr.orientation.norm(), 1.0);
    }

    #[test]
    fn rank_deficient_free_block_uses_its_own_span() {
        // only the last column is live; it is orthogonal to the subspace
        let basis = axis_basis(5, &[0, 1]);
        let mut g = DMatrix::zeros(5, 3);
        g[(3, 2)] = 2.0;
        let corr = free_orientation_correlation(g.columns(0, 3), &basis).unwrap();
        assert_relative_eq!(corr.value, 0.0, epsilon = 1e-12);

        // a dead first column in front of a live one inside the subspace
        let mut g = DMatrix::zeros(5, 3);
        g[(1, 1)] = 3.0;
        g[(4, 2)] = 1.0;
        let corr = free_orientation_correlation(g.columns(0, 3), &basis).unwrap();
        assert_relative_eq!(corr.value, 1.0, epsilon = 1e-12);
        assert_relative_eq!(corr.orientation[1].abs(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn non_finite_free_block_never_scores() {
        let basis = axis_basis(4, &[0]);
        let mut g = axis_basis(4, &[0, 1, 2]);
        g[(2, 1)] = f64::NAN;
        let corr = free_orientation_correlation(g.columns(0, 3), &basis).unwrap();
        assert!(corr.value.is_nan());
    }

    #[test]
    fn dispatch_rejects_channel_mismatch() {
        let g = DMatrix::zeros(3, 1);
        let basis = DMatrix::zeros(4, 1);
        assert!(subspace_correlation(SourceOrientation::Fixed, g.columns(0, 1), &basis).is_err());
    }
}
