// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::DMatrix;
use tracing::debug;

use crate::linalg::least_squares;
use crate::MusicResult;

/// Source time courses `S` minimising `‖A·S − X‖_F` for fixed topographies.
///
/// Solved through the SVD so rank-deficient `A` (repeated or colinear
/// sources) yields the minimum-norm solution instead of failing.
pub fn estimate_amplitudes(
    topographies: &DMatrix<f64>,
    whitened: &DMatrix<f64>,
) -> MusicResult<DMatrix<f64>> {
    let amplitudes = least_squares(topographies, whitened)?;
    let misfit = (topographies * &amplitudes - whitened).norm();
    let total = whitened.norm();
    let relative_residual = if total > 0.0 { misfit / total } else { 0.0 };
    debug!(
        sources = amplitudes.nrows(),
        times = amplitudes.ncols(),
        relative_residual,
        "fitted source amplitudes"
    );
    Ok(amplitudes)
}
