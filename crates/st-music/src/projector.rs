// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::{DMatrix, DMatrixView};

use crate::linalg::pseudo_inverse;
use crate::MusicResult;

/// Projector onto the orthogonal complement of `span(topographies)`:
///
/// ```text
/// P = I − A (Aᵀ A)⁺ Aᵀ
/// ```
///
/// The pseudoinverse keeps `P` well defined when topographies are colinear.
/// With no columns `P = I`.
pub fn orthogonal_complement(topographies: DMatrixView<'_, f64>) -> MusicResult<DMatrix<f64>> {
    let channels = topographies.nrows();
    let identity = DMatrix::identity(channels, channels);
    if topographies.ncols() == 0 {
        return Ok(identity);
    }
    let gram = topographies.tr_mul(&topographies);
    let gram_pinv = pseudo_inverse(gram)?;
    let span = &topographies * gram_pinv * topographies.transpose();
    Ok(identity - span)
}
