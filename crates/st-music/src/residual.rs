// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Data explained by the found sources, back in sensor units.

use nalgebra::DMatrix;

use crate::forward::Leadfield;
use crate::recording::Recording;
use crate::selector::Selection;
use crate::{MusicError, MusicResult};

/// Topographies of the selected sources taken from the unwhitened gain,
/// one column per round.
pub fn sensor_topographies(gain: &Leadfield, selection: &Selection) -> DMatrix<f64> {
    let sources = selection.sources();
    let mut topographies = DMatrix::zeros(gain.n_channels(), sources.len());
    for (column, source) in sources.iter().enumerate() {
        let topography = gain.block(source.candidate) * &source.orientation;
        topographies.set_column(column, &topography);
    }
    topographies
}

/// `D = G_sel · S` with amplitude rows in discovery order.
pub fn explained_data(
    gain: &Leadfield,
    selection: &Selection,
    amplitudes: &DMatrix<f64>,
) -> MusicResult<DMatrix<f64>> {
    let topographies = sensor_topographies(gain, selection);
    if topographies.ncols() != amplitudes.nrows() {
        return Err(MusicError::ShapeMismatch {
            context: "explained data",
            left: topographies.shape(),
            right: amplitudes.shape(),
        });
    }
    Ok(topographies * amplitudes)
}

/// Recording minus the explained data, on the recording's time axis.
pub fn compose_residual(recording: &Recording, explained: &DMatrix<f64>) -> MusicResult<Recording> {
    if recording.data().shape() != explained.shape() {
        return Err(MusicError::ShapeMismatch {
            context: "residual",
            left: recording.data().shape(),
            right: explained.shape(),
        });
    }
    Ok(recording.with_data(recording.data() - explained))
}
