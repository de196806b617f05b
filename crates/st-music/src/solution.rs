// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::DMatrix;

use crate::forward::SourceSpaceVertices;
use crate::selector::{ActiveSet, Selection};
use crate::{MusicError, MusicResult};

/// Time courses of the found dipoles on their source-space vertices.
///
/// Rows follow the ascending candidate order: all left-hemisphere vertices
/// first, then the right hemisphere, matching `vertices`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceEstimate {
    pub vertices: SourceSpaceVertices,
    pub data: DMatrix<f64>,
    pub tmin: f64,
    pub tstep: f64,
    pub subject: Option<String>,
    active_set: ActiveSet,
}

impl SourceEstimate {
    /// Reorders discovery-order `amplitudes` onto the sorted active set.
    pub fn assemble(
        selection: &Selection,
        amplitudes: &DMatrix<f64>,
        source_space: &SourceSpaceVertices,
        tmin: f64,
        tstep: f64,
        subject: Option<String>,
    ) -> MusicResult<Self> {
        if amplitudes.nrows() != selection.sources().len() {
            return Err(MusicError::ShapeMismatch {
                context: "amplitude rows per source",
                left: amplitudes.shape(),
                right: (selection.sources().len(), amplitudes.ncols()),
            });
        }
        let order = selection.rounds_by_candidate();
        let data = amplitudes.select_rows(order.iter());
        let active_set = selection.active_set();
        let vertices = source_space.select(active_set.as_slice());
        Ok(Self {
            vertices,
            data,
            tmin,
            tstep,
            subject,
            active_set,
        })
    }

    /// Sorted candidate indices behind each row.
    pub fn active_set(&self) -> &ActiveSet {
        &self.active_set
    }

    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|idx| self.tmin + idx as f64 * self.tstep)
            .collect()
    }
}
