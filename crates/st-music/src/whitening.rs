// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::DMatrix;

use crate::{MusicError, MusicResult};

/// Channels × channels noise-whitening operator computed by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Whitener {
    matrix: DMatrix<f64>,
}

impl Whitener {
    pub fn new(matrix: DMatrix<f64>) -> MusicResult<Self> {
        if !matrix.is_square() {
            return Err(MusicError::ShapeMismatch {
                context: "whitener must be square",
                left: matrix.shape(),
                right: (matrix.nrows(), matrix.nrows()),
            });
        }
        if matrix.nrows() == 0 {
            return Err(MusicError::EmptyInput("whitener"));
        }
        Ok(Self { matrix })
    }

    /// Pass-through whitener for data that is already white.
    pub fn identity(channels: usize) -> MusicResult<Self> {
        Self::new(DMatrix::identity(channels, channels))
    }

    pub fn n_channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// `W · operand`.
    pub fn apply(&self, operand: &DMatrix<f64>) -> MusicResult<DMatrix<f64>> {
        if operand.nrows() != self.matrix.ncols() {
            return Err(MusicError::ShapeMismatch {
                context: "whitening",
                left: self.matrix.shape(),
                right: operand.shape(),
            });
        }
        Ok(&self.matrix * operand)
    }
}
