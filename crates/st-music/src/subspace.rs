// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Signal subspace estimation from whitened sensor data.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::linalg::symmetric_eigen_ascending;
use crate::{MusicError, MusicResult};

/// Orthonormal basis of the dominant `rank` directions of `X · Xᵀ`.
#[derive(Clone, Debug)]
pub struct SignalSubspace {
    basis: DMatrix<f64>,
    eigenvalues: DVector<f64>,
}

impl SignalSubspace {
    /// Eigendecomposes the channel covariance of `whitened` and keeps the
    /// eigenvectors of the `rank` largest eigenvalues, in ascending order
    /// of eigenvalue (the last column is the strongest direction).
    pub fn extract(whitened: &DMatrix<f64>, rank: usize) -> MusicResult<Self> {
        let channels = whitened.nrows();
        if rank == 0 {
            return Err(MusicError::config("subspace rank must be at least 1"));
        }
        if rank > channels {
            return Err(MusicError::RankExceedsChannels { rank, channels });
        }
        let covariance = whitened * whitened.transpose();
        let pairs = symmetric_eigen_ascending(covariance)?;
        let start = channels - rank;
        let basis = pairs.vectors.columns(start, rank).clone_owned();
        let eigenvalues = pairs.values.rows(start, rank).clone_owned();
        debug!(
            rank,
            channels,
            largest = eigenvalues[rank - 1],
            smallest_kept = eigenvalues[0],
            "extracted signal subspace"
        );
        Ok(Self { basis, eigenvalues })
    }

    /// Channels × rank basis Φ.
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    /// Eigenvalues belonging to the basis columns, ascending.
    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn rank(&self) -> usize {
        self.basis.ncols()
    }
}
