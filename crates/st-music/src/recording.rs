// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::DMatrix;

use crate::{MusicError, MusicResult};

/// Channels × times sensor recording with its time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    data: DMatrix<f64>,
    tmin: f64,
    tstep: f64,
}

impl Recording {
    pub fn new(data: DMatrix<f64>, tmin: f64, tstep: f64) -> MusicResult<Self> {
        if !(tstep.is_finite() && tstep > 0.0) {
            return Err(MusicError::InvalidSamplingInterval { tstep });
        }
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(MusicError::EmptyInput("recording"));
        }
        Ok(Self { data, tmin, tstep })
    }

    /// Builds the time axis from a sampling frequency in Hz.
    pub fn from_sfreq(data: DMatrix<f64>, tmin: f64, sfreq: f64) -> MusicResult<Self> {
        Self::new(data, tmin, 1.0 / sfreq)
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    pub fn tstep(&self) -> f64 {
        self.tstep
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|idx| self.tmin + idx as f64 * self.tstep)
            .collect()
    }

    /// Same time axis, different samples.
    pub(crate) fn with_data(&self, data: DMatrix<f64>) -> Self {
        Self {
            data,
            tmin: self.tmin,
            tstep: self.tstep,
        }
    }
}
