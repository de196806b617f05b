// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};

use crate::selector::DEFAULT_PARALLEL_THRESHOLD;
use crate::{MusicError, MusicResult};

/// Scalar settings of one localisation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapMusicConfig {
    /// Dimension `r` of the signal subspace.
    pub subspace_rank: usize,
    /// Number of dipoles to find.
    pub n_sources: usize,
    /// Keep only the surface-normal component of a free-orientation forward.
    pub pick_normal: bool,
    /// Also reconstruct the explained data and the residual recording.
    pub return_residual: bool,
    /// Candidate count from which the per-round scan runs on rayon.
    pub parallel_threshold: usize,
}

impl Default for RapMusicConfig {
    fn default() -> Self {
        Self {
            subspace_rank: 15,
            n_sources: 5,
            pick_normal: false,
            return_residual: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl RapMusicConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> MusicResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> MusicResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_subspace_rank(mut self, rank: usize) -> Self {
        self.subspace_rank = rank;
        self
    }

    pub fn with_n_sources(mut self, n_sources: usize) -> Self {
        self.n_sources = n_sources;
        self
    }

    pub fn with_pick_normal(mut self, pick_normal: bool) -> Self {
        self.pick_normal = pick_normal;
        self
    }

    pub fn with_residual(mut self, return_residual: bool) -> Self {
        self.return_residual = return_residual;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Checks the settings that do not depend on the data.
    pub fn validate(&self) -> MusicResult<()> {
        if self.subspace_rank == 0 {
            return Err(MusicError::config("subspace_rank must be at least 1"));
        }
        if self.n_sources == 0 {
            return Err(MusicError::config("n_sources must be at least 1"));
        }
        if self.subspace_rank < self.n_sources {
            return Err(MusicError::config(format!(
                "subspace_rank ({}) must be at least n_sources ({})",
                self.subspace_rank, self.n_sources
            )));
        }
        Ok(())
    }
}
