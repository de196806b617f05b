// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MusicResult<T> = Result<T, MusicError>;

/// Errors emitted while preparing or running a localisation.
///
/// Every variant is fatal for the `apply` call that produced it; no partial
/// active set or amplitude matrix is returned alongside an error.
#[derive(Debug, Error)]
pub enum MusicError {
    /// A scalar setting is out of its admissible range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
    /// The signal subspace cannot be wider than the sensor space.
    #[error("subspace rank {rank} exceeds the number of channels ({channels})")]
    RankExceedsChannels { rank: usize, channels: usize },
    /// Fewer candidates than requested sources.
    #[error("requested {requested} sources but the leadfield only holds {available} candidates")]
    NotEnoughCandidates { requested: usize, available: usize },
    /// Two operands that must be conformable are not.
    #[error("{context}: shape mismatch {left:?} vs {right:?}")]
    ShapeMismatch {
        context: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    /// Leadfield columns do not tile into whole candidate blocks.
    #[error("leadfield has {columns} columns which is not a multiple of orientation width {width}")]
    RaggedLeadfield { columns: usize, width: usize },
    /// The candidate count disagrees with the source space vertex lists.
    #[error("leadfield holds {candidates} candidates but the source space lists {vertices} vertices")]
    VertexCountMismatch { candidates: usize, vertices: usize },
    /// A normal-component pick needs the three free components per location.
    #[error("normal orientation can only be picked from a free-orientation leadfield")]
    NormalPickOnFixedOrientation,
    /// The sampling interval must be finite and strictly positive.
    #[error("sampling interval must be finite and positive, got {tstep}")]
    InvalidSamplingInterval { tstep: f64 },
    /// Computation received an empty input.
    #[error("{0}: empty input")]
    EmptyInput(&'static str),
    /// nalgebra refused a decomposition or solve.
    #[error("{stage}: {message}")]
    Decomposition {
        stage: &'static str,
        message: &'static str,
    },
    /// Every candidate of a round produced a non-finite correlation.
    #[error("round {round}: no candidate produced a finite subspace correlation")]
    NoFiniteCorrelation { round: usize },
    /// Configuration document could not be parsed.
    #[error(transparent)]
    ConfigParse(#[from] serde_json::Error),
}

impl MusicError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        MusicError::InvalidConfig {
            reason: reason.into(),
        }
    }
}
