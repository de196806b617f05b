// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! RAP-MUSIC (recursively applied and projected multiple signal
//! classification) dipole localisation.
//!
//! Given a leadfield and a sensor recording, [`RapMusic::apply`] whitens both,
//! estimates the signal subspace of the data, then finds sources one at a
//! time: the candidate whose topography is most correlated with the signal
//! subspace wins the round, and its topography is projected out of the
//! leadfield and the subspace before the next round. Amplitudes are fitted by
//! least squares once all locations are fixed.
//!
//! Reference: J. C. Mosher and R. M. Leahy, "Source localization using
//! recursively applied and projected (RAP) MUSIC", IEEE Trans. Signal
//! Processing 47(2), 1999.

pub mod amplitude;
pub mod config;
pub mod correlation;
pub mod error;
pub mod forward;
pub mod linalg;
pub mod pipeline;
pub mod projector;
pub mod recording;
pub mod residual;
pub mod selector;
pub mod solution;
pub mod subspace;
pub mod synthetic;
pub mod telemetry;
pub mod whitening;

pub use amplitude::estimate_amplitudes;
pub use config::RapMusicConfig;
pub use correlation::{subspace_correlation, SubspaceCorrelation};
pub use error::{MusicError, MusicResult};
pub use forward::{ForwardOperator, Hemisphere, Leadfield, SourceOrientation, SourceSpaceVertices};
pub use pipeline::{RapMusic, RapMusicOutput};
pub use projector::orthogonal_complement;
pub use recording::Recording;
pub use selector::{ActiveSet, DiscoveredSource, GreedySourceSelector, Selection};
pub use solution::SourceEstimate;
pub use subspace::SignalSubspace;
pub use whitening::Whitener;
