// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! End-to-end RAP-MUSIC on one recording.

use std::borrow::Cow;

use nalgebra::DMatrix;
use tracing::{info, info_span};

use crate::amplitude::estimate_amplitudes;
use crate::config::RapMusicConfig;
use crate::forward::ForwardOperator;
use crate::recording::Recording;
use crate::residual::{compose_residual, explained_data};
use crate::selector::{DiscoveredSource, GreedySourceSelector};
use crate::solution::SourceEstimate;
use crate::subspace::SignalSubspace;
use crate::whitening::Whitener;
use crate::{MusicError, MusicResult};

/// Everything one `apply` call produces.
#[derive(Clone, Debug)]
pub struct RapMusicOutput {
    pub estimate: SourceEstimate,
    /// Per-round winners in discovery order.
    pub rounds: Vec<DiscoveredSource>,
    /// Eigenvalues of the retained signal subspace, ascending.
    pub subspace_eigenvalues: Vec<f64>,
    /// Data explained by the sources in sensor units, when requested.
    pub explained: Option<DMatrix<f64>>,
    /// Recording minus `explained`, when requested.
    pub residual: Option<Recording>,
}

/// Configured localiser. Holds no per-run state, so one instance can serve
/// concurrent calls on different recordings.
#[derive(Clone, Debug, Default)]
pub struct RapMusic {
    config: RapMusicConfig,
}

impl RapMusic {
    pub fn new(config: RapMusicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RapMusicConfig {
        &self.config
    }

    /// Localises `config.n_sources` dipoles explaining `recording`.
    ///
    /// Fails before the first round on any configuration or shape problem;
    /// nothing partial is returned.
    pub fn apply(
        &self,
        recording: &Recording,
        forward: &ForwardOperator,
        whitener: &Whitener,
    ) -> MusicResult<RapMusicOutput> {
        let span = info_span!(
            "rap_music",
            rank = self.config.subspace_rank,
            n_sources = self.config.n_sources
        );
        let _guard = span.enter();

        self.config.validate()?;
        let forward = if self.config.pick_normal {
            Cow::Owned(forward.with_normal_orientation()?)
        } else {
            Cow::Borrowed(forward)
        };
        let gain = forward.leadfield();
        check_channels("forward vs recording", gain.matrix().shape(), recording.data().shape())?;
        check_channels("whitener vs recording", whitener.matrix().shape(), recording.data().shape())?;
        if self.config.subspace_rank > recording.n_channels() {
            return Err(MusicError::RankExceedsChannels {
                rank: self.config.subspace_rank,
                channels: recording.n_channels(),
            });
        }
        if gain.n_candidates() < self.config.n_sources {
            return Err(MusicError::NotEnoughCandidates {
                requested: self.config.n_sources,
                available: gain.n_candidates(),
            });
        }

        let whitened_gain = gain.whiten(whitener)?;
        let whitened_data = whitener.apply(recording.data())?;

        let subspace = SignalSubspace::extract(&whitened_data, self.config.subspace_rank)?;
        let selection =
            GreedySourceSelector::new(&whitened_gain, subspace.basis(), self.config.n_sources)?
                .with_parallel_threshold(self.config.parallel_threshold)
                .run()?;

        let amplitudes = estimate_amplitudes(selection.topographies(), &whitened_data)?;

        let (explained, residual) = if self.config.return_residual {
            let explained = explained_data(gain, &selection, &amplitudes)?;
            let residual = compose_residual(recording, &explained)?;
            (Some(explained), Some(residual))
        } else {
            (None, None)
        };

        let estimate = SourceEstimate::assemble(
            &selection,
            &amplitudes,
            forward.vertices(),
            recording.tmin(),
            recording.tstep(),
            forward.subject().map(str::to_owned),
        )?;
        info!(
            active_set = ?estimate.active_set().as_slice(),
            lh = estimate.vertices.lh.len(),
            rh = estimate.vertices.rh.len(),
            "localisation complete"
        );

        Ok(RapMusicOutput {
            estimate,
            rounds: selection.sources().to_vec(),
            subspace_eigenvalues: subspace.eigenvalues().iter().copied().collect(),
            explained,
            residual,
        })
    }
}

fn check_channels(
    context: &'static str,
    left: (usize, usize),
    right: (usize, usize),
) -> MusicResult<()> {
    if left.0 != right.0 {
        return Err(MusicError::ShapeMismatch {
            context,
            left,
            right,
        });
    }
    Ok(())
}
