// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Recursively applied and projected source search.
//!
//! Each round runs three steps:
//!
//! 1. **search** – score every candidate block of the current (deflated)
//!    leadfield against the current (deflated) subspace basis;
//! 2. **select** – record the best candidate and its topography, built from
//!    the undeflated leadfield block and the winning orientation;
//! 3. **deflate** – project the original leadfield and basis onto the
//!    orthogonal complement of every topography found so far.
//!
//! Rounds are strictly sequential. Within one round the scan may run on rayon;
//! the reduction orders by `(correlation desc, candidate asc)` so that the
//! winner is the first maximal candidate, exactly as in a single-threaded
//! strict-greater scan. A candidate already selected is not excluded from
//! later rounds; its deflated block is normally too weak to win again.

use std::borrow::Cow;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use st_music_config::determinism;
use tracing::{debug, info};

use crate::correlation::{subspace_correlation, SubspaceCorrelation};
use crate::forward::{Leadfield, SourceOrientation};
use crate::projector::orthogonal_complement;
use crate::{MusicError, MusicResult};

/// Candidate counts below this are always scanned on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// One round's winner.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredSource {
    /// Zero-based round in which the source was found.
    pub round: usize,
    /// Flat candidate index into the leadfield's block structure.
    pub candidate: usize,
    /// Subspace correlation against the deflated subspace, in `[0, 1]`.
    pub correlation: f64,
    /// Unit orientation in the candidate's own column frame.
    pub orientation: DVector<f64>,
}

/// Candidate indices sorted ascending. Repeats are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSet(Vec<usize>);

impl ActiveSet {
    pub fn from_candidates(candidates: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = candidates.into_iter().collect();
        indices.sort_unstable();
        Self(indices)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

/// Frozen result of all rounds.
#[derive(Clone, Debug)]
pub struct Selection {
    sources: Vec<DiscoveredSource>,
    topographies: DMatrix<f64>,
}

impl Selection {
    /// Winners in discovery order.
    pub fn sources(&self) -> &[DiscoveredSource] {
        &self.sources
    }

    /// Channels × n_sources matrix `A`, column `k` found in round `k`.
    pub fn topographies(&self) -> &DMatrix<f64> {
        &self.topographies
    }

    pub fn active_set(&self) -> ActiveSet {
        ActiveSet::from_candidates(self.sources.iter().map(|source| source.candidate))
    }

    /// Rounds reordered by ascending candidate index; stable for repeats.
    pub fn rounds_by_candidate(&self) -> Vec<usize> {
        let mut rounds: Vec<usize> = (0..self.sources.len()).collect();
        rounds.sort_by_key(|&round| self.sources[round].candidate);
        rounds
    }
}

/// Working copies owned by one round. Round 0 borrows the originals.
struct DeflationState<'a> {
    leadfield: Cow<'a, Leadfield>,
    basis: Cow<'a, DMatrix<f64>>,
}

impl<'a> DeflationState<'a> {
    fn initial(leadfield: &'a Leadfield, basis: &'a DMatrix<f64>) -> Self {
        Self {
            leadfield: Cow::Borrowed(leadfield),
            basis: Cow::Borrowed(basis),
        }
    }

    /// Always projects the originals, never the previous round's copies.
    fn deflated(leadfield: &Leadfield, basis: &DMatrix<f64>, projector: &DMatrix<f64>) -> Self {
        Self {
            leadfield: Cow::Owned(leadfield.projected(projector)),
            basis: Cow::Owned(projector * basis),
        }
    }
}

#[derive(Clone, Debug)]
struct Scored {
    candidate: usize,
    correlation: SubspaceCorrelation,
}

impl Scored {
    fn rank_value(&self) -> f64 {
        if self.correlation.value.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.correlation.value
        }
    }

    /// Strictly greater wins; exact ties go to the lower index.
    fn beats(&self, incumbent: &Scored) -> bool {
        let (mine, theirs) = (self.rank_value(), incumbent.rank_value());
        mine > theirs || (mine == theirs && self.candidate < incumbent.candidate)
    }
}

/// Greedy RAP-MUSIC search over a whitened leadfield.
#[derive(Debug)]
pub struct GreedySourceSelector<'a> {
    leadfield: &'a Leadfield,
    basis: &'a DMatrix<f64>,
    n_sources: usize,
    parallel_threshold: usize,
}

impl<'a> GreedySourceSelector<'a> {
    /// Validates the whole problem before any round runs.
    pub fn new(
        leadfield: &'a Leadfield,
        basis: &'a DMatrix<f64>,
        n_sources: usize,
    ) -> MusicResult<Self> {
        if n_sources == 0 {
            return Err(MusicError::config("at least one source must be requested"));
        }
        if leadfield.n_channels() != basis.nrows() {
            return Err(MusicError::ShapeMismatch {
                context: "leadfield and subspace basis channels",
                left: leadfield.matrix().shape(),
                right: basis.shape(),
            });
        }
        if basis.ncols() < n_sources {
            return Err(MusicError::config(format!(
                "subspace rank {} is smaller than the number of sources {}",
                basis.ncols(),
                n_sources
            )));
        }
        if leadfield.n_candidates() < n_sources {
            return Err(MusicError::NotEnoughCandidates {
                requested: n_sources,
                available: leadfield.n_candidates(),
            });
        }
        Ok(Self {
            leadfield,
            basis,
            n_sources,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn orientation(&self) -> SourceOrientation {
        self.leadfield.orientation()
    }

    /// Runs exactly `n_sources` rounds.
    pub fn run(&self) -> MusicResult<Selection> {
        let channels = self.leadfield.n_channels();
        let mut topographies = DMatrix::zeros(channels, self.n_sources);
        let mut sources = Vec::with_capacity(self.n_sources);
        let mut state = DeflationState::initial(self.leadfield, self.basis);

        for round in 0..self.n_sources {
            let best = self.search(&state, round)?;

            let topography = self.leadfield.block(best.candidate) * &best.correlation.orientation;
            topographies.set_column(round, &topography);
            self.report(round, &best);
            sources.push(DiscoveredSource {
                round,
                candidate: best.candidate,
                correlation: best.correlation.value,
                orientation: best.correlation.orientation,
            });

            if round + 1 < self.n_sources {
                let projector = orthogonal_complement(topographies.columns(0, round + 1))?;
                state = DeflationState::deflated(self.leadfield, self.basis, &projector);
            }
        }

        Ok(Selection {
            sources,
            topographies,
        })
    }

    fn search(&self, state: &DeflationState<'_>, round: usize) -> MusicResult<Scored> {
        let candidates = state.leadfield.n_candidates();
        let parallel = candidates >= self.parallel_threshold && !determinism::lock_scan_order();
        let best = if parallel {
            scan_parallel(&state.leadfield, &state.basis)?
        } else {
            scan_serial(&state.leadfield, &state.basis)?
        };
        debug!(round, candidates, parallel, "scanned candidates");
        best.filter(|scored| scored.rank_value().is_finite())
            .ok_or(MusicError::NoFiniteCorrelation { round })
    }

    fn report(&self, round: usize, best: &Scored) {
        match self.orientation() {
            SourceOrientation::Fixed => info!(
                round = round + 1,
                candidate = best.candidate,
                correlation = best.correlation.value,
                "source found"
            ),
            SourceOrientation::Free => info!(
                round = round + 1,
                candidate = best.candidate,
                correlation = best.correlation.value,
                orientation = ?best.correlation.orientation.as_slice(),
                "source found"
            ),
        }
    }
}

fn score(leadfield: &Leadfield, basis: &DMatrix<f64>, candidate: usize) -> MusicResult<Scored> {
    let correlation = subspace_correlation(leadfield.orientation(), leadfield.block(candidate), basis)?;
    Ok(Scored {
        candidate,
        correlation,
    })
}

fn scan_serial(leadfield: &Leadfield, basis: &DMatrix<f64>) -> MusicResult<Option<Scored>> {
    let mut best: Option<Scored> = None;
    for candidate in 0..leadfield.n_candidates() {
        let scored = score(leadfield, basis, candidate)?;
        if best.as_ref().map_or(true, |incumbent| scored.beats(incumbent)) {
            best = Some(scored);
        }
    }
    Ok(best)
}

fn scan_parallel(leadfield: &Leadfield, basis: &DMatrix<f64>) -> MusicResult<Option<Scored>> {
    (0..leadfield.n_candidates())
        .into_par_iter()
        .map(|candidate| score(leadfield, basis, candidate))
        .try_reduce_with(|left, right| Ok(if right.beats(&left) { right } else { left }))
        .transpose()
}
