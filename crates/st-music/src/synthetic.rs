// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Noiseless planted-source problems for tests and benchmarks.
//!
//! A Gaussian leadfield is drawn, a handful of candidates are planted with
//! unit orientations and Gaussian time courses, and the recording is exactly
//! `A · S`. When no seed is given the RNG follows
//! [`st_music_config::determinism`].

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use st_music_config::determinism;

use crate::forward::{ForwardOperator, Leadfield, SourceOrientation, SourceSpaceVertices};
use crate::recording::Recording;
use crate::{MusicError, MusicResult};

/// A generated problem with its ground truth.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub forward: ForwardOperator,
    pub recording: Recording,
    /// Planted candidate indices, in the order given to the builder.
    pub planted: Vec<usize>,
    /// Unit orientation per planted source.
    pub orientations: Vec<DVector<f64>>,
    /// Planted time courses, one row per entry of `planted`.
    pub amplitudes: DMatrix<f64>,
}

impl Scenario {
    pub fn builder(channels: usize, candidates: usize) -> ScenarioBuilder {
        ScenarioBuilder::new(channels, candidates)
    }

    /// Channels × planted topography matrix.
    pub fn topographies(&self) -> DMatrix<f64> {
        planted_topographies(self.forward.leadfield(), &self.planted, &self.orientations)
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioBuilder {
    channels: usize,
    candidates: usize,
    orientation: SourceOrientation,
    planted: Vec<usize>,
    n_times: usize,
    sfreq: f64,
    tmin: f64,
    left_hemisphere: Option<usize>,
    seed: Option<u64>,
    leadfield: Option<DMatrix<f64>>,
}

impl ScenarioBuilder {
    pub fn new(channels: usize, candidates: usize) -> Self {
        Self {
            channels,
            candidates,
            orientation: SourceOrientation::Fixed,
            planted: Vec::new(),
            n_times: 50,
            sfreq: 1000.0,
            tmin: -0.05,
            left_hemisphere: None,
            seed: None,
            leadfield: None,
        }
    }

    pub fn orientation(mut self, orientation: SourceOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn planted(mut self, planted: impl Into<Vec<usize>>) -> Self {
        self.planted = planted.into();
        self
    }

    pub fn n_times(mut self, n_times: usize) -> Self {
        self.n_times = n_times;
        self
    }

    pub fn sfreq(mut self, sfreq: f64) -> Self {
        self.sfreq = sfreq;
        self
    }

    pub fn tmin(mut self, tmin: f64) -> Self {
        self.tmin = tmin;
        self
    }

    /// Candidates `0..count` go to the left hemisphere. Defaults to half.
    pub fn left_hemisphere(mut self, count: usize) -> Self {
        self.left_hemisphere = Some(count);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Uses `matrix` instead of a random gain.
    pub fn leadfield(mut self, matrix: DMatrix<f64>) -> Self {
        self.leadfield = Some(matrix);
        self
    }

    pub fn build(self) -> MusicResult<Scenario> {
        if self.planted.is_empty() {
            return Err(MusicError::config("a scenario needs at least one planted source"));
        }
        if let Some(&bad) = self.planted.iter().find(|&&idx| idx >= self.candidates) {
            return Err(MusicError::config(format!(
                "planted candidate {bad} is outside 0..{}",
                self.candidates
            )));
        }
        let lh_count = self.left_hemisphere.unwrap_or(self.candidates / 2);
        if lh_count > self.candidates {
            return Err(MusicError::config("left hemisphere larger than the source space"));
        }

        let mut rng = determinism::rng_from_optional(self.seed, "st-music::synthetic");
        let width = self.orientation.width();
        let gain = match self.leadfield {
            Some(matrix) => matrix,
            None => gaussian(&mut rng, self.channels, self.candidates * width),
        };
        let leadfield = Leadfield::new(gain, self.orientation)?;
        if leadfield.n_candidates() != self.candidates || leadfield.n_channels() != self.channels {
            return Err(MusicError::ShapeMismatch {
                context: "provided scenario leadfield",
                left: leadfield.matrix().shape(),
                right: (self.channels, self.candidates * width),
            });
        }

        let orientations: Vec<DVector<f64>> = self
            .planted
            .iter()
            .map(|_| unit_orientation(&mut rng, width))
            .collect();
        let amplitudes = gaussian(&mut rng, self.planted.len(), self.n_times);
        let data = planted_topographies(&leadfield, &self.planted, &orientations) * &amplitudes;

        let vertices = SourceSpaceVertices::new(
            (0..lh_count).map(|idx| 2 * idx as u32).collect(),
            (lh_count..self.candidates).map(|idx| 2 * idx as u32 + 1).collect(),
        );
        let forward = ForwardOperator::new(leadfield, vertices, Some("synthetic".to_owned()))?;
        let recording = Recording::from_sfreq(data, self.tmin, self.sfreq)?;

        Ok(Scenario {
            forward,
            recording,
            planted: self.planted,
            orientations,
            amplitudes,
        })
    }
}

fn gaussian(rng: &mut StdRng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.sample::<f64, _>(StandardNormal))
}

fn unit_orientation(rng: &mut StdRng, width: usize) -> DVector<f64> {
    if width == 1 {
        return DVector::from_element(1, 1.0);
    }
    loop {
        let v = DVector::from_fn(width, |_, _| rng.sample::<f64, _>(StandardNormal));
        let norm = v.norm();
        if norm > 1e-6 {
            return v / norm;
        }
    }
}

fn planted_topographies(
    leadfield: &Leadfield,
    planted: &[usize],
    orientations: &[DVector<f64>],
) -> DMatrix<f64> {
    let mut topographies = DMatrix::zeros(leadfield.n_channels(), planted.len());
    for (column, (&candidate, orientation)) in planted.iter().zip(orientations).enumerate() {
        topographies.set_column(column, &(leadfield.block(candidate) * orientation));
    }
    topographies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_scenarios_are_reproducible() {
        let build = || {
            Scenario::builder(8, 10)
                .planted(vec![2, 7])
                .seed(3)
                .build()
                .unwrap()
        };
        let (a, b) = (build(), build());
        assert_eq!(a.recording, b.recording);
        assert_eq!(a.forward, b.forward);
    }

    #[test]
    fn recording_is_exact_mixture() {
        let scenario = Scenario::builder(6, 5)
            .orientation(SourceOrientation::Free)
            .planted(vec![4, 0])
            .n_times(12)
            .seed(9)
            .build()
            .unwrap();
        let rebuilt = scenario.topographies() * &scenario.amplitudes;
        assert!((rebuilt - scenario.recording.data()).norm() < 1e-12);
        for orientation in &scenario.orientations {
            assert!((orientation.norm() - 1.0).abs() < 1e-12);
        }
        assert_eq!(scenario.forward.vertices().lh, vec![0, 2]);
        assert_eq!(scenario.forward.vertices().rh, vec![5, 7, 9]);
    }

    #[test]
    fn out_of_range_plant_is_rejected() {
        assert!(Scenario::builder(4, 3).planted(vec![3]).build().is_err());
        assert!(Scenario::builder(4, 3).build().is_err());
    }
}
