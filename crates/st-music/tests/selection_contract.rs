// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::{DMatrix, DVector};
use st_music::synthetic::Scenario;
use st_music::{
    GreedySourceSelector, Leadfield, MusicError, RapMusic, RapMusicConfig, SourceOrientation,
    Whitener,
};

fn fixed(columns: &[[f64; 3]]) -> Leadfield {
    let columns: Vec<DVector<f64>> = columns
        .iter()
        .map(|col| DVector::from_column_slice(col))
        .collect();
    Leadfield::new(DMatrix::from_columns(&columns), SourceOrientation::Fixed).unwrap()
}

fn plane_basis() -> DMatrix<f64> {
    DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
}

fn winner(leadfield: &Leadfield, threshold: usize) -> usize {
    let basis = plane_basis();
    let selection = GreedySourceSelector::new(leadfield, &basis, 1)
        .unwrap()
        .with_parallel_threshold(threshold)
        .run()
        .unwrap();
    selection.sources()[0].candidate
}

#[test]
fn strictly_higher_correlation_wins() {
    let leadfield = fixed(&[[1.0, 0.0, 1.0], [1.0, 1.0, 0.2]]);
    assert_eq!(winner(&leadfield, usize::MAX), 1);
    assert_eq!(winner(&leadfield, 1), 1);

    let swapped = fixed(&[[1.0, 1.0, 0.2], [1.0, 0.0, 1.0]]);
    assert_eq!(winner(&swapped, usize::MAX), 0);
    assert_eq!(winner(&swapped, 1), 0);
}

#[test]
fn exact_ties_select_the_lower_index() {
    // both columns sit at 45 degrees to the plane
    let leadfield = fixed(&[[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]]);
    assert_eq!(winner(&leadfield, usize::MAX), 0);
    assert_eq!(winner(&leadfield, 1), 0);

    let mirrored = fixed(&[[0.0, 1.0, 1.0], [1.0, 0.0, 1.0]]);
    assert_eq!(winner(&mirrored, usize::MAX), 0);
    assert_eq!(winner(&mirrored, 1), 0);
}

#[test]
fn parallel_and_serial_scans_agree_on_large_pools() {
    st_music::telemetry::init_tracing();
    let scenario = Scenario::builder(16, 300)
        .planted(vec![299, 150, 0])
        .seed(123)
        .build()
        .unwrap();
    let run = |threshold: usize| {
        RapMusic::new(
            RapMusicConfig::default()
                .with_subspace_rank(3)
                .with_n_sources(3)
                .with_parallel_threshold(threshold),
        )
        .apply(&scenario.recording, &scenario.forward, &Whitener::identity(16).unwrap())
        .unwrap()
    };
    let serial = run(usize::MAX);
    let parallel = run(1);
    assert_eq!(serial.rounds, parallel.rounds);
    assert_eq!(serial.estimate.active_set().as_slice(), &[0, 150, 299]);
}

#[test]
fn too_many_sources_fail_before_any_round() {
    let scenario = Scenario::builder(12, 5)
        .planted(vec![1])
        .seed(1)
        .build()
        .unwrap();
    let config = RapMusicConfig::default()
        .with_subspace_rank(6)
        .with_n_sources(6);
    let err = RapMusic::new(config)
        .apply(&scenario.recording, &scenario.forward, &Whitener::identity(12).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        MusicError::NotEnoughCandidates {
            requested: 6,
            available: 5
        }
    ));
}

#[test]
fn configuration_errors_are_fatal() {
    let scenario = Scenario::builder(4, 6)
        .planted(vec![2])
        .seed(4)
        .build()
        .unwrap();
    let identity = Whitener::identity(4).unwrap();

    let too_wide = RapMusicConfig::default().with_subspace_rank(5).with_n_sources(1);
    assert!(matches!(
        RapMusic::new(too_wide).apply(&scenario.recording, &scenario.forward, &identity),
        Err(MusicError::RankExceedsChannels {
            rank: 5,
            channels: 4
        })
    ));

    let rank_below_sources = RapMusicConfig::default().with_subspace_rank(1).with_n_sources(2);
    assert!(matches!(
        RapMusic::new(rank_below_sources).apply(&scenario.recording, &scenario.forward, &identity),
        Err(MusicError::InvalidConfig { .. })
    ));

    let normal_on_fixed = RapMusicConfig::default()
        .with_subspace_rank(2)
        .with_n_sources(1)
        .with_pick_normal(true);
    assert!(matches!(
        RapMusic::new(normal_on_fixed).apply(&scenario.recording, &scenario.forward, &identity),
        Err(MusicError::NormalPickOnFixedOrientation)
    ));

    let valid = RapMusicConfig::default().with_subspace_rank(2).with_n_sources(1);
    let wide = Whitener::identity(5).unwrap();
    assert!(matches!(
        RapMusic::new(valid).apply(&scenario.recording, &scenario.forward, &wide),
        Err(MusicError::ShapeMismatch { .. })
    ));
}
