// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide switches shared by the st-music crates.
//!
//! [`determinism`] decides whether candidate scans may fan out over rayon and
//! hands out seeded RNGs; [`tracing`] installs the global subscriber.

pub mod determinism;
pub mod tracing;
