// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-level logging hooks for binaries, tests and benchmarks that drive
//! [`RapMusic`](crate::RapMusic). The per-round `info!` events and the
//! `rap_music` span are only visible once a subscriber is installed.

use std::sync::OnceLock;

use st_music_config::tracing::{self as config_tracing, InitError};
use tracing::warn;

static ACTIVE: OnceLock<()> = OnceLock::new();

/// Installs the `ST_MUSIC_LOG`-filtered subscriber if none is active yet.
///
/// Returns `false` when another global subscriber owns the process or the
/// environment is unreadable; a later call may still succeed.
pub fn init_tracing() -> bool {
    if ACTIVE.get().is_some() {
        return true;
    }
    match config_tracing::init_tracing() {
        Ok(()) | Err(InitError::AlreadyInitialised) => {
            let _ = ACTIVE.set(());
            true
        }
        Err(err) => {
            warn!("st-music tracing not installed: {err}");
            false
        }
    }
}

/// Writes out the chrome trace, if `ST_MUSIC_TRACE_CHROME` enabled one.
pub fn finish() {
    config_tracing::flush_chrome_trace();
}
