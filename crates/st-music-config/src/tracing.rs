// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "ST_MUSIC_LOG";
const ENV_CHROME: &str = "ST_MUSIC_TRACE_CHROME";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: OnceLock<Mutex<Option<tracing_chrome::FlushGuard>>> = OnceLock::new();

/// Installs the global subscriber: env filter, fmt layer and, when
/// `ST_MUSIC_TRACE_CHROME` names a file, a chrome trace writer.
pub fn init_tracing() -> Result<(), InitError> {
    if INITIALISED.get().is_some() {
        return Err(InitError::AlreadyInitialised);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stdout().is_terminal());
    let registry = Registry::default().with(env_filter()).with(fmt_layer);

    match chrome_trace_path()? {
        Some(path) => {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            registry.with(chrome_layer).try_init()?;
            let slot = CHROME_GUARD.get_or_init(|| Mutex::new(None));
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(guard);
            }
        }
        None => registry.try_init()?,
    }
    let _ = INITIALISED.set(());
    Ok(())
}

pub fn flush_chrome_trace() {
    if let Some(cell) = CHROME_GUARD.get() {
        if let Ok(mut slot) = cell.lock() {
            slot.take();
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(ENV_FILTER)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn chrome_trace_path() -> Result<Option<PathBuf>, InitError> {
    match std::env::var(ENV_CHROME) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw.trim()))),
        Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read ST_MUSIC_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("another global subscriber is installed: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
