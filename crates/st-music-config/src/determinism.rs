// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use rand::{rngs::StdRng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

const ENV_ENABLED: &str = "ST_MUSIC_DETERMINISTIC";
const ENV_SEED: &str = "ST_MUSIC_DETERMINISTIC_SEED";
const ENV_SERIAL_SCAN: &str = "ST_MUSIC_SERIAL_SCAN";

const DEFAULT_SEED: u64 = 42;

/// Deterministic execution switches for localisation runs.
///
/// Candidate scans are reproducible even when they run on rayon, because the
/// reduction is ordered by `(correlation, index)`. `serial_scan` exists for
/// profiling and for bit-exact comparisons against a single-threaded run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Master switch.
    pub enabled: bool,
    /// Base seed for synthetic scenario generators.
    pub base_seed: u64,
    /// Forces the per-round candidate scan onto the calling thread.
    pub serial_scan: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_SEED,
            serial_scan: false,
        }
    }
}

/// Parses a boolean switch. Unknown spellings yield `None`.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "True" | "TRUE" | "on" | "ON" | "yes" => Some(true),
        "0" | "false" | "False" | "FALSE" | "off" | "OFF" | "no" => Some(false),
        _ => None,
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().as_deref().and_then(parse_flag)
}

impl DeterminismConfig {
    /// Builds a configuration snapshot from the `ST_MUSIC_*` variables.
    pub fn from_env() -> Self {
        let enabled = env_flag(ENV_ENABLED).unwrap_or(false);
        let base_seed = std::env::var(ENV_SEED)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);
        let serial_scan = env_flag(ENV_SERIAL_SCAN).unwrap_or(enabled);
        Self {
            enabled,
            base_seed,
            serial_scan,
        }
    }

    /// Derives a stable seed for `label` from the base seed.
    pub fn seed_for<L: Hash>(&self, label: L) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_seed.hash(&mut hasher);
        label.hash(&mut hasher);
        hasher.finish()
    }
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// Returns the process configuration, reading the environment on first use.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Installs `cfg` unless a configuration was already observed.
pub fn configure(cfg: DeterminismConfig) -> &'static DeterminismConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Whether candidate scans must stay on the calling thread.
pub fn lock_scan_order() -> bool {
    config().serial_scan
}

/// RNG for `label`: seeded when determinism is on, from OS entropy otherwise.
pub fn rng_from_label(label: &str) -> StdRng {
    let cfg = config();
    if cfg.enabled {
        StdRng::seed_from_u64(cfg.seed_for(label))
    } else {
        StdRng::from_entropy()
    }
}

/// An explicit seed wins over the process configuration.
pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => rng_from_label(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
    use std::sync::Mutex;

    fn with_env(vars: &[(&str, Option<&str>)], test: impl FnOnce()) {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                match value {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
                ((*key).to_string(), previous)
            })
            .collect();

        let result = catch_unwind(AssertUnwindSafe(test));

        for (key, value) in snapshot {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
        if let Err(err) = result {
            resume_unwind(err);
        }
    }

    #[test]
    fn unset_environment_keeps_parallel_scan() {
        with_env(
            &[(ENV_ENABLED, None), (ENV_SEED, None), (ENV_SERIAL_SCAN, None)],
            || {
                let cfg = DeterminismConfig::from_env();
                assert_eq!(cfg, DeterminismConfig::default());
            },
        );
    }

    #[test]
    fn serial_scan_follows_master_switch_unless_overridden() {
        with_env(&[(ENV_ENABLED, Some("on")), (ENV_SERIAL_SCAN, None)], || {
            assert!(DeterminismConfig::from_env().serial_scan);
        });
        with_env(
            &[(ENV_ENABLED, Some("1")), (ENV_SERIAL_SCAN, Some("0"))],
            || {
                let cfg = DeterminismConfig::from_env();
                assert!(cfg.enabled);
                assert!(!cfg.serial_scan);
            },
        );
    }

    #[test]
    fn unparsable_seed_falls_back_to_default() {
        with_env(&[(ENV_SEED, Some("not-a-number"))], || {
            assert_eq!(DeterminismConfig::from_env().base_seed, DEFAULT_SEED);
        });
        with_env(&[(ENV_SEED, Some(" 1337 "))], || {
            assert_eq!(DeterminismConfig::from_env().base_seed, 1337);
        });
    }

    #[test]
    fn label_seeds_are_stable() {
        let cfg = DeterminismConfig {
            enabled: true,
            base_seed: 7,
            serial_scan: true,
        };
        assert_eq!(cfg.seed_for("leadfield"), cfg.seed_for("leadfield"));
        assert_ne!(cfg.seed_for("leadfield"), cfg.seed_for("courses"));
    }

    #[test]
    fn explicit_seed_reproduces_stream() {
        let mut a = rng_from_optional(Some(11), "ignored");
        let mut b = rng_from_optional(Some(11), "other");
        let xs: Vec<f64> = (0..4).map(|_| a.gen()).collect();
        let ys: Vec<f64> = (0..4).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }
}
