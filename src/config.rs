//! Engine tuning knobs, loaded from environment variables.
//!
//! Every knob has a default in [`crate::consts`]; a missing or unparsable
//! variable silently falls back to it.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{
    DEFAULT_ALPHA_THRESHOLD, DEFAULT_DEBOUNCE_MS, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_NEIGHBOR_FRACTION,
};

const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;

/// Tuning knobs for one editing session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Quiet period before metadata synthesis runs, in milliseconds.
    pub debounce_ms: u64,
    /// Raster samples with alpha above this count as inside a mask.
    pub alpha_threshold: u8,
    /// Hover coalescing window, in milliseconds.
    pub frame_interval_ms: u64,
    /// Relationship cutoff as a fraction of the image diagonal.
    pub neighbor_fraction: f64,
    /// Bounded capacity of the runtime command channel.
    pub command_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            neighbor_fraction: DEFAULT_NEIGHBOR_FRACTION,
            command_queue: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary key lookup. `from_env` is this over the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let neighbor_fraction = env_parse(&lookup, "MASKEDIT_NEIGHBOR_FRACTION", d.neighbor_fraction);
        Self {
            debounce_ms: env_parse(&lookup, "MASKEDIT_DEBOUNCE_MS", d.debounce_ms),
            alpha_threshold: env_parse(&lookup, "MASKEDIT_ALPHA_THRESHOLD", d.alpha_threshold),
            frame_interval_ms: env_parse(&lookup, "MASKEDIT_FRAME_INTERVAL_MS", d.frame_interval_ms).max(1),
            neighbor_fraction: if neighbor_fraction.is_finite() && neighbor_fraction >= 0.0 {
                neighbor_fraction
            } else {
                d.neighbor_fraction
            },
            command_queue: env_parse(&lookup, "MASKEDIT_COMMAND_QUEUE", d.command_queue).max(1),
        }
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    lookup(key).map_or(default, |raw| raw.trim().parse::<T>().unwrap_or(default))
}

/// A process environment variable, if set to valid UTF-8.
fn env_var(key: &str) -> Option<String> {
    std::env::var_os(key).and_then(|v| v.to_str().map(str::to_owned))
}
