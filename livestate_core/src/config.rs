//! Runtime configuration for the sampler, engine loop, and completion wait.
//!
//! These are separate from the TOML-deserialized config in `livestate_config`;
//! see `conversions` for the bridge.
use std::time::Duration;

use crate::util::{DEFAULT_INTERVAL, DEFAULT_MAX_HISTORY, nonzero_or};

/// Trajectory sampler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerCfg {
    /// Time between position samples.
    pub interval: Duration,
    /// Buffer capacity; the oldest entries are evicted beyond it.
    pub max_history: usize,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl SamplerCfg {
    /// Replace zero values with the defaults.
    pub fn normalized(self) -> Self {
        Self {
            interval: nonzero_or(self.interval, DEFAULT_INTERVAL),
            max_history: if self.max_history == 0 {
                DEFAULT_MAX_HISTORY
            } else {
                self.max_history
            },
        }
    }
}

/// Command completion wait settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionCfg {
    pub timeout: Duration,
    /// Delay between status reads; never sleeps past the deadline.
    pub poll_interval: Duration,
}

impl Default for CompletionCfg {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Cadence of a caller-driven `DeltaEngine::poll` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCfg {
    pub poll_interval: Duration,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}
