//! `From` implementations bridging `livestate_config` types to runtime types.

use std::time::Duration;

use crate::config::{CompletionCfg, EngineCfg, SamplerCfg};
use crate::util::{DEFAULT_INTERVAL, ms_or};

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl From<&livestate_config::SamplerSection> for SamplerCfg {
    fn from(c: &livestate_config::SamplerSection) -> Self {
        Self {
            interval: ms_or(c.interval_ms, DEFAULT_INTERVAL),
            max_history: c.max_history,
        }
        .normalized()
    }
}

// ── CompletionCfg ────────────────────────────────────────────────────────────

impl From<&livestate_config::CompletionSection> for CompletionCfg {
    fn from(c: &livestate_config::CompletionSection) -> Self {
        let d = CompletionCfg::default();
        Self {
            timeout: ms_or(c.timeout_ms, d.timeout),
            poll_interval: ms_or(c.poll_ms, d.poll_interval),
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&livestate_config::EngineSection> for EngineCfg {
    fn from(c: &livestate_config::EngineSection) -> Self {
        Self {
            poll_interval: ms_or(c.poll_ms, Duration::from_millis(50)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let s = livestate_config::SamplerSection {
            interval_ms: 0,
            max_history: 0,
        };
        assert_eq!(SamplerCfg::from(&s), SamplerCfg::default());

        let c = livestate_config::CompletionSection {
            timeout_ms: 250,
            poll_ms: 0,
        };
        let cfg = CompletionCfg::from(&c);
        assert_eq!(cfg.timeout, Duration::from_millis(250));
        assert_eq!(cfg.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn defaults_line_up_with_toml_defaults() {
        let cfg = livestate_config::Config::default();
        assert_eq!(SamplerCfg::from(&cfg.sampler), SamplerCfg::default());
        assert_eq!(CompletionCfg::from(&cfg.completion), CompletionCfg::default());
        assert_eq!(EngineCfg::from(&cfg.engine), EngineCfg::default());
    }
}
