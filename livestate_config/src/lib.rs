#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! TOML configuration schema for the live-state tools.
//!
//! Every section is optional; missing keys take the defaults below. Call
//! [`Config::validate`] after [`load_toml`] to reject out-of-range values.
use serde::Deserialize;
use serde::de::Deserializer;

/// Upper bound on simulated joints; mirrors the status model's joint array.
pub const MAX_SIM_JOINTS: u32 = 16;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SamplerSection {
    /// Sampling period of the trajectory thread (ms).
    pub interval_ms: u64,
    /// Ring capacity in samples.
    pub max_history: usize,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: 10,
            max_history: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct EngineSection {
    /// Cadence of the CLI watch loop (ms).
    pub poll_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self { poll_ms: 50 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CompletionSection {
    pub timeout_ms: u64,
    pub poll_ms: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            poll_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Never,
    Daily,
    Hourly,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    pub rotation: Rotation,
}

/// Tool preloaded into the simulator's table.
///
/// Accepts either a table (`{ tool_no = 1, pocket_no = 1, diameter = 6.0 }`)
/// or a tuple (`[tool_no, pocket_no, diameter]`).
#[derive(Debug, Clone, PartialEq)]
pub struct SimTool {
    pub tool_no: i32,
    pub pocket_no: i32,
    pub diameter: f64,
    pub z_offset: f64,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimSection {
    /// Feed-move speed (units/s).
    pub feed_rate: f64,
    /// Rapid-move speed (units/s); must not be slower than `feed_rate`.
    pub rapid_rate: f64,
    pub joints: u32,
    #[serde(deserialize_with = "de_tools")]
    pub tools: Vec<SimTool>,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            feed_rate: 20.0,
            rapid_rate: 80.0,
            joints: 3,
            tools: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sampler: SamplerSection,
    pub engine: EngineSection,
    pub completion: CompletionSection,
    pub logging: Logging,
    pub sim: SimSection,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolToml {
    Tuple((i32, i32, f64)),
    Table {
        tool_no: i32,
        #[serde(default)]
        pocket_no: i32,
        #[serde(default)]
        diameter: f64,
        #[serde(default)]
        z_offset: f64,
        #[serde(default)]
        comment: String,
    },
}

fn de_tools<'de, D>(deserializer: D) -> Result<Vec<SimTool>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<ToolToml>> = Option::deserialize(deserializer)?;
    Ok(opt
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            ToolToml::Tuple((tool_no, pocket_no, diameter)) => SimTool {
                tool_no,
                pocket_no,
                diameter,
                z_offset: 0.0,
                comment: String::new(),
            },
            ToolToml::Table {
                tool_no,
                pocket_no,
                diameter,
                z_offset,
                comment,
            } => SimTool {
                tool_no,
                pocket_no,
                diameter,
                z_offset,
                comment,
            },
        })
        .collect())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampler
        if self.sampler.interval_ms == 0 {
            eyre::bail!("sampler.interval_ms must be > 0");
        }
        if self.sampler.interval_ms > 60 * 1000 {
            eyre::bail!("sampler.interval_ms is unreasonably large (>60s)");
        }
        if self.sampler.max_history == 0 {
            eyre::bail!("sampler.max_history must be >= 1");
        }

        // Engine
        if self.engine.poll_ms == 0 {
            eyre::bail!("engine.poll_ms must be > 0");
        }

        // Completion
        if self.completion.timeout_ms == 0 {
            eyre::bail!("completion.timeout_ms must be > 0");
        }
        if self.completion.poll_ms == 0 {
            eyre::bail!("completion.poll_ms must be > 0");
        }
        if self.completion.poll_ms > self.completion.timeout_ms {
            eyre::bail!("completion.poll_ms must be <= completion.timeout_ms");
        }

        // Logging
        if let Some(level) = self.logging.level.as_deref()
            && !matches!(
                level.to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error" | "off"
            )
        {
            eyre::bail!("logging.level must be one of trace|debug|info|warn|error|off");
        }

        // Sim
        if !(self.sim.feed_rate.is_finite() && self.sim.feed_rate > 0.0) {
            eyre::bail!("sim.feed_rate must be > 0");
        }
        if !self.sim.rapid_rate.is_finite() || self.sim.rapid_rate < self.sim.feed_rate {
            eyre::bail!("sim.rapid_rate must be >= sim.feed_rate");
        }
        if self.sim.joints == 0 || self.sim.joints > MAX_SIM_JOINTS {
            eyre::bail!("sim.joints must be in 1..={MAX_SIM_JOINTS}");
        }
        for (i, t) in self.sim.tools.iter().enumerate() {
            if t.tool_no <= 0 {
                eyre::bail!("sim.tools[{i}].tool_no must be > 0");
            }
            if t.diameter.is_sign_negative() || !t.diameter.is_finite() {
                eyre::bail!("sim.tools[{i}].diameter must be >= 0");
            }
            if self.sim.tools[..i].iter().any(|o| o.tool_no == t.tool_no) {
                eyre::bail!("sim.tools[{i}].tool_no {} is duplicated", t.tool_no);
            }
        }

        Ok(())
    }
}
