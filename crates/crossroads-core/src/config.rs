//! Configuration loading and typed config structures for the Crossroads
//! simulation.
//!
//! The canonical configuration lives in `crossroads-config.yaml` at the
//! project root. Every value is a constant for the lifetime of a run and is
//! passed to the engine explicitly, so an adaptive and a fixed instance can
//! run side by side with different settings.

use std::path::Path;

use crossroads_types::ApproachState;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its permitted range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Explanation of what is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `crossroads-config.yaml`. All fields default to
/// the reference signal plan.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Signal timing and saturation-flow parameters.
    #[serde(default)]
    pub signal: SignalConfig,

    /// Adaptive controller coefficients.
    #[serde(default)]
    pub adaptive: AdaptiveConfig,

    /// Random-walk parameters for the synthetic sensors.
    #[serde(default)]
    pub demand: DemandConfig,

    /// Initial sensor values and random seed for a fresh run.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Driver loop bounds and pacing.
    #[serde(default)]
    pub run: RunConfig,

    /// External explanation generator settings.
    #[serde(default)]
    pub explanation: ExplanationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CROSSROADS_SEED` overrides `seed.rng_seed`
    /// - `CROSSROADS_MAX_TRANSITIONS` overrides `run.max_transitions`
    ///
    /// Unparseable override values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply the `CROSSROADS_SEED` and `CROSSROADS_MAX_TRANSITIONS`
    /// overrides. [`SimulationConfig::from_file`] calls this already.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_parse::<u64>("CROSSROADS_SEED") {
            self.seed.rng_seed = seed;
        }
        if let Some(max) = env_parse::<u64>("CROSSROADS_MAX_TRANSITIONS") {
            self.run.max_transitions = max;
        }
    }

    /// Check every value against the range the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signal;
        positive("signal.base_green_s", s.base_green_s)?;
        positive("signal.yellow_s", s.yellow_s)?;
        positive("signal.min_green_base_s", s.min_green_base_s)?;
        positive("signal.min_green_emergency_s", s.min_green_emergency_s)?;
        positive("signal.headway_s", s.headway_s)?;
        non_negative("signal.startup_lost_s", s.startup_lost_s)?;
        if s.lanes_per_approach == 0 {
            return Err(ConfigError::Invalid {
                field: "signal.lanes_per_approach",
                reason: "must be at least 1".to_owned(),
            });
        }

        let a = &self.adaptive;
        non_negative("adaptive.max_adjust_s", a.max_adjust_s)?;
        non_negative("adaptive.emergency_bonus_s", a.emergency_bonus_s)?;
        finite("adaptive.alpha_per_mean", a.alpha_per_mean)?;
        finite("adaptive.beta_per_weight", a.beta_per_weight)?;

        let d = &self.demand;
        jitter("demand.arrival_jitter", d.arrival_jitter)?;
        jitter("demand.weight_jitter", d.weight_jitter)?;
        probability("demand.emergency_decay_p", d.emergency_decay_p)?;
        probability("demand.emergency_spawn_p", d.emergency_spawn_p)?;
        probability("demand.mean_update_factor", d.mean_update_factor)?;

        for (field, seed) in [
            ("seed.north_south", &self.seed.north_south),
            ("seed.east_west", &self.seed.east_west),
        ] {
            non_negative(field, seed.queue)?;
            positive(field, seed.arrival_rate)?;
            positive(field, seed.weight_index)?;
            finite(field, seed.mean_demand)?;
        }

        non_negative("run.time_scale", self.run.time_scale)?;
        Ok(())
    }
}

/// Signal timing and discharge configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalConfig {
    /// Green duration before any adaptive adjustment, in seconds.
    #[serde(default = "default_base_green_s")]
    pub base_green_s: f64,

    /// Yellow clearance interval, in seconds.
    #[serde(default = "default_yellow_s")]
    pub yellow_s: f64,

    /// Shortest green an approach can get without an emergency.
    #[serde(default = "default_min_green_base_s")]
    pub min_green_base_s: f64,

    /// Shortest green an approach can get while an emergency is active.
    #[serde(default = "default_min_green_emergency_s")]
    pub min_green_emergency_s: f64,

    /// Seconds between vehicles crossing the stop line at saturation flow.
    #[serde(default = "default_headway_s")]
    pub headway_s: f64,

    /// Green time lost to the first vehicle starting up.
    #[serde(default = "default_startup_lost_s")]
    pub startup_lost_s: f64,

    /// Lanes discharging in parallel per approach.
    #[serde(default = "default_lanes_per_approach")]
    pub lanes_per_approach: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            base_green_s: default_base_green_s(),
            yellow_s: default_yellow_s(),
            min_green_base_s: default_min_green_base_s(),
            min_green_emergency_s: default_min_green_emergency_s(),
            headway_s: default_headway_s(),
            startup_lost_s: default_startup_lost_s(),
            lanes_per_approach: default_lanes_per_approach(),
        }
    }
}

/// Coefficients of the adaptive green-time adjustment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdaptiveConfig {
    /// Bound on the magnitude of a single adjustment, in seconds.
    #[serde(default = "default_max_adjust_s")]
    pub max_adjust_s: f64,

    /// Extra seconds granted to an approach with an active emergency.
    #[serde(default = "default_emergency_bonus_s")]
    pub emergency_bonus_s: f64,

    /// Seconds per unit of mean-demand asymmetry.
    #[serde(default = "default_alpha_per_mean")]
    pub alpha_per_mean: f64,

    /// Seconds per unit of weight-index asymmetry.
    #[serde(default = "default_beta_per_weight")]
    pub beta_per_weight: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            max_adjust_s: default_max_adjust_s(),
            emergency_bonus_s: default_emergency_bonus_s(),
            alpha_per_mean: default_alpha_per_mean(),
            beta_per_weight: default_beta_per_weight(),
        }
    }
}

/// Random-walk configuration for the synthetic sensors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemandConfig {
    /// Relative jitter applied to arrival rates (0.15 = +/-15%).
    #[serde(default = "default_arrival_jitter")]
    pub arrival_jitter: f64,

    /// Relative jitter applied to weight indexes.
    #[serde(default = "default_weight_jitter")]
    pub weight_jitter: f64,

    /// Chance that an active emergency clears at a phase boundary.
    #[serde(default = "default_emergency_decay_p")]
    pub emergency_decay_p: f64,

    /// Chance that a new emergency appears at a phase boundary.
    #[serde(default = "default_emergency_spawn_p")]
    pub emergency_spawn_p: f64,

    /// Weight of the current queue in the mean-demand moving average.
    #[serde(default = "default_mean_update_factor")]
    pub mean_update_factor: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            arrival_jitter: default_arrival_jitter(),
            weight_jitter: default_weight_jitter(),
            emergency_decay_p: default_emergency_decay_p(),
            emergency_spawn_p: default_emergency_spawn_p(),
            mean_update_factor: default_mean_update_factor(),
        }
    }
}

/// Initial values for a fresh run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedConfig {
    /// Seed for each instance's random source.
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,

    /// Initial North-South sensor state.
    #[serde(default = "default_north_south_seed")]
    pub north_south: ApproachState,

    /// Initial East-West sensor state.
    #[serde(default = "default_east_west_seed")]
    pub east_west: ApproachState,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            rng_seed: default_rng_seed(),
            north_south: default_north_south_seed(),
            east_west: default_east_west_seed(),
        }
    }
}

/// Driver loop configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    /// Stop after this many phase transitions (0 = unlimited).
    #[serde(default)]
    pub max_transitions: u64,

    /// Stop after this many wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Simulated seconds per wall-clock second. 0 runs without sleeping.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Start in fast-forward: no sleeping and no explanation requests.
    #[serde(default)]
    pub fast_forward: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_transitions: 0,
            max_real_time_seconds: 0,
            time_scale: default_time_scale(),
            fast_forward: false,
        }
    }
}

/// Explanation generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExplanationConfig {
    /// Whether adaptive runs request an explanation at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on a single explanation request, in milliseconds.
    #[serde(default = "default_explanation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_explanation_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a finite number"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be greater than zero"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must not be negative"),
        })
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must lie in [0, 1]"),
        })
    }
}

fn jitter(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must lie in [0, 1)"),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_base_green_s() -> f64 {
    30.0
}

const fn default_yellow_s() -> f64 {
    3.0
}

const fn default_min_green_base_s() -> f64 {
    10.0
}

const fn default_min_green_emergency_s() -> f64 {
    7.0
}

const fn default_headway_s() -> f64 {
    1.9
}

const fn default_startup_lost_s() -> f64 {
    2.0
}

const fn default_lanes_per_approach() -> u32 {
    2
}

const fn default_max_adjust_s() -> f64 {
    20.0
}

const fn default_emergency_bonus_s() -> f64 {
    15.0
}

const fn default_alpha_per_mean() -> f64 {
    1.0
}

const fn default_beta_per_weight() -> f64 {
    0.6
}

const fn default_arrival_jitter() -> f64 {
    0.15
}

const fn default_weight_jitter() -> f64 {
    0.1
}

const fn default_emergency_decay_p() -> f64 {
    0.6
}

const fn default_emergency_spawn_p() -> f64 {
    0.05
}

const fn default_mean_update_factor() -> f64 {
    0.1
}

const fn default_rng_seed() -> u64 {
    42
}

const fn default_north_south_seed() -> ApproachState {
    ApproachState {
        queue: 22.0,
        arrival_rate: 35.0,
        mean_demand: 18.5,
        weight_index: 4.2,
        emergency_active: false,
    }
}

const fn default_east_west_seed() -> ApproachState {
    ApproachState {
        queue: 15.0,
        arrival_rate: 45.0,
        mean_demand: 12.0,
        weight_index: 2.9,
        emergency_active: false,
    }
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_explanation_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
