//! Engine binary for the Crossroads simulation.
//!
//! Runs an adaptive and a fixed-time controller side by side from the same
//! seed and reports how much more traffic the adaptive one moved.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `CROSSROADS_CONFIG` or `crossroads-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Validate configuration
//! 4. Select the explanation source (LLM or disabled)
//! 5. Create operator state; wire Ctrl-C and the stdin console to it
//! 6. Create the adaptive and fixed engines, each with its own generator
//! 7. Drive both concurrently until a termination condition is met
//! 8. Log the comparison report

mod console;
mod error;
mod explainer;
mod reporter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossroads_core::config::{ExplanationConfig, SimulationConfig};
use crossroads_core::engine::SimulationEngine;
use crossroads_core::explanation::ExplanationSource;
use crossroads_core::metrics::ComparisonReport;
use crossroads_core::operator::OperatorState;
use crossroads_core::random::SeededRandom;
use crossroads_core::runner::{self, RunResult, RunnerError};
use crossroads_explainer::config::ExplainerConfig;
use crossroads_types::ControlMode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::explainer::Explainer;
use crate::reporter::LogReporter;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "CROSSROADS_CONFIG";

/// Configuration file looked up in the working directory.
const DEFAULT_CONFIG_PATH: &str = "crossroads-config.yaml";

/// In fast-forward, log one green activation in this many.
const FAST_FORWARD_LOG_BATCH: u64 = 50;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, explainer setup, or a run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging needs its level, so errors surface after.
    let loaded = load_config();

    // 2. Initialize structured logging.
    let level = loaded
        .as_ref()
        .map_or("info", |(config, _)| config.logging.level.as_str())
        .to_owned();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(true)
        .init();

    info!("crossroads-engine starting");

    let (config, source) = loaded?;
    match source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    run(config).await?;

    info!("crossroads-engine shutdown complete");
    Ok(())
}

async fn run(config: SimulationConfig) -> Result<(), EngineError> {
    // 3. Validate.
    config.validate()?;
    info!(
        seed = config.seed.rng_seed,
        base_green_s = config.signal.base_green_s,
        yellow_s = config.signal.yellow_s,
        max_adjust_s = config.adaptive.max_adjust_s,
        "Configuration validated"
    );

    // 4. Explanation source.
    let llm = ExplainerConfig::from_env()?;
    let explainer = Explainer::select(&config.explanation, llm.as_ref())?;

    // 5. Operator controls.
    let operator = Arc::new(OperatorState::new(&config.run));
    info!(
        max_transitions = operator.max_transitions(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        time_scale = operator.time_scale(),
        fast_forward = operator.is_fast_forward(),
        explainer = explainer.name(),
        "Operator state initialized"
    );

    let ctrl_c_operator = Arc::clone(&operator);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                ctrl_c_operator.request_stop();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });
    let _console = console::spawn_console(Arc::clone(&operator));

    // 6. Engines.
    let seed = config.seed.rng_seed;
    let mut adaptive = SimulationEngine::new(
        ControlMode::Adaptive,
        config.clone(),
        SeededRandom::new(seed),
    );
    let mut fixed = SimulationEngine::new(ControlMode::Fixed, config.clone(), SeededRandom::new(seed));
    let mut adaptive_reporter = LogReporter::new(
        ControlMode::Adaptive,
        Arc::clone(&operator),
        FAST_FORWARD_LOG_BATCH,
    );
    let mut fixed_reporter =
        LogReporter::new(ControlMode::Fixed, Arc::clone(&operator), FAST_FORWARD_LOG_BATCH);

    info!(
        adaptive_run = %adaptive.run_id(),
        fixed_run = %fixed.run_id(),
        "Engines created, entering driver loops"
    );

    // 7. Drive both.
    let (adaptive_result, fixed_result) = tokio::join!(
        drive(
            &mut adaptive,
            &explainer,
            &operator,
            &mut adaptive_reporter,
            &config.explanation,
        ),
        drive(
            &mut fixed,
            &explainer,
            &operator,
            &mut fixed_reporter,
            &config.explanation,
        ),
    );
    let adaptive_result = adaptive_result?;
    let fixed_result = fixed_result?;
    runner::log_run_end(&adaptive_result);
    runner::log_run_end(&fixed_result);

    // 8. Compare.
    let report = ComparisonReport::new(adaptive_result.final_metrics, fixed_result.final_metrics);
    match serde_json::to_string(&report) {
        Ok(json) => info!(report = %json, "Comparison report"),
        Err(e) => warn!(error = %e, "failed to serialize comparison report"),
    }
    info!(
        efficiency_gain_pct = report.efficiency_gain_pct,
        cycle_count = report.cycle_count,
        "{}",
        report.summary()
    );

    Ok(())
}

/// Run one engine; if it fails, stop the other run too.
async fn drive<E: ExplanationSource>(
    engine: &mut SimulationEngine<SeededRandom>,
    explainer: &E,
    operator: &Arc<OperatorState>,
    reporter: &mut LogReporter,
    explanation: &ExplanationConfig,
) -> Result<RunResult, RunnerError> {
    let mode = engine.mode();
    let result = runner::run_simulation(engine, explainer, operator, reporter, explanation).await;
    if let Err(ref e) = result {
        error!(%mode, error = %e, "Run failed, stopping the other run");
        operator.request_stop();
    }
    result
}

/// Load the simulation configuration.
///
/// Uses the file named by `CROSSROADS_CONFIG` if set, which must exist.
/// Otherwise reads `crossroads-config.yaml` from the working directory,
/// falling back to defaults when it is absent. Returns the path read.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(explicit);
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = SimulationConfig::from_file(path)?;
        Ok((config, Some(path.to_path_buf())))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, None))
    }
}
