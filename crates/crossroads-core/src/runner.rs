//! Driver loop with operator controls.
//!
//! [`run_simulation`] is the external timer around the pure
//! [`advance`](crate::engine::advance). Each iteration fires one transition,
//! then waits out the new phase in wall-clock time:
//!
//! - **Bounded runs**: stop after `max_transitions` or `max_real_time_seconds`
//! - **Pause/resume**: the phase countdown freezes while paused
//! - **Time scale**: simulated seconds per wall second, adjustable at runtime
//! - **Fast-forward**: no sleeping and no explanation requests
//! - **Operator stop**: checked between transitions and during pacing
//!
//! Explanations for adaptive green activations are resolved while the green
//! phase is being paced, so a slow generator costs no simulated time.

use std::sync::Arc;
use std::time::Duration;

use crossroads_types::{MetricsSnapshot, RunId, SimulationState};
use tracing::{debug, info, warn};

use crate::config::ExplanationConfig;
use crate::engine::{SimulationEngine, TransitionKind, TransitionSummary};
use crate::explanation::{ExplanationSource, resolve_explanation};
use crate::operator::{OperatorState, RunEndReason};
use crate::phase::TransitionError;
use crate::random::RandomSource;

/// Longest single sleep while pacing a phase.
pub const PACING_SLICE: Duration = Duration::from_millis(100);

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A transition failed.
    #[error("transition error: {source}")]
    Transition {
        /// The underlying transition error.
        #[from]
        source: TransitionError,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// The instance that ran.
    pub run_id: RunId,
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last transition summary, if any transition fired.
    pub final_summary: Option<TransitionSummary>,
    /// Transitions fired by this driver.
    pub total_transitions: u64,
    /// Metrics at the end of the run.
    pub final_metrics: MetricsSnapshot,
}

/// Callback invoked as the run progresses.
///
/// Implementations render or log the state. The driver never waits on
/// them beyond the call itself.
pub trait TransitionCallback: Send {
    /// Called after every transition.
    fn on_transition(&mut self, summary: &TransitionSummary, state: &SimulationState);

    /// Called when an explanation has been attached to the current state.
    fn on_explanation(&mut self, _state: &SimulationState) {}
}

/// A callback that ignores everything.
pub struct NoOpCallback;

impl TransitionCallback for NoOpCallback {
    fn on_transition(&mut self, _summary: &TransitionSummary, _state: &SimulationState) {}
}

/// Drive `engine` until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a transition fails. The engine keeps the
/// last good state.
pub async fn run_simulation<R, E>(
    engine: &mut SimulationEngine<R>,
    explainer: &E,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TransitionCallback,
    explanation: &ExplanationConfig,
) -> Result<RunResult, RunnerError>
where
    R: RandomSource,
    E: ExplanationSource,
{
    let mut last_summary: Option<TransitionSummary> = None;
    let mut total_transitions: u64 = 0;
    let deadline = Duration::from_millis(explanation.timeout_ms);

    info!(
        run_id = %engine.run_id(),
        mode = %engine.mode(),
        max_transitions = operator.max_transitions(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        time_scale = operator.time_scale(),
        fast_forward = operator.is_fast_forward(),
        "Run starting"
    );

    let end_reason = loop {
        if operator.is_paused() {
            info!(mode = %engine.mode(), "Run paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!(mode = %engine.mode(), "Run resumed");
        }

        if operator.is_stop_requested() {
            info!(mode = %engine.mode(), "Operator stop requested");
            break RunEndReason::OperatorStop;
        }

        if operator.time_limit_reached() {
            info!(
                mode = %engine.mode(),
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            break RunEndReason::MaxRealTimeReached;
        }

        let (summary, request) = engine.advance()?;
        total_transitions = total_transitions.saturating_add(1);
        callback.on_transition(&summary, engine.state());
        last_summary = Some(summary);

        if operator.transition_limit_reached(total_transitions) {
            info!(
                mode = %engine.mode(),
                transitions = total_transitions,
                max_transitions = operator.max_transitions(),
                "Transition limit reached"
            );
            break RunEndReason::MaxTransitionsReached;
        }

        let pacing = pace_phase(operator, summary.timer);
        match request {
            Some(request) if explanation.enabled && !operator.is_fast_forward() => {
                tokio::pin!(pacing);
                tokio::select! {
                    biased;
                    text = resolve_explanation(explainer, &request, deadline) => {
                        engine.set_explanation(text);
                        callback.on_explanation(engine.state());
                        pacing.await;
                    }
                    () = &mut pacing => {
                        debug!(
                            group = %request.group,
                            "phase ended before its explanation arrived"
                        );
                    }
                }
            }
            _ => pacing.await,
        }
    };

    operator.set_end_reason(end_reason).await;
    Ok(RunResult {
        run_id: engine.run_id(),
        end_reason,
        final_summary: last_summary,
        total_transitions,
        final_metrics: engine.state().metrics,
    })
}

/// Wait out `phase_seconds` of simulated time.
///
/// Sleeps in [`PACING_SLICE`] steps so that a stop, a pause, a reached
/// wall-clock limit, or a time-scale change takes effect mid-phase.
/// Returns at once in fast-forward or when the time scale is 0.
async fn pace_phase(operator: &OperatorState, phase_seconds: f64) {
    let mut remaining = phase_seconds;
    while remaining > 0.0 {
        if operator.is_stop_requested()
            || operator.is_fast_forward()
            || operator.time_limit_reached()
        {
            return;
        }
        if operator.is_paused() {
            operator.wait_if_paused().await;
            continue;
        }
        let scale = operator.time_scale();
        if scale <= 0.0 {
            return;
        }
        let wall = Duration::try_from_secs_f64(remaining / scale)
            .unwrap_or(PACING_SLICE)
            .min(PACING_SLICE);
        if wall.is_zero() {
            return;
        }
        tokio::time::sleep(wall).await;
        remaining -= wall.as_secs_f64() * scale;
    }
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        run_id = %result.run_id,
        reason = ?result.end_reason,
        total_transitions = result.total_transitions,
        total_vehicles = result.final_metrics.total_vehicles,
        cycle_count = result.final_metrics.cycle_count,
        emergency_vehicles = result.final_metrics.emergency_vehicles,
        "Run ended"
    );

    match result.final_summary.as_ref().map(|s| s.kind) {
        Some(TransitionKind::Green { group, green_s, delta }) => {
            info!(%group, green_s, delta, "Final phase: green");
        }
        Some(TransitionKind::Yellow { group, discharged }) => {
            info!(%group, discharged, "Final phase: yellow");
        }
        None => warn!("Run ended with no transitions fired"),
    }
}
