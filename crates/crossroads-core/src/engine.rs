//! The simulation engine: one pure transition per phase expiry.
//!
//! [`advance`] is the whole core. Given a state, the run configuration and a
//! random source it returns the next state; the phase decides which
//! transition fires. It performs no I/O and never suspends, so a driver can
//! call it back-to-back (fast-forward) or from a timer, and two instances
//! can advance in parallel without sharing anything.
//!
//! [`SimulationEngine`] bundles one instance's state, configuration and
//! random source for drivers that want an owned handle.

use crossroads_types::{
    Approach, ControlMode, MetricsSnapshot, PerApproach, RunId, SignalPhase, SimulationState,
};
use tracing::debug;

use crate::config::SimulationConfig;
use crate::explanation::{ExplanationRequest, NOT_STARTED_EXPLANATION};
use crate::phase::{self, TransitionError};
use crate::random::RandomSource;

/// Which transition fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionKind {
    /// GREEN -> YELLOW on `group`.
    Yellow {
        /// The approach whose green ended.
        group: Approach,
        /// Vehicles discharged during that green.
        discharged: f64,
    },
    /// YELLOW -> GREEN handing green to `group`.
    Green {
        /// The approach that received green.
        group: Approach,
        /// Its green duration, seconds.
        green_s: f64,
        /// Adjustment applied, seconds.
        delta: f64,
    },
}

/// Summary of a single transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionSummary {
    /// What happened.
    pub kind: TransitionKind,
    /// Phase after the transition.
    pub phase: SignalPhase,
    /// Seconds until the next transition.
    pub timer: f64,
    /// Metrics after the transition.
    pub metrics: MetricsSnapshot,
}

/// Result of [`advance`].
#[derive(Debug, Clone)]
pub struct Transition {
    /// The next state.
    pub state: SimulationState,
    /// What happened.
    pub summary: TransitionSummary,
    /// Set on adaptive green activations: the decision an explanation
    /// generator may be asked to justify.
    pub explanation_request: Option<ExplanationRequest>,
}

/// Build a fresh state from the configured seed.
///
/// Starts in GREEN with East-West active and both greens at the base
/// duration. There is no prior discharge to account for.
pub fn initial_state(mode: ControlMode, config: &SimulationConfig) -> SimulationState {
    let base = config.signal.base_green_s;
    SimulationState {
        mode,
        phase: SignalPhase::Green,
        active_group: Approach::EastWest,
        lights: phase::lights_for(Approach::EastWest, SignalPhase::Green),
        green_duration: PerApproach::new(base, base),
        timer: base,
        delta_used: 0.0,
        approaches: PerApproach::new(config.seed.north_south, config.seed.east_west),
        throughput: PerApproach::new(0.0, 0.0),
        emergency_throughput: PerApproach::new(0, 0),
        transition_count: 0,
        metrics: MetricsSnapshot::default(),
        explanation: NOT_STARTED_EXPLANATION.to_owned(),
    }
}

/// Fire the transition due when `state`'s phase timer expires.
///
/// Deterministic given the draw sequence of `rng`. Draws are only made on
/// YELLOW -> GREEN.
///
/// # Errors
///
/// Returns [`TransitionError`] if `state` is corrupt. The caller's state is
/// never modified.
pub fn advance(
    state: &SimulationState,
    config: &SimulationConfig,
    rng: &mut impl RandomSource,
) -> Result<Transition, TransitionError> {
    phase::check_state(state)?;

    let (next, kind) = match state.phase {
        SignalPhase::Green => {
            let (next, discharged) = phase::begin_yellow(state, config);
            debug!(
                group = %state.active_group,
                discharged,
                ns_queue = next.approaches.north_south.queue,
                ew_queue = next.approaches.east_west.queue,
                "green ended"
            );
            (
                next,
                TransitionKind::Yellow {
                    group: state.active_group,
                    discharged,
                },
            )
        }
        SignalPhase::Yellow => {
            let next = phase::begin_green(state, config, rng);
            debug!(
                group = %next.active_group,
                green_s = next.active_green(),
                delta = next.delta_used,
                ns_emergency = next.approaches.north_south.emergency_active,
                ew_emergency = next.approaches.east_west.emergency_active,
                total_vehicles = next.metrics.total_vehicles,
                "green started"
            );
            let kind = TransitionKind::Green {
                group: next.active_group,
                green_s: next.active_green(),
                delta: next.delta_used,
            };
            (next, kind)
        }
    };

    let explanation_request = match (kind, next.mode) {
        (TransitionKind::Green { .. }, ControlMode::Adaptive) => {
            Some(ExplanationRequest::from_state(&next))
        }
        _ => None,
    };

    Ok(Transition {
        summary: TransitionSummary {
            kind,
            phase: next.phase,
            timer: next.timer,
            metrics: next.metrics,
        },
        state: next,
        explanation_request,
    })
}

/// One simulation instance: its state, configuration and random source.
#[derive(Debug)]
pub struct SimulationEngine<R> {
    run_id: RunId,
    config: SimulationConfig,
    rng: R,
    state: SimulationState,
    steps: u64,
}

impl<R: RandomSource> SimulationEngine<R> {
    /// Create an instance seeded from `config`.
    pub fn new(mode: ControlMode, config: SimulationConfig, rng: R) -> Self {
        let state = initial_state(mode, &config);
        Self {
            run_id: RunId::new(),
            config,
            rng,
            state,
            steps: 0,
        }
    }

    /// Identifier of this instance.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Controller strategy of this instance.
    pub const fn mode(&self) -> ControlMode {
        self.state.mode
    }

    /// The run configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The current state.
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Transitions fired since creation or the last reset.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Fire the next transition and keep the resulting state.
    ///
    /// Returns the summary and, on adaptive green activations, the
    /// explanation request.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the held state is corrupt; the state
    /// is kept as it was.
    pub fn advance(
        &mut self,
    ) -> Result<(TransitionSummary, Option<ExplanationRequest>), TransitionError> {
        let transition = advance(&self.state, &self.config, &mut self.rng)?;
        self.state = transition.state;
        self.steps = self.steps.saturating_add(1);
        Ok((transition.summary, transition.explanation_request))
    }

    /// Replace the explanation text shown for the current decision.
    pub fn set_explanation(&mut self, text: String) {
        self.state.explanation = text;
    }

    /// Discard all progress and start again from the seed.
    ///
    /// The random source carries on from where it was; pass a fresh one to
    /// [`SimulationEngine::reset_with`] to replay the same run.
    pub fn reset(&mut self) {
        self.state = initial_state(self.state.mode, &self.config);
        self.steps = 0;
    }

    /// Reset and swap in a new random source.
    pub fn reset_with(&mut self, rng: R) {
        self.rng = rng;
        self.reset();
    }
}
