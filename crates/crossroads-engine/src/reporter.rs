//! Transition callback that reports progress through `tracing`.
//!
//! Every green activation is logged at `info` in real-time runs. In
//! fast-forward the runs advance thousands of phases per second, so only
//! every `batch`-th activation is logged.

use std::sync::Arc;

use crossroads_core::engine::{TransitionKind, TransitionSummary};
use crossroads_core::operator::OperatorState;
use crossroads_core::runner::TransitionCallback;
use crossroads_types::{ControlMode, SimulationState};
use tracing::{debug, info};

/// Logs activations of one run.
pub struct LogReporter {
    mode: ControlMode,
    operator: Arc<OperatorState>,
    batch: u64,
    skipped: u64,
    logged: u64,
}

impl LogReporter {
    /// Create a reporter for the run in `mode`. A `batch` of 0 is treated as 1.
    pub fn new(mode: ControlMode, operator: Arc<OperatorState>, batch: u64) -> Self {
        Self {
            mode,
            operator,
            batch: batch.max(1),
            skipped: 0,
            logged: 0,
        }
    }

    /// Activations logged so far.
    pub const fn logged(&self) -> u64 {
        self.logged
    }

    fn should_log(&mut self) -> bool {
        if !self.operator.is_fast_forward() {
            self.skipped = 0;
            return true;
        }
        self.skipped = self.skipped.saturating_add(1);
        if self.skipped >= self.batch {
            self.skipped = 0;
            true
        } else {
            false
        }
    }
}

impl TransitionCallback for LogReporter {
    fn on_transition(&mut self, summary: &TransitionSummary, state: &SimulationState) {
        match summary.kind {
            TransitionKind::Yellow { group, discharged } => {
                debug!(mode = %self.mode, %group, discharged, "Yellow");
            }
            TransitionKind::Green {
                group,
                green_s,
                delta,
            } => {
                if !self.should_log() {
                    return;
                }
                self.logged = self.logged.saturating_add(1);
                info!(
                    mode = %self.mode,
                    %group,
                    green_s,
                    delta,
                    ns_queue = state.approaches.north_south.queue,
                    ew_queue = state.approaches.east_west.queue,
                    ns_emergency = state.approaches.north_south.emergency_active,
                    ew_emergency = state.approaches.east_west.emergency_active,
                    total_vehicles = summary.metrics.total_vehicles,
                    cycle = summary.metrics.cycle_count,
                    "Green"
                );
            }
        }
    }

    fn on_explanation(&mut self, state: &SimulationState) {
        info!(
            mode = %self.mode,
            group = %state.active_group,
            explanation = %state.explanation,
            "Decision explained"
        );
    }
}
