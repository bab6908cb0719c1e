//! Throughput metrics and the adaptive-versus-fixed comparison.
//!
//! [`MetricsSnapshot`] is a projection of the cumulative counters in
//! [`SimulationState`]. It is recomputed from those counters on every green
//! activation and never mutated on its own, so it cannot drift from them.

use crossroads_types::{MetricsSnapshot, PerApproach, SimulationState};
use serde::Serialize;

/// Derive the snapshot from the underlying counters.
pub fn derive(
    throughput: &PerApproach<f64>,
    emergency_throughput: &PerApproach<u64>,
    transition_count: u64,
) -> MetricsSnapshot {
    MetricsSnapshot {
        total_vehicles: throughput.north_south + throughput.east_west,
        cycle_count: transition_count.div_ceil(2),
        emergency_vehicles: emergency_throughput.total(),
    }
}

/// Derive the snapshot for `state`'s current counters.
pub fn snapshot(state: &SimulationState) -> MetricsSnapshot {
    derive(
        &state.throughput,
        &state.emergency_throughput,
        state.transition_count,
    )
}

/// Side-by-side result of an adaptive and a fixed run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Metrics of the adaptive run.
    pub adaptive: MetricsSnapshot,
    /// Metrics of the fixed-time run.
    pub fixed: MetricsSnapshot,
    /// Extra throughput of the adaptive run relative to the fixed run, in
    /// percent. Zero while the fixed run has discharged nothing.
    pub efficiency_gain_pct: f64,
    /// The larger of the two cycle counts.
    pub cycle_count: u64,
}

impl ComparisonReport {
    /// Compare two snapshots.
    pub fn new(adaptive: MetricsSnapshot, fixed: MetricsSnapshot) -> Self {
        let efficiency_gain_pct = if fixed.total_vehicles > 0.0 {
            (adaptive.total_vehicles - fixed.total_vehicles) / fixed.total_vehicles * 100.0
        } else {
            0.0
        };
        Self {
            adaptive,
            fixed,
            efficiency_gain_pct,
            cycle_count: adaptive.cycle_count.max(fixed.cycle_count),
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let direction = if self.efficiency_gain_pct < 0.0 {
            "less"
        } else {
            "more"
        };
        format!(
            "{:.1}% {direction} throughput: after {} cycles the adaptive controller processed {:.0} vehicles \
             ({} emergency) against {:.0} ({} emergency) for fixed time",
            self.efficiency_gain_pct.abs(),
            self.cycle_count,
            self.adaptive.total_vehicles,
            self.adaptive.emergency_vehicles,
            self.fixed.total_vehicles,
            self.fixed.emergency_vehicles,
        )
    }
}
