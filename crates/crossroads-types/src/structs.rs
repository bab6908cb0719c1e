//! Core state records for the Crossroads signal simulation.
//!
//! [`SimulationState`] is a plain value: the engine never mutates one in
//! place, it returns the next state from the previous one.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Approach, ControlMode, LightColor, SignalPhase};

// ---------------------------------------------------------------------------
// Per-approach container
// ---------------------------------------------------------------------------

/// One value for each approach.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PerApproach<T> {
    /// Value for the North-South approach.
    pub north_south: T,
    /// Value for the East-West approach.
    pub east_west: T,
}

impl<T> PerApproach<T> {
    /// Build from the two values.
    pub const fn new(north_south: T, east_west: T) -> Self {
        Self {
            north_south,
            east_west,
        }
    }

    /// Borrow the value for `approach`.
    pub const fn get(&self, approach: Approach) -> &T {
        match approach {
            Approach::NorthSouth => &self.north_south,
            Approach::EastWest => &self.east_west,
        }
    }

    /// Mutably borrow the value for `approach`.
    pub const fn get_mut(&mut self, approach: Approach) -> &mut T {
        match approach {
            Approach::NorthSouth => &mut self.north_south,
            Approach::EastWest => &mut self.east_west,
        }
    }

    /// Apply `f` to each value, passing the approach it belongs to.
    pub fn map<U>(self, mut f: impl FnMut(Approach, T) -> U) -> PerApproach<U> {
        PerApproach {
            north_south: f(Approach::NorthSouth, self.north_south),
            east_west: f(Approach::EastWest, self.east_west),
        }
    }
}

impl PerApproach<f64> {
    /// Sum of both values.
    pub fn total(&self) -> f64 {
        self.north_south + self.east_west
    }
}

impl PerApproach<u64> {
    /// Sum of both values, saturating at `u64::MAX`.
    pub const fn total(&self) -> u64 {
        self.north_south.saturating_add(self.east_west)
    }
}

// ---------------------------------------------------------------------------
// Sensor state
// ---------------------------------------------------------------------------

/// Synthetic sensor readings for one approach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ApproachState {
    /// Vehicles waiting at the stop line. Never negative.
    pub queue: f64,
    /// Arrivals in vehicles per minute. Always positive.
    pub arrival_rate: f64,
    /// Exponentially smoothed queue pressure.
    pub mean_demand: f64,
    /// Vehicle-mix severity score (heavier vehicles raise it). Always positive.
    pub weight_index: f64,
    /// Whether an emergency vehicle is currently detected.
    pub emergency_active: bool,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Throughput summary republished on every green activation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricsSnapshot {
    /// Vehicles discharged across both approaches.
    pub total_vehicles: f64,
    /// Completed NS+EW rounds, `ceil(transition_count / 2)`.
    pub cycle_count: u64,
    /// Discharge events that happened while an emergency was active.
    pub emergency_vehicles: u64,
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Complete state of one simulated intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationState {
    /// Controller strategy for the whole run.
    pub mode: ControlMode,
    /// Phase of the active approach.
    pub phase: SignalPhase,
    /// The approach that is currently not red.
    pub active_group: Approach,
    /// Light shown by each approach.
    pub lights: PerApproach<LightColor>,
    /// Green duration (seconds) chosen for each approach this round.
    pub green_duration: PerApproach<f64>,
    /// Seconds left in the current phase.
    pub timer: f64,
    /// Last adaptive adjustment applied, in seconds.
    pub delta_used: f64,
    /// Sensor state per approach.
    pub approaches: PerApproach<ApproachState>,
    /// Cumulative discharged vehicles per approach.
    pub throughput: PerApproach<f64>,
    /// Discharge events while an emergency was active, per approach.
    pub emergency_throughput: PerApproach<u64>,
    /// Incremented on every green activation (YELLOW -> GREEN).
    pub transition_count: u64,
    /// Derived metrics, recomputed on each green activation.
    pub metrics: MetricsSnapshot,
    /// Free-text justification of the latest decision, or fallback text.
    pub explanation: String,
}

impl SimulationState {
    /// Green duration of the active approach.
    pub const fn active_green(&self) -> f64 {
        *self.green_duration.get(self.active_group)
    }

    /// Sensor state of `approach`.
    pub const fn approach(&self, approach: Approach) -> &ApproachState {
        self.approaches.get(approach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_approach_get_and_map() {
        let mut values = PerApproach::new(1_u64, 2_u64);
        assert_eq!(*values.get(Approach::NorthSouth), 1);
        assert_eq!(*values.get(Approach::EastWest), 2);

        *values.get_mut(Approach::EastWest) = 5;
        assert_eq!(values.total(), 6);

        let labelled = values.map(|approach, v| format!("{approach}={v}"));
        assert_eq!(labelled.north_south, "NS=1");
        assert_eq!(labelled.east_west, "EW=5");
    }

    #[test]
    fn u64_total_saturates() {
        let values = PerApproach::new(u64::MAX, 1);
        assert_eq!(values.total(), u64::MAX);
    }

    #[test]
    fn f64_total_adds() {
        let values = PerApproach::new(29.5, 10.25);
        assert!((values.total() - 39.75).abs() < 1e-12);
    }

    #[test]
    fn state_uses_wire_names() {
        let approach = ApproachState {
            queue: 22.0,
            arrival_rate: 35.0,
            mean_demand: 18.5,
            weight_index: 4.2,
            emergency_active: false,
        };
        let state = SimulationState {
            mode: ControlMode::Fixed,
            phase: SignalPhase::Green,
            active_group: Approach::EastWest,
            lights: PerApproach::new(LightColor::Red, LightColor::Green),
            green_duration: PerApproach::new(30.0, 30.0),
            timer: 30.0,
            delta_used: 0.0,
            approaches: PerApproach::new(approach, approach),
            throughput: PerApproach::default(),
            emergency_throughput: PerApproach::default(),
            transition_count: 0,
            metrics: MetricsSnapshot::default(),
            explanation: String::new(),
        };
        let json = serde_json::to_value(&state).unwrap_or_default();
        assert_eq!(json["mode"], "fixed");
        assert_eq!(json["phase"], "GREEN");
        assert_eq!(json["active_group"], "EW");
        assert_eq!(json["lights"]["north_south"], "RED");

        let back: SimulationState = serde_json::from_value(json).unwrap_or_else(|_| state.clone());
        assert_eq!(back, state);
        assert!((back.active_green() - 30.0).abs() < 1e-12);
    }
}
