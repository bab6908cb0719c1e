//! The GREEN/YELLOW signal protocol.
//!
//! Exactly one approach is green or yellow at any time; the other is red.
//! There is no terminal state. Each expiry of the phase timer fires one of
//! two transitions:
//!
//! - **GREEN -> YELLOW** ([`begin_yellow`]): the active approach discharges
//!   vehicles for its elapsed green, arrivals accrue on both approaches,
//!   and the yellow clearance interval starts.
//! - **YELLOW -> GREEN** ([`begin_green`]): sensors evolve, the next green
//!   durations are chosen (base plus adaptive adjustment, floored at the
//!   minimum green), the other approach becomes active, and metrics are
//!   republished.
//!
//! Both functions take the previous state by reference and return the next
//! one; nothing is mutated in place.

use crossroads_types::{
    Approach, ControlMode, LightColor, PerApproach, SignalPhase, SimulationState,
};

use crate::config::{SignalConfig, SimulationConfig};
use crate::demand;
use crate::delta;
use crate::explanation::{FIXED_MODE_EXPLANATION, PENDING_EXPLANATION};
use crate::metrics;
use crate::random::RandomSource;

/// Floor applied to every phase length.
///
/// A degenerate duration is not an error: it is raised to this value so
/// the phase timer and any progress fraction stay well-defined.
pub const MIN_PHASE_SECONDS: f64 = 0.1;

/// Errors that abort a transition. The input state is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The light layout contradicts the recorded phase and active group.
    #[error("invalid phase: {reason}")]
    InvalidPhase {
        /// What is inconsistent.
        reason: String,
    },

    /// A numeric field holds NaN or an infinity.
    #[error("non-finite value in {field}")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Light layout for `active` showing the color of `phase`.
pub const fn lights_for(active: Approach, phase: SignalPhase) -> PerApproach<LightColor> {
    let shown = LightColor::for_phase(phase);
    match active {
        Approach::NorthSouth => PerApproach::new(shown, LightColor::Red),
        Approach::EastWest => PerApproach::new(LightColor::Red, shown),
    }
}

/// Shortest green an approach may receive.
pub const fn min_green(emergency_active: bool, config: &SignalConfig) -> f64 {
    if emergency_active {
        config.min_green_emergency_s
    } else {
        config.min_green_base_s
    }
}

/// Vehicles that clear the stop line during `green_s` seconds of green.
pub fn discharge_volume(green_s: f64, config: &SignalConfig) -> f64 {
    let saturation_flow = f64::from(config.lanes_per_approach) / config.headway_s;
    ((green_s - config.startup_lost_s) * saturation_flow).max(0.0)
}

/// Full length of the phase `state` is in, floored at [`MIN_PHASE_SECONDS`].
pub fn phase_duration(state: &SimulationState, config: &SignalConfig) -> f64 {
    let raw = match state.phase {
        SignalPhase::Green => state.active_green(),
        SignalPhase::Yellow => config.yellow_s,
    };
    floor_duration(raw)
}

/// Fraction of the current phase still remaining, in `[0, 1]`.
pub fn progress_fraction(state: &SimulationState, config: &SignalConfig) -> f64 {
    (state.timer / phase_duration(state, config)).clamp(0.0, 1.0)
}

/// Check that `state` is something the protocol could have produced.
///
/// # Errors
///
/// Returns [`TransitionError::InvalidPhase`] when the lights disagree with
/// the phase, or [`TransitionError::NonFinite`] for NaN/infinite numbers.
pub fn check_state(state: &SimulationState) -> Result<(), TransitionError> {
    let expected = lights_for(state.active_group, state.phase);
    if state.lights != expected {
        return Err(TransitionError::InvalidPhase {
            reason: format!(
                "phase {:?} with {} active expects NS={:?} EW={:?}, found NS={:?} EW={:?}",
                state.phase,
                state.active_group,
                expected.north_south,
                expected.east_west,
                state.lights.north_south,
                state.lights.east_west,
            ),
        });
    }

    finite("timer", state.timer)?;
    finite("delta_used", state.delta_used)?;
    finite("green_duration.north_south", state.green_duration.north_south)?;
    finite("green_duration.east_west", state.green_duration.east_west)?;
    finite("throughput.north_south", state.throughput.north_south)?;
    finite("throughput.east_west", state.throughput.east_west)?;
    for approach in Approach::ALL {
        let sensors = state.approach(approach);
        finite("queue", sensors.queue)?;
        finite("arrival_rate", sensors.arrival_rate)?;
        finite("mean_demand", sensors.mean_demand)?;
        finite("weight_index", sensors.weight_index)?;
    }
    Ok(())
}

/// GREEN -> YELLOW. Returns the next state and the vehicles discharged.
pub fn begin_yellow(state: &SimulationState, config: &SimulationConfig) -> (SimulationState, f64) {
    let signal = &config.signal;
    let active = state.active_group;
    let elapsed_green = state.active_green();

    let mut next = state.clone();

    let discharged = discharge_volume(elapsed_green, signal);
    *next.throughput.get_mut(active) += discharged;
    if state.approach(active).emergency_active {
        let count = next.emergency_throughput.get_mut(active);
        *count = count.saturating_add(1);
    }
    let served = next.approaches.get_mut(active);
    served.queue = (served.queue - discharged).max(0.0);

    // The waiting side has sat through this green and the yellow to come.
    for approach in Approach::ALL {
        let elapsed = if approach == active {
            elapsed_green
        } else {
            signal.yellow_s + elapsed_green
        };
        let sensors = next.approaches.get_mut(approach);
        *sensors = demand::accrue_arrivals(sensors, elapsed);
    }

    next.phase = SignalPhase::Yellow;
    next.timer = floor_duration(signal.yellow_s);
    next.lights = lights_for(active, SignalPhase::Yellow);

    (next, discharged)
}

/// YELLOW -> GREEN. Hands green to the other approach.
pub fn begin_green(
    state: &SimulationState,
    config: &SimulationConfig,
    rng: &mut impl RandomSource,
) -> SimulationState {
    let previous = state.active_group;
    let favored = previous.other();

    let approaches = demand::evolve(&state.approaches, &config.demand, rng);

    let delta = match state.mode {
        ControlMode::Adaptive => delta::compute_delta(favored, &approaches, &config.adaptive),
        ControlMode::Fixed => 0.0,
    };

    let base = config.signal.base_green_s;
    let mut green = PerApproach::new(base, base);
    *green.get_mut(favored) += delta;
    *green.get_mut(previous) -= delta;
    let green = green.map(|approach, seconds| {
        let floor = min_green(approaches.get(approach).emergency_active, &config.signal);
        seconds.max(floor)
    });

    let mut next = state.clone();
    next.approaches = approaches;
    next.green_duration = green;
    next.active_group = favored;
    next.phase = SignalPhase::Green;
    next.lights = lights_for(favored, SignalPhase::Green);
    next.timer = floor_duration(*green.get(favored));
    next.delta_used = delta;
    next.transition_count = state.transition_count.saturating_add(1);
    next.metrics = metrics::snapshot(&next);
    next.explanation = match state.mode {
        ControlMode::Adaptive => PENDING_EXPLANATION.to_owned(),
        ControlMode::Fixed => FIXED_MODE_EXPLANATION.to_owned(),
    };
    next
}

fn floor_duration(seconds: f64) -> f64 {
    if seconds.is_nan() {
        MIN_PHASE_SECONDS
    } else {
        seconds.max(MIN_PHASE_SECONDS)
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), TransitionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TransitionError::NonFinite { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::initial_state;
    use crate::random::ConstantRandom;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn discharge_matches_saturation_flow() {
        let signal = SignalConfig::default();
        // (30 - 2) * (2 / 1.9)
        let discharged = discharge_volume(30.0, &signal);
        assert!(close(discharged, 28.0 * 2.0 / 1.9));
        assert!((discharged - 29.47).abs() < 0.01);
    }

    #[test]
    fn discharge_never_negative() {
        let signal = SignalConfig::default();
        assert!(discharge_volume(1.0, &signal).abs() < f64::EPSILON);
        assert!(discharge_volume(0.0, &signal).abs() < f64::EPSILON);
    }

    #[test]
    fn min_green_depends_on_emergency() {
        let signal = SignalConfig::default();
        assert!(close(min_green(false, &signal), 10.0));
        assert!(close(min_green(true, &signal), 7.0));
    }

    #[test]
    fn yellow_discharges_active_and_accrues_both() {
        let config = SimulationConfig::default();
        let seed = initial_state(ControlMode::Fixed, &config);
        let (next, discharged) = begin_yellow(&seed, &config);

        assert_eq!(next.phase, SignalPhase::Yellow);
        assert_eq!(next.active_group, Approach::EastWest);
        assert_eq!(next.lights, PerApproach::new(LightColor::Red, LightColor::Yellow));
        assert!(close(next.timer, 3.0));

        // EW had green: 15 - 29.47 floors at 0, then 45/60 * 30 = 22.5 arrive.
        assert!(close(next.throughput.east_west, discharged));
        assert!(close(next.approaches.east_west.queue, 22.5));
        // NS waited 33 s: 22 + 35/60 * 33 = 41.25.
        assert!(close(next.approaches.north_south.queue, 41.25));
        assert!(next.throughput.north_south.abs() < f64::EPSILON);

        // Green activations are the only counted transitions.
        assert_eq!(next.transition_count, 0);
        // The input is untouched.
        assert_eq!(seed.phase, SignalPhase::Green);
    }

    #[test]
    fn yellow_counts_emergency_discharge() {
        let config = SimulationConfig::default();
        let mut seed = initial_state(ControlMode::Fixed, &config);
        seed.approaches.east_west.emergency_active = true;
        let (next, _) = begin_yellow(&seed, &config);
        assert_eq!(next.emergency_throughput.east_west, 1);
        assert_eq!(next.emergency_throughput.north_south, 0);
    }

    #[test]
    fn fixed_green_uses_base_durations() {
        let config = SimulationConfig::default();
        let seed = initial_state(ControlMode::Fixed, &config);
        let (yellow, _) = begin_yellow(&seed, &config);
        let green = begin_green(&yellow, &config, &mut ConstantRandom::quiet());

        assert_eq!(green.active_group, Approach::NorthSouth);
        assert_eq!(green.lights, PerApproach::new(LightColor::Green, LightColor::Red));
        assert!(close(green.green_duration.north_south, 30.0));
        assert!(close(green.green_duration.east_west, 30.0));
        assert!(close(green.timer, 30.0));
        assert!(green.delta_used.abs() < f64::EPSILON);
        assert_eq!(green.transition_count, 1);
        assert_eq!(green.metrics.cycle_count, 1);
        assert!(close(green.metrics.total_vehicles, yellow.throughput.total()));
        assert_eq!(green.explanation, FIXED_MODE_EXPLANATION);
    }

    #[test]
    fn adaptive_green_moves_durations_in_opposite_directions() {
        let config = SimulationConfig::default();
        let seed = initial_state(ControlMode::Adaptive, &config);
        let (yellow, _) = begin_yellow(&seed, &config);
        let green = begin_green(&yellow, &config, &mut ConstantRandom::quiet());

        let delta = green.delta_used;
        assert!(delta.abs() <= config.adaptive.max_adjust_s);
        assert!(close(green.green_duration.north_south, 30.0 + delta));
        assert!(close(green.green_duration.east_west, 30.0 - delta));
        assert_eq!(green.explanation, PENDING_EXPLANATION);
    }

    #[test]
    fn adaptive_green_respects_minimums() {
        let mut config = SimulationConfig::default();
        config.signal.base_green_s = 12.0;
        config.adaptive.max_adjust_s = 20.0;
        config.adaptive.alpha_per_mean = 10.0;
        let mut state = initial_state(ControlMode::Adaptive, &config);
        state.phase = SignalPhase::Yellow;
        state.lights = lights_for(Approach::EastWest, SignalPhase::Yellow);
        state.approaches.north_south.mean_demand = 100.0;

        let green = begin_green(&state, &config, &mut ConstantRandom::quiet());
        assert!(close(green.delta_used, 20.0));
        assert!(close(green.green_duration.north_south, 32.0));
        // 12 - 20 = -8, raised to the base minimum.
        assert!(close(green.green_duration.east_west, 10.0));
    }

    #[test]
    fn emergency_lowers_minimum() {
        let mut config = SimulationConfig::default();
        config.signal.base_green_s = 5.0;
        let mut state = initial_state(ControlMode::Fixed, &config);
        state.phase = SignalPhase::Yellow;
        state.lights = lights_for(Approach::EastWest, SignalPhase::Yellow);
        state.approaches.north_south.emergency_active = true;

        // Quiet source keeps the emergency active through the decay trial.
        let green = begin_green(&state, &config, &mut ConstantRandom::quiet());
        assert!(close(green.green_duration.north_south, 7.0));
        assert!(close(green.green_duration.east_west, 10.0));
    }

    #[test]
    fn check_state_rejects_contradictory_lights() {
        let config = SimulationConfig::default();
        let mut state = initial_state(ControlMode::Fixed, &config);
        state.lights = PerApproach::new(LightColor::Green, LightColor::Green);
        assert!(matches!(
            check_state(&state),
            Err(TransitionError::InvalidPhase { .. })
        ));

        let mut state = initial_state(ControlMode::Fixed, &config);
        state.phase = SignalPhase::Yellow;
        assert!(matches!(
            check_state(&state),
            Err(TransitionError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn check_state_rejects_nan() {
        let config = SimulationConfig::default();
        let mut state = initial_state(ControlMode::Fixed, &config);
        state.timer = f64::NAN;
        assert!(matches!(
            check_state(&state),
            Err(TransitionError::NonFinite { field: "timer" })
        ));
    }

    #[test]
    fn degenerate_durations_are_floored() {
        let config = SimulationConfig::default();
        let mut state = initial_state(ControlMode::Fixed, &config);
        state.green_duration.east_west = 0.0;
        state.timer = 0.0;
        assert!(close(phase_duration(&state, &config.signal), MIN_PHASE_SECONDS));
        assert!(progress_fraction(&state, &config.signal).abs() < f64::EPSILON);

        state.green_duration.east_west = 30.0;
        state.timer = 15.0;
        assert!(close(progress_fraction(&state, &config.signal), 0.5));
    }
}
