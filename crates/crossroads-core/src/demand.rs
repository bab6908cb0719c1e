//! Synthetic per-approach demand and its stochastic evolution.
//!
//! Sensors are random walks owned by the engine; there is no real sensor
//! I/O. Two rules live here:
//!
//! - [`accrue_arrivals`] grows a queue by the vehicles that arrived over an
//!   elapsed window.
//! - [`evolve`] jitters arrival rate and weight index, moves mean demand
//!   toward the current queue, and toggles emergencies. It runs for both
//!   approaches at every YELLOW to GREEN edge.

use crossroads_types::{Approach, ApproachState, PerApproach};

use crate::config::DemandConfig;
use crate::random::RandomSource;

/// Smallest value a jittered arrival rate or weight index may take.
///
/// Jitter is bounded below 100%, so this only matters for configurations
/// that push a value close to zero over many steps.
pub const POSITIVE_FLOOR: f64 = 1e-3;

/// Return `approach` with the vehicles that arrived over `elapsed_s`
/// seconds added to its queue.
pub fn accrue_arrivals(approach: &ApproachState, elapsed_s: f64) -> ApproachState {
    let arrivals = (approach.arrival_rate / 60.0) * elapsed_s.max(0.0);
    ApproachState {
        queue: (approach.queue + arrivals).max(0.0),
        ..*approach
    }
}

/// Advance one approach's sensors by a single random-walk step.
///
/// Draws, in order: arrival jitter, weight jitter, one emergency trial.
pub fn evolve_approach(
    approach: &ApproachState,
    config: &DemandConfig,
    rng: &mut impl RandomSource,
) -> ApproachState {
    let arrival_rate = jitter(approach.arrival_rate, config.arrival_jitter, rng.signed_unit());
    let weight_index = jitter(approach.weight_index, config.weight_jitter, rng.signed_unit());

    let factor = config.mean_update_factor;
    let mean_demand = approach.mean_demand * (1.0 - factor) + approach.queue * factor;

    let emergency_active = if approach.emergency_active {
        !rng.bernoulli(config.emergency_decay_p)
    } else {
        rng.bernoulli(config.emergency_spawn_p)
    };

    ApproachState {
        queue: approach.queue,
        arrival_rate,
        mean_demand,
        weight_index,
        emergency_active,
    }
}

/// Advance both approaches, North-South first.
pub fn evolve(
    approaches: &PerApproach<ApproachState>,
    config: &DemandConfig,
    rng: &mut impl RandomSource,
) -> PerApproach<ApproachState> {
    let mut next = *approaches;
    for approach in Approach::ALL {
        *next.get_mut(approach) = evolve_approach(approaches.get(approach), config, rng);
    }
    next
}

fn jitter(value: f64, amount: f64, draw: f64) -> f64 {
    (value * (1.0 + draw * amount)).max(POSITIVE_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ConstantRandom, SeededRandom};

    fn north_south() -> ApproachState {
        ApproachState {
            queue: 22.0,
            arrival_rate: 35.0,
            mean_demand: 18.5,
            weight_index: 4.2,
            emergency_active: false,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn arrivals_accrue_per_minute_rate() {
        // 35 veh/min over 33 s = 19.25 vehicles.
        let next = accrue_arrivals(&north_south(), 33.0);
        assert!(close(next.queue, 22.0 + 19.25));
        assert!(close(next.arrival_rate, 35.0));
    }

    #[test]
    fn negative_window_adds_nothing() {
        let next = accrue_arrivals(&north_south(), -5.0);
        assert!(close(next.queue, 22.0));
    }

    #[test]
    fn quiet_step_only_moves_mean() {
        let config = DemandConfig::default();
        let mut rng = ConstantRandom::quiet();
        let next = evolve_approach(&north_south(), &config, &mut rng);

        assert!(close(next.arrival_rate, 35.0));
        assert!(close(next.weight_index, 4.2));
        // 18.5 * 0.9 + 22 * 0.1
        assert!(close(next.mean_demand, 18.85));
        assert!(!next.emergency_active);
        assert!(close(next.queue, 22.0));
    }

    #[test]
    fn extreme_draws_scale_by_jitter() {
        let config = DemandConfig::default();
        let mut up = ConstantRandom::new(1.0, false);
        let next = evolve_approach(&north_south(), &config, &mut up);
        assert!(close(next.arrival_rate, 35.0 * 1.15));
        assert!(close(next.weight_index, 4.2 * 1.1));

        let mut down = ConstantRandom::new(-1.0, false);
        let next = evolve_approach(&north_south(), &config, &mut down);
        assert!(close(next.arrival_rate, 35.0 * 0.85));
        assert!(close(next.weight_index, 4.2 * 0.9));
    }

    #[test]
    fn emergencies_spawn_and_clear() {
        let config = DemandConfig::default();
        let mut always = ConstantRandom::new(0.0, true);

        let spawned = evolve_approach(&north_south(), &config, &mut always);
        assert!(spawned.emergency_active);

        // An active emergency clears when the decay trial fires.
        let cleared = evolve_approach(&spawned, &config, &mut always);
        assert!(!cleared.emergency_active);

        // And persists when no trial fires.
        let mut never = ConstantRandom::quiet();
        let kept = evolve_approach(&spawned, &config, &mut never);
        assert!(kept.emergency_active);
    }

    #[test]
    fn rates_never_go_non_positive() {
        let config = DemandConfig {
            arrival_jitter: 0.99,
            weight_jitter: 0.99,
            ..DemandConfig::default()
        };
        let mut rng = ConstantRandom::new(-1.0, false);
        let mut state = north_south();
        for _ in 0..1_000 {
            state = evolve_approach(&state, &config, &mut rng);
            assert!(state.arrival_rate > 0.0);
            assert!(state.weight_index > 0.0);
        }
        assert!(close(state.arrival_rate, POSITIVE_FLOOR));
    }

    #[test]
    fn evolve_is_reproducible_per_seed() {
        let config = DemandConfig::default();
        let both = PerApproach::new(north_south(), north_south());
        let a = evolve(&both, &config, &mut SeededRandom::new(5));
        let b = evolve(&both, &config, &mut SeededRandom::new(5));
        assert_eq!(a, b);
        // Each approach consumes its own draws.
        assert!(a.north_south.arrival_rate.to_bits() != a.east_west.arrival_rate.to_bits());
    }
}
