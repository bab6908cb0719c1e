//! Adaptive green-time adjustment.
//!
//! ```text
//! delta = clamp(bonus + alpha * (mean - avg_mean) + beta * (weight - avg_weight),
//!               -max_adjust, +max_adjust)
//! ```
//!
//! `mean` and `weight` belong to the approach about to receive green; the
//! averages are the unweighted mean over both approaches. The calculation
//! is closed-form and has no hidden state.

use crossroads_types::{Approach, ApproachState, PerApproach};

use crate::config::AdaptiveConfig;

/// Inputs to the adjustment formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaInputs {
    /// Seconds added when the favored approach has an active emergency.
    pub emergency_bonus: f64,
    /// Mean demand of the favored approach.
    pub mean_demand: f64,
    /// Average mean demand of both approaches.
    pub avg_mean: f64,
    /// Weight index of the favored approach.
    pub weight_index: f64,
    /// Average weight index of both approaches.
    pub avg_weight: f64,
    /// Seconds per unit of mean-demand asymmetry.
    pub alpha: f64,
    /// Seconds per unit of weight asymmetry.
    pub beta: f64,
    /// Bound on the output magnitude.
    pub max_adjust: f64,
}

impl DeltaInputs {
    /// Gather the inputs for favoring `favored` given the current sensors.
    pub fn for_favored(
        favored: Approach,
        approaches: &PerApproach<ApproachState>,
        config: &AdaptiveConfig,
    ) -> Self {
        let this: &ApproachState = approaches.get(favored);
        let other: &ApproachState = approaches.get(favored.other());
        Self {
            emergency_bonus: if this.emergency_active {
                config.emergency_bonus_s
            } else {
                0.0
            },
            mean_demand: this.mean_demand,
            avg_mean: (this.mean_demand + other.mean_demand) / 2.0,
            weight_index: this.weight_index,
            avg_weight: (this.weight_index + other.weight_index) / 2.0,
            alpha: config.alpha_per_mean,
            beta: config.beta_per_weight,
            max_adjust: config.max_adjust_s,
        }
    }

    /// The adjustment before clamping.
    pub fn raw(&self) -> f64 {
        self.emergency_bonus
            + self.alpha * (self.mean_demand - self.avg_mean)
            + self.beta * (self.weight_index - self.avg_weight)
    }

    /// The clamped adjustment, in seconds.
    pub fn delta(&self) -> f64 {
        let bound = self.max_adjust.abs();
        self.raw().max(-bound).min(bound)
    }
}

/// Adjustment in seconds for the approach about to receive green.
pub fn compute_delta(
    favored: Approach,
    approaches: &PerApproach<ApproachState>,
    config: &AdaptiveConfig,
) -> f64 {
    DeltaInputs::for_favored(favored, approaches, config).delta()
}
