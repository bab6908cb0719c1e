//! Explanation source trait, fallback texts, and the bounded request helper.
//!
//! On every adaptive green activation the engine can ask an external
//! generator for a one-sentence justification of the decision. The
//! [`ExplanationSource`] trait abstracts that generator -- it could be an
//! LLM backend, a canned responder, or a test stub.
//!
//! Explanations are best-effort. [`resolve_explanation`] bounds each request
//! with a timeout and turns every failure into fallback text, so a slow or
//! broken generator never affects phase or timer progression.

use std::future::Future;
use std::time::Duration;

use crossroads_types::{Approach, SimulationState};
use serde::Serialize;
use tracing::{debug, warn};

/// Shown for every fixed-time green activation.
pub const FIXED_MODE_EXPLANATION: &str = "Fixed time cycle. No AI intervention.";

/// Shown while an adaptive explanation is pending or was skipped.
pub const PENDING_EXPLANATION: &str = "Calculating...";

/// Shown when the generator failed or timed out.
pub const FALLBACK_EXPLANATION: &str = "Waiting for phase...";

/// Shown on a freshly seeded state.
pub const NOT_STARTED_EXPLANATION: &str = "Simulation has not started.";

/// Errors an explanation source can report.
///
/// None of these ever propagate past the transition boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExplanationError {
    /// The generator is absent, unreachable, or returned nothing usable.
    #[error("explanation unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The generator did not answer within the deadline.
    #[error("explanation timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },
}

/// Sensor readings and timing behind one adaptive decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationRequest {
    /// The approach that just received green.
    pub group: Approach,
    /// Chosen North-South green duration, seconds.
    pub ns_green_s: f64,
    /// Chosen East-West green duration, seconds.
    pub ew_green_s: f64,
    /// Adjustment applied, seconds.
    pub delta_used_s: f64,
    /// North-South queue length.
    pub ns_queue: f64,
    /// East-West queue length.
    pub ew_queue: f64,
    /// North-South arrival rate, vehicles per minute.
    pub ns_count: f64,
    /// East-West arrival rate, vehicles per minute.
    pub ew_count: f64,
    /// North-South mean demand.
    pub ns_mean: f64,
    /// East-West mean demand.
    pub ew_mean: f64,
    /// North-South weight index.
    pub ns_weight: f64,
    /// East-West weight index.
    pub ew_weight: f64,
    /// Whether North-South has an active emergency.
    pub ns_emergency: bool,
    /// Whether East-West has an active emergency.
    pub ew_emergency: bool,
}

impl ExplanationRequest {
    /// Capture the decision that produced `state`.
    pub const fn from_state(state: &SimulationState) -> Self {
        let ns = &state.approaches.north_south;
        let ew = &state.approaches.east_west;
        Self {
            group: state.active_group,
            ns_green_s: state.green_duration.north_south,
            ew_green_s: state.green_duration.east_west,
            delta_used_s: state.delta_used,
            ns_queue: ns.queue,
            ew_queue: ew.queue,
            ns_count: ns.arrival_rate,
            ew_count: ew.arrival_rate,
            ns_mean: ns.mean_demand,
            ew_mean: ew.mean_demand,
            ns_weight: ns.weight_index,
            ew_weight: ew.weight_index,
            ns_emergency: ns.emergency_active,
            ew_emergency: ew.emergency_active,
        }
    }

    /// Green duration chosen for the favored approach.
    pub const fn group_green_s(&self) -> f64 {
        match self.group {
            Approach::NorthSouth => self.ns_green_s,
            Approach::EastWest => self.ew_green_s,
        }
    }
}

/// A generator of free-text decision explanations.
pub trait ExplanationSource {
    /// Produce a justification for the decision described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ExplanationError`] when no explanation can be produced.
    /// Callers substitute fallback text.
    fn explain(
        &self,
        request: &ExplanationRequest,
    ) -> impl Future<Output = Result<String, ExplanationError>> + Send;
}

/// A source that never produces an explanation.
///
/// Used when no generator is configured; every adaptive activation then
/// shows [`FALLBACK_EXPLANATION`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExplanationSource;

impl DisabledExplanationSource {
    /// Create a new disabled source.
    pub const fn new() -> Self {
        Self
    }
}

impl ExplanationSource for DisabledExplanationSource {
    async fn explain(&self, _request: &ExplanationRequest) -> Result<String, ExplanationError> {
        Err(ExplanationError::Unavailable {
            message: "no explanation generator configured".to_owned(),
        })
    }
}

/// Ask `source` for an explanation, giving up after `deadline`.
///
/// Returns the generated text, or [`FALLBACK_EXPLANATION`] if the source
/// failed, timed out, or answered with blank text. Failures are logged and
/// absorbed here.
pub async fn resolve_explanation<E: ExplanationSource>(
    source: &E,
    request: &ExplanationRequest,
    deadline: Duration,
) -> String {
    let outcome = match tokio::time::timeout(deadline, source.explain(request)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ExplanationError::Timeout {
            timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    match outcome {
        Ok(text) if !text.trim().is_empty() => {
            debug!(group = %request.group, "explanation generated");
            text.trim().to_owned()
        }
        Ok(_) => {
            warn!(group = %request.group, "explanation generator returned blank text");
            FALLBACK_EXPLANATION.to_owned()
        }
        Err(e) => {
            warn!(group = %request.group, error = %e, "explanation unavailable, using fallback");
            FALLBACK_EXPLANATION.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl ExplanationSource for Canned {
        async fn explain(&self, _request: &ExplanationRequest) -> Result<String, ExplanationError> {
            Ok(self.0.to_owned())
        }
    }

    struct Slow;

    impl ExplanationSource for Slow {
        async fn explain(&self, _request: &ExplanationRequest) -> Result<String, ExplanationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_owned())
        }
    }

    fn request() -> ExplanationRequest {
        ExplanationRequest {
            group: Approach::NorthSouth,
            ns_green_s: 33.64,
            ew_green_s: 26.36,
            delta_used_s: 3.64,
            ns_queue: 10.0,
            ew_queue: 20.0,
            ns_count: 35.0,
            ew_count: 45.0,
            ns_mean: 18.5,
            ew_mean: 12.0,
            ns_weight: 4.2,
            ew_weight: 2.9,
            ns_emergency: false,
            ew_emergency: false,
        }
    }

    #[tokio::test]
    async fn generated_text_is_trimmed() {
        let text = resolve_explanation(
            &Canned("  Longer queue on NS.\n"),
            &request(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(text, "Longer queue on NS.");
    }

    #[tokio::test]
    async fn blank_text_falls_back() {
        let text = resolve_explanation(&Canned("   "), &request(), Duration::from_secs(1)).await;
        assert_eq!(text, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn disabled_source_falls_back() {
        let text = resolve_explanation(
            &DisabledExplanationSource::new(),
            &request(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(text, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let started = std::time::Instant::now();
        let text = resolve_explanation(&Slow, &request(), Duration::from_millis(20)).await;
        assert_eq!(text, FALLBACK_EXPLANATION);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn group_green_follows_group() {
        let mut req = request();
        assert!((req.group_green_s() - 33.64).abs() < 1e-12);
        req.group = Approach::EastWest;
        assert!((req.group_green_s() - 26.36).abs() < 1e-12);
    }
}
