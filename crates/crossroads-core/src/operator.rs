//! Operator control state for runtime simulation management.
//!
//! The start/stop/fast-forward controls of a dashboard map onto this
//! shared state. Every driver loop holds an `Arc<OperatorState>` and polls
//! it between transitions, so one operator can pause, speed up, or stop an
//! adaptive and a fixed run together.
//!
//! # Architecture
//!
//! Flags are atomics for lock-free reads on the driver hot path. Pausing
//! uses a [`watch`] channel so any number of paused drivers wake on resume.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::config::RunConfig;

/// Reason why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// Reached the configured `max_transitions` limit.
    MaxTransitionsReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Point-in-time view of the operator controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorStatus {
    /// Whether the drivers are paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Whether fast-forward is on.
    pub fast_forward: bool,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
    /// Wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Transition limit per run (0 = unlimited).
    pub max_transitions: u64,
    /// Wall-clock limit in seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Start time, RFC 3339.
    pub started_at: String,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the drivers are paused. Receivers wait on changes.
    paused: watch::Sender<bool>,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Skip sleeping and explanation requests.
    fast_forward: AtomicBool,

    /// Simulated seconds per wall-clock second, stored as `f64` bits.
    time_scale_bits: AtomicU64,

    /// Wall-clock time when the operator state was created.
    started_at: DateTime<Utc>,

    /// Maximum number of transitions per run (0 = unlimited).
    max_transitions: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// First reason any driver recorded for ending.
    end_reason: Mutex<Option<RunEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from the run configuration.
    pub fn new(run: &RunConfig) -> Self {
        let time_scale = if run.time_scale.is_finite() && run.time_scale >= 0.0 {
            run.time_scale
        } else {
            1.0
        };
        let (paused, _initial_rx) = watch::channel(false);
        Self {
            paused,
            stop_requested: AtomicBool::new(false),
            fast_forward: AtomicBool::new(run.fast_forward),
            time_scale_bits: AtomicU64::new(time_scale.to_bits()),
            started_at: Utc::now(),
            max_transitions: run.max_transitions,
            max_real_time_seconds: run.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the drivers are paused.
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Pause the drivers. Each sleeps before its next transition until resumed.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Resume and wake every paused driver.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Wait until the drivers are no longer paused.
    ///
    /// Returns immediately if not paused.
    pub async fn wait_if_paused(&self) {
        let mut rx = self.paused.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Paused drivers are released so they can exit.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.paused.send_replace(false);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why a run ended. The first reason recorded is kept.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        let mut guard = self.end_reason.lock().await;
        if guard.is_none() {
            *guard = Some(reason);
        }
    }

    /// The first recorded end reason, if any run has ended.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Whether fast-forward is on.
    pub fn is_fast_forward(&self) -> bool {
        self.fast_forward.load(Ordering::Acquire)
    }

    /// Turn fast-forward on or off. Returns the previous setting.
    pub fn set_fast_forward(&self, enabled: bool) -> bool {
        self.fast_forward.swap(enabled, Ordering::AcqRel)
    }

    /// Simulated seconds per wall-clock second (0 = no sleeping).
    pub fn time_scale(&self) -> f64 {
        f64::from_bits(self.time_scale_bits.load(Ordering::Acquire))
    }

    /// Change the time scale.
    ///
    /// Returns the previous scale on success, or `None` if the value was
    /// rejected (negative or not finite).
    pub fn set_time_scale(&self, scale: f64) -> Option<f64> {
        if !scale.is_finite() || scale < 0.0 {
            return None;
        }
        let prev = self.time_scale_bits.swap(scale.to_bits(), Ordering::AcqRel);
        Some(f64::from_bits(prev))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Returns `true` if `max_transitions > 0` and `transitions >= max_transitions`.
    pub const fn transition_limit_reached(&self, transitions: u64) -> bool {
        self.max_transitions > 0 && transitions >= self.max_transitions
    }

    /// Returns `true` if `max_real_time_seconds > 0` and that many seconds
    /// have elapsed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured transition limit.
    pub const fn max_transitions(&self) -> u64 {
        self.max_transitions
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// Snapshot every control for display.
    pub fn status(&self) -> OperatorStatus {
        OperatorStatus {
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            fast_forward: self.is_fast_forward(),
            time_scale: self.time_scale(),
            elapsed_seconds: self.elapsed_seconds(),
            max_transitions: self.max_transitions,
            max_real_time_seconds: self.max_real_time_seconds,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}
