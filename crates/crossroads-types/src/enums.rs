//! Enumeration types for the Crossroads signal simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Approaches
// ---------------------------------------------------------------------------

/// One of the two traffic flows crossing the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Approach {
    /// North-South flow.
    #[serde(rename = "NS")]
    NorthSouth,
    /// East-West flow.
    #[serde(rename = "EW")]
    EastWest,
}

impl Approach {
    /// Both approaches in canonical order. Every per-approach loop and
    /// every random draw sequence walks this order.
    pub const ALL: [Self; 2] = [Self::NorthSouth, Self::EastWest];

    /// The approach on the conflicting axis.
    pub const fn other(self) -> Self {
        match self {
            Self::NorthSouth => Self::EastWest,
            Self::EastWest => Self::NorthSouth,
        }
    }

    /// Short label used in logs and prompts (`NS` / `EW`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::NorthSouth => "NS",
            Self::EastWest => "EW",
        }
    }
}

impl core::fmt::Display for Approach {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Signal protocol
// ---------------------------------------------------------------------------

/// Phase of the currently active approach. The inactive approach is
/// always red, so there is no red phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalPhase {
    /// The active approach is discharging.
    Green,
    /// Clearance interval before the other approach gets green.
    Yellow,
}

/// Color shown by one approach's signal head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "UPPERCASE")]
pub enum LightColor {
    /// Proceed.
    Green,
    /// Clear the intersection.
    Yellow,
    /// Stop.
    Red,
}

impl LightColor {
    /// The color the active approach shows during `phase`.
    pub const fn for_phase(phase: SignalPhase) -> Self {
        match phase {
            SignalPhase::Green => Self::Green,
            SignalPhase::Yellow => Self::Yellow,
        }
    }
}

/// Controller strategy. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Green durations perturbed from live demand.
    Adaptive,
    /// Every green lasts the base duration.
    Fixed,
}

impl core::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Adaptive => f.write_str("adaptive"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}
