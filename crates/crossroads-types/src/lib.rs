//! Shared type definitions for the Crossroads signal simulation.
//!
//! This crate is the single source of truth for the state that flows
//! between the simulation core, the explanation generator, and any
//! dashboard driving the engine. Types flow downstream to `TypeScript`
//! via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper identifying a simulation run
//! - [`enums`] -- Approaches, signal phases, light colors, control modes
//! - [`structs`] -- Per-approach sensor state, metrics, and the full
//!   simulation state record

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Approach, ControlMode, LightColor, SignalPhase};
pub use ids::RunId;
pub use structs::{ApproachState, MetricsSnapshot, PerApproach, SimulationState};
