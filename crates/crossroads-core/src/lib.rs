//! Signal state machine, demand model, and run orchestration for the
//! Crossroads two-approach intersection simulation.
//!
//! This crate owns the two-phase transition cycle (GREEN -> YELLOW -> GREEN
//! on the other approach) and the driver that paces it in wall-clock time.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `crossroads-config.yaml` into
//!   strongly-typed structs.
//! - [`demand`] -- Arrival accrual and the per-cycle demand random walk.
//! - [`delta`] -- Closed-form adaptive green-time adjustment.
//! - [`phase`] -- Phase state machine: discharge, minimum greens, and the
//!   two transitions.
//! - [`metrics`] -- Metrics snapshot derivation and [`ComparisonReport`].
//! - [`engine`] -- [`advance`] and the owned [`SimulationEngine`] handle.
//! - [`explanation`] -- [`ExplanationSource`] trait and fallback texts.
//! - [`random`] -- [`RandomSource`] trait, seeded and constant sources.
//! - [`operator`] -- Shared pause/stop/speed controls.
//! - [`runner`] -- The async driver loop.
//!
//! [`ComparisonReport`]: metrics::ComparisonReport
//! [`advance`]: engine::advance
//! [`SimulationEngine`]: engine::SimulationEngine
//! [`ExplanationSource`]: explanation::ExplanationSource
//! [`RandomSource`]: random::RandomSource

pub mod config;
pub mod delta;
pub mod demand;
pub mod engine;
pub mod explanation;
pub mod metrics;
pub mod operator;
pub mod phase;
pub mod random;
pub mod runner;
