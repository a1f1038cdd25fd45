//! EventBus - broadcast-based orchestration events.
//!
//! Every turn publishes its lifecycle here so hosts, log shippers and tests
//! can observe classification, planning, dispatch and calibration without
//! touching session state.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions for the orchestration lifecycle.
pub mod types;

pub use bus::EventBus;
pub use types::OrchestrationEvent;

#[cfg(test)]
mod tests;
