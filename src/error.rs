//! Error types shared by the simulation engine.

use thiserror::Error;

/// Failures that abort a simulation run before or while it executes.
///
/// Numeric edge cases (zero distance, vanishing power) are not errors; they
/// are floored by small epsilons inside the physical model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Missing or invalid configuration: empty AP table, zero steps or users,
    /// non-physical parameter values.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Array dimensions disagree with the declared user/AP/step counts.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
