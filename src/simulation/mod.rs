//! Multi-AP link simulation core.
//!
//! Estimates per-user link quality and MAC-layer performance for users moving
//! through a deployment of access points. It integrates:
//! - Geometry between AP positions and user tracks
//! - Path loss, Rician fading, shadowing and directional antenna gain
//! - SINR aggregation with spectral-overlap weighted interference
//! - Hysteresis handover between APs
//! - Adaptive MCS selection with a bounded retry model
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (APs, parameter blocks, SINR series)
//! - `geometry`: Distances, bearings and the distance tensor
//! - `mobility`: Trajectory containers and the linear mobility model
//! - `signal_calculations`: Propagation and antenna calculations
//! - `interference`: Per-AP SINR toward one user
//! - `handover`: Serving-AP state machine
//! - `link_adaptation`: MCS table, BER/PER and throughput per step
//! - `network`: Orchestrator producing the result bundle
//!
//! ## Public API
//!
//! The main entry point is [`simulate`], which takes the AP table, a mobility
//! trace, the model parameters and a random generator.

pub mod geometry;
pub mod handover;
pub mod interference;
pub mod link_adaptation;
pub mod mobility;
pub mod network;
pub mod signal_calculations;
pub mod types;

// Re-export the orchestrator for convenience
pub use network::{SimulationParameters, SimulationResult, UserSummary, simulate};

// Re-export commonly used types
pub use mobility::{LinearMobility, MobilityModel, MobilityTrace, UserTrajectory};
pub use types::{AccessPoint, ChannelParameters, HandoverParameters, MacParameters, Point};
