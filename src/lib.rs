//! Multi-access-point wireless link simulator.
//!
//! Given an AP deployment and user trajectories, computes SINR per AP and
//! step, hysteresis handover decisions, adaptive MCS throughput and retry
//! outcomes for every user.

pub mod common;
pub mod error;
pub mod simulation;

pub use error::{Result, SimulationError};
