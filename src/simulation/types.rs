//! Type definitions for the simulation.
//!
//! Contains the data structures shared across the engine:
//! - Access point records and 2D positions
//! - Channel, handover and MAC parameter blocks with their defaults
//! - Per-AP SINR series and per-step throughput outcomes

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Floor added before taking logarithms and in SINR denominators so that
/// vanishing powers never produce non-finite values.
pub const LOG_EPSILON: f64 = 1e-12;

/// Simple 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single access point. Immutable for the duration of a run.
///
/// Antenna fields default to an omnidirectional 0 dBi pattern pointing along
/// the positive x axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessPoint {
    /// Zero-based position in the AP table.
    pub index: usize,
    pub tx_power_dbm: f64,
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub position: Point,
    /// Peak antenna gain in dBi.
    pub antenna_gain_dbi: f64,
    /// Half-power beamwidth in degrees. 360 means omnidirectional.
    pub beamwidth_deg: f64,
    /// Azimuth of the main lobe in degrees, counter-clockwise from +x.
    pub boresight_deg: f64,
}

pub const DEFAULT_ANTENNA_GAIN_DBI: f64 = 0.0;
pub const DEFAULT_BEAMWIDTH_DEG: f64 = 360.0;
pub const DEFAULT_BORESIGHT_DEG: f64 = 0.0;

impl AccessPoint {
    pub fn new(index: usize, tx_power_dbm: f64, frequency_hz: f64, bandwidth_hz: f64, position: Point) -> Self {
        Self {
            index,
            tx_power_dbm,
            frequency_hz,
            bandwidth_hz,
            position,
            antenna_gain_dbi: DEFAULT_ANTENNA_GAIN_DBI,
            beamwidth_deg: DEFAULT_BEAMWIDTH_DEG,
            boresight_deg: DEFAULT_BORESIGHT_DEG,
        }
    }

    pub fn with_antenna(mut self, antenna_gain_dbi: f64, beamwidth_deg: f64) -> Self {
        self.antenna_gain_dbi = antenna_gain_dbi;
        self.beamwidth_deg = beamwidth_deg;
        self
    }

    pub fn with_boresight(mut self, boresight_deg: f64) -> Self {
        self.boresight_deg = boresight_deg;
        self
    }

    /// Reject records that would make the physical model meaningless.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.tx_power_dbm,
            self.frequency_hz,
            self.bandwidth_hz,
            self.position.x,
            self.position.y,
            self.antenna_gain_dbi,
            self.beamwidth_deg,
            self.boresight_deg,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(SimulationError::Configuration(format!("AP {} has non-finite parameters", self.index + 1)));
        }
        if self.frequency_hz <= 0.0 {
            return Err(SimulationError::Configuration(format!(
                "AP {} frequency {} Hz must be positive",
                self.index + 1,
                self.frequency_hz
            )));
        }
        if self.bandwidth_hz <= 0.0 {
            return Err(SimulationError::Configuration(format!(
                "AP {} bandwidth {} Hz must be positive",
                self.index + 1,
                self.bandwidth_hz
            )));
        }
        if self.beamwidth_deg <= 0.0 {
            return Err(SimulationError::Configuration(format!(
                "AP {} beamwidth {} deg must be positive",
                self.index + 1,
                self.beamwidth_deg
            )));
        }
        Ok(())
    }
}

/// Parameters of the propagation model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelParameters {
    /// Path loss exponent (n). 2.0 for free space, 3 to 5 indoors.
    pub path_loss_exponent: f64,
    /// Rician K-factor at zero distance, in dB.
    pub k0_db: f64,
    /// Exponential decay rate of the K-factor per meter.
    pub k_decay: f64,
    /// Standard deviation of log-normal shadowing in dB. 0 disables it.
    pub shadow_sigma_db: f64,
}

impl Default for ChannelParameters {
    fn default() -> Self {
        Self {
            path_loss_exponent: 3.0,
            k0_db: 5.0,
            k_decay: 0.1,
            shadow_sigma_db: 3.0,
        }
    }
}

impl ChannelParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.path_loss_exponent.is_finite() && self.path_loss_exponent > 0.0) {
            return Err(SimulationError::Configuration(format!(
                "path loss exponent {} must be positive",
                self.path_loss_exponent
            )));
        }
        if !(self.shadow_sigma_db.is_finite() && self.shadow_sigma_db >= 0.0) {
            return Err(SimulationError::Configuration(format!(
                "shadowing sigma {} dB must be non-negative",
                self.shadow_sigma_db
            )));
        }
        if !(self.k0_db.is_finite() && self.k_decay.is_finite()) {
            return Err(SimulationError::Configuration("Rician K parameters must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandoverParameters {
    /// Margin in dB a candidate AP must exceed the serving AP by.
    pub hysteresis_db: f64,
}

impl Default for HandoverParameters {
    fn default() -> Self {
        Self { hysteresis_db: 3.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MacParameters {
    pub packet_size_bytes: f64,
    /// Upper bound on transmission attempts per step.
    pub max_retries: u32,
}

impl Default for MacParameters {
    fn default() -> Self {
        Self {
            packet_size_bytes: 1500.0,
            max_retries: 3,
        }
    }
}

impl MacParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.packet_size_bytes.is_finite() && self.packet_size_bytes > 0.0) {
            return Err(SimulationError::Configuration(format!(
                "packet size {} bytes must be positive",
                self.packet_size_bytes
            )));
        }
        if self.max_retries == 0 {
            return Err(SimulationError::Configuration("max_retries must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn packet_size_bits(&self) -> f64 {
        self.packet_size_bytes * 8.0
    }
}

/// SINR of one AP toward one user across all time steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SinrSeries {
    pub linear: Vec<f64>,
    pub db: Vec<f64>,
}

impl SinrSeries {
    pub fn from_linear(linear: Vec<f64>) -> Self {
        let db = linear.iter().map(|&v| linear_to_db(v)).collect();
        Self { linear, db }
    }

    pub fn len(&self) -> usize {
        self.linear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }
}

/// Result of one user's transmission attempt window at one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Row of the MCS table selected for this step.
    pub mcs_index: usize,
    /// Delivered PHY throughput; zero when the packet was lost.
    pub throughput_bps: f64,
    pub mac_throughput_bps: f64,
    pub per: f64,
    pub retries: u32,
    pub collision: bool,
}

/// Linear power ratio to dB with an epsilon floor.
pub fn linear_to_db(value: f64) -> f64 {
    10.0 * (value + LOG_EPSILON).log10()
}

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}
