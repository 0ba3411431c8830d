//! Scene loading, parsing, and validation logic.
//!
//! A scene is the JSON description of the deployment: the AP table as
//! parallel per-AP arrays, the run duration, the user population and the
//! channel, handover and MAC knobs. Keys are camelCase. Optional knobs fall
//! back to the defaults of the parameter blocks in
//! [`crate::simulation::types`].

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::error::SimulationError;
use crate::simulation::link_adaptation::McsTable;
use crate::simulation::mobility::MobilityTrace;
use crate::simulation::network::SimulationParameters;
use crate::simulation::types::{
    AccessPoint, ChannelParameters, DEFAULT_ANTENNA_GAIN_DBI, DEFAULT_BEAMWIDTH_DEG, DEFAULT_BORESIGHT_DEG, HandoverParameters,
    MacParameters, Point,
};

/// Error type for scene and trace loading failures.
#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("Failed to read file: {0}")]
    FileRead(String),
    #[error("Failed to parse JSON: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(#[from] SimulationError),
}

/// Root structure representing the entire scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub number_of_access_points: usize,
    /// dBm per AP.
    pub transmission_powers: Vec<f64>,
    /// Hz per AP.
    pub frequencies: Vec<f64>,
    /// Hz per AP.
    pub bandwidths: Vec<f64>,
    /// `[x, y]` in meters per AP.
    pub ap_positions: Vec<[f64; 2]>,
    /// dBi per AP; omnidirectional 0 dBi when absent.
    #[serde(default)]
    pub antenna_gains: Option<Vec<f64>>,
    /// Degrees per AP; 360 when absent.
    #[serde(default)]
    pub beamwidths: Option<Vec<f64>>,
    /// Main-lobe azimuth in degrees per AP; 0 when absent.
    #[serde(default)]
    pub boresights: Option<Vec<f64>>,
    /// Seconds.
    pub simulation_time: f64,
    /// Seconds per step.
    pub time_step: f64,
    pub number_of_nodes: usize,
    /// User speed in m/s for generated traces.
    #[serde(default = "default_velocity")]
    pub velocity: f64,
    #[serde(default)]
    pub path_loss_exponent: Option<f64>,
    #[serde(default, rename = "hysteresis_dB")]
    pub hysteresis_db: Option<f64>,
    #[serde(default, rename = "K0dB")]
    pub k0_db: Option<f64>,
    #[serde(default, rename = "KDecay")]
    pub k_decay: Option<f64>,
    #[serde(default, rename = "shadowSigmaDB")]
    pub shadow_sigma_db: Option<f64>,
    /// Packet size in bytes.
    #[serde(default)]
    pub data_size: Option<f64>,
    /// Attempts per step. Integral JSON numbers such as `3.0` are accepted.
    #[serde(default, deserialize_with = "deserialize_count")]
    pub max_retries: Option<u32>,
}

/// Upper bound on `floor(simulationTime / timeStep)`.
pub const MAX_STEP_COUNT: f64 = u32::MAX as f64;

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(value) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            value
        )));
    }
    Ok(Some(value as u32))
}

fn default_velocity() -> f64 {
    1.5
}

impl Scene {
    /// Number of discrete steps: `floor(simulationTime / timeStep)`.
    pub fn step_count(&self) -> usize {
        (self.simulation_time / self.time_step).floor() as usize
    }

    /// Build the AP table from the parallel per-AP arrays.
    pub fn access_points(&self) -> Result<Vec<AccessPoint>, SimulationError> {
        let n = self.number_of_access_points;
        check_len("transmissionPowers", self.transmission_powers.len(), n)?;
        check_len("frequencies", self.frequencies.len(), n)?;
        check_len("bandwidths", self.bandwidths.len(), n)?;
        check_len("apPositions", self.ap_positions.len(), n)?;
        for (field, values) in [
            ("antennaGains", &self.antenna_gains),
            ("beamwidths", &self.beamwidths),
            ("boresights", &self.boresights),
        ] {
            if let Some(values) = values {
                check_len(field, values.len(), n)?;
            }
        }

        let per_ap = |values: &Option<Vec<f64>>, i: usize, default: f64| values.as_ref().map_or(default, |v| v[i]);
        (0..n)
            .map(|i| {
                let [x, y] = self.ap_positions[i];
                let ap = AccessPoint::new(i, self.transmission_powers[i], self.frequencies[i], self.bandwidths[i], Point::new(x, y))
                    .with_antenna(
                        per_ap(&self.antenna_gains, i, DEFAULT_ANTENNA_GAIN_DBI),
                        per_ap(&self.beamwidths, i, DEFAULT_BEAMWIDTH_DEG),
                    )
                    .with_boresight(per_ap(&self.boresights, i, DEFAULT_BORESIGHT_DEG));
                ap.validate()?;
                Ok(ap)
            })
            .collect()
    }

    pub fn channel_parameters(&self) -> ChannelParameters {
        let defaults = ChannelParameters::default();
        ChannelParameters {
            path_loss_exponent: self.path_loss_exponent.unwrap_or(defaults.path_loss_exponent),
            k0_db: self.k0_db.unwrap_or(defaults.k0_db),
            k_decay: self.k_decay.unwrap_or(defaults.k_decay),
            shadow_sigma_db: self.shadow_sigma_db.unwrap_or(defaults.shadow_sigma_db),
        }
    }

    pub fn handover_parameters(&self) -> HandoverParameters {
        HandoverParameters {
            hysteresis_db: self.hysteresis_db.unwrap_or(HandoverParameters::default().hysteresis_db),
        }
    }

    pub fn mac_parameters(&self) -> MacParameters {
        let defaults = MacParameters::default();
        MacParameters {
            packet_size_bytes: self.data_size.unwrap_or(defaults.packet_size_bytes),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
        }
    }

    /// All model parameters of the scene with the default MCS table.
    pub fn simulation_parameters(&self) -> SimulationParameters {
        SimulationParameters {
            channel: self.channel_parameters(),
            handover: self.handover_parameters(),
            mac: self.mac_parameters(),
            mcs_table: McsTable::default(),
        }
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<(), SimulationError> {
    if actual != expected {
        return Err(SimulationError::Configuration(format!(
            "'{}' has {} entries but numberOfAccessPoints is {}",
            field, actual, expected
        )));
    }
    Ok(())
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| SceneLoadError::FileRead(e.to_string()))?;

    let scene: Scene = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::Parse(e.to_string()))?;

    validate_scene(&scene)?;

    Ok(scene)
}

/// Validate scene configuration.
///
/// Builds the AP table once so that per-AP array lengths and physical ranges
/// are checked together with the run-level fields.
pub fn validate_scene(scene: &Scene) -> Result<(), SimulationError> {
    if scene.number_of_access_points == 0 {
        return Err(SimulationError::Configuration("Scene must contain at least one access point".to_string()));
    }
    if scene.number_of_nodes == 0 {
        return Err(SimulationError::Configuration("Scene must contain at least one user".to_string()));
    }
    if !(scene.time_step.is_finite() && scene.time_step > 0.0) {
        return Err(SimulationError::Configuration(format!("Invalid timeStep {}, must be positive", scene.time_step)));
    }
    let steps = (scene.simulation_time / scene.time_step).floor();
    if !steps.is_finite() || steps < 1.0 {
        return Err(SimulationError::Configuration(format!(
            "simulationTime {} yields no steps at timeStep {}",
            scene.simulation_time, scene.time_step
        )));
    }
    if steps > MAX_STEP_COUNT {
        return Err(SimulationError::Configuration(format!(
            "simulationTime {} at timeStep {} yields {} steps, more than {}",
            scene.simulation_time, scene.time_step, steps, MAX_STEP_COUNT
        )));
    }
    if !scene.velocity.is_finite() {
        return Err(SimulationError::Configuration("Invalid velocity, must be finite".to_string()));
    }

    scene.access_points()?;
    scene.simulation_parameters().validate()
}

/// Load an external mobility trace: a JSON array of shape `(users, 2, steps)`.
pub fn load_trace(path: &Path) -> Result<MobilityTrace, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| SceneLoadError::FileRead(e.to_string()))?;

    let axes: Vec<Vec<Vec<f64>>> = serde_json::from_str(&data)
        .context("Invalid trace format")
        .map_err(|e| SceneLoadError::Parse(e.to_string()))?;

    Ok(MobilityTrace::from_axes(&axes)?)
}
