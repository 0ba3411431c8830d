//! Multi-AP interference aggregation.
//!
//! For every candidate serving AP the SINR toward one user is formed from the
//! AP's own received power against the spectrally weighted sum of all other
//! APs' received power plus thermal noise.

use rand::Rng;

use super::signal_calculations::{dbm_to_mw, directional_gain, received_power};
use super::types::{AccessPoint, ChannelParameters, LOG_EPSILON, Point, SinrSeries};
use crate::error::{Result, SimulationError};

/// Thermal noise power spectral density at room temperature.
pub const THERMAL_NOISE_DBM_PER_HZ: f64 = -174.0;

/// Receiver noise figure added on top of the thermal floor.
pub const NOISE_FIGURE_DB: f64 = 7.0;

/// Fraction of an interferer's power that falls into the victim channel.
///
/// 1.0 for co-channel operation, ramping linearly down to 0.0 as the
/// separation approaches one channel bandwidth, and exactly 0.0 at or beyond
/// it.
pub fn spectral_overlap(frequency_offset_hz: f64, bandwidth_hz: f64) -> f64 {
    let offset = frequency_offset_hz.abs();
    if offset == 0.0 {
        1.0
    } else if offset < bandwidth_hz {
        1.0 - offset / bandwidth_hz
    } else {
        0.0
    }
}

/// Receiver noise power (mW) over `bandwidth_hz`.
pub fn noise_power_mw(bandwidth_hz: f64) -> f64 {
    dbm_to_mw(THERMAL_NOISE_DBM_PER_HZ + 10.0 * bandwidth_hz.max(LOG_EPSILON).log10() + NOISE_FIGURE_DB)
}

/// Compute the SINR of every AP toward one user across all time steps.
///
/// `distances` is indexed `[ap][t]`. When `user_track` is given, each
/// transmitter's directional antenna gain toward the user position at step
/// `t` is applied to its received power.
///
/// The cross power matrix draws independent fading and shadowing for every
/// (receiving AP, transmitting AP) pair, so the interference seen by AP `i`
/// from AP `j` is not the same sample as AP `j`'s own desired signal.
pub fn compute_sinr<R: Rng + ?Sized>(
    distances: &[Vec<f64>],
    aps: &[AccessPoint],
    user_track: Option<&[Point]>,
    params: &ChannelParameters,
    rng: &mut R,
) -> Result<Vec<SinrSeries>> {
    if aps.is_empty() {
        return Err(SimulationError::Configuration("at least one access point is required".to_string()));
    }
    if distances.len() != aps.len() {
        return Err(SimulationError::ShapeMismatch(format!(
            "distance matrix has {} AP rows, expected {}",
            distances.len(),
            aps.len()
        )));
    }
    let step_count = distances[0].len();
    if let Some((idx, row)) = distances.iter().enumerate().find(|(_, row)| row.len() != step_count) {
        return Err(SimulationError::ShapeMismatch(format!(
            "distance row for AP {} has {} steps, expected {}",
            idx + 1,
            row.len(),
            step_count
        )));
    }
    if let Some(track) = user_track {
        if track.len() != step_count {
            return Err(SimulationError::ShapeMismatch(format!(
                "user track has {} steps, expected {}",
                track.len(),
                step_count
            )));
        }
    }

    // Antenna gain depends only on the transmitter and the user position.
    let gains: Vec<Vec<f64>> = aps
        .iter()
        .map(|ap| match user_track {
            Some(track) => track.iter().map(|p| directional_gain(ap, p)).collect(),
            None => vec![1.0; step_count],
        })
        .collect();

    let mut series = Vec::with_capacity(aps.len());
    for (i, serving) in aps.iter().enumerate() {
        let noise = noise_power_mw(serving.bandwidth_hz);
        let mut desired = vec![0.0; step_count];
        let mut interference = vec![0.0; step_count];

        for (j, transmitter) in aps.iter().enumerate() {
            let overlap = if j == i {
                1.0
            } else {
                spectral_overlap(transmitter.frequency_hz - serving.frequency_hz, serving.bandwidth_hz)
            };
            for t in 0..step_count {
                let power = received_power(distances[j][t], transmitter, params, rng) * gains[j][t];
                if j == i {
                    desired[t] = power;
                } else {
                    interference[t] += power * overlap;
                }
            }
        }

        let linear = desired
            .iter()
            .zip(&interference)
            .map(|(&s, &interf)| sanitize_sinr(s / (interf + noise + LOG_EPSILON), i))
            .collect();
        series.push(SinrSeries::from_linear(linear));
    }
    Ok(series)
}

/// Keep SINR finite and strictly positive.
fn sanitize_sinr(sinr: f64, ap_index: usize) -> f64 {
    if sinr.is_nan() {
        log::warn!("AP {} produced an undefined SINR sample, flooring it", ap_index + 1);
        f64::MIN_POSITIVE
    } else if sinr.is_infinite() {
        log::warn!("AP {} produced an unbounded SINR sample, capping it", ap_index + 1);
        f64::MAX
    } else {
        sinr.max(f64::MIN_POSITIVE)
    }
}
