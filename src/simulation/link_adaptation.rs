//! Adaptive modulation and coding with a bounded retry model.
//!
//! Per time step:
//! 1) bucket the SINR (dB) into the MCS table,
//! 2) derive BER from a modulation-specific closed form and PER from the
//!    packet size,
//! 3) draw up to `max_retries` independent transmission attempts,
//! 4) scale the delivered PHY rate by a fair-share MAC efficiency.
//!
//! A step whose attempts all fail is a lost packet: zero throughput, retries
//! pinned at the maximum, collision flag set.

use rand::Rng;

use super::types::{MacParameters, StepOutcome, linear_to_db};
use crate::error::{Result, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Qam16,
    Qam64,
}

impl Modulation {
    /// Approximate bit error rate at linear SINR `sinr`.
    pub fn bit_error_rate(self, sinr: f64) -> f64 {
        let sinr = sinr.max(0.0);
        match self {
            Modulation::Bpsk | Modulation::Qpsk => q_function((2.0 * sinr).sqrt()),
            Modulation::Qam16 => 3.0 / 8.0 * q_function((4.0 / 5.0 * sinr).sqrt()),
            Modulation::Qam64 => 7.0 / 24.0 * q_function((6.0 / 7.0 * sinr).sqrt()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Modulation::Bpsk => "BPSK",
            Modulation::Qpsk => "QPSK",
            Modulation::Qam16 => "16QAM",
            Modulation::Qam64 => "64QAM",
        }
    }
}

impl std::fmt::Display for Modulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the MCS table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McsEntry {
    pub modulation: Modulation,
    pub code_rate: f64,
    /// PHY bit rate in Mbps.
    pub phy_rate_mbps: f64,
}

impl McsEntry {
    pub const fn new(modulation: Modulation, code_rate: f64, phy_rate_mbps: f64) -> Self {
        Self {
            modulation,
            code_rate,
            phy_rate_mbps,
        }
    }

    pub fn phy_rate_bps(&self) -> f64 {
        self.phy_rate_mbps * 1e6
    }
}

/// 802.11n single-stream 20 MHz rates, 800 ns guard interval.
pub const DEFAULT_MCS_ENTRIES: [McsEntry; 8] = [
    McsEntry::new(Modulation::Bpsk, 1.0 / 2.0, 6.5),
    McsEntry::new(Modulation::Qpsk, 1.0 / 2.0, 13.0),
    McsEntry::new(Modulation::Qpsk, 3.0 / 4.0, 19.5),
    McsEntry::new(Modulation::Qam16, 1.0 / 2.0, 26.0),
    McsEntry::new(Modulation::Qam16, 3.0 / 4.0, 39.0),
    McsEntry::new(Modulation::Qam64, 2.0 / 3.0, 52.0),
    McsEntry::new(Modulation::Qam64, 3.0 / 4.0, 58.5),
    McsEntry::new(Modulation::Qam64, 5.0 / 6.0, 65.0),
];

pub const DEFAULT_MCS_THRESHOLDS_DB: [f64; 7] = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0];

/// Ordered MCS rows selected by ascending SINR thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct McsTable {
    entries: Vec<McsEntry>,
    thresholds_db: Vec<f64>,
}

impl Default for McsTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_MCS_ENTRIES.to_vec(),
            thresholds_db: DEFAULT_MCS_THRESHOLDS_DB.to_vec(),
        }
    }
}

impl McsTable {
    pub fn new(entries: Vec<McsEntry>, thresholds_db: Vec<f64>) -> Result<Self> {
        if entries.is_empty() {
            return Err(SimulationError::Configuration("MCS table must not be empty".to_string()));
        }
        if thresholds_db.iter().any(|t| !t.is_finite()) || thresholds_db.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimulationError::Configuration("MCS thresholds must be finite and strictly ascending".to_string()));
        }
        Ok(Self { entries, thresholds_db })
    }

    /// Row index for `sinr_db`: the number of thresholds at or below it,
    /// clamped to the last row.
    pub fn select(&self, sinr_db: f64) -> usize {
        let bucket = self.thresholds_db.iter().take_while(|&&t| t <= sinr_db).count();
        bucket.min(self.entries.len() - 1)
    }

    pub fn entry(&self, index: usize) -> &McsEntry {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[McsEntry] {
        &self.entries
    }
}

/// Gaussian tail probability `Q(x) = ½ erfc(x / √2)`.
pub fn q_function(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

// Abramowitz & Stegun 7.1.26
fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let poly = t * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x * x).exp();
    if x >= 0.0 { result } else { 2.0 - result }
}

/// Probability that a packet of `packet_bits` contains at least one bit
/// error, assuming independent errors.
pub fn packet_error_rate(ber: f64, packet_bits: f64) -> f64 {
    (1.0 - (-ber * packet_bits).exp()).clamp(0.0, 1.0)
}

/// Fair-share MAC efficiency under contention from `concurrent_users`.
pub fn mac_efficiency(concurrent_users: usize) -> f64 {
    1.0 / concurrent_users.max(1) as f64
}

/// Draw up to `max_retries` attempts, each succeeding with probability
/// `1 − per`. Returns the index of the first success, or `max_retries` and a
/// collision flag when every attempt failed.
pub fn simulate_retries<R: Rng + ?Sized>(per: f64, max_retries: u32, rng: &mut R) -> (u32, bool) {
    for attempt in 0..max_retries {
        let draw: f64 = rng.r#gen();
        if draw > per {
            return (attempt, false);
        }
    }
    (max_retries, true)
}

/// Evaluate one step for a link at linear SINR `sinr`.
pub fn evaluate_step<R: Rng + ?Sized>(sinr: f64, concurrent_users: usize, mac: &MacParameters, table: &McsTable, rng: &mut R) -> StepOutcome {
    let mcs_index = table.select(linear_to_db(sinr));
    let entry = table.entry(mcs_index);
    let ber = entry.modulation.bit_error_rate(sinr);
    let per = packet_error_rate(ber, mac.packet_size_bits());
    let (retries, collision) = simulate_retries(per, mac.max_retries, rng);
    let throughput_bps = if collision { 0.0 } else { entry.phy_rate_bps() };
    StepOutcome {
        mcs_index,
        throughput_bps,
        mac_throughput_bps: throughput_bps * mac_efficiency(concurrent_users),
        per,
        retries,
        collision,
    }
}

/// Throughput, PER, retries and collisions for one link over all steps.
///
/// `sinr_linear[t]` is the SINR on the serving AP at step `t` and
/// `concurrent_users[t]` the number of users sharing that AP at the same step.
pub fn compute_throughput<R: Rng + ?Sized>(
    sinr_linear: &[f64],
    concurrent_users: &[usize],
    mac: &MacParameters,
    table: &McsTable,
    rng: &mut R,
) -> Result<Vec<StepOutcome>> {
    mac.validate()?;
    if sinr_linear.len() != concurrent_users.len() {
        return Err(SimulationError::ShapeMismatch(format!(
            "{} SINR samples but {} occupancy samples",
            sinr_linear.len(),
            concurrent_users.len()
        )));
    }
    Ok(sinr_linear
        .iter()
        .zip(concurrent_users)
        .map(|(&sinr, &users)| evaluate_step(sinr.max(0.0), users, mac, table, rng))
        .collect())
}
