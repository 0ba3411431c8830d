//! Radio propagation calculations.
//!
//! Contains helpers for:
//! - Log-distance path loss anchored at the 1 m free-space loss
//! - Distance-dependent Rician small-scale fading
//! - Log-normal shadowing
//! - Azimuthal cosine antenna pattern with a back-lobe floor
//! - Received power sampling combining all of the above
//!
//! Units:
//! - Power: dBm, mW (conversion provided)
//! - Distance: meters
//! - Frequency: Hz
//!
//! Every sampling function takes the random source explicitly, so a seeded
//! generator reproduces a run exactly.

use rand::Rng;
use rand_distr::StandardNormal;

use super::geometry::{angular_offset_deg, bearing};
use super::types::{AccessPoint, ChannelParameters, LOG_EPSILON, Point};

pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Reference distance d₀ of the log-distance model, in meters.
pub const REFERENCE_DISTANCE: f64 = 1.0;

/// Lowest antenna gain the directional pattern may produce, in dB.
pub const BACK_LOBE_FLOOR_DB: f64 = -20.0;

/// Free-space path loss (dB) at the reference distance.
///
/// ```text
/// PL(d₀) = 20 × log₁₀(4π d₀ / λ),  λ = c / f
/// ```
pub fn reference_path_loss(frequency_hz: f64) -> f64 {
    let wavelength = SPEED_OF_LIGHT / frequency_hz.max(LOG_EPSILON);
    20.0 * (4.0 * std::f64::consts::PI * REFERENCE_DISTANCE / wavelength).log10()
}

/// Deterministic log-distance path loss in dB.
///
/// ```text
/// PL(d) = PL(d₀) + 10 × n × log₁₀(d / d₀)
/// ```
///
/// The distance ratio is floored at a tiny epsilon, so `d = 0` yields a very
/// large negative loss (huge received power) instead of a non-finite value.
pub fn calculate_path_loss(distance: f64, frequency_hz: f64, path_loss_exponent: f64) -> f64 {
    let ratio = (distance / REFERENCE_DISTANCE).max(LOG_EPSILON);
    reference_path_loss(frequency_hz) + 10.0 * path_loss_exponent * ratio.log10()
}

/// Linear Rician K-factor at `distance`: `K_dB = K0_dB × exp(−K_decay × d)`.
pub fn rician_k_factor(distance: f64, params: &ChannelParameters) -> f64 {
    let k_db = params.k0_db * (-params.k_decay * distance).exp();
    10f64.powf(k_db / 10.0)
}

/// Sample a Rician power gain with unit mean.
///
/// The line-of-sight component has magnitude `sqrt(K/(K+1))`; the two
/// scattered quadrature components are Gaussian with standard deviation
/// `sqrt(1/(2(K+1)))`.
pub fn sample_rician_gain<R: Rng + ?Sized>(distance: f64, params: &ChannelParameters, rng: &mut R) -> f64 {
    let k = rician_k_factor(distance, params);
    let los = (k / (k + 1.0)).sqrt();
    let sigma = (1.0 / (2.0 * (k + 1.0))).sqrt();
    let z_i: f64 = rng.sample(StandardNormal);
    let z_q: f64 = rng.sample(StandardNormal);
    let in_phase = los + sigma * z_i;
    let quadrature = sigma * z_q;
    in_phase * in_phase + quadrature * quadrature
}

/// Sample log-normal shadowing as a Normal(0, σ) value in dB.
pub fn sample_shadowing_db<R: Rng + ?Sized>(shadow_sigma_db: f64, rng: &mut R) -> f64 {
    if shadow_sigma_db > 0.0 {
        let z: f64 = rng.sample(StandardNormal);
        z * shadow_sigma_db
    } else {
        0.0
    }
}

/// Antenna gain in dB for a user `offset_deg` away from boresight.
///
/// Cosine pattern: `G(θ) = G_max × cos(π/2 × θ / θ₃dB)`. The cosine argument
/// stops at π so the pattern does not rise again behind the antenna, and the
/// result is clipped to `[BACK_LOBE_FLOOR_DB, G_max]`.
pub fn directional_gain_db(offset_deg: f64, max_gain_dbi: f64, beamwidth_deg: f64) -> f64 {
    let argument = (std::f64::consts::FRAC_PI_2 * offset_deg / beamwidth_deg).min(std::f64::consts::PI);
    let gain = max_gain_dbi * argument.cos();
    gain.max(BACK_LOBE_FLOOR_DB).min(max_gain_dbi.max(BACK_LOBE_FLOOR_DB))
}

/// Linear antenna gain of `ap` toward a user at `user`.
pub fn directional_gain(ap: &AccessPoint, user: &Point) -> f64 {
    let bearing_deg = bearing(&ap.position, user).to_degrees();
    let offset = angular_offset_deg(bearing_deg, ap.boresight_deg);
    dbm_to_mw(directional_gain_db(offset, ap.antenna_gain_dbi, ap.beamwidth_deg))
}

/// Sample the received power (mW) from `ap` at `distance`.
///
/// ```text
/// P_rx(dBm) = P_tx − PL(d) + 10 log₁₀(g_rician) + X_σ
/// ```
///
/// Each call draws fresh fading and shadowing, so repeated calls with the
/// same inputs return different values.
pub fn received_power<R: Rng + ?Sized>(distance: f64, ap: &AccessPoint, params: &ChannelParameters, rng: &mut R) -> f64 {
    let path_loss_db = calculate_path_loss(distance, ap.frequency_hz, params.path_loss_exponent);
    let fading_db = 10.0 * (sample_rician_gain(distance, params, rng) + LOG_EPSILON).log10();
    let shadowing_db = sample_shadowing_db(params.shadow_sigma_db, rng);
    dbm_to_mw(ap.tx_power_dbm - path_loss_db + fading_db + shadowing_db)
}

/// Convert power from dBm to milliwatts. Also used for plain dB → linear.
///
/// ```text
/// 0 dBm   → 1 mW
/// 20 dBm  → 100 mW
/// -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert power from milliwatts to dBm. Non-positive inputs are floored.
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.max(LOG_EPSILON).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ap() -> AccessPoint {
        AccessPoint::new(0, 20.0, 2.4e9, 20e6, Point::new(0.0, 0.0))
    }

    fn calm_channel() -> ChannelParameters {
        ChannelParameters {
            shadow_sigma_db: 0.0,
            ..ChannelParameters::default()
        }
    }

    #[test]
    fn reference_loss_matches_free_space_at_2_4_ghz() {
        // 20 log10(4π / 0.125) ≈ 40.05 dB
        assert!((reference_path_loss(2.4e9) - 40.05).abs() < 0.01);
        assert!(reference_path_loss(5.18e9) > reference_path_loss(2.4e9));
    }

    #[test]
    fn path_loss_grows_with_distance_and_stays_finite_at_zero() {
        let near = calculate_path_loss(1.0, 2.4e9, 3.0);
        let far = calculate_path_loss(10.0, 2.4e9, 3.0);
        assert!((far - near - 30.0).abs() < 1e-9);
        assert!(calculate_path_loss(0.0, 2.4e9, 3.0).is_finite());
    }

    #[test]
    fn k_factor_decays_with_distance() {
        let params = ChannelParameters::default();
        let k0 = rician_k_factor(0.0, &params);
        assert!((k0 - 10f64.powf(0.5)).abs() < 1e-12);
        assert!(rician_k_factor(50.0, &params) < k0);
        assert!((rician_k_factor(1e6, &params) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rician_gain_has_unit_mean() {
        let params = ChannelParameters::default();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let mean = (0..n).map(|_| sample_rician_gain(5.0, &params, &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean gain {mean}");
    }

    #[test]
    fn shadowing_disabled_when_sigma_is_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sample_shadowing_db(0.0, &mut rng), 0.0);
        assert_ne!(sample_shadowing_db(3.0, &mut rng), 0.0);
    }

    #[test]
    fn directional_gain_limits() {
        // Peak on boresight, attenuated behind, never below the back-lobe floor.
        assert_eq!(directional_gain_db(0.0, 6.0, 360.0), 6.0);
        let behind = directional_gain_db(180.0, 6.0, 360.0);
        assert!(behind < 6.0 && behind > 0.0);
        assert_eq!(directional_gain_db(180.0, 30.0, 60.0), BACK_LOBE_FLOOR_DB);
        assert_eq!(directional_gain_db(90.0, 0.0, 360.0), 0.0);

        let sector = ap().with_antenna(6.0, 60.0).with_boresight(90.0);
        let ahead = directional_gain(&sector, &Point::new(0.0, 10.0));
        let aside = directional_gain(&sector, &Point::new(10.0, 0.0));
        assert!(ahead > aside);
        assert!(ahead <= 10f64.powf(0.6) + 1e-12);
        assert!(aside > 0.0);
    }

    #[test]
    fn received_power_is_stochastic_and_decreases_with_distance_on_average() {
        let params = calm_channel();
        let mut rng = StdRng::seed_from_u64(11);
        let a = received_power(3.0, &ap(), &params, &mut rng);
        let b = received_power(3.0, &ap(), &params, &mut rng);
        assert_ne!(a, b);

        let mean = |d: f64, rng: &mut StdRng| (0..500).map(|_| received_power(d, &ap(), &params, rng)).sum::<f64>() / 500.0;
        let near = mean(2.0, &mut rng);
        let far = mean(12.0, &mut rng);
        assert!(near > far);
    }

    #[test]
    fn dbm_mw_conversion_roundtrip_reasonable() {
        for v in [-100.0, -50.0, 0.0, 10.0] {
            assert!((mw_to_dbm(dbm_to_mw(v)) - v).abs() < 1e-9);
        }
        assert!(mw_to_dbm(0.0).is_finite());
    }
}
