//! Simulation orchestrator.
//!
//! Drives one batch run over all users:
//! - Builds the AP × user × time distance tensor
//! - Computes per-AP SINR series for every user and runs the handover engine
//! - Tallies how many users each AP serves at every step (the occupancy is
//!   complete before any throughput is evaluated)
//! - Evaluates MCS, PER, retries and throughput on each user's serving AP
//! - Assembles the result bundle
//!
//! The run is single-threaded and draws all randomness from the generator the
//! caller passes in, so a seeded generator reproduces a run exactly.

use rand::Rng;
use serde::Serialize;

use super::geometry::distance_tensor;
use super::handover::{HandoverAssignment, handover_decision};
use super::interference::compute_sinr;
use super::link_adaptation::{McsTable, compute_throughput};
use super::mobility::MobilityTrace;
use super::types::{AccessPoint, ChannelParameters, HandoverParameters, MacParameters, SinrSeries, StepOutcome};
use crate::error::{Result, SimulationError};

/// All tunable model parameters of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationParameters {
    pub channel: ChannelParameters,
    pub handover: HandoverParameters,
    pub mac: MacParameters,
    pub mcs_table: McsTable,
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<()> {
        self.channel.validate()?;
        self.mac.validate()?;
        if !self.handover.hysteresis_db.is_finite() {
            return Err(SimulationError::Configuration("hysteresis must be finite".to_string()));
        }
        Ok(())
    }
}

/// Number of users served by each AP at each step, indexed `[ap][t]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApOccupancy {
    counts: Vec<Vec<usize>>,
}

impl ApOccupancy {
    /// Tally the serving APs of all users.
    pub fn tally(ap_count: usize, step_count: usize, assignments: &[HandoverAssignment]) -> Result<Self> {
        let mut counts = vec![vec![0usize; step_count]; ap_count];
        for (user, assignment) in assignments.iter().enumerate() {
            if assignment.len() != step_count {
                return Err(SimulationError::ShapeMismatch(format!(
                    "user {} has {} handover steps, expected {}",
                    user,
                    assignment.len(),
                    step_count
                )));
            }
            for (t, &ap) in assignment.as_slice().iter().enumerate() {
                let row = counts.get_mut(ap).ok_or_else(|| {
                    SimulationError::ShapeMismatch(format!("user {} assigned to unknown AP {}", user, ap + 1))
                })?;
                row[t] += 1;
            }
        }
        Ok(Self { counts })
    }

    /// Occupancy of the AP serving `assignment` at each of its steps.
    pub fn along(&self, assignment: &HandoverAssignment) -> Vec<usize> {
        assignment.as_slice().iter().enumerate().map(|(t, &ap)| self.counts[ap][t]).collect()
    }

    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }
}

/// Result bundle of a run. Field names match the JSON output keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// SINR in dB, `[user][ap][t]`.
    pub users_sinr: Vec<Vec<Vec<f64>>>,
    /// 1-based serving AP, `[user][t]`.
    pub users_handover: Vec<Vec<usize>>,
    pub users_throughput: Vec<Vec<f64>>,
    pub users_mac_throughput: Vec<Vec<f64>>,
    pub users_per: Vec<Vec<f64>>,
    pub users_retries: Vec<Vec<u32>>,
    /// 1 when every attempt at that step failed.
    pub users_collision: Vec<Vec<u8>>,
    /// Meters, `[user][ap][t]`.
    pub users_distance: Vec<Vec<Vec<f64>>>,
    /// Step labels `1..=n`.
    pub time: Vec<usize>,
}

/// Aggregate figures for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub user: usize,
    pub mean_throughput_bps: f64,
    pub mean_mac_throughput_bps: f64,
    pub handovers: usize,
    pub collisions: usize,
}

impl SimulationResult {
    pub fn user_count(&self) -> usize {
        self.users_handover.len()
    }

    pub fn step_count(&self) -> usize {
        self.time.len()
    }

    pub fn summary(&self) -> Vec<UserSummary> {
        let mean = |values: &[f64]| {
            if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
        };
        (0..self.user_count())
            .map(|user| UserSummary {
                user,
                mean_throughput_bps: mean(&self.users_throughput[user]),
                mean_mac_throughput_bps: mean(&self.users_mac_throughput[user]),
                handovers: self.users_handover[user].windows(2).filter(|w| w[0] != w[1]).count(),
                collisions: self.users_collision[user].iter().filter(|&&c| c != 0).count(),
            })
            .collect()
    }
}

/// Run the full pipeline for every user in `trace` against `aps`.
pub fn simulate<R: Rng + ?Sized>(
    aps: &[AccessPoint],
    trace: &MobilityTrace,
    params: &SimulationParameters,
    rng: &mut R,
) -> Result<SimulationResult> {
    if aps.is_empty() {
        return Err(SimulationError::Configuration("at least one access point is required".to_string()));
    }
    if trace.user_count() == 0 || trace.step_count() == 0 {
        return Err(SimulationError::Configuration("mobility trace is empty".to_string()));
    }
    for ap in aps {
        ap.validate()?;
    }
    params.validate()?;

    let user_count = trace.user_count();
    let step_count = trace.step_count();
    log::info!("Simulating {} users against {} APs over {} steps", user_count, aps.len(), step_count);

    let distances = distance_tensor(aps, trace);
    let user_distances: Vec<Vec<Vec<f64>>> = (0..user_count)
        .map(|user| distances.iter().map(|per_ap| per_ap[user].clone()).collect())
        .collect();

    let mut sinr_per_user: Vec<Vec<SinrSeries>> = Vec::with_capacity(user_count);
    let mut assignments: Vec<HandoverAssignment> = Vec::with_capacity(user_count);
    for (user, trajectory) in trace.users().iter().enumerate() {
        let sinr = compute_sinr(&user_distances[user], aps, Some(&trajectory.positions), &params.channel, rng)?;
        let sinr_db: Vec<&[f64]> = sinr.iter().map(|series| series.db.as_slice()).collect();
        let assignment = handover_decision(&sinr_db, params.handover.hysteresis_db)?;
        log::debug!("User {}: {} handovers", user + 1, assignment.handover_count());
        sinr_per_user.push(sinr);
        assignments.push(assignment);
    }

    let occupancy = ApOccupancy::tally(aps.len(), step_count, &assignments)?;

    let mut outcomes: Vec<Vec<StepOutcome>> = Vec::with_capacity(user_count);
    for (user, assignment) in assignments.iter().enumerate() {
        let serving_sinr: Vec<f64> = assignment
            .as_slice()
            .iter()
            .enumerate()
            .map(|(t, &ap)| sinr_per_user[user][ap].linear[t])
            .collect();
        let steps = compute_throughput(&serving_sinr, &occupancy.along(assignment), &params.mac, &params.mcs_table, rng)?;
        let collisions = steps.iter().filter(|s| s.collision).count();
        if collisions == step_count {
            log::warn!("User {} lost the packet at every step", user + 1);
        } else {
            log::debug!("User {}: {} of {} steps lost", user + 1, collisions, step_count);
        }
        if let Some(last) = steps.last() {
            let entry = params.mcs_table.entry(last.mcs_index);
            log::debug!(
                "User {}: final MCS {} ({}, rate {}, {} Mbps)",
                user + 1,
                last.mcs_index,
                entry.modulation,
                entry.code_rate,
                entry.phy_rate_mbps
            );
        }
        outcomes.push(steps);
    }

    let series = |f: fn(&StepOutcome) -> f64| -> Vec<Vec<f64>> {
        outcomes.iter().map(|steps| steps.iter().map(f).collect()).collect()
    };

    let result = SimulationResult {
        users_sinr: sinr_per_user
            .iter()
            .map(|per_ap| per_ap.iter().map(|s| s.db.clone()).collect())
            .collect(),
        users_handover: assignments.iter().map(HandoverAssignment::one_based).collect(),
        users_throughput: series(|s| s.throughput_bps),
        users_mac_throughput: series(|s| s.mac_throughput_bps),
        users_per: series(|s| s.per),
        users_retries: outcomes.iter().map(|steps| steps.iter().map(|s| s.retries).collect()).collect(),
        users_collision: outcomes
            .iter()
            .map(|steps| steps.iter().map(|s| u8::from(s.collision)).collect())
            .collect(),
        users_distance: user_distances,
        time: (1..=step_count).collect(),
    };
    log::info!("Simulation finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::mobility::UserTrajectory;
    use crate::simulation::types::Point;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_aps() -> Vec<AccessPoint> {
        vec![
            AccessPoint::new(0, 20.0, 5.18e9, 20e6, Point::new(0.0, 0.0)),
            AccessPoint::new(1, 20.0, 5.22e9, 20e6, Point::new(10.0, 0.0)),
        ]
    }

    fn walking_user(steps: usize) -> MobilityTrace {
        let positions = (0..steps).map(|t| Point::new(2.5 * t as f64, 0.5)).collect();
        MobilityTrace::new(vec![UserTrajectory::new(positions)]).unwrap()
    }

    #[test]
    fn two_ap_run_has_expected_shapes() {
        let mut rng = StdRng::seed_from_u64(2024);
        let result = simulate(&two_aps(), &walking_user(5), &SimulationParameters::default(), &mut rng).unwrap();

        assert_eq!(result.time, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.users_sinr.len(), 1);
        assert_eq!(result.users_sinr[0].len(), 2);
        assert!(result.users_sinr[0].iter().all(|row| row.len() == 5));
        assert_eq!(result.users_distance[0][0][0], 0.5);
        assert!(result.users_handover[0].iter().all(|&ap| ap == 1 || ap == 2));
        for t in 0..5 {
            let per = result.users_per[0][t];
            assert!((0.0..=1.0).contains(&per));
            assert!(result.users_retries[0][t] <= 3);
            assert!(result.users_mac_throughput[0][t] <= result.users_throughput[0][t]);
            if result.users_collision[0][t] == 1 {
                assert_eq!(result.users_throughput[0][t], 0.0);
                assert_eq!(result.users_retries[0][t], 3);
            }
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let params = SimulationParameters::default();
        let a = simulate(&two_aps(), &walking_user(8), &params, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = simulate(&two_aps(), &walking_user(8), &params, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_ap_halves_mac_throughput() {
        let ap = vec![AccessPoint::new(0, 30.0, 5.18e9, 20e6, Point::new(0.0, 0.0))];
        let near = UserTrajectory::new(vec![Point::new(1.0, 0.0); 4]);
        let trace = MobilityTrace::new(vec![near.clone(), near]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let result = simulate(&ap, &trace, &SimulationParameters::default(), &mut rng).unwrap();

        for user in 0..2 {
            assert!(result.users_handover[user].iter().all(|&ap| ap == 1));
            for t in 0..4 {
                let phy = result.users_throughput[user][t];
                assert!((result.users_mac_throughput[user][t] - phy / 2.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn occupancy_counts_users_per_ap() {
        let a = handover_decision(&[vec![10.0, 10.0], vec![0.0, 20.0]], 3.0).unwrap();
        let b = handover_decision(&[vec![10.0, 10.0], vec![0.0, 0.0]], 3.0).unwrap();
        let occupancy = ApOccupancy::tally(2, 2, &[a.clone(), b]).unwrap();
        assert_eq!(occupancy.counts(), &[vec![2, 1], vec![0, 1]]);
        assert_eq!(occupancy.along(&a), vec![2, 1]);
        assert!(ApOccupancy::tally(1, 2, &[a]).is_err());
    }

    #[test]
    fn summary_counts_handovers_and_collisions() {
        let result = SimulationResult {
            users_sinr: vec![vec![vec![0.0; 3]]],
            users_handover: vec![vec![1, 2, 2]],
            users_throughput: vec![vec![6.5e6, 0.0, 13e6]],
            users_mac_throughput: vec![vec![6.5e6, 0.0, 13e6]],
            users_per: vec![vec![0.0, 1.0, 0.0]],
            users_retries: vec![vec![0, 3, 0]],
            users_collision: vec![vec![0, 1, 0]],
            users_distance: vec![vec![vec![1.0; 3]]],
            time: vec![1, 2, 3],
        };
        let summary = result.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].handovers, 1);
        assert_eq!(summary[0].collisions, 1);
        assert!((summary[0].mean_throughput_bps - 6.5e6).abs() < 1e-6);
    }

    #[test]
    fn rejects_empty_inputs_and_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = SimulationParameters::default();
        assert!(matches!(
            simulate(&[], &walking_user(3), &params, &mut rng),
            Err(SimulationError::Configuration(_))
        ));

        let bad = SimulationParameters {
            mac: MacParameters {
                max_retries: 0,
                ..MacParameters::default()
            },
            ..SimulationParameters::default()
        };
        assert!(simulate(&two_aps(), &walking_user(3), &bad, &mut rng).is_err());
    }

    #[test]
    fn result_serializes_with_bundle_keys() {
        let mut rng = StdRng::seed_from_u64(5);
        let result = simulate(&two_aps(), &walking_user(2), &SimulationParameters::default(), &mut rng).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "users_sinr",
            "users_handover",
            "users_throughput",
            "users_mac_throughput",
            "users_per",
            "users_retries",
            "users_collision",
            "users_distance",
            "time",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
