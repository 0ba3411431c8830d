//! User mobility traces.
//!
//! The engine treats trajectories as read-only input. They either come from
//! an external generator (loaded with [`MobilityTrace::from_axes`]) or from a
//! [`MobilityModel`] such as [`LinearMobility`].

use rand::Rng;

use super::types::Point;
use crate::error::{Result, SimulationError};

/// Positions of one user, one per discrete time step.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTrajectory {
    pub positions: Vec<Point>,
}

impl UserTrajectory {
    pub fn new(positions: Vec<Point>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Trajectories of all users. Every user has the same, non-zero step count.
#[derive(Debug, Clone, PartialEq)]
pub struct MobilityTrace {
    users: Vec<UserTrajectory>,
    step_count: usize,
}

impl MobilityTrace {
    pub fn new(users: Vec<UserTrajectory>) -> Result<Self> {
        let Some(first) = users.first() else {
            return Err(SimulationError::Configuration("mobility trace contains no users".to_string()));
        };
        let step_count = first.len();
        if step_count == 0 {
            return Err(SimulationError::Configuration("mobility trace contains no time steps".to_string()));
        }
        if let Some((idx, user)) = users.iter().enumerate().find(|(_, u)| u.len() != step_count) {
            return Err(SimulationError::ShapeMismatch(format!(
                "user {} has {} steps, expected {}",
                idx,
                user.len(),
                step_count
            )));
        }
        Ok(Self { users, step_count })
    }

    /// Build a trace from a 3-axis array of shape `(users, 2, steps)`.
    pub fn from_axes(data: &[Vec<Vec<f64>>]) -> Result<Self> {
        let users = data
            .iter()
            .enumerate()
            .map(|(idx, axes)| {
                let [xs, ys] = axes.as_slice() else {
                    return Err(SimulationError::ShapeMismatch(format!(
                        "user {} has {} coordinate axes, expected 2",
                        idx,
                        axes.len()
                    )));
                };
                if xs.len() != ys.len() {
                    return Err(SimulationError::ShapeMismatch(format!(
                        "user {} has {} x samples but {} y samples",
                        idx,
                        xs.len(),
                        ys.len()
                    )));
                }
                Ok(UserTrajectory::new(xs.iter().zip(ys).map(|(&x, &y)| Point::new(x, y)).collect()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(users)
    }

    /// Fail with `ShapeMismatch` unless the trace has exactly the declared
    /// number of users and steps.
    pub fn expect_shape(&self, user_count: usize, step_count: usize) -> Result<()> {
        if self.users.len() != user_count || self.step_count != step_count {
            return Err(SimulationError::ShapeMismatch(format!(
                "trace shape ({}, 2, {}) does not match declared ({}, 2, {})",
                self.users.len(),
                self.step_count,
                user_count,
                step_count
            )));
        }
        Ok(())
    }

    pub fn users(&self) -> &[UserTrajectory] {
        &self.users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }
}

/// Source of user trajectories.
pub trait MobilityModel {
    fn generate<R: Rng + ?Sized>(&self, user_count: usize, step_count: usize, rng: &mut R) -> Result<MobilityTrace>;
}

/// Constant-velocity straight-line motion from a shared origin, each user
/// along an independent uniformly random heading.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMobility {
    pub origin: Point,
    /// Speed in m/s.
    pub velocity: f64,
    /// Seconds per step.
    pub time_step: f64,
}

impl MobilityModel for LinearMobility {
    fn generate<R: Rng + ?Sized>(&self, user_count: usize, step_count: usize, rng: &mut R) -> Result<MobilityTrace> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(SimulationError::Configuration(format!("time step {} must be positive", self.time_step)));
        }
        if !self.velocity.is_finite() {
            return Err(SimulationError::Configuration("velocity must be finite".to_string()));
        }
        let users = (0..user_count)
            .map(|_| {
                let heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                let (dy, dx) = heading.sin_cos();
                let positions = (0..step_count)
                    .map(|step| {
                        let travelled = self.velocity * step as f64 * self.time_step;
                        Point::new(self.origin.x + travelled * dx, self.origin.y + travelled * dy)
                    })
                    .collect();
                UserTrajectory::new(positions)
            })
            .collect();
        MobilityTrace::new(users)
    }
}
