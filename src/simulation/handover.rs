//! Hysteresis-based handover between access points.
//!
//! The serving AP is a single register carried forward in time. A candidate
//! replaces it only when its SINR beats the serving AP's SINR by more than the
//! hysteresis margin, which keeps users from flapping between APs of nearly
//! equal quality.

use crate::error::{Result, SimulationError};

/// Index of the first maximum among `values`.
fn first_argmax(values: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in values {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Current-AP register of the handover state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoverState {
    serving: usize,
}

impl HandoverState {
    /// Start on the AP with the highest SINR in `sinr_db` (first one on ties).
    pub fn initial(sinr_db: &[f64]) -> Option<Self> {
        first_argmax(sinr_db.iter().copied().enumerate()).map(|serving| Self { serving })
    }

    /// Zero-based index of the serving AP.
    pub fn serving(&self) -> usize {
        self.serving
    }

    /// Advance one time step and return the (possibly new) serving AP.
    ///
    /// Only APs strictly more than `hysteresis_db` above the serving AP
    /// qualify; the best qualifying AP wins, first occurrence on ties.
    pub fn step(&mut self, sinr_db: &[f64], hysteresis_db: f64) -> usize {
        let threshold = sinr_db[self.serving] + hysteresis_db;
        let candidate = first_argmax(sinr_db.iter().copied().enumerate().filter(|&(_, value)| value > threshold));
        if let Some(next) = candidate {
            self.serving = next;
        }
        self.serving
    }
}

/// Serving AP of one user at every time step. Exactly one valid AP per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverAssignment {
    serving: Vec<usize>,
}

impl HandoverAssignment {
    /// Zero-based serving AP at step `t`.
    pub fn serving_ap(&self, t: usize) -> usize {
        self.serving[t]
    }

    /// Zero-based serving APs for all steps.
    pub fn as_slice(&self) -> &[usize] {
        &self.serving
    }

    /// 1-based AP indices as exposed in the result bundle.
    pub fn one_based(&self) -> Vec<usize> {
        self.serving.iter().map(|ap| ap + 1).collect()
    }

    /// Number of steps where the serving AP changed.
    pub fn handover_count(&self) -> usize {
        self.serving.windows(2).filter(|w| w[0] != w[1]).count()
    }

    pub fn len(&self) -> usize {
        self.serving.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serving.is_empty()
    }
}

/// Run the handover state machine over a `[ap][t]` SINR matrix in dB.
pub fn handover_decision<S: AsRef<[f64]>>(sinr_db: &[S], hysteresis_db: f64) -> Result<HandoverAssignment> {
    let Some(first) = sinr_db.first() else {
        return Err(SimulationError::Configuration("handover needs at least one access point".to_string()));
    };
    let step_count = first.as_ref().len();
    if step_count == 0 {
        return Err(SimulationError::Configuration("handover needs at least one time step".to_string()));
    }
    if let Some((idx, row)) = sinr_db.iter().enumerate().find(|(_, row)| row.as_ref().len() != step_count) {
        return Err(SimulationError::ShapeMismatch(format!(
            "SINR row for AP {} has {} steps, expected {}",
            idx + 1,
            row.as_ref().len(),
            step_count
        )));
    }
    if !hysteresis_db.is_finite() {
        return Err(SimulationError::Configuration("hysteresis must be finite".to_string()));
    }

    let column = |t: usize| -> Vec<f64> { sinr_db.iter().map(|row| row.as_ref()[t]).collect() };

    let mut state = HandoverState::initial(&column(0))
        .ok_or_else(|| SimulationError::Configuration("handover needs at least one access point".to_string()))?;
    let serving = (0..step_count).map(|t| state.step(&column(t), hysteresis_db)).collect();
    Ok(HandoverAssignment { serving })
}
