//! Ability estimation via grid-search maximum likelihood.
//!
//! The estimator walks a fixed, finite theta grid and keeps the grid point
//! with the highest log-likelihood over the full administered history:
//!
//! - Log-likelihood: LL(θ) = Σ r·ln(p+ε) + (1-r)·ln(1-p+ε)
//!   where p = P(correct | θ, a, b) under the 2PL model
//! - Standard error: SE = 1 / sqrt(Σ I(θ̂, a, b)), undefined when the summed
//!   information is not positive
//!
//! Grid resolution bounds precision, but the search is deterministic and
//! reproducible, which is the design goal: identical inputs always yield
//! identical estimates, and exact-likelihood ties resolve to the lowest
//! theta on the grid (the ascending scan only replaces on strictly greater
//! log-likelihood).
//!
//! The estimator always recomputes from the entire history rather than
//! updating incrementally. Banks are tens of items, so the O(grid × items)
//! full pass stays trivially cheap.

use serde::{Deserialize, Serialize};

use crate::irt::{item_information, probability_correct};
use crate::types::{
    Observation, DEFAULT_GRID_MAX, DEFAULT_GRID_MIN, DEFAULT_GRID_POINTS, LOG_EPS,
};

// ==================== Data Structures ====================

/// Fixed theta grid over which the likelihood is maximized.
///
/// The default covers [-4, 4] in 0.05 steps (161 points). Bounds and
/// resolution are tunables, not laws, but they are part of a session's
/// reproducibility surface and travel with its configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lower bound of the ability grid
    pub min: f64,
    /// Upper bound of the ability grid
    pub max: f64,
    /// Number of evenly spaced grid points (at least 2)
    pub points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_GRID_MIN,
            max: DEFAULT_GRID_MAX,
            points: DEFAULT_GRID_POINTS,
        }
    }
}

impl GridConfig {
    /// Theta value of the i-th grid point.
    fn theta_at(&self, i: usize) -> f64 {
        self.min + (self.max - self.min) * (i as f64) / ((self.points - 1) as f64)
    }

    /// Reject unusable grids (fewer than 2 points, non-finite or inverted
    /// bounds). Also enforced at session construction.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.points < 2 || !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max
        {
            return Err(EstimatorError::InvalidGrid {
                min: self.min,
                max: self.max,
                points: self.points,
            });
        }
        Ok(())
    }
}

/// Maximum-likelihood ability estimate with its precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityEstimate {
    /// Point estimate θ̂ (always a grid point)
    pub theta: f64,
    /// 1/sqrt(total information) at θ̂; None when no information was gathered
    pub standard_error: Option<f64>,
    /// Log-likelihood attained at θ̂
    pub log_likelihood: f64,
}

/// Caller contract violations; normal inputs never fail.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("ability estimation requires at least one administered item")]
    EmptyObservations,
    #[error("invalid theta grid: min={min}, max={max}, points={points}")]
    InvalidGrid { min: f64, max: f64, points: usize },
}

// ==================== Estimation ====================

/// Grid-search maximum-likelihood estimate of ability.
///
/// Requires a non-empty observation list; with zero administered items the
/// caller must seed the initial estimate itself rather than call this.
pub fn mle_theta(
    observations: &[Observation],
    grid: &GridConfig,
) -> Result<AbilityEstimate, EstimatorError> {
    if observations.is_empty() {
        return Err(EstimatorError::EmptyObservations);
    }
    grid.validate()?;

    let mut best_theta = grid.min;
    let mut best_ll = f64::NEG_INFINITY;

    for i in 0..grid.points {
        let theta = grid.theta_at(i);
        let ll = log_likelihood(theta, observations);
        // Strictly greater: ties keep the lowest theta encountered
        if ll > best_ll {
            best_ll = ll;
            best_theta = theta;
        }
    }

    Ok(AbilityEstimate {
        theta: best_theta,
        standard_error: standard_error(best_theta, observations),
        log_likelihood: best_ll,
    })
}

/// Log-likelihood of the administered history at a fixed theta.
fn log_likelihood(theta: f64, observations: &[Observation]) -> f64 {
    observations
        .iter()
        .map(|obs| {
            let p = probability_correct(theta, obs.a, obs.b);
            let r = f64::from(obs.response);
            r * (p + LOG_EPS).ln() + (1.0 - r) * (1.0 - p + LOG_EPS).ln()
        })
        .sum()
}

/// Standard error of a theta estimate: 1/sqrt of the summed item information.
///
/// Returns None when total information is not positive (no items yet, or
/// every item carries zero information at this theta). That degeneracy is an
/// explicit "undefined", not an error or a sentinel.
pub fn standard_error(theta: f64, observations: &[Observation]) -> Option<f64> {
    let total: f64 = observations
        .iter()
        .map(|obs| item_information(theta, obs.a, obs.b))
        .sum();

    if total > 0.0 {
        Some(1.0 / total.sqrt())
    } else {
        None
    }
}

// ==================== Unit Tests ====================
