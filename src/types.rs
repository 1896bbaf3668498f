//! Shared types and constants for the adaptive testing engine.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Probability clamp: keeps the 2PL response probability inside the open
/// interval (0, 1) so it is always a valid log-likelihood term
pub const PROB_FLOOR: f64 = 1e-12;

/// Additive floor inside log-likelihood terms, guards log(0)
pub const LOG_EPS: f64 = 1e-9;

/// Default lower bound of the ability grid
pub const DEFAULT_GRID_MIN: f64 = -4.0;

/// Default upper bound of the ability grid
pub const DEFAULT_GRID_MAX: f64 = 4.0;

/// Default number of grid points (0.05 theta units over [-4, 4])
pub const DEFAULT_GRID_POINTS: usize = 161;

/// Default maximum number of administered items per session
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Default prior ability estimate used to seed a session
pub const DEFAULT_INITIAL_THETA: f64 = 0.0;

// ==================== Data Structures ====================

/// A calibrated test item under the 2PL model.
///
/// Immutable once loaded into an [`crate::bank::ItemBank`]; the bank is the
/// only owner and never hands out mutable access.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, stable item identifier
    pub id: String,
    /// Discrimination parameter a (must be > 0, enforced at bank load)
    pub a: f64,
    /// Difficulty parameter b (the theta at which P(correct) = 0.5)
    pub b: f64,
}

impl Item {
    pub fn new(id: impl Into<String>, a: f64, b: f64) -> Self {
        Self { id: id.into(), a, b }
    }
}

/// One administered item together with its 0/1 outcome, the unit the
/// ability estimator consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Discrimination of the administered item
    pub a: f64,
    /// Difficulty of the administered item
    pub b: f64,
    /// Scored response: 1 correct, 0 incorrect
    pub response: u8,
}

impl Observation {
    pub fn new(a: f64, b: f64, response: u8) -> Self {
        Self { a, b, response }
    }
}
