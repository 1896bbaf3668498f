//! 2PL item response model primitives.
//!
//! Core theory:
//! - Probability of a correct response is a logistic function of ability,
//!   scaled by item discrimination and shifted by item difficulty
//! - Fisher information measures how much one response at a given ability
//!   reduces uncertainty about that ability
//!
//! Mathematical formulas:
//! - Probability: P(θ) = 1 / (1 + exp(-a·(θ - b)))
//! - Information: I(θ) = a² · P(θ) · (1 - P(θ))
//!   - maximized at θ = b, where I = a²/4
//!
//! References:
//! - Birnbaum, A. (1968). Some latent trait models. In Lord & Novick,
//!   Statistical Theories of Mental Test Scores.

use crate::types::PROB_FLOOR;

/// Probability of a correct response under the 2PL model.
///
/// Returns a value strictly inside (0, 1): the raw logistic saturates for
/// large |a·(θ-b)| and is clamped away from exactly 0 and 1 so the result is
/// always a usable log-likelihood term.
pub fn probability_correct(theta: f64, a: f64, b: f64) -> f64 {
    let z = a * (theta - b);
    let p = 1.0 / (1.0 + (-z).exp());
    p.clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
}

/// Fisher information of one item at a given ability: I(θ) = a²·p·(1-p).
pub fn item_information(theta: f64, a: f64, b: f64) -> f64 {
    let p = probability_correct(theta, a, b);
    a * a * p * (1.0 - p)
}

// ==================== Unit Tests ====================
