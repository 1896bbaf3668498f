//! Item selection: maximum information at the current ability estimate.
//!
//! Steady state picks the not-yet-administered item with the highest Fisher
//! information at θ̂. Before anything has been administered the prior carries
//! no information, so the bootstrap rule instead picks the item whose
//! difficulty sits closest to the seeded estimate.
//!
//! Both rules scan in bank load order and replace only on a strict
//! improvement, so exact ties resolve to the first item encountered.
//! Reproducible traces depend on this ordering staying deterministic.

use std::collections::HashSet;

use crate::bank::ItemBank;
use crate::irt::item_information;
use crate::types::Item;

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// No un-administered items remain. The engine's stopping rule must fire
    /// before the pool empties, so hitting this means a logic bug upstream.
    #[error("item pool exhausted: no un-administered items remain")]
    PoolExhausted,
}

/// Pick the un-administered item with maximum information at `theta`.
pub fn select_next<'a>(
    bank: &'a ItemBank,
    administered: &HashSet<String>,
    theta: f64,
) -> Result<&'a Item, SelectorError> {
    let mut best: Option<&Item> = None;
    let mut best_info = f64::NEG_INFINITY;

    for item in bank.items() {
        if administered.contains(&item.id) {
            continue;
        }
        let info = item_information(theta, item.a, item.b);
        if info > best_info {
            best_info = info;
            best = Some(item);
        }
    }

    best.ok_or(SelectorError::PoolExhausted)
}

/// Bootstrap rule: the item whose difficulty is closest to the initial
/// ability estimate, minimizing |b - θ₀|.
pub fn select_first(bank: &ItemBank, initial_theta: f64) -> Result<&Item, SelectorError> {
    let mut best: Option<&Item> = None;
    let mut best_distance = f64::INFINITY;

    for item in bank.items() {
        let distance = (item.b - initial_theta).abs();
        if distance < best_distance {
            best_distance = distance;
            best = Some(item);
        }
    }

    best.ok_or(SelectorError::PoolExhausted)
}

// ==================== Unit Tests ====================
