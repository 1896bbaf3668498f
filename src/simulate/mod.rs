//! Seeded simulation: item banks, latent abilities, response matrices, and
//! batch CAT runs over them.
//!
//! Everything here draws from a single `ChaCha8Rng` stream per population,
//! so the latent "ground truth" abilities and the responses generated from
//! them always come from the same seeded sequence. A
//! [`SimulatedPopulation`] carries the abilities alongside the matrix, so
//! any validation that assumes knowledge of truth reuses the identical
//! draw instead of regenerating it.
//!
//! Generation follows the 2PL model directly:
//! - discrimination a ~ Uniform over the configured range
//! - difficulty b evenly spaced over the configured span
//! - ability θ ~ Normal(0, 1), sampled via Box-Muller
//! - response r ~ Bernoulli(P(correct | θ, a, b))
//!
//! Batch runs drive one independent session per respondent in parallel;
//! sessions share only the read-only item bank.

use std::collections::HashMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bank::{BankError, ItemBank};
use crate::irt::probability_correct;
use crate::session::{CatSession, SessionConfig, SessionError, TraceRecord};
use crate::types::Item;

// ==================== Configuration ====================

/// Parameters for one simulated population.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of items in the simulated bank
    pub n_items: usize,
    /// Number of simulated respondents
    pub n_respondents: usize,
    /// RNG seed; identical configs yield identical populations
    pub seed: u64,
    /// Uniform range for discrimination a (low, high)
    pub discrimination_range: (f64, f64),
    /// Difficulties are evenly spaced over this span (low, high)
    pub difficulty_span: (f64, f64),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_items: 30,
            n_respondents: 500,
            seed: 42,
            discrimination_range: (1.0, 2.5),
            difficulty_span: (-2.0, 2.0),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulateError {
    #[error("simulation requires at least one item and one respondent")]
    EmptyConfig,
    #[error("unknown respondent: {0}")]
    UnknownRespondent(String),
    #[error("respondent {respondent} has no response for item {item}")]
    MissingResponse { respondent: String, item: String },
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

// ==================== Data Structures ====================

/// Pre-simulated 0/1 outcomes keyed by (respondent, item).
#[derive(Clone, Debug)]
pub struct ResponseMatrix {
    respondents: Vec<String>,
    items: Vec<String>,
    rows: Vec<Vec<u8>>,
    respondent_index: HashMap<String, usize>,
    item_index: HashMap<String, usize>,
}

impl ResponseMatrix {
    fn new(respondents: Vec<String>, items: Vec<String>, rows: Vec<Vec<u8>>) -> Self {
        let respondent_index = respondents
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i))
            .collect();
        let item_index = items
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            respondents,
            items,
            rows,
            respondent_index,
            item_index,
        }
    }

    pub fn get(&self, respondent: &str, item: &str) -> Option<u8> {
        let &r = self.respondent_index.get(respondent)?;
        let &c = self.item_index.get(item)?;
        Some(self.rows[r][c])
    }

    /// One respondent's responses in item order.
    pub fn row(&self, respondent: &str) -> Option<&[u8]> {
        self.respondent_index
            .get(respondent)
            .map(|&r| self.rows[r].as_slice())
    }

    pub fn respondents(&self) -> &[String] {
        &self.respondents
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn n_respondents(&self) -> usize {
        self.respondents.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }
}

/// A simulated item bank, its respondents' true abilities, and the
/// responses those abilities generated. Abilities are parallel to
/// `responses.respondents()`.
pub struct SimulatedPopulation {
    pub bank: Arc<ItemBank>,
    pub abilities: Vec<f64>,
    pub responses: ResponseMatrix,
}

// ==================== Simulation ====================

/// Simulate a full population from one seeded RNG stream.
pub fn simulate_population(config: &SimulationConfig) -> Result<SimulatedPopulation, SimulateError> {
    if config.n_items == 0 || config.n_respondents == 0 {
        return Err(SimulateError::EmptyConfig);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let (a_lo, a_hi) = config.discrimination_range;
    let (b_lo, b_hi) = config.difficulty_span;
    let items: Vec<Item> = (0..config.n_items)
        .map(|i| {
            let a = rng.gen_range(a_lo..a_hi);
            let b = linspace_point(b_lo, b_hi, config.n_items, i);
            Item::new(format!("Q{}", i + 1), a, b)
        })
        .collect();
    let bank = Arc::new(ItemBank::new(items)?);

    let abilities: Vec<f64> = (0..config.n_respondents)
        .map(|_| standard_normal(&mut rng))
        .collect();

    let respondents: Vec<String> = (1..=config.n_respondents).map(|i| format!("R{i}")).collect();
    let item_ids: Vec<String> = bank.items().iter().map(|item| item.id.clone()).collect();

    let rows: Vec<Vec<u8>> = abilities
        .iter()
        .map(|&theta| {
            bank.items()
                .iter()
                .map(|item| {
                    let p = probability_correct(theta, item.a, item.b);
                    u8::from(rng.gen::<f64>() < p)
                })
                .collect()
        })
        .collect();

    Ok(SimulatedPopulation {
        bank,
        abilities,
        responses: ResponseMatrix::new(respondents, item_ids, rows),
    })
}

/// i-th of n evenly spaced points over [lo, hi].
fn linspace_point(lo: f64, hi: f64, n: usize, i: usize) -> f64 {
    if n == 1 {
        (lo + hi) / 2.0
    } else {
        lo + (hi - lo) * (i as f64) / ((n - 1) as f64)
    }
}

/// Sample from the standard normal distribution using Box-Muller.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ==================== Reliability ====================

/// Cronbach's alpha over a response matrix: α = k/(k-1) · (1 - Σσ²ᵢ / σ²ₜ)
/// with sample variances (ddof = 1).
///
/// Returns None for degenerate shapes: fewer than two items or respondents,
/// or zero total-score variance.
pub fn cronbach_alpha(matrix: &ResponseMatrix) -> Option<f64> {
    let k = matrix.n_items();
    let n = matrix.n_respondents();
    if k < 2 || n < 2 {
        return None;
    }

    let item_variance_sum: f64 = (0..k)
        .map(|c| sample_variance(matrix.rows.iter().map(|row| f64::from(row[c]))))
        .sum();

    let total_variance = sample_variance(
        matrix
            .rows
            .iter()
            .map(|row| row.iter().map(|&r| f64::from(r)).sum::<f64>()),
    );

    if total_variance <= 0.0 {
        return None;
    }

    let k = k as f64;
    Some((k / (k - 1.0)) * (1.0 - item_variance_sum / total_variance))
}

fn sample_variance(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

// ==================== Batch CAT Runs ====================

/// Drive one full adaptive session for a respondent from pre-simulated
/// responses and return its trace.
pub fn run_cat(
    bank: &Arc<ItemBank>,
    matrix: &ResponseMatrix,
    respondent: &str,
    config: SessionConfig,
) -> Result<Vec<TraceRecord>, SimulateError> {
    if matrix.row(respondent).is_none() {
        return Err(SimulateError::UnknownRespondent(respondent.to_string()));
    }

    let mut session = CatSession::new(Arc::clone(bank), config)?;
    loop {
        let item_id = match session.current_item() {
            Some(item) => item.id.clone(),
            None => break,
        };
        let response = matrix.get(respondent, &item_id).ok_or_else(|| {
            SimulateError::MissingResponse {
                respondent: respondent.to_string(),
                item: item_id.clone(),
            }
        })?;
        session.submit(response)?;
    }

    Ok(session.trace().to_vec())
}

/// Run the CAT for every respondent in parallel. Sessions are mutually
/// independent and share only the read-only bank.
pub fn run_cat_batch(
    bank: &Arc<ItemBank>,
    matrix: &ResponseMatrix,
    config: &SessionConfig,
) -> Result<Vec<(String, Vec<TraceRecord>)>, SimulateError> {
    matrix
        .respondents()
        .par_iter()
        .map(|respondent| {
            run_cat(bank, matrix, respondent, config.clone())
                .map(|trace| (respondent.clone(), trace))
        })
        .collect()
}

// ==================== Unit Tests ====================
