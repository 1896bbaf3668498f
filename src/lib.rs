//! Computerized adaptive testing (CAT) engine under the 2PL item response
//! model.
//!
//! This crate provides the full adaptive loop:
//! - 2PL response probability and Fisher information primitives
//! - Grid-search maximum-likelihood ability estimation with standard errors
//! - Maximum-information item selection with a closest-difficulty bootstrap
//! - A session state machine with a fixed-length stopping rule and a
//!   per-step trace exportable as delimited text or JSON
//! - Seeded simulation of item banks, respondent abilities and response
//!   matrices, with parallel batch runs and a Cronbach's alpha check
//!
//! ## Module structure
//!
//! - [`irt`] - 2PL probability and information functions
//! - [`estimator`] - grid-search MLE and standard errors
//! - [`bank`] - validated, read-only item bank
//! - [`selector`] - maximum-information item selection
//! - [`session`] - the adaptive session state machine and trace
//! - [`simulate`] - seeded population simulation and batch CAT runs
//! - [`types`] - shared types and constants
//!
//! ## Usage example
//!
//! ```rust
//! use std::sync::Arc;
//! use catsim::{CatSession, Item, ItemBank, SessionConfig};
//!
//! let bank = Arc::new(ItemBank::new(vec![
//!     Item::new("Q1", 1.5, -1.0),
//!     Item::new("Q2", 2.0, 0.0),
//!     Item::new("Q3", 1.0, 1.0),
//! ])?);
//!
//! let mut session = CatSession::new(bank, SessionConfig {
//!     max_items: 3,
//!     ..SessionConfig::default()
//! })?;
//!
//! while !session.is_complete() {
//!     // A real caller scores the pending item; here everything is correct
//!     session.submit(1)?;
//! }
//! println!("{}", session.trace_to_delimited());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]

pub mod bank;
pub mod estimator;
pub mod irt;
pub mod selector;
pub mod session;
pub mod simulate;
pub mod types;

pub use bank::{BankError, ItemBank};
pub use estimator::{mle_theta, standard_error, AbilityEstimate, EstimatorError, GridConfig};
pub use irt::{item_information, probability_correct};
pub use selector::{select_first, select_next, SelectorError};
pub use session::{CatSession, SessionConfig, SessionError, SessionPhase, TraceRecord};
pub use simulate::{
    cronbach_alpha, run_cat, run_cat_batch, simulate_population, ResponseMatrix, SimulateError,
    SimulatedPopulation, SimulationConfig,
};
pub use types::{Item, Observation};
