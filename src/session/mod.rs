//! Adaptive test session: the engine's state machine.
//!
//! A session owns everything about one test-taker's run: the ordered
//! administered items, the parallel 0/1 responses, the ability and
//! standard-error histories, the pending item, and the per-step trace.
//! State lives in an explicit owned object handed to the caller; there is
//! no ambient shared storage. Many sessions may run concurrently as long as
//! each is driven from one place at a time; they share only the read-only
//! item bank behind an `Arc`.
//!
//! Phases: `AwaitingResponse` (an item is pending an answer) and `Complete`
//! (the stopping rule fired). The recording step between them is transient
//! inside [`CatSession::submit`]: validation happens before any mutation,
//! so a failed submit leaves the session exactly as it was.
//!
//! Stopping rule: a session terminates when the administered count reaches
//! `max_items`, which is validated at construction to never exceed the item
//! pool. The estimator reruns over the full history at every step; with
//! banks of tens of items that costs nothing and keeps the estimate
//! insensitive to update order.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bank::ItemBank;
use crate::estimator::{mle_theta, EstimatorError, GridConfig};
use crate::irt::item_information;
use crate::selector::{select_first, select_next, SelectorError};
use crate::types::{Item, Observation, DEFAULT_INITIAL_THETA, DEFAULT_MAX_ITEMS};

// ==================== Configuration ====================

/// Per-session configuration, fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stop after this many administered items (1..=bank size)
    pub max_items: usize,
    /// Prior ability estimate seeding the session
    pub initial_theta: f64,
    /// Theta grid used for every re-estimation in this session
    pub grid: GridConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            initial_theta: DEFAULT_INITIAL_THETA,
            grid: GridConfig::default(),
        }
    }
}

// ==================== Data Structures ====================

/// Session phase. The transient recording step is internal to `submit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// An item has been selected and is waiting for an answer
    AwaitingResponse,
    /// Stopping rule satisfied; no further item will be selected
    Complete,
}

/// One administered-item event. Created once per step, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// 1-based step number
    pub step: usize,
    /// Ability estimate before this item was selected
    pub theta_before: f64,
    /// Identifier of the administered item
    pub item_id: String,
    /// Scored response: 1 correct, 0 incorrect
    pub response: u8,
    /// Item discrimination
    pub a: f64,
    /// Item difficulty
    pub b: f64,
    /// Item information at `theta_before`, the selection-time value
    pub information: f64,
    /// Standard error after integrating this response; None when undefined
    pub standard_error_after: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("max_items must be positive")]
    ZeroMaxItems,
    #[error("max_items ({max_items}) exceeds item bank size ({pool_size})")]
    MaxItemsExceedsPool { max_items: usize, pool_size: usize },
    #[error("invalid response {0}: expected 0 or 1")]
    InvalidResponse(u8),
    #[error("session is complete; no further responses are accepted")]
    Complete,
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    /// The stopping rule should make this unreachable; it signals a logic
    /// bug, not a user-facing condition.
    #[error("engine invariant violated: {0}")]
    Internal(#[from] SelectorError),
}

// ==================== Session ====================

/// A single test-taker's adaptive session over a shared item bank.
pub struct CatSession {
    bank: Arc<ItemBank>,
    config: SessionConfig,
    asked: Vec<String>,
    asked_set: HashSet<String>,
    responses: Vec<u8>,
    /// Ability history; entry 0 is the prior, then one entry per step
    theta_history: Vec<f64>,
    /// Standard-error history, parallel to `theta_history`; entry 0 is None
    se_history: Vec<Option<f64>>,
    current: Option<Item>,
    trace: Vec<TraceRecord>,
}

impl CatSession {
    /// Create a session: validates the configuration, seeds the ability
    /// history with the prior, and selects the first item by the
    /// closest-difficulty bootstrap rule.
    pub fn new(bank: Arc<ItemBank>, config: SessionConfig) -> Result<Self, SessionError> {
        if config.max_items == 0 {
            return Err(SessionError::ZeroMaxItems);
        }
        if config.max_items > bank.len() {
            return Err(SessionError::MaxItemsExceedsPool {
                max_items: config.max_items,
                pool_size: bank.len(),
            });
        }
        config.grid.validate()?;

        let mut session = Self {
            bank,
            config,
            asked: Vec::new(),
            asked_set: HashSet::new(),
            responses: Vec::new(),
            theta_history: Vec::new(),
            se_history: Vec::new(),
            current: None,
            trace: Vec::new(),
        };
        session.reset();
        Ok(session)
    }

    /// Record a 0/1 response for the pending item and advance.
    ///
    /// The transition is atomic: phase and response are validated first and
    /// the new estimate is computed before any state changes, so an `Err`
    /// leaves the session untouched. On success the item joins the
    /// administered list, theta and SE are re-estimated over the whole
    /// history, and either the next item is selected or the session
    /// completes at exactly `max_items`.
    pub fn submit(&mut self, response: u8) -> Result<&TraceRecord, SessionError> {
        let item = self.current.clone().ok_or(SessionError::Complete)?;
        if response > 1 {
            return Err(SessionError::InvalidResponse(response));
        }

        let theta_before = self.theta();
        let information = item_information(theta_before, item.a, item.b);

        // Full re-estimation over the entire administered history
        let mut observations = self.observations();
        observations.push(Observation::new(item.a, item.b, response));
        let estimate = mle_theta(&observations, &self.config.grid)?;

        // Commit
        self.asked.push(item.id.clone());
        self.asked_set.insert(item.id.clone());
        self.responses.push(response);
        self.theta_history.push(estimate.theta);
        self.se_history.push(estimate.standard_error);
        self.trace.push(TraceRecord {
            step: self.asked.len(),
            theta_before,
            item_id: item.id,
            response,
            a: item.a,
            b: item.b,
            information,
            standard_error_after: estimate.standard_error,
        });

        if self.asked.len() < self.config.max_items {
            self.current = Some(select_next(&self.bank, &self.asked_set, estimate.theta)?.clone());
        } else {
            self.current = None;
        }

        Ok(&self.trace[self.trace.len() - 1])
    }

    /// Discard all session state and reinitialize as at construction.
    ///
    /// Idempotent, and never touches the item bank.
    pub fn reset(&mut self) {
        self.asked.clear();
        self.asked_set.clear();
        self.responses.clear();
        self.theta_history.clear();
        self.theta_history.push(self.config.initial_theta);
        self.se_history.clear();
        self.se_history.push(None);
        self.trace.clear();
        // The bank was verified non-empty at construction
        self.current = select_first(&self.bank, self.config.initial_theta)
            .ok()
            .cloned();
    }

    // ==================== Accessors ====================

    pub fn phase(&self) -> SessionPhase {
        if self.current.is_some() {
            SessionPhase::AwaitingResponse
        } else {
            SessionPhase::Complete
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == SessionPhase::Complete
    }

    /// The item pending an answer, if the session is still running.
    pub fn current_item(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    /// Latest ability estimate (the prior until the first response).
    pub fn theta(&self) -> f64 {
        self.theta_history
            .last()
            .copied()
            .unwrap_or(self.config.initial_theta)
    }

    /// Latest standard error; None until information has been gathered.
    pub fn standard_error(&self) -> Option<f64> {
        self.se_history.last().copied().flatten()
    }

    /// Administered item identifiers, in order. Never contains duplicates.
    pub fn administered(&self) -> &[String] {
        &self.asked
    }

    /// Scored responses, parallel to [`CatSession::administered`].
    pub fn responses(&self) -> &[u8] {
        &self.responses
    }

    /// Ability history: the prior followed by one estimate per step.
    pub fn theta_history(&self) -> &[f64] {
        &self.theta_history
    }

    /// Standard-error history, parallel to the ability history.
    pub fn se_history(&self) -> &[Option<f64>] {
        &self.se_history
    }

    pub fn trace(&self) -> &[TraceRecord] {
        &self.trace
    }

    pub fn steps_taken(&self) -> usize {
        self.asked.len()
    }

    /// Count of correct responses so far.
    pub fn score(&self) -> u32 {
        self.responses.iter().map(|&r| u32::from(r)).sum()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ==================== Trace Export ====================

    /// Export the trace as delimited text with the historical column order
    /// `Step,Theta_Est,ItemID,Response,a,b,Info,SE` (SE empty when
    /// undefined). Kept stable so exported traces stay comparable.
    pub fn trace_to_delimited(&self) -> String {
        let mut out = String::from("Step,Theta_Est,ItemID,Response,a,b,Info,SE\n");
        for record in &self.trace {
            let se = record
                .standard_error_after
                .map(|se| format!("{se:.6}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{},{:.6},{},{},{:.6},{:.6},{:.6},{}",
                record.step,
                record.theta_before,
                record.item_id,
                record.response,
                record.a,
                record.b,
                record.information,
                se
            );
        }
        out
    }

    /// Export the trace as JSON.
    pub fn trace_to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.trace)
    }

    /// Administered history as estimator observations.
    fn observations(&self) -> Vec<Observation> {
        self.trace
            .iter()
            .map(|r| Observation::new(r.a, r.b, r.response))
            .collect()
    }
}

// ==================== Unit Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn three_item_bank() -> Arc<ItemBank> {
        Arc::new(
            ItemBank::new(vec![
                Item::new("Q1", 1.5, -1.0),
                Item::new("Q2", 2.0, 0.0),
                Item::new("Q3", 1.0, 1.0),
            ])
            .unwrap(),
        )
    }

    fn three_item_session() -> CatSession {
        CatSession::new(
            three_item_bank(),
            SessionConfig {
                max_items: 3,
                ..SessionConfig::default()
            },
        )
        .unwrap()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_initial_state() {
        let session = three_item_session();

        assert_eq!(session.phase(), SessionPhase::AwaitingResponse);
        assert_eq!(session.steps_taken(), 0);
        assert!((session.theta() - 0.0).abs() < EPSILON);
        assert!(session.standard_error().is_none());
        assert_eq!(session.theta_history(), &[0.0]);
        assert_eq!(session.se_history(), &[None]);
    }

    #[test]
    fn test_first_item_is_closest_difficulty() {
        // With theta0 = 0 the first item must be Q2 (b = 0.0)
        let session = three_item_session();
        assert_eq!(session.current_item().unwrap().id, "Q2");
    }

    #[test]
    fn test_zero_max_items_rejected() {
        let result = CatSession::new(
            three_item_bank(),
            SessionConfig {
                max_items: 0,
                ..SessionConfig::default()
            },
        );
        assert!(matches!(result, Err(SessionError::ZeroMaxItems)));
    }

    #[test]
    fn test_max_items_beyond_pool_rejected() {
        let result = CatSession::new(
            three_item_bank(),
            SessionConfig {
                max_items: 4,
                ..SessionConfig::default()
            },
        );
        assert!(matches!(
            result,
            Err(SessionError::MaxItemsExceedsPool {
                max_items: 4,
                pool_size: 3
            })
        ));
    }

    #[test]
    fn test_invalid_grid_rejected_at_construction() {
        let result = CatSession::new(
            three_item_bank(),
            SessionConfig {
                max_items: 2,
                initial_theta: 0.0,
                grid: GridConfig {
                    min: 1.0,
                    max: -1.0,
                    points: 61,
                },
            },
        );
        assert!(matches!(result, Err(SessionError::Estimator(_))));
    }

    // ==================== Transition Tests ====================

    #[test]
    fn test_correct_answer_raises_theta() {
        let mut session = three_item_session();
        let record = session.submit(1).unwrap();

        assert_eq!(record.item_id, "Q2");
        assert_eq!(record.step, 1);
        assert!((record.theta_before - 0.0).abs() < EPSILON);
        assert!(session.theta() > 0.0);
    }

    #[test]
    fn test_incorrect_answer_lowers_theta() {
        let mut session = three_item_session();
        session.submit(0).unwrap();
        assert!(session.theta() < 0.0);
    }

    #[test]
    fn test_full_run_completes_exactly_at_max_items() {
        let mut session = three_item_session();

        for step in 1..=3 {
            assert_eq!(session.phase(), SessionPhase::AwaitingResponse);
            session.submit(1).unwrap();
            assert_eq!(session.steps_taken(), step);
        }

        // Complete at exactly max_items: no 4th selection
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.current_item().is_none());
        assert!(matches!(session.submit(1), Err(SessionError::Complete)));
        assert_eq!(session.steps_taken(), 3);
    }

    #[test]
    fn test_no_duplicate_administration() {
        let mut session = three_item_session();
        session.submit(1).unwrap();
        session.submit(0).unwrap();
        session.submit(1).unwrap();

        let mut seen = HashSet::new();
        for id in session.administered() {
            assert!(seen.insert(id.clone()), "item {id} administered twice");
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_invalid_response_leaves_state_untouched() {
        let mut session = three_item_session();
        session.submit(1).unwrap();

        let theta = session.theta();
        let steps = session.steps_taken();
        let pending = session.current_item().unwrap().id.clone();

        assert!(matches!(
            session.submit(2),
            Err(SessionError::InvalidResponse(2))
        ));

        assert_eq!(session.steps_taken(), steps);
        assert!((session.theta() - theta).abs() < EPSILON);
        assert_eq!(session.current_item().unwrap().id, pending);
        assert_eq!(session.phase(), SessionPhase::AwaitingResponse);
    }

    #[test]
    fn test_all_incorrect_theta_non_increasing() {
        let mut session = three_item_session();
        while !session.is_complete() {
            session.submit(0).unwrap();
        }

        let history = session.theta_history();
        for window in history.windows(2) {
            assert!(
                window[1] <= window[0] + EPSILON,
                "theta rose on an incorrect answer: {history:?}"
            );
        }
    }

    #[test]
    fn test_histories_stay_parallel() {
        let mut session = three_item_session();
        session.submit(1).unwrap();
        session.submit(0).unwrap();

        assert_eq!(session.theta_history().len(), session.steps_taken() + 1);
        assert_eq!(session.se_history().len(), session.steps_taken() + 1);
        assert_eq!(session.responses().len(), session.steps_taken());
        assert_eq!(session.trace().len(), session.steps_taken());
    }

    #[test]
    fn test_standard_error_defined_after_first_item() {
        let mut session = three_item_session();
        assert!(session.standard_error().is_none());

        session.submit(1).unwrap();
        let se = session.standard_error().unwrap();
        assert!(se > 0.0 && se.is_finite());
    }

    #[test]
    fn test_score_counts_correct_responses() {
        let mut session = three_item_session();
        session.submit(1).unwrap();
        session.submit(0).unwrap();
        session.submit(1).unwrap();
        assert_eq!(session.score(), 2);
    }

    // ==================== Reset Tests ====================

    #[test]
    fn test_reset_restores_initial_state() {
        let mut session = three_item_session();
        session.submit(1).unwrap();
        session.submit(0).unwrap();

        session.reset();

        assert_eq!(session.steps_taken(), 0);
        assert_eq!(session.phase(), SessionPhase::AwaitingResponse);
        assert_eq!(session.theta_history(), &[0.0]);
        assert_eq!(session.se_history(), &[None]);
        assert_eq!(session.current_item().unwrap().id, "Q2");
        assert!(session.trace().is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut session = three_item_session();
        session.submit(1).unwrap();

        session.reset();
        let theta_once = session.theta_history().to_vec();
        let item_once = session.current_item().unwrap().id.clone();

        session.reset();

        assert_eq!(session.theta_history(), theta_once.as_slice());
        assert_eq!(session.current_item().unwrap().id, item_once);
    }

    #[test]
    fn test_reset_after_completion_allows_new_run() {
        let mut session = three_item_session();
        while !session.is_complete() {
            session.submit(1).unwrap();
        }

        session.reset();

        assert_eq!(session.phase(), SessionPhase::AwaitingResponse);
        session.submit(0).unwrap();
        assert_eq!(session.steps_taken(), 1);
    }

    // ==================== Trace Export Tests ====================

    #[test]
    fn test_trace_records_selection_time_values() {
        let mut session = three_item_session();
        session.submit(1).unwrap();
        session.submit(1).unwrap();

        let trace = session.trace();
        assert_eq!(trace[0].step, 1);
        assert_eq!(trace[1].step, 2);
        // theta_before of step 2 is the estimate after step 1
        assert!((trace[1].theta_before - session.theta_history()[1]).abs() < EPSILON);
        // Q2 at theta 0: information = a²/4 = 1.0
        assert!((trace[0].information - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_delimited_export_layout() {
        let mut session = three_item_session();
        session.submit(1).unwrap();

        let text = session.trace_to_delimited();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Step,Theta_Est,ItemID,Response,a,b,Info,SE"
        );

        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], "1");
        assert_eq!(row[2], "Q2");
        assert_eq!(row[3], "1");
        assert!(!row[7].is_empty());
    }

    #[test]
    fn test_json_export_roundtrip() {
        let mut session = three_item_session();
        session.submit(0).unwrap();

        let json = session.trace_to_json().unwrap();
        let parsed: Vec<TraceRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_slice(), session.trace());
    }

    // ==================== Concrete Scenario ====================

    #[test]
    fn test_reference_three_item_scenario() {
        // Bank {Q1: a=1.5,b=-1; Q2: a=2,b=0; Q3: a=1,b=1}, max_items = 3.
        // First item must be Q2; a correct answer must raise theta; after
        // three items the session is complete with no further selection.
        let mut session = three_item_session();

        assert_eq!(session.current_item().unwrap().id, "Q2");

        session.submit(1).unwrap();
        assert!(session.theta() > 0.0);

        session.submit(1).unwrap();
        session.submit(0).unwrap();

        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.current_item().is_none());
        assert_eq!(session.administered().len(), 3);
    }
}
