//! Per-attempt commit state machine
//!
//! ```text
//! Received → ShapeChecked → SyntaxChecked → IsolationChecked → Merged → Persisted → Committed
//!     └──────────┴──────────────┴─────────────────┴────────────┴──→ Aborted
//! ```
//!
//! `Committed` and `Aborted` are terminal. Once `Persisted`, an attempt can
//! only commit: the durable write is the point of no return.

use crate::error::GateError;
use serde::Serialize;

/// Commit states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// Record accepted for processing
    Received,
    /// Payload normalized into a file map
    ShapeChecked,
    /// Every file passed the lexical checks
    SyntaxChecked,
    /// Every path passed isolation
    IsolationChecked,
    /// Final file map computed (full replace or delta merge)
    Merged,
    /// Durable store accepted the write
    Persisted,
    /// Live view updated
    Committed,
    /// Attempt ended without mutating anything
    Aborted,
}

impl CommitState {
    /// Terminal states accept no further transition
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CommitState::Committed | CommitState::Aborted)
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: CommitState) -> Vec<CommitState> {
    use CommitState::{
        Aborted, Committed, IsolationChecked, Merged, Persisted, Received, ShapeChecked,
        SyntaxChecked,
    };
    match from {
        Received => vec![ShapeChecked, Aborted],
        ShapeChecked => vec![SyntaxChecked, Aborted],
        SyntaxChecked => vec![IsolationChecked, Aborted],
        IsolationChecked => vec![Merged, Aborted],
        Merged => vec![Persisted, Aborted],
        Persisted => vec![Committed],
        Committed | Aborted => vec![],
    }
}

/// Validate one transition
///
/// # Errors
/// Returns [`GateError::IllegalTransition`] for an edge not in
/// [`allowed_transitions`].
pub fn validate_transition(from: CommitState, to: CommitState) -> Result<(), GateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(GateError::IllegalTransition { from, to })
    }
}

/// Ordered audit trail of the states one attempt visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommitTrace(Vec<CommitState>);

impl CommitTrace {
    /// Start a trace at [`CommitState::Received`]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(vec![CommitState::Received])
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn current(&self) -> CommitState {
        self.0.last().copied().unwrap_or(CommitState::Received)
    }

    /// Every visited state, in order
    #[inline]
    #[must_use]
    pub fn states(&self) -> &[CommitState] {
        &self.0
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns [`GateError::IllegalTransition`] and leaves the trace unchanged.
    pub fn advance(&mut self, to: CommitState) -> Result<(), GateError> {
        validate_transition(self.current(), to)?;
        self.0.push(to);
        Ok(())
    }
}

impl Default for CommitTrace {
    fn default() -> Self {
        Self::new()
    }
}
