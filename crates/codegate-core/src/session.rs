//! Per-project session context
//!
//! Holds the state the gate must not keep globally: which attempt is active,
//! which attempt ids were already processed, and the one outstanding retry.
//! Passed to the gate by `&mut`, so separate projects never share state.

use crate::error::SessionError;
use crate::record::{AttemptId, CompletionRecord, ProjectId};
use crate::config::DEFAULT_PROCESSED_HISTORY;
use indexmap::IndexSet;
use serde::Serialize;

/// The one outstanding failed prompt of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetryState {
    /// Nothing to replay
    #[default]
    Idle,
    /// Last attempt failed retryably; its prompt can be replayed
    PendingRetry {
        /// Failed attempt
        attempt_id: AttemptId,
        /// Prompt to replay
        prompt: String,
        /// Why it failed
        reason_code: String,
    },
}

/// Session state for one project
#[derive(Debug, Clone)]
pub struct ProjectSession {
    project_id: ProjectId,
    active_attempt: Option<AttemptId>,
    processed: IndexSet<AttemptId>,
    history: usize,
    retry: RetryState,
    has_durable_snapshot: bool,
}

impl ProjectSession {
    /// Create a session with the default processed-id history
    #[inline]
    #[must_use]
    pub fn new(project_id: impl Into<ProjectId>) -> Self {
        Self::with_history(project_id, DEFAULT_PROCESSED_HISTORY)
    }

    /// Create a session remembering up to `history` processed ids
    #[must_use]
    pub fn with_history(project_id: impl Into<ProjectId>, history: usize) -> Self {
        Self {
            project_id: project_id.into(),
            active_attempt: None,
            processed: IndexSet::new(),
            history: history.max(1),
            retry: RetryState::Idle,
            has_durable_snapshot: false,
        }
    }

    /// Project this session controls
    #[inline]
    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Currently active attempt
    #[inline]
    #[must_use]
    pub fn active_attempt(&self) -> Option<&AttemptId> {
        self.active_attempt.as_ref()
    }

    /// Outstanding retry
    #[inline]
    #[must_use]
    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// Whether a durable snapshot backs the live view
    #[inline]
    #[must_use]
    pub fn has_durable_snapshot(&self) -> bool {
        self.has_durable_snapshot
    }

    /// Start a new attempt
    ///
    /// Clears any pending retry.
    ///
    /// # Errors
    /// Returns [`SessionError::AttemptInFlight`] while another attempt is
    /// outstanding.
    pub fn begin_attempt(&mut self, attempt_id: impl Into<AttemptId>) -> Result<(), SessionError> {
        if let Some(active) = &self.active_attempt {
            return Err(SessionError::AttemptInFlight {
                active: active.clone(),
            });
        }
        let attempt_id = attempt_id.into();
        tracing::debug!(project = %self.project_id, attempt = %attempt_id, "attempt started");
        self.retry = RetryState::Idle;
        self.active_attempt = Some(attempt_id);
        Ok(())
    }

    /// Whether this record no longer belongs to the active attempt
    #[must_use]
    pub fn is_stale(&self, record: &CompletionRecord) -> bool {
        record.project_id != self.project_id || self.active_attempt.as_ref() != Some(&record.id)
    }

    /// Whether this attempt id was already processed
    #[inline]
    #[must_use]
    pub fn was_processed(&self, attempt_id: &AttemptId) -> bool {
        self.processed.contains(attempt_id)
    }

    /// Remember an attempt id; returns `false` if it was already known
    ///
    /// The oldest id is forgotten once the history is full.
    pub fn mark_processed(&mut self, attempt_id: &AttemptId) -> bool {
        if !self.processed.insert(attempt_id.clone()) {
            return false;
        }
        if self.processed.len() > self.history {
            self.processed.shift_remove_index(0);
        }
        true
    }

    /// Clear the active attempt if it is `attempt_id`
    pub fn finish_attempt(&mut self, attempt_id: &AttemptId) {
        if self.active_attempt.as_ref() == Some(attempt_id) {
            self.active_attempt = None;
        }
    }

    /// Record a retryable failure, replacing any earlier one
    pub fn record_retry(&mut self, record: &CompletionRecord, reason_code: &str) {
        self.retry = RetryState::PendingRetry {
            attempt_id: record.id.clone(),
            prompt: record.prompt.clone(),
            reason_code: reason_code.to_string(),
        };
    }

    /// Take the prompt to replay, leaving the retry state idle
    pub fn take_retry_prompt(&mut self) -> Option<String> {
        match std::mem::take(&mut self.retry) {
            RetryState::PendingRetry { prompt, .. } => Some(prompt),
            RetryState::Idle => None,
        }
    }

    /// Note that a durable snapshot now backs the live view
    #[inline]
    pub fn mark_durable(&mut self) {
        self.has_durable_snapshot = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AttemptStatus;

    fn record(id: &str, project: &str) -> CompletionRecord {
        CompletionRecord::new(id, project, AttemptStatus::Completed, "make a hero")
    }

    #[test]
    fn only_one_attempt_in_flight() {
        let mut session = ProjectSession::new("p");
        session.begin_attempt("a1").unwrap();
        assert_eq!(
            session.begin_attempt("a2"),
            Err(SessionError::AttemptInFlight {
                active: AttemptId::from("a1")
            })
        );
        session.finish_attempt(&AttemptId::from("a1"));
        assert!(session.begin_attempt("a2").is_ok());
    }

    #[test]
    fn staleness_by_project_and_attempt() {
        let mut session = ProjectSession::new("p");
        assert!(session.is_stale(&record("a1", "p")));

        session.begin_attempt("a1").unwrap();
        assert!(!session.is_stale(&record("a1", "p")));
        assert!(session.is_stale(&record("a0", "p")));
        assert!(session.is_stale(&record("a1", "other")));
    }

    #[test]
    fn processed_history_is_bounded() {
        let mut session = ProjectSession::with_history("p", 2);
        for id in ["a", "b", "c"] {
            assert!(session.mark_processed(&AttemptId::from(id)));
        }
        assert!(!session.was_processed(&AttemptId::from("a")));
        assert!(session.was_processed(&AttemptId::from("c")));
        assert!(!session.mark_processed(&AttemptId::from("c")));
    }

    #[test]
    fn retry_prompt_taken_once_and_cleared_by_new_attempt() {
        let mut session = ProjectSession::new("p");
        session.record_retry(&record("a1", "p"), "syntax_errors");
        assert_eq!(session.take_retry_prompt().as_deref(), Some("make a hero"));
        assert_eq!(session.take_retry_prompt(), None);

        session.record_retry(&record("a1", "p"), "syntax_errors");
        session.begin_attempt("a2").unwrap();
        assert_eq!(session.retry_state(), &RetryState::Idle);
    }
}
