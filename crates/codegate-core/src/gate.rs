//! Commit orchestrator (zero-trust gate)
//!
//! Receives exactly one completion record per attempt and either commits it
//! or leaves the project exactly as it was.
//!
//! # Workflow
//! 1. Drop redelivered records (same attempt id)
//! 2. Dispatch on producer status; only `completed` is validated
//! 3. Shape → syntax → isolation, fail-fast
//! 4. Full replace or delta merge over the last durable snapshot
//! 5. Durable write, then live view: observers never see a state that is
//!    not also durably recorded
//!
//! A stale record (not the session's active attempt) is still validated so
//! that a rejection can be refunded, but it never mutates state or messages
//! the user.

use crate::collaborators::{LiveProjectView, RefundService, SnapshotStore, UserNotifier};
use crate::coordinator::{AbortHandling, RetryRefundCoordinator};
use crate::error::GateError;
use crate::notice::UserNotice;
use crate::pipeline::{CommitMode, Pipeline};
use crate::reason::{AbortReason, ProducerReason, Rejection};
use crate::record::{AttemptId, AttemptStatus, CompletionRecord, ProjectId};
use crate::session::ProjectSession;
use crate::state::{CommitState, CommitTrace};
use crate::telemetry;
use chrono::{DateTime, Utc};
use codegate_filemap::Fingerprint;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use ulid::Ulid;

/// Unique commit identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommitId(pub Ulid);

impl CommitId {
    /// Generate new commit ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CommitId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CommitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proof of a successful commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    /// Commit identity
    pub commit_id: CommitId,
    /// Attempt that produced the files
    pub attempt_id: AttemptId,
    /// Project committed to
    pub project_id: ProjectId,
    /// Fingerprint of the committed map
    pub fingerprint: Fingerprint,
    /// Files in the committed map
    pub file_count: usize,
    /// Replace or merge
    pub mode: CommitMode,
    /// When the live view was updated
    pub committed_at: DateTime<Utc>,
}

/// Result of handling one completion record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Attempt id already processed; nothing happened
    Duplicate {
        /// Redelivered attempt
        attempt_id: AttemptId,
    },
    /// Files are durably stored and live
    Committed {
        /// Commit receipt
        receipt: CommitReceipt,
        /// States visited
        trace: CommitTrace,
    },
    /// Attempt rejected; nothing was mutated
    Aborted {
        /// Why
        reason: AbortReason,
        /// Refund, retry and messaging performed
        handling: AbortHandling,
        /// States visited
        trace: CommitTrace,
    },
    /// Stale attempt passed every check but was not applied
    Discarded {
        /// States visited
        trace: CommitTrace,
    },
}

impl GateOutcome {
    /// Outcome label for logs and metrics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            GateOutcome::Duplicate { .. } => "duplicate",
            GateOutcome::Committed { .. } => "committed",
            GateOutcome::Aborted { .. } => "aborted",
            GateOutcome::Discarded { .. } => "discarded",
        }
    }

    /// Whether the attempt was committed
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, GateOutcome::Committed { .. })
    }

    /// Abort reason, if aborted
    #[must_use]
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            GateOutcome::Aborted { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Audit trace, if the record was processed
    #[must_use]
    pub fn trace(&self) -> Option<&CommitTrace> {
        match self {
            GateOutcome::Committed { trace, .. }
            | GateOutcome::Aborted { trace, .. }
            | GateOutcome::Discarded { trace } => Some(trace),
            GateOutcome::Duplicate { .. } => None,
        }
    }
}

/// Why processing stopped early
enum Halt {
    /// Attempt must abort with this reason
    Abort(AbortReason),
    /// Internal fault; propagated to the caller
    Fault(GateError),
}

impl From<GateError> for Halt {
    fn from(err: GateError) -> Self {
        Halt::Fault(err)
    }
}

impl From<Rejection> for Halt {
    fn from(rejection: Rejection) -> Self {
        Halt::Abort(AbortReason::Rejected(rejection))
    }
}

/// The zero-trust commit gate
pub struct CommitGate {
    pipeline: Pipeline,
    store: Arc<dyn SnapshotStore>,
    live: Arc<dyn LiveProjectView>,
    notifier: Arc<dyn UserNotifier>,
    coordinator: RetryRefundCoordinator,
}

impl std::fmt::Debug for CommitGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitGate")
            .field("pipeline", &self.pipeline)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl CommitGate {
    /// Create gate over its collaborators
    #[must_use]
    pub fn new(
        pipeline: Pipeline,
        store: Arc<dyn SnapshotStore>,
        live: Arc<dyn LiveProjectView>,
        refunds: Arc<dyn RefundService>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Self {
        Self {
            coordinator: RetryRefundCoordinator::new(refunds, notifier.clone()),
            pipeline,
            store,
            live,
            notifier,
        }
    }

    /// With the number of refunded attempt ids remembered for dedupe
    #[must_use]
    pub fn with_refund_history(mut self, history: usize) -> Self {
        self.coordinator = self.coordinator.with_history(history);
        self
    }

    /// Validation pipeline
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Retry/refund coordinator
    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &RetryRefundCoordinator {
        &self.coordinator
    }

    /// Handle one completion record
    ///
    /// Rejections are reported as [`GateOutcome::Aborted`], not as errors.
    ///
    /// # Errors
    /// Returns [`GateError`] only for internal faults (an illegal state
    /// transition).
    pub async fn handle_completion(
        &self,
        session: &mut ProjectSession,
        record: &CompletionRecord,
    ) -> Result<GateOutcome, GateError> {
        if !session.mark_processed(&record.id) {
            tracing::info!(attempt = %record.id, "duplicate completion ignored");
            telemetry::record_attempt("duplicate");
            return Ok(GateOutcome::Duplicate {
                attempt_id: record.id.clone(),
            });
        }

        let stale = session.is_stale(record);
        tracing::info!(
            attempt = %record.id,
            project = %record.project_id,
            status = ?record.status,
            stale,
            "completion received"
        );

        let mut trace = CommitTrace::new();
        let outcome = match self.process(session, record, stale, &mut trace).await {
            Ok(Some(receipt)) => GateOutcome::Committed { receipt, trace },
            Ok(None) => {
                trace.advance(CommitState::Aborted)?;
                tracing::info!(attempt = %record.id, "stale attempt passed checks; discarded");
                GateOutcome::Discarded { trace }
            }
            Err(Halt::Abort(reason)) => {
                trace.advance(CommitState::Aborted)?;
                log_abort(record, &reason);
                telemetry::record_rejection(reason.reason_code());
                let handling = self.coordinator.on_abort(session, record, &reason, stale).await;
                GateOutcome::Aborted {
                    reason,
                    handling,
                    trace,
                }
            }
            Err(Halt::Fault(err)) => {
                tracing::error!(attempt = %record.id, error = %err, "gate fault");
                return Err(err);
            }
        };

        if !stale {
            session.finish_attempt(&record.id);
        }
        telemetry::record_attempt(outcome.label());
        Ok(outcome)
    }

    async fn process(
        &self,
        session: &mut ProjectSession,
        record: &CompletionRecord,
        stale: bool,
        trace: &mut CommitTrace,
    ) -> Result<Option<CommitReceipt>, Halt> {
        match record.status {
            AttemptStatus::Completed => {}
            AttemptStatus::NeedsContinuation => return Err(Halt::Abort(AbortReason::Incomplete)),
            AttemptStatus::NeedsUserAction => return Err(Halt::Abort(AbortReason::NeedsUserAction)),
            AttemptStatus::Failed => return Err(Halt::Abort(classify_failure(record))),
        }

        let files = self.pipeline.shape(record.code_result.as_deref())?;
        trace.advance(CommitState::ShapeChecked)?;

        self.pipeline.syntax(&files)?;
        trace.advance(CommitState::SyntaxChecked)?;

        let snapshot = self
            .store
            .load(&record.project_id)
            .await
            .map_err(|e| Halt::Abort(AbortReason::Infrastructure { message: e.to_string() }))?;
        let mode = self.pipeline.isolation_mode(snapshot.as_ref());
        self.pipeline.isolation(&files, mode)?;
        trace.advance(CommitState::IsolationChecked)?;

        if stale {
            return Ok(None);
        }

        let plan = self.pipeline.plan_commit(files, snapshot.as_ref());
        trace.advance(CommitState::Merged)?;

        self.store
            .store(&record.project_id, &plan.files)
            .await
            .map_err(|e| Halt::Abort(AbortReason::Infrastructure { message: e.to_string() }))?;
        trace.advance(CommitState::Persisted)?;

        self.live.replace_all(&record.project_id, &plan.files).await;
        session.mark_durable();
        trace.advance(CommitState::Committed)?;

        let receipt = CommitReceipt {
            commit_id: CommitId::new(),
            attempt_id: record.id.clone(),
            project_id: record.project_id.clone(),
            fingerprint: plan.files.fingerprint(),
            file_count: plan.files.len(),
            mode: plan.mode,
            committed_at: Utc::now(),
        };
        tracing::info!(
            attempt = %receipt.attempt_id,
            project = %receipt.project_id,
            commit = %receipt.commit_id,
            fingerprint = %receipt.fingerprint.short(),
            files = receipt.file_count,
            mode = ?receipt.mode,
            "attempt committed"
        );

        self.notifier
            .notify(UserNotice::committed(
                record.id.clone(),
                record.project_id.clone(),
                record.summary.as_deref(),
                receipt.file_count,
            ))
            .await;

        Ok(Some(receipt))
    }
}

fn log_abort(record: &CompletionRecord, reason: &AbortReason) {
    match reason {
        AbortReason::Infrastructure { message } => tracing::error!(
            attempt = %record.id,
            project = %record.project_id,
            error = %message,
            "attempt aborted by platform failure"
        ),
        _ => tracing::warn!(
            attempt = %record.id,
            project = %record.project_id,
            code = reason.reason_code(),
            security = reason.is_security(),
            "attempt aborted: {reason}"
        ),
    }
}

fn classify_failure(record: &CompletionRecord) -> AbortReason {
    let message = record.error_message.as_deref().unwrap_or_default();
    match ProducerReason::parse(message) {
        Some(reason) => AbortReason::Producer { reason },
        None => AbortReason::ProducerFailed {
            message: if message.trim().is_empty() {
                "unknown producer failure".to_string()
            } else {
                message.trim().to_string()
            },
        },
    }
}
