//! Retry/refund coordination
//!
//! Runs on every abort. Refund and user messaging are independent: a stale
//! attempt still gets its refund but no message, and a failed refund never
//! suppresses the message.

use crate::collaborators::{RefundRequest, RefundService, UserNotifier};
use crate::notice::UserNotice;
use crate::reason::AbortReason;
use crate::record::{AttemptId, CompletionRecord};
use crate::session::ProjectSession;
use crate::telemetry;
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Default number of refunded attempt ids a coordinator remembers
pub const DEFAULT_REFUND_HISTORY: usize = 4096;

/// What happened to the refund of one abort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RefundOutcome {
    /// The abort carries no refund reason
    NotApplicable,
    /// Credits were returned
    Refunded {
        /// Credits returned
        amount: u64,
    },
    /// This attempt was refunded before
    AlreadyRefunded,
    /// Refund service answered without returning credits
    Declined,
    /// Refund service could not be reached
    Failed {
        /// Service error text
        error: String,
    },
}

impl RefundOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            RefundOutcome::NotApplicable => "not_applicable",
            RefundOutcome::Refunded { .. } => "refunded",
            RefundOutcome::AlreadyRefunded => "already_refunded",
            RefundOutcome::Declined => "declined",
            RefundOutcome::Failed { .. } => "failed",
        }
    }
}

/// Side effects performed for one abort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortHandling {
    /// Refund result
    pub refund: RefundOutcome,
    /// Whether the prompt was kept for replay
    pub retry_recorded: bool,
    /// Whether the user was messaged
    pub notified: bool,
}

/// Classifies aborts, refunds charged attempts and messages the user
pub struct RetryRefundCoordinator {
    refunds: Arc<dyn RefundService>,
    notifier: Arc<dyn UserNotifier>,
    /// Attempts with a refund requested or granted, oldest first
    refunded: Mutex<IndexSet<AttemptId>>,
    history: usize,
}

impl std::fmt::Debug for RetryRefundCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryRefundCoordinator")
            .field("refunded", &self.refunded.lock().len())
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl RetryRefundCoordinator {
    /// Create coordinator
    #[must_use]
    pub fn new(refunds: Arc<dyn RefundService>, notifier: Arc<dyn UserNotifier>) -> Self {
        Self {
            refunds,
            notifier,
            refunded: Mutex::new(IndexSet::new()),
            history: DEFAULT_REFUND_HISTORY,
        }
    }

    /// With refunded-id history size
    ///
    /// The oldest id is forgotten once `history` ids are remembered.
    #[inline]
    #[must_use]
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history.max(1);
        self
    }

    /// Whether a refund was already requested for this attempt
    #[inline]
    #[must_use]
    pub fn was_refunded(&self, attempt_id: &AttemptId) -> bool {
        self.refunded.lock().contains(attempt_id)
    }

    /// Remember an attempt id; returns `false` if it was already known
    fn claim(&self, attempt_id: &AttemptId) -> bool {
        let mut refunded = self.refunded.lock();
        if !refunded.insert(attempt_id.clone()) {
            return false;
        }
        if refunded.len() > self.history {
            refunded.shift_remove_index(0);
        }
        true
    }

    /// Handle one abort
    ///
    /// `stale` suppresses retry recording and messaging but never the refund.
    pub async fn on_abort(
        &self,
        session: &mut ProjectSession,
        record: &CompletionRecord,
        reason: &AbortReason,
        stale: bool,
    ) -> AbortHandling {
        let refund = match reason.refund_code() {
            Some(code) => self.refund_once(&record.id, code).await,
            None => RefundOutcome::NotApplicable,
        };
        telemetry::record_refund(refund.metric_label());

        if stale {
            tracing::info!(
                attempt = %record.id,
                project = %record.project_id,
                reason = reason.reason_code(),
                "stale attempt aborted; messaging suppressed"
            );
            return AbortHandling {
                refund,
                retry_recorded: false,
                notified: false,
            };
        }

        let retry_recorded = reason.is_retryable();
        if retry_recorded {
            session.record_retry(record, reason.reason_code());
        }

        let notice = UserNotice::aborted(
            record.id.clone(),
            record.project_id.clone(),
            reason,
            retry_recorded.then(|| record.prompt.clone()),
        );
        self.notifier.notify(notice).await;

        AbortHandling {
            refund,
            retry_recorded,
            notified: true,
        }
    }

    async fn refund_once(&self, attempt_id: &AttemptId, reason_code: &str) -> RefundOutcome {
        if !self.claim(attempt_id) {
            tracing::debug!(attempt = %attempt_id, "refund already requested");
            return RefundOutcome::AlreadyRefunded;
        }

        let request = RefundRequest {
            attempt_id: attempt_id.clone(),
            reason_code: reason_code.to_string(),
        };
        match self.refunds.refund(request).await {
            Ok(receipt) if receipt.success => {
                tracing::info!(
                    attempt = %attempt_id,
                    reason = reason_code,
                    amount = receipt.refunded_amount,
                    "refund issued"
                );
                RefundOutcome::Refunded {
                    amount: receipt.refunded_amount,
                }
            }
            Ok(_) => {
                tracing::warn!(attempt = %attempt_id, reason = reason_code, "refund declined");
                RefundOutcome::Declined
            }
            Err(e) => {
                // Allow a later redelivery to try again.
                self.refunded.lock().shift_remove(attempt_id);
                tracing::error!(attempt = %attempt_id, reason = reason_code, error = %e, "refund failed");
                RefundOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
