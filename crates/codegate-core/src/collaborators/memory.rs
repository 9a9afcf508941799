//! In-process collaborators
//!
//! Used by the `codegate` binary to replay records offline and by tests.
//! Failure switches let a caller make a collaborator fail deterministically.

use super::{LiveProjectView, RefundReceipt, RefundRequest, RefundService, SnapshotStore, UserNotifier};
use crate::error::{RefundError, StoreError};
use crate::notice::UserNotice;
use crate::record::ProjectId;
use async_trait::async_trait;
use codegate_filemap::FileMap;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Snapshot store backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<ProjectId, FileMap>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project's snapshot
    #[must_use]
    pub fn with_snapshot(self, project_id: impl Into<ProjectId>, files: FileMap) -> Self {
        self.snapshots.insert(project_id.into(), files);
        self
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current snapshot of a project
    #[must_use]
    pub fn snapshot(&self, project_id: &ProjectId) -> Option<FileMap> {
        self.snapshots.get(project_id).map(|entry| entry.value().clone())
    }

    /// Successful writes so far
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, project_id: &ProjectId) -> Result<Option<FileMap>, StoreError> {
        Ok(self.snapshot(project_id))
    }

    async fn store(&self, project_id: &ProjectId, files: &FileMap) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("write disabled".to_string()));
        }
        self.snapshots.insert(project_id.clone(), files.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Live view that records every replacement
#[derive(Debug, Default)]
pub struct MemoryLiveView {
    projects: DashMap<ProjectId, FileMap>,
    replacements: AtomicUsize,
}

impl MemoryLiveView {
    /// Create empty view
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files currently shown for a project
    #[must_use]
    pub fn files(&self, project_id: &ProjectId) -> Option<FileMap> {
        self.projects.get(project_id).map(|entry| entry.value().clone())
    }

    /// Number of `replace_all` calls observed
    #[inline]
    #[must_use]
    pub fn replacement_count(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveProjectView for MemoryLiveView {
    async fn replace_all(&self, project_id: &ProjectId, files: &FileMap) {
        self.projects.insert(project_id.clone(), files.clone());
        self.replacements.fetch_add(1, Ordering::SeqCst);
    }
}

/// Refund service that keeps a ledger of requests
#[derive(Debug)]
pub struct LedgerRefunds {
    ledger: Mutex<Vec<RefundRequest>>,
    amount: u64,
    decline: AtomicBool,
}

impl LedgerRefunds {
    /// Create a ledger refunding `amount` credits per request
    #[inline]
    #[must_use]
    pub fn new(amount: u64) -> Self {
        Self {
            ledger: Mutex::new(Vec::new()),
            amount,
            decline: AtomicBool::new(false),
        }
    }

    /// Answer subsequent requests with `success: false`
    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }

    /// Every request received, in order
    #[must_use]
    pub fn requests(&self) -> Vec<RefundRequest> {
        self.ledger.lock().clone()
    }
}

impl Default for LedgerRefunds {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl RefundService for LedgerRefunds {
    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, RefundError> {
        self.ledger.lock().push(request);
        if self.decline.load(Ordering::SeqCst) {
            return Ok(RefundReceipt {
                success: false,
                refunded_amount: 0,
            });
        }
        Ok(RefundReceipt {
            success: true,
            refunded_amount: self.amount,
        })
    }
}

/// Notifier that writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl UserNotifier for LogNotifier {
    async fn notify(&self, notice: UserNotice) {
        tracing::info!(
            attempt = %notice.attempt_id,
            project = %notice.project_id,
            kind = ?notice.kind,
            retry = notice.retry_prompt.is_some(),
            "{}",
            notice.message
        );
    }
}

/// Notifier that keeps every notice
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<UserNotice>>,
}

impl CollectingNotifier {
    /// Create empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices delivered so far
    #[must_use]
    pub fn notices(&self) -> Vec<UserNotice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl UserNotifier for CollectingNotifier {
    async fn notify(&self, notice: UserNotice) {
        self.notices.lock().push(notice);
    }
}
