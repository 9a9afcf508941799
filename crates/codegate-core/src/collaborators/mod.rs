//! Collaborator seams
//!
//! The gate talks to storage, billing, the live project view and the user
//! only through these traits. [`memory`] provides in-process implementations
//! for the CLI and tests.

use crate::error::{RefundError, StoreError};
use crate::notice::UserNotice;
use crate::record::{AttemptId, ProjectId};
use async_trait::async_trait;
use codegate_filemap::FileMap;
use serde::{Deserialize, Serialize};

pub mod memory;

/// Durable storage of each project's last committed file map
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Last durably committed snapshot, if any
    async fn load(&self, project_id: &ProjectId) -> Result<Option<FileMap>, StoreError>;

    /// Replace the snapshot ("last valid files")
    async fn store(&self, project_id: &ProjectId, files: &FileMap) -> Result<(), StoreError>;
}

/// Compensating credit refunds
#[async_trait]
pub trait RefundService: Send + Sync {
    /// Request a refund for a charged attempt
    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, RefundError>;
}

/// In-memory view observers read the project from
#[async_trait]
pub trait LiveProjectView: Send + Sync {
    /// Replace every file of the live project
    async fn replace_all(&self, project_id: &ProjectId, files: &FileMap);
}

/// Chat-style user messaging
#[async_trait]
pub trait UserNotifier: Send + Sync {
    /// Deliver a notice
    async fn notify(&self, notice: UserNotice);
}

/// Refund request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Charged attempt
    pub attempt_id: AttemptId,
    /// Why the output was refused
    pub reason_code: String,
}

/// Refund response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Whether credits were returned
    pub success: bool,
    /// Credits returned
    pub refunded_amount: u64,
}
