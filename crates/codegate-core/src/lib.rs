//! Codegate Core
//!
//! The zero-trust commit gate. Generated output is never trusted: it passes
//! the shape, syntax and isolation layers in order or the project stays
//! exactly as it was.
//!
//! # Core Concepts
//!
//! - [`CommitGate`]: handles one [`CompletionRecord`] per attempt
//! - [`Pipeline`]: the three ordered validation layers plus commit planning
//! - [`ProjectSession`]: active attempt, retry state and redelivery memory
//! - [`RetryRefundCoordinator`]: refunds, retry prompts and user notices
//! - [`CommitState`]: audit state machine of one attempt
//!
//! # Example
//!
//! ```rust
//! use codegate_core::collaborators::memory::{
//!     CollectingNotifier, LedgerRefunds, MemoryLiveView, MemorySnapshotStore,
//! };
//! use codegate_core::{AttemptStatus, CommitGate, CompletionRecord, Pipeline, ProjectSession};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = CommitGate::new(
//!     Pipeline::default(),
//!     Arc::new(MemorySnapshotStore::new()),
//!     Arc::new(MemoryLiveView::new()),
//!     Arc::new(LedgerRefunds::default()),
//!     Arc::new(CollectingNotifier::new()),
//! );
//!
//! let mut session = ProjectSession::new("shop");
//! session.begin_attempt("a1").unwrap();
//!
//! let record = CompletionRecord::new("a1", "shop", AttemptStatus::Completed, "add a hero")
//!     .with_code_result(r#"{"/storefront/Hero.tsx": "export const Hero = () => <section />;"}"#);
//!
//! let outcome = gate.handle_completion(&mut session, &record).await.unwrap();
//! assert!(outcome.is_committed());
//! # }
//! ```

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod notice;
pub mod pipeline;
pub mod reason;
pub mod record;
pub mod session;
pub mod state;
pub mod telemetry;

pub use collaborators::{LiveProjectView, RefundReceipt, RefundRequest, RefundService, SnapshotStore, UserNotifier};
pub use config::{GateConfig, DEFAULT_PROCESSED_HISTORY};
pub use coordinator::{AbortHandling, RefundOutcome, RetryRefundCoordinator, DEFAULT_REFUND_HISTORY};
pub use error::{ConfigError, GateError, RefundError, SessionError, StoreError};
pub use gate::{CommitGate, CommitId, CommitReceipt, GateOutcome};
pub use notice::{NoticeKind, UserNotice, NO_CHANGES_APPLIED};
pub use pipeline::{CommitMode, CommitPlan, Pipeline, SECURITY_TARGET};
pub use reason::{AbortReason, FileError, Layer, ProducerReason, Rejection, RejectionCode};
pub use record::{AttemptId, AttemptStatus, CompletionRecord, ProjectId};
pub use session::{ProjectSession, RetryState};
pub use state::{allowed_transitions, validate_transition, CommitState, CommitTrace};

/// Convenience re-exports
pub mod prelude {
    pub use crate::collaborators::{LiveProjectView, RefundService, SnapshotStore, UserNotifier};
    pub use crate::{
        AbortReason, AttemptId, AttemptStatus, CommitGate, CompletionRecord, GateConfig, GateOutcome,
        Pipeline, ProjectId, ProjectSession,
    };
    pub use codegate_filemap::{FileMap, SandboxPath};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
