//! Testing utilities for the codegate workspace
//!
//! Shared fixtures and a gate harness wired to in-memory collaborators.

#![allow(missing_docs)]

use codegate_core::collaborators::memory::{
    CollectingNotifier, LedgerRefunds, MemoryLiveView, MemorySnapshotStore,
};
use codegate_core::{
    AttemptStatus, CommitGate, CompletionRecord, GateError, GateOutcome, Pipeline, ProjectId,
    ProjectSession,
};
use codegate_filemap::FileMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const PROJECT: &str = "shop";

/// Credits returned per refund by the harness ledger
pub const REFUND_AMOUNT: u64 = 2;

pub const APP_SOURCE: &str = r#"import { Hero } from "./storefront/Hero";

export default function App() {
  return (
    <main className="app">
      <Hero title="Spring sale" />
    </main>
  );
}
"#;

pub const HERO_SOURCE: &str = r#"export const Hero = ({ title }: { title: string }) => {
  const items = [1, 2, 3].map((n) => `item-${n}`);
  return (
    <section className="hero">
      <h1>{title}</h1>
      <ul>{items.map((i) => <li key={i}>{i}</li>)}</ul>
    </section>
  );
};
"#;

pub const FOOTER_SOURCE: &str = r#"export const Footer = () => <footer>© Shop</footer>;
"#;

/// Keyed payload text for `pairs`
pub fn keyed_payload<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(path, content)| (path.to_string(), Value::String(content.to_string())))
        .collect();
    Value::Object(map).to_string()
}

/// Record-array payload text for `pairs`
pub fn records_payload<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let files: Vec<Value> = pairs
        .into_iter()
        .map(|(path, content)| json!({"path": path, "content": content}))
        .collect();
    json!({ "files": files }).to_string()
}

/// Full storefront: root entry plus hero
pub fn full_app_payload() -> String {
    keyed_payload([("/App.tsx", APP_SOURCE), ("/storefront/Hero.tsx", HERO_SOURCE)])
}

pub fn file_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> FileMap {
    FileMap::from_raw_pairs(pairs).unwrap()
}

pub fn completed_record(id: &str, code_result: impl Into<String>) -> CompletionRecord {
    CompletionRecord::new(id, PROJECT, AttemptStatus::Completed, format!("prompt for {id}"))
        .with_code_result(code_result)
}

pub fn status_record(id: &str, status: AttemptStatus) -> CompletionRecord {
    CompletionRecord::new(id, PROJECT, status, format!("prompt for {id}"))
}

/// Gate over in-memory collaborators, with handles to inspect them
pub struct GateHarness {
    pub gate: CommitGate,
    pub session: ProjectSession,
    pub store: Arc<MemorySnapshotStore>,
    pub live: Arc<MemoryLiveView>,
    pub refunds: Arc<LedgerRefunds>,
    pub notifier: Arc<CollectingNotifier>,
}

impl GateHarness {
    pub fn new() -> Self {
        Self::with_store(MemorySnapshotStore::new())
    }

    /// Harness whose project already has a durable snapshot
    pub fn with_snapshot(files: FileMap) -> Self {
        Self::with_store(MemorySnapshotStore::new().with_snapshot(PROJECT, files))
    }

    pub fn with_store(store: MemorySnapshotStore) -> Self {
        Self::with_pipeline(Pipeline::default(), store)
    }

    pub fn with_pipeline(pipeline: Pipeline, store: MemorySnapshotStore) -> Self {
        let store = Arc::new(store);
        let live = Arc::new(MemoryLiveView::new());
        let refunds = Arc::new(LedgerRefunds::new(REFUND_AMOUNT));
        let notifier = Arc::new(CollectingNotifier::new());
        let gate = CommitGate::new(
            pipeline,
            store.clone(),
            live.clone(),
            refunds.clone(),
            notifier.clone(),
        );
        Self {
            gate,
            session: ProjectSession::new(PROJECT),
            store,
            live,
            refunds,
            notifier,
        }
    }

    pub fn project() -> ProjectId {
        ProjectId::from(PROJECT)
    }

    /// Start `id` as the active attempt
    pub fn begin(&mut self, id: &str) {
        self.session.begin_attempt(id).unwrap();
    }

    pub async fn deliver(&mut self, record: &CompletionRecord) -> Result<GateOutcome, GateError> {
        self.gate.handle_completion(&mut self.session, record).await
    }

    /// Begin `record`'s attempt and deliver it
    pub async fn run(&mut self, record: &CompletionRecord) -> GateOutcome {
        self.begin(record.id.as_str());
        self.deliver(record).await.unwrap()
    }

    pub fn stored(&self) -> Option<FileMap> {
        self.store.snapshot(&Self::project())
    }

    pub fn live_files(&self) -> Option<FileMap> {
        self.live.files(&Self::project())
    }
}

impl Default for GateHarness {
    fn default() -> Self {
        Self::new()
    }
}
