//! Completion records
//!
//! The inbound event from the job-execution collaborator. One record per
//! attempt; read-only to the gate.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Attempt identifier, assigned by the job collaborator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AttemptId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttemptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Project identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Producer-reported status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Producer finished; output must still pass the gate
    Completed,
    /// Output was cut off; known incomplete
    NeedsContinuation,
    /// Producer refused; the user must narrow the request
    NeedsUserAction,
    /// Producer failed outright
    Failed,
}

/// One completion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Attempt identity
    pub id: AttemptId,
    /// Owning project
    pub project_id: ProjectId,
    /// Producer status
    pub status: AttemptStatus,
    /// Originating prompt, kept for replay
    pub prompt: String,
    /// Raw textual result, expected to be a file-map payload
    #[serde(default)]
    pub code_result: Option<String>,
    /// Structured plan, if the producer emitted one
    #[serde(default)]
    pub plan_result: Option<serde_json::Value>,
    /// Human-readable summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Producer error text for failed attempts
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CompletionRecord {
    /// Create a record with no payload
    #[must_use]
    pub fn new(
        id: impl Into<AttemptId>,
        project_id: impl Into<ProjectId>,
        status: AttemptStatus,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            status,
            prompt: prompt.into(),
            code_result: None,
            plan_result: None,
            summary: None,
            error_message: None,
        }
    }

    /// With raw code result
    #[inline]
    #[must_use]
    pub fn with_code_result(mut self, code_result: impl Into<String>) -> Self {
        self.code_result = Some(code_result.into());
        self
    }

    /// With summary
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// With producer error message
    #[inline]
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// With structured plan
    #[inline]
    #[must_use]
    pub fn with_plan(mut self, plan: serde_json::Value) -> Self {
        self.plan_result = Some(plan);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_record() {
        let record: CompletionRecord = serde_json::from_str(
            r#"{
                "id": "att-1",
                "project_id": "proj-1",
                "status": "needs_continuation",
                "prompt": "add a hero",
                "code_result": "{\"files\": {}}"
            }"#,
        )
        .unwrap();
        assert_eq!(record.id, AttemptId::from("att-1"));
        assert_eq!(record.status, AttemptStatus::NeedsContinuation);
        assert!(record.plan_result.is_none());
        assert!(record.error_message.is_none());
    }
}
