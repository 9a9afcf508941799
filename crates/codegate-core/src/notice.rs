//! User-facing notices

use crate::reason::AbortReason;
use crate::record::{AttemptId, ProjectId};
use serde::Serialize;

/// Statement appended to every abort message
pub const NO_CHANGES_APPLIED: &str =
    "No changes were applied. Your project remains in its last stable state.";

/// Kind of notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Changes were applied
    Committed,
    /// Output was rejected; a retry may be offered
    Rejected,
    /// The user must narrow the request
    ActionRequired,
    /// The platform failed
    Unavailable,
}

/// Chat-style message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotice {
    /// Attempt the notice is about
    pub attempt_id: AttemptId,
    /// Owning project
    pub project_id: ProjectId,
    /// Kind of notice
    pub kind: NoticeKind,
    /// Message text
    pub message: String,
    /// Prompt offered for one-click replay
    pub retry_prompt: Option<String>,
}

impl UserNotice {
    /// Notice for a successful commit
    #[must_use]
    pub fn committed(
        attempt_id: AttemptId,
        project_id: ProjectId,
        summary: Option<&str>,
        file_count: usize,
    ) -> Self {
        let message = match summary {
            Some(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            _ => format!("Applied {file_count} file(s)."),
        };
        Self {
            attempt_id,
            project_id,
            kind: NoticeKind::Committed,
            message,
            retry_prompt: None,
        }
    }

    /// Notice for an abort
    #[must_use]
    pub fn aborted(
        attempt_id: AttemptId,
        project_id: ProjectId,
        reason: &AbortReason,
        retry_prompt: Option<String>,
    ) -> Self {
        let (kind, headline) = match reason {
            AbortReason::NeedsUserAction => (
                NoticeKind::ActionRequired,
                "This request is too broad to apply in one step. Try splitting it into smaller changes."
                    .to_string(),
            ),
            AbortReason::Infrastructure { .. } => (
                NoticeKind::Unavailable,
                "We couldn't save the generated changes.".to_string(),
            ),
            AbortReason::Incomplete => (
                NoticeKind::Rejected,
                "The generated output was incomplete.".to_string(),
            ),
            other => (
                NoticeKind::Rejected,
                format!("The generated output was rejected ({}).", other.reason_code()),
            ),
        };
        Self {
            attempt_id,
            project_id,
            kind,
            message: format!("{headline} {NO_CHANGES_APPLIED}"),
            retry_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_message_states_nothing_changed() {
        let notice = UserNotice::aborted(
            AttemptId::from("a"),
            ProjectId::from("p"),
            &AbortReason::Incomplete,
            Some("retry me".to_string()),
        );
        assert_eq!(notice.kind, NoticeKind::Rejected);
        assert!(notice.message.ends_with(NO_CHANGES_APPLIED));
        assert_eq!(notice.retry_prompt.as_deref(), Some("retry me"));
    }

    #[test]
    fn commit_message_prefers_summary() {
        let notice = UserNotice::committed(AttemptId::from("a"), ProjectId::from("p"), Some(" Added hero "), 2);
        assert_eq!(notice.message, "Added hero");
        let notice = UserNotice::committed(AttemptId::from("a"), ProjectId::from("p"), None, 2);
        assert_eq!(notice.message, "Applied 2 file(s).");
    }
}
