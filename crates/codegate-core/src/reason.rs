//! Reason codes and abort classification
//!
//! Every abort carries one machine-readable code. The code drives user
//! messaging, the retry affordance and refund tagging.

use codegate_filemap::{IsolationViolation, SandboxPath, ShapeError};
use codegate_lexical::SyntaxIssue;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Codes emitted when the gate itself rejects output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    /// Output does not start like JSON
    NotJson,
    /// Output starts like JSON but does not parse
    JsonParseFailed,
    /// Parsed, but not a non-empty path-to-text mapping
    InvalidFileMap,
    /// A file value is not text
    NonStringValues,
    /// A script file reads as prose
    ConversationalText,
    /// At least one file failed the lexical checks
    SyntaxErrors,
    /// At least one path escaped the sandbox rules
    PathIsolation,
}

impl RejectionCode {
    /// All codes
    pub const ALL: [RejectionCode; 7] = [
        RejectionCode::NotJson,
        RejectionCode::JsonParseFailed,
        RejectionCode::InvalidFileMap,
        RejectionCode::NonStringValues,
        RejectionCode::ConversationalText,
        RejectionCode::SyntaxErrors,
        RejectionCode::PathIsolation,
    ];

    /// Wire spelling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionCode::NotJson => "not_json",
            RejectionCode::JsonParseFailed => "json_parse_failed",
            RejectionCode::InvalidFileMap => "invalid_file_map",
            RejectionCode::NonStringValues => "non_string_values",
            RejectionCode::ConversationalText => "conversational_text",
            RejectionCode::SyntaxErrors => "syntax_errors",
            RejectionCode::PathIsolation => "path_isolation",
        }
    }
}

impl Display for RejectionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ShapeError> for RejectionCode {
    fn from(err: &ShapeError) -> Self {
        match err {
            ShapeError::NotJson => RejectionCode::NotJson,
            ShapeError::ParseFailed(_) => RejectionCode::JsonParseFailed,
            ShapeError::InvalidFileMap(_) => RejectionCode::InvalidFileMap,
            ShapeError::NonStringValue { .. } => RejectionCode::NonStringValues,
            ShapeError::Conversational { .. } => RejectionCode::ConversationalText,
        }
    }
}

/// Failure classes reported by the producer side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerReason {
    /// Producer returned no code at all
    NoCodeProduced,
    /// Producer's own JSON was corrupt
    CorruptJson,
    /// Producer-side compile step failed
    CompileFailure,
    /// Producer ran out of time
    Timeout,
    /// Output too short to be plausible
    TooShort,
    /// Empty response
    EmptyResponse,
    /// Output was cut off
    Truncated,
    /// A required export is missing
    MissingRequiredExport,
}

impl ProducerReason {
    /// All reasons, in matching order
    pub const ALL: [ProducerReason; 8] = [
        ProducerReason::NoCodeProduced,
        ProducerReason::CorruptJson,
        ProducerReason::CompileFailure,
        ProducerReason::Timeout,
        ProducerReason::TooShort,
        ProducerReason::EmptyResponse,
        ProducerReason::Truncated,
        ProducerReason::MissingRequiredExport,
    ];

    /// Wire spelling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProducerReason::NoCodeProduced => "no_code_produced",
            ProducerReason::CorruptJson => "corrupt_json",
            ProducerReason::CompileFailure => "compile_failure",
            ProducerReason::Timeout => "timeout",
            ProducerReason::TooShort => "too_short",
            ProducerReason::EmptyResponse => "empty_response",
            ProducerReason::Truncated => "truncated",
            ProducerReason::MissingRequiredExport => "missing_required_export",
        }
    }

    /// Classify a producer error message
    ///
    /// Case, spaces and hyphens are folded to the wire spelling, so
    /// `"Compile failure: TS2304"` matches `compile_failure`.
    #[must_use]
    pub fn parse(message: &str) -> Option<Self> {
        let folded: String = message
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|reason| folded.contains(reason.as_str()))
    }
}

impl Display for ProducerReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate layer that rejected an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Payload shape and normalization
    Shape,
    /// Per-file lexical checks
    Syntax,
    /// Path isolation
    Isolation,
}

/// One file's rejection reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// Offending file
    pub path: SandboxPath,
    /// Human-readable reason
    pub reason: String,
}

/// Verdict of the first failing gate layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Layer that failed
    pub layer: Layer,
    /// Machine-readable code
    pub code: RejectionCode,
    /// Summary for logs and messages
    pub detail: String,
    /// Per-file reasons, if the layer reports them
    pub file_errors: Vec<FileError>,
}

impl Rejection {
    /// Shape-layer rejection
    #[must_use]
    pub fn from_shape(err: &ShapeError) -> Self {
        let file_errors = match err {
            ShapeError::Conversational { path } => vec![FileError {
                path: path.clone(),
                reason: err.to_string(),
            }],
            _ => Vec::new(),
        };
        Self {
            layer: Layer::Shape,
            code: RejectionCode::from(err),
            detail: err.to_string(),
            file_errors,
        }
    }

    /// Syntax-layer rejection
    #[must_use]
    pub fn from_syntax(errors: &[(SandboxPath, SyntaxIssue)]) -> Self {
        Self {
            layer: Layer::Syntax,
            code: RejectionCode::SyntaxErrors,
            detail: format!("{} file(s) failed syntax checks", errors.len()),
            file_errors: errors
                .iter()
                .map(|(path, issue)| FileError {
                    path: path.clone(),
                    reason: issue.to_string(),
                })
                .collect(),
        }
    }

    /// Isolation-layer rejection
    #[must_use]
    pub fn from_isolation(errors: &[(SandboxPath, IsolationViolation)]) -> Self {
        Self {
            layer: Layer::Isolation,
            code: RejectionCode::PathIsolation,
            detail: format!("{} path(s) violate sandbox isolation", errors.len()),
            file_errors: errors
                .iter()
                .map(|(path, violation)| FileError {
                    path: path.clone(),
                    reason: violation.to_string(),
                })
                .collect(),
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// Why an attempt did not commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// A gate layer rejected the output
    Rejected(Rejection),
    /// Producer flagged the output as needing continuation
    Incomplete,
    /// Producer refused and asked the user to narrow the request
    NeedsUserAction,
    /// Producer failed with a recognized reason
    Producer {
        /// Classified reason
        reason: ProducerReason,
    },
    /// Producer failed with an unrecognized message
    ProducerFailed {
        /// Raw message
        message: String,
    },
    /// The platform failed (snapshot load or durable write)
    Infrastructure {
        /// Collaborator error text
        message: String,
    },
}

impl AbortReason {
    /// Machine-readable code for messaging and metrics
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            AbortReason::Rejected(rejection) => rejection.code.as_str(),
            AbortReason::Incomplete => ProducerReason::Truncated.as_str(),
            AbortReason::NeedsUserAction => "needs_user_action",
            AbortReason::Producer { reason } => reason.as_str(),
            AbortReason::ProducerFailed { .. } => "producer_failed",
            AbortReason::Infrastructure { .. } => "infrastructure",
        }
    }

    /// Whether replaying the original prompt is offered
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AbortReason::Rejected(_)
                | AbortReason::Incomplete
                | AbortReason::Producer { .. }
                | AbortReason::Infrastructure { .. }
        )
    }

    /// Refund tag, when the attempt was charged before the gate ran
    ///
    /// Content rejections and truncation are refunded. Infrastructure
    /// failures carry no content reason, and producer-side failures are
    /// settled by the job collaborator.
    #[must_use]
    pub fn refund_code(&self) -> Option<&'static str> {
        match self {
            AbortReason::Rejected(rejection) => Some(rejection.code.as_str()),
            AbortReason::Incomplete => Some(ProducerReason::Truncated.as_str()),
            AbortReason::NeedsUserAction
            | AbortReason::Producer { .. }
            | AbortReason::ProducerFailed { .. }
            | AbortReason::Infrastructure { .. } => None,
        }
    }

    /// Security-class rejection (logged separately)
    #[inline]
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(self, AbortReason::Rejected(r) if r.code == RejectionCode::PathIsolation)
    }
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Rejected(rejection) => Display::fmt(rejection, f),
            AbortReason::Incomplete => f.write_str("output was incomplete"),
            AbortReason::NeedsUserAction => f.write_str("request needs to be narrowed"),
            AbortReason::Producer { reason } => write!(f, "producer failed: {reason}"),
            AbortReason::ProducerFailed { message } => write!(f, "producer failed: {message}"),
            AbortReason::Infrastructure { message } => write!(f, "platform error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_codes_have_wire_spelling() {
        let codes: Vec<_> = RejectionCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "not_json",
                "json_parse_failed",
                "invalid_file_map",
                "non_string_values",
                "conversational_text",
                "syntax_errors",
                "path_isolation",
            ]
        );
        assert_eq!(
            serde_json::to_string(&RejectionCode::PathIsolation).unwrap(),
            "\"path_isolation\""
        );
    }

    #[test]
    fn producer_reason_parsing() {
        assert_eq!(ProducerReason::parse("timeout"), Some(ProducerReason::Timeout));
        assert_eq!(
            ProducerReason::parse("Compile failure: TS2304 cannot find name"),
            Some(ProducerReason::CompileFailure)
        );
        assert_eq!(
            ProducerReason::parse("missing-required-export"),
            Some(ProducerReason::MissingRequiredExport)
        );
        assert_eq!(ProducerReason::parse("model overloaded"), None);
    }

    #[test]
    fn classification_table() {
        let rejected = AbortReason::Rejected(Rejection::from_shape(&ShapeError::NotJson));
        assert!(rejected.is_retryable());
        assert_eq!(rejected.refund_code(), Some("not_json"));

        assert!(AbortReason::Incomplete.is_retryable());
        assert_eq!(AbortReason::Incomplete.refund_code(), Some("truncated"));

        assert!(!AbortReason::NeedsUserAction.is_retryable());
        assert_eq!(AbortReason::NeedsUserAction.refund_code(), None);

        let infra = AbortReason::Infrastructure {
            message: "disk full".to_string(),
        };
        assert!(infra.is_retryable());
        assert_eq!(infra.refund_code(), None);

        let producer = AbortReason::Producer {
            reason: ProducerReason::Timeout,
        };
        assert!(producer.is_retryable());
        assert_eq!(producer.reason_code(), "timeout");

        let unknown = AbortReason::ProducerFailed {
            message: "boom".to_string(),
        };
        assert!(!unknown.is_retryable());
    }

    #[test]
    fn conversational_rejection_names_file() {
        let path = SandboxPath::normalize("/storefront/Hero.tsx").unwrap();
        let rejection = Rejection::from_shape(&ShapeError::Conversational { path: path.clone() });
        assert_eq!(rejection.code, RejectionCode::ConversationalText);
        assert_eq!(rejection.file_errors[0].path, path);
    }
}
