//! Payload shape resolution and normalization
//!
//! A producer's textual result is parsed once at the boundary and resolved
//! into exactly one canonical [`FileMap`]. Three payload shapes are accepted:
//!
//! ```text
//! {"files": {"/App.tsx": "..."}}                 → Keyed
//! [{"path": "/App.tsx", "content": "..."}]       → Records (bare or under "files")
//! {"/App.tsx": "...", "storefront/Hero.tsx": ""} → BareFiles (no envelope)
//! ```

use crate::conversational::looks_conversational;
use crate::kind::{looks_like_source_path, FileKind};
use crate::map::FileMap;
use crate::path::SandboxPath;
use serde_json::{Map, Value};

/// Envelope key wrapping the files of a payload
pub const FILES_KEY: &str = "files";

/// Record field holding the file path
pub const PATH_FIELD: &str = "path";

/// Record field holding the file content
pub const CONTENT_FIELD: &str = "content";

/// Default upper bound on a single file's size
pub const DEFAULT_MAX_FILE_BYTES: usize = 512 * 1024;

/// Reasons a payload does not normalize into a file map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Output does not even start like JSON
    #[error("output is not JSON")]
    NotJson,

    /// Output starts like JSON but does not parse
    #[error("JSON parse failed: {0}")]
    ParseFailed(String),

    /// Parsed, but not a non-empty mapping of path to text
    #[error("payload is not a file map: {0}")]
    InvalidFileMap(String),

    /// A file value is structured data instead of text
    #[error("file '{path}' has a non-text value ({found})")]
    NonStringValue {
        /// Key as the producer spelled it
        path: String,
        /// JSON type found instead of a string
        found: &'static str,
    },

    /// A script file reads as natural language
    #[error("file '{path}' reads as conversational text, not code")]
    Conversational {
        /// Normalized path of the offending file
        path: SandboxPath,
    },
}

/// The accepted payload shapes, resolved once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    /// `{"files": {path: content}}`
    Keyed(Map<String, Value>),
    /// `[{path, content}]`, bare or under `files`
    Records(Vec<Value>),
    /// Path-keyed object without the envelope
    BareFiles(Map<String, Value>),
}

impl PayloadShape {
    /// Recognize the shape of a parsed payload
    ///
    /// # Errors
    /// Returns [`ShapeError::InvalidFileMap`] for any other shape.
    pub fn resolve(value: Value) -> Result<Self, ShapeError> {
        match value {
            Value::Array(records) => Ok(Self::Records(records)),
            Value::Object(mut object) => match object.remove(FILES_KEY) {
                Some(Value::Object(files)) => Ok(Self::Keyed(files)),
                Some(Value::Array(records)) => Ok(Self::Records(records)),
                Some(other) => Err(ShapeError::InvalidFileMap(format!(
                    "'{FILES_KEY}' holds {}",
                    json_type_name(&other)
                ))),
                None if object.keys().any(|key| looks_like_source_path(key)) => {
                    Ok(Self::BareFiles(object))
                }
                None => Err(ShapeError::InvalidFileMap(
                    "object has no 'files' entry and no file-like keys".to_string(),
                )),
            },
            other => Err(ShapeError::InvalidFileMap(format!(
                "top-level value is {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Shape name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyed(_) => "keyed",
            Self::Records(_) => "records",
            Self::BareFiles(_) => "bare_files",
        }
    }

    /// Reduce to the canonical file map
    ///
    /// Every value must be text; one non-text value invalidates the whole
    /// map. Records missing `path` or `content` are dropped.
    ///
    /// # Errors
    /// - [`ShapeError::NonStringValue`] on the first non-text value
    /// - [`ShapeError::InvalidFileMap`] if no entries remain or a key is empty
    pub fn into_file_map(self) -> Result<FileMap, ShapeError> {
        let mut files = FileMap::new();
        match self {
            Self::Keyed(object) | Self::BareFiles(object) => {
                for (key, value) in object {
                    let content = expect_text(&key, value)?;
                    files.insert(normalize_key(&key)?, content);
                }
            }
            Self::Records(records) => {
                for record in records {
                    let Value::Object(mut fields) = record else {
                        tracing::debug!("dropping non-object file record");
                        continue;
                    };
                    let (Some(Value::String(key)), Some(value)) =
                        (fields.remove(PATH_FIELD), fields.remove(CONTENT_FIELD))
                    else {
                        tracing::debug!("dropping file record without path or content");
                        continue;
                    };
                    let content = expect_text(&key, value)?;
                    files.insert(normalize_key(&key)?, content);
                }
            }
        }

        if files.is_empty() {
            return Err(ShapeError::InvalidFileMap("no files".to_string()));
        }
        Ok(files)
    }
}

/// Boundary normalizer: raw producer text in, canonical file map out
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_file_bytes: usize,
}

impl Normalizer {
    /// Create normalizer with a per-file size bound
    #[inline]
    #[must_use]
    pub fn new(max_file_bytes: usize) -> Self {
        Self { max_file_bytes }
    }

    /// Parse, resolve, normalize and screen a raw payload
    ///
    /// # Errors
    /// Returns the first [`ShapeError`] encountered, in the order: JSON,
    /// shape, text values, size, conversational text.
    pub fn normalize(&self, raw: &str) -> Result<FileMap, ShapeError> {
        let value = parse_json_payload(raw)?;
        let shape = PayloadShape::resolve(value)?;
        tracing::debug!(shape = shape.name(), "resolved payload shape");
        let files = shape.into_file_map()?;

        if let Some((path, content)) = files
            .iter()
            .find(|(_, content)| content.len() > self.max_file_bytes)
        {
            return Err(ShapeError::InvalidFileMap(format!(
                "file '{path}' is {} bytes (max: {})",
                content.len(),
                self.max_file_bytes
            )));
        }

        check_conversational(&files)?;
        Ok(files)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

/// Reject script files that read as prose
///
/// # Errors
/// Returns [`ShapeError::Conversational`] naming the first offending file.
pub fn check_conversational(files: &FileMap) -> Result<(), ShapeError> {
    match files
        .iter()
        .find(|(path, content)| FileKind::of(path).is_script() && looks_conversational(content))
    {
        Some((path, _)) => Err(ShapeError::Conversational { path: path.clone() }),
        None => Ok(()),
    }
}

/// Parse producer text as JSON, tolerating one surrounding code fence
///
/// # Errors
/// - [`ShapeError::NotJson`] if the text does not start with `{` or `[`
/// - [`ShapeError::ParseFailed`] if it does but is not valid JSON
pub fn parse_json_payload(raw: &str) -> Result<Value, ShapeError> {
    let body = strip_code_fence(raw).trim();
    if !body.starts_with('{') && !body.starts_with('[') {
        return Err(ShapeError::NotJson);
    }
    serde_json::from_str(body).map_err(|e| ShapeError::ParseFailed(e.to_string()))
}

/// Remove one surrounding Markdown code fence (```` ```json ... ``` ````)
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line. A one-line
    // fence has no newline, so the info string ends where the payload starts.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

fn expect_text(key: &str, value: Value) -> Result<String, ShapeError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(ShapeError::NonStringValue {
            path: key.to_string(),
            found: json_type_name(&other),
        }),
    }
}

fn normalize_key(key: &str) -> Result<SandboxPath, ShapeError> {
    SandboxPath::normalize(key)
        .map_err(|e| ShapeError::InvalidFileMap(format!("key '{key}': {e}")))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> SandboxPath {
        SandboxPath::normalize(raw).unwrap()
    }

    const APP: &str = "export default function App(){return <div>Hi</div>}";

    #[test]
    fn resolves_keyed_envelope() {
        let shape = PayloadShape::resolve(json!({"files": {"/App.tsx": APP}})).unwrap();
        assert_eq!(shape.name(), "keyed");
        let files = shape.into_file_map().unwrap();
        assert_eq!(files.get(&path("/App.tsx")), Some(APP));
    }

    #[test]
    fn resolves_records_bare_and_enveloped() {
        let bare = json!([{"path": "App.tsx", "content": APP}]);
        let wrapped = json!({"files": [{"path": "App.tsx", "content": APP}]});
        for value in [bare, wrapped] {
            let shape = PayloadShape::resolve(value).unwrap();
            assert_eq!(shape.name(), "records");
            assert!(shape.into_file_map().unwrap().contains(&path("/App.tsx")));
        }
    }

    #[test]
    fn records_missing_fields_are_dropped() {
        let value = json!([
            {"path": "/App.tsx", "content": APP},
            {"path": "/storefront/Orphan.tsx"},
            {"content": "export const x = 1;"},
            "not a record"
        ]);
        let files = PayloadShape::resolve(value).unwrap().into_file_map().unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn resolves_bare_path_keyed_object() {
        let shape = PayloadShape::resolve(json!({"storefront/Hero.tsx": APP})).unwrap();
        assert_eq!(shape.name(), "bare_files");
    }

    #[test]
    fn rejects_unknown_shapes() {
        for value in [
            json!("just a string"),
            json!(42),
            json!({"plan": "do things"}),
            json!({"files": "App.tsx"}),
        ] {
            assert!(matches!(
                PayloadShape::resolve(value),
                Err(ShapeError::InvalidFileMap(_))
            ));
        }
    }

    #[test]
    fn rejects_empty_map() {
        let shape = PayloadShape::resolve(json!({"files": {}})).unwrap();
        assert!(matches!(shape.into_file_map(), Err(ShapeError::InvalidFileMap(_))));
    }

    #[test]
    fn one_non_text_value_invalidates_map() {
        let shape = PayloadShape::resolve(json!({"files": {
            "/App.tsx": APP,
            "/storefront/config.ts": {"theme": "dark"}
        }}))
        .unwrap();
        assert_eq!(
            shape.into_file_map(),
            Err(ShapeError::NonStringValue {
                path: "/storefront/config.ts".to_string(),
                found: "an object",
            })
        );
    }

    #[test]
    fn normalizer_distinguishes_not_json_from_parse_failure() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("Here you go!"), Err(ShapeError::NotJson));
        assert_eq!(normalizer.normalize(""), Err(ShapeError::NotJson));
        assert!(matches!(
            normalizer.normalize("{\"files\": {\"/App.tsx\": "),
            Err(ShapeError::ParseFailed(_))
        ));
    }

    #[test]
    fn normalizer_strips_code_fence() {
        let raw = format!("```json\n{}\n```", json!({"/App.tsx": APP}));
        let files = Normalizer::default().normalize(&raw).unwrap();
        assert!(files.contains(&path("/App.tsx")));
    }

    #[test]
    fn normalizer_rejects_oversized_file() {
        let raw = json!({"/App.tsx": APP}).to_string();
        let result = Normalizer::new(10).normalize(&raw);
        assert!(matches!(result, Err(ShapeError::InvalidFileMap(_))));
    }

    #[test]
    fn conversational_check_runs_after_path_normalization() {
        let raw = json!({"storefront/Hero.tsx": "Sure! Here's your hero section..."}).to_string();
        assert_eq!(
            Normalizer::default().normalize(&raw),
            Err(ShapeError::Conversational {
                path: path("/storefront/Hero.tsx")
            })
        );
    }

    #[test]
    fn conversational_check_skips_non_script_files() {
        let raw = json!({
            "/App.tsx": APP,
            "/storefront/theme.css": ".hero { color: red; }",
            "/storefront/notes.md": "Sure, these are notes."
        })
        .to_string();
        assert!(Normalizer::default().normalize(&raw).is_ok());
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn strip_code_fence_handles_one_line_fence() {
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
        assert_eq!(parse_json_payload("```json{\"a\":1}```"), Ok(serde_json::json!({"a": 1})));
    }
}
