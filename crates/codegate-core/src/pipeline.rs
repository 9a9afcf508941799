//! Ordered validation pipeline
//!
//! Shape, then syntax, then isolation. Each layer assumes the previous
//! layer's postcondition (isolation only ever sees a normalized, all-text
//! map), and the first failing layer's verdict is final.

use crate::config::GateConfig;
use crate::error::ConfigError;
use crate::reason::Rejection;
use codegate_filemap::{FileMap, IsolationMode, IsolationPolicy, Normalizer, ShapeError};
use codegate_lexical::validate_all;
use serde::Serialize;

/// Log target for security-class rejections
pub const SECURITY_TARGET: &str = "codegate::security";

/// How the committed map relates to the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitMode {
    /// Attempt carried the root entry file and replaces everything
    FullReplace,
    /// Attempt was overlaid on the snapshot
    DeltaMerge {
        /// Snapshot files kept unchanged
        carried: usize,
    },
}

/// File map that will actually be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    /// Final files
    pub files: FileMap,
    /// Replace or merge
    pub mode: CommitMode,
}

/// The three gate layers plus commit planning
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    policy: IsolationPolicy,
}

impl Pipeline {
    /// Create pipeline from its parts
    #[inline]
    #[must_use]
    pub fn new(normalizer: Normalizer, policy: IsolationPolicy) -> Self {
        Self { normalizer, policy }
    }

    /// Create pipeline described by a config
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the config is invalid.
    pub fn from_config(config: &GateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.normalizer(), config.isolation_policy()?))
    }

    /// Isolation policy in force
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        &self.policy
    }

    /// Layer 1: parse and normalize the raw result
    ///
    /// An absent result is treated like empty text (`not_json`).
    ///
    /// # Errors
    /// Returns the shape-layer [`Rejection`].
    pub fn shape(&self, raw: Option<&str>) -> Result<FileMap, Rejection> {
        let Some(raw) = raw else {
            return Err(Rejection::from_shape(&ShapeError::NotJson));
        };
        self.normalizer
            .normalize(raw)
            .map_err(|e| Rejection::from_shape(&e))
    }

    /// Layer 2: per-file lexical checks
    ///
    /// # Errors
    /// Returns the syntax-layer [`Rejection`] listing every failing file.
    pub fn syntax(&self, files: &FileMap) -> Result<(), Rejection> {
        let report = validate_all(files);
        if report.is_valid() {
            Ok(())
        } else {
            Err(Rejection::from_syntax(&report.errors))
        }
    }

    /// Isolation mode implied by the existing snapshot
    #[inline]
    #[must_use]
    pub fn isolation_mode(&self, snapshot: Option<&FileMap>) -> IsolationMode {
        self.policy.mode_for_snapshot(snapshot)
    }

    /// Layer 3: path isolation
    ///
    /// Every violation is logged under [`SECURITY_TARGET`].
    ///
    /// # Errors
    /// Returns the isolation-layer [`Rejection`] listing every offending path.
    pub fn isolation(&self, files: &FileMap, mode: IsolationMode) -> Result<(), Rejection> {
        let report = self.policy.check(files, mode);
        if report.is_valid() {
            return Ok(());
        }
        for (path, violation) in &report.errors {
            tracing::warn!(
                target: SECURITY_TARGET,
                path = %path,
                mode = ?mode,
                "isolation violation: {violation}"
            );
        }
        Err(Rejection::from_isolation(&report.errors))
    }

    /// Run all three layers in order
    ///
    /// # Errors
    /// Returns the first failing layer's [`Rejection`].
    pub fn evaluate(&self, raw: Option<&str>, snapshot: Option<&FileMap>) -> Result<FileMap, Rejection> {
        let files = self.shape(raw)?;
        self.syntax(&files)?;
        self.isolation(&files, self.isolation_mode(snapshot))?;
        Ok(files)
    }

    /// Decide between full replacement and delta merge
    ///
    /// A map without the root entry file is a delta: it is overlaid on the
    /// snapshot, attempt winning on collisions.
    #[must_use]
    pub fn plan_commit(&self, files: FileMap, snapshot: Option<&FileMap>) -> CommitPlan {
        if files.contains(self.policy.root_entry_file()) {
            return CommitPlan {
                files,
                mode: CommitMode::FullReplace,
            };
        }
        let empty = FileMap::new();
        let merged = files.merged_over(snapshot.unwrap_or(&empty));
        let carried = merged.len() - files.len();
        CommitPlan {
            files: merged,
            mode: CommitMode::DeltaMerge { carried },
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Normalizer::default(), IsolationPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::{Layer, RejectionCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn absent_result_is_not_json() {
        let rejection = Pipeline::default().shape(None).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::NotJson);
        assert_eq!(rejection.layer, Layer::Shape);
    }

    #[test]
    fn shape_runs_before_syntax() {
        // Prose that is also unbalanced: the shape layer reports it first.
        let raw = json!({"/storefront/A.tsx": "Sure! {"}).to_string();
        let rejection = Pipeline::default().evaluate(Some(&raw), None).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::ConversationalText);
    }

    #[test]
    fn syntax_runs_before_isolation() {
        let raw = json!({"/admin/Panel.tsx": "export const P = () => <div>{"}).to_string();
        let rejection = Pipeline::default().evaluate(Some(&raw), None).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::SyntaxErrors);
    }

    #[test]
    fn legacy_snapshot_relaxes_subtree_rule() {
        let raw = json!({"/components/Nav.tsx": "export const Nav = () => <nav />;"}).to_string();
        let pipeline = Pipeline::default();

        let strict = pipeline.evaluate(Some(&raw), None).unwrap_err();
        assert_eq!(strict.code, RejectionCode::PathIsolation);

        let legacy = FileMap::from_raw_pairs([("/components/Old.tsx", "export {}")]).unwrap();
        assert!(pipeline.evaluate(Some(&raw), Some(&legacy)).is_ok());
    }

    #[test]
    fn plan_full_replace_when_root_entry_present() {
        let files = FileMap::from_raw_pairs([("/App.tsx", "export {}")]).unwrap();
        let snapshot = FileMap::from_raw_pairs([("/storefront/Old.tsx", "export {}")]).unwrap();
        let plan = Pipeline::default().plan_commit(files.clone(), Some(&snapshot));
        assert_eq!(plan.mode, CommitMode::FullReplace);
        assert_eq!(plan.files, files);
    }

    #[test]
    fn plan_delta_merge_counts_carried_files() {
        let files = FileMap::from_raw_pairs([("/storefront/Hero.tsx", "new")]).unwrap();
        let snapshot = FileMap::from_raw_pairs([
            ("/App.tsx", "app"),
            ("/storefront/Hero.tsx", "old"),
            ("/storefront/Footer.tsx", "footer"),
        ])
        .unwrap();
        let plan = Pipeline::default().plan_commit(files, Some(&snapshot));
        assert_eq!(plan.mode, CommitMode::DeltaMerge { carried: 2 });
        assert_eq!(plan.files.len(), 3);
    }

    #[test]
    fn plan_delta_without_snapshot() {
        let files = FileMap::from_raw_pairs([("/storefront/Hero.tsx", "new")]).unwrap();
        let plan = Pipeline::default().plan_commit(files.clone(), None);
        assert_eq!(plan.mode, CommitMode::DeltaMerge { carried: 0 });
        assert_eq!(plan.files, files);
    }
}
