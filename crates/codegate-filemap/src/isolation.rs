//! Path isolation guard
//!
//! The security boundary between a producer and the project sandbox. Three
//! rules, applied per path:
//!
//! 1. No parent-traversal segment, in every mode.
//! 2. No write into a restricted top-level zone, in every mode.
//! 3. In [`IsolationMode::Strict`], the path must lie under the writable
//!    subtree or be exactly the root entry file.

use crate::map::FileMap;
use crate::path::SandboxPath;

/// Default writable subtree for generated files
pub const DEFAULT_WRITABLE_SUBTREE: &str = "/storefront/";

/// Default root entry file
pub const DEFAULT_ROOT_ENTRY_FILE: &str = "/App.tsx";

/// Top-level zones no attempt may write to
pub const DEFAULT_RESTRICTED_ZONES: &[&str] = &[
    "core", "auth", "payments", "admin", "settings", "checkout", "api",
];

/// Isolation strictness for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMode {
    /// Every path must be under the writable subtree or be the root entry
    Strict,
    /// The subtree rule is relaxed for projects whose snapshot predates it
    Legacy,
}

/// Why a single path was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsolationViolation {
    /// Path climbs out of its directory
    #[error("path contains a parent-directory segment")]
    ParentTraversal,

    /// Path targets a restricted zone
    #[error("path targets restricted zone '{zone}'")]
    RestrictedZone {
        /// Zone as configured
        zone: String,
    },

    /// Path is outside the writable subtree (strict mode only)
    #[error("path is outside the writable subtree '{subtree}'")]
    OutsideWritableSubtree {
        /// Configured subtree prefix
        subtree: String,
    },
}

/// Aggregate verdict over a whole file map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsolationReport {
    /// Every path offending, in path order
    pub errors: Vec<(SandboxPath, IsolationViolation)>,
}

impl IsolationReport {
    /// True when no path was refused
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Sandbox rules for one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationPolicy {
    writable_subtree: String,
    root_entry_file: SandboxPath,
    restricted_zones: Vec<String>,
}

impl IsolationPolicy {
    /// Create a policy
    ///
    /// `writable_subtree` should be a `/…/` prefix; a missing trailing
    /// separator is added so `/storefront` does not admit `/storefront-x`.
    #[must_use]
    pub fn new(
        writable_subtree: impl Into<String>,
        root_entry_file: SandboxPath,
        restricted_zones: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut writable_subtree = writable_subtree.into();
        if !writable_subtree.ends_with('/') {
            writable_subtree.push('/');
        }
        if !writable_subtree.starts_with('/') {
            writable_subtree.insert(0, '/');
        }
        Self {
            writable_subtree,
            root_entry_file,
            restricted_zones: restricted_zones.into_iter().map(Into::into).collect(),
        }
    }

    /// Writable subtree prefix
    #[inline]
    #[must_use]
    pub fn writable_subtree(&self) -> &str {
        &self.writable_subtree
    }

    /// Root entry file whose presence marks a full replacement
    #[inline]
    #[must_use]
    pub fn root_entry_file(&self) -> &SandboxPath {
        &self.root_entry_file
    }

    /// Restricted zones
    #[inline]
    #[must_use]
    pub fn restricted_zones(&self) -> &[String] {
        &self.restricted_zones
    }

    /// Choose the mode for an attempt from the project's existing snapshot
    ///
    /// Legacy mode applies only when the snapshot already holds a file that
    /// strict mode would refuse; a missing snapshot means strict.
    #[must_use]
    pub fn mode_for_snapshot(&self, snapshot: Option<&FileMap>) -> IsolationMode {
        let predates_subtree = snapshot.is_some_and(|snapshot| {
            snapshot.paths().any(|path| !self.is_in_sandbox(path))
        });
        if predates_subtree {
            IsolationMode::Legacy
        } else {
            IsolationMode::Strict
        }
    }

    /// Check one path
    ///
    /// # Errors
    /// Returns the first rule the path breaks.
    pub fn check_path(&self, path: &SandboxPath, mode: IsolationMode) -> Result<(), IsolationViolation> {
        if path.has_parent_traversal() {
            return Err(IsolationViolation::ParentTraversal);
        }
        if let Some(zone) = self.restricted_zone_of(path) {
            return Err(IsolationViolation::RestrictedZone { zone: zone.to_string() });
        }
        if mode == IsolationMode::Strict && !self.is_in_sandbox(path) {
            return Err(IsolationViolation::OutsideWritableSubtree {
                subtree: self.writable_subtree.clone(),
            });
        }
        Ok(())
    }

    /// Check every path of a file map
    #[must_use]
    pub fn check(&self, files: &FileMap, mode: IsolationMode) -> IsolationReport {
        let errors = files
            .paths()
            .filter_map(|path| {
                self.check_path(path, mode)
                    .err()
                    .map(|violation| (path.clone(), violation))
            })
            .collect();
        IsolationReport { errors }
    }

    fn is_in_sandbox(&self, path: &SandboxPath) -> bool {
        path.is_under(&self.writable_subtree) || *path == self.root_entry_file
    }

    fn restricted_zone_of(&self, path: &SandboxPath) -> Option<&str> {
        let first = path.first_segment()?;
        self.restricted_zones
            .iter()
            .find(|zone| zone.eq_ignore_ascii_case(first))
            .map(String::as_str)
    }
}

impl Default for IsolationPolicy {
    fn default() -> Self {
        Self {
            writable_subtree: DEFAULT_WRITABLE_SUBTREE.to_string(),
            root_entry_file: SandboxPath::from_normalized(DEFAULT_ROOT_ENTRY_FILE),
            restricted_zones: DEFAULT_RESTRICTED_ZONES.iter().map(|z| (*z).to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> SandboxPath {
        SandboxPath::normalize(raw).unwrap()
    }

    fn map(keys: &[&str]) -> FileMap {
        FileMap::from_raw_pairs(keys.iter().map(|k| (*k, "export {}"))).unwrap()
    }

    #[test]
    fn strict_accepts_subtree_and_root_entry() {
        let policy = IsolationPolicy::default();
        let report = policy.check(
            &map(&["/App.tsx", "/storefront/Hero.tsx", "/storefront/sections/Grid.tsx"]),
            IsolationMode::Strict,
        );
        assert!(report.is_valid());
    }

    #[test]
    fn strict_refuses_paths_outside_subtree() {
        let policy = IsolationPolicy::default();
        let report = policy.check(&map(&["/components/Nav.tsx", "/storefront-x/A.tsx"]), IsolationMode::Strict);
        assert_eq!(report.errors.len(), 2);
        assert!(report
            .errors
            .iter()
            .all(|(_, v)| matches!(v, IsolationViolation::OutsideWritableSubtree { .. })));
    }

    #[test]
    fn legacy_relaxes_only_the_subtree_rule() {
        let policy = IsolationPolicy::default();
        let files = map(&["/components/Nav.tsx", "/admin/Panel.tsx", "/storefront/../api/x.ts"]);
        let report = policy.check(&files, IsolationMode::Legacy);
        assert_eq!(
            report.errors,
            vec![
                (
                    path("/admin/Panel.tsx"),
                    IsolationViolation::RestrictedZone { zone: "admin".to_string() }
                ),
                (path("/storefront/../api/x.ts"), IsolationViolation::ParentTraversal),
            ]
        );
    }

    #[test]
    fn restricted_zones_match_case_insensitively() {
        let policy = IsolationPolicy::default();
        assert_eq!(
            policy.check_path(&path("/Payments/Stripe.ts"), IsolationMode::Legacy),
            Err(IsolationViolation::RestrictedZone { zone: "payments".to_string() })
        );
        assert!(policy
            .check_path(&path("/storefront/admin/Panel.tsx"), IsolationMode::Strict)
            .is_ok());
    }

    #[test]
    fn mode_follows_existing_snapshot() {
        let policy = IsolationPolicy::default();
        assert_eq!(policy.mode_for_snapshot(None), IsolationMode::Strict);
        assert_eq!(
            policy.mode_for_snapshot(Some(&map(&["/App.tsx", "/storefront/Hero.tsx"]))),
            IsolationMode::Strict
        );
        assert_eq!(
            policy.mode_for_snapshot(Some(&map(&["/App.tsx", "/components/Old.tsx"]))),
            IsolationMode::Legacy
        );
    }

    #[test]
    fn new_completes_subtree_prefix() {
        let policy = IsolationPolicy::new("shop", path("/App.tsx"), ["admin"]);
        assert_eq!(policy.writable_subtree(), "/shop/");
    }
}
