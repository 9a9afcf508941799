//! Sandbox paths
//!
//! Provides [`SandboxPath`], the canonical key of a [`FileMap`](crate::FileMap).
//! Every path is rooted at the sandbox and starts with exactly one separator.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path separator used inside the sandbox
pub const SEPARATOR: char = '/';

/// Segment that climbs out of its parent directory
pub const PARENT_SEGMENT: &str = "..";

/// Segment that names its own directory
pub const CURRENT_SEGMENT: &str = ".";

/// Absolute path inside the project sandbox
///
/// Always normalized to a single leading separator with forward slashes
/// and no empty or `.` segments, so `App.tsx`, `/./App.tsx`, `\App.tsx`
/// and `//App.tsx` all name the same file. `..` segments are kept for the
/// isolation guard to reject.
///
/// # Examples
/// - `storefront/Hero.tsx` → `/storefront/Hero.tsx`
/// - `///App.tsx` → `/App.tsx`
/// - `/.//admin\Panel.tsx` → `/admin/Panel.tsx`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SandboxPath(String);

impl SandboxPath {
    /// Normalize a raw key into a sandbox path
    ///
    /// # Errors
    /// Returns [`PathError::Empty`] if nothing remains after separators
    /// and `.` segments are removed.
    pub fn normalize(raw: &str) -> Result<Self, PathError> {
        let mut normalized = String::with_capacity(raw.len() + 1);
        for segment in raw
            .split([SEPARATOR, '\\'])
            .filter(|seg| !seg.is_empty() && *seg != CURRENT_SEGMENT)
        {
            normalized.push(SEPARATOR);
            normalized.push_str(segment);
        }
        if normalized.trim_start_matches(SEPARATOR).trim().is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Wrap text already known to be normalized
    pub(crate) fn from_normalized(normalized: &str) -> Self {
        debug_assert!(normalized.starts_with(SEPARATOR) && normalized.len() > 1);
        Self(normalized.to_string())
    }

    /// Full path text, including the leading separator
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments after the leading separator
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split(SEPARATOR)
    }

    /// Top-level directory (or file name for root-level files)
    #[inline]
    #[must_use]
    pub fn first_segment(&self) -> Option<&str> {
        self.segments().next()
    }

    /// Final path segment
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.segments().last().unwrap_or_default()
    }

    /// Extension of the file name, without the dot
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Check whether any segment climbs to a parent directory
    #[inline]
    #[must_use]
    pub fn has_parent_traversal(&self) -> bool {
        self.segments().any(|seg| seg == PARENT_SEGMENT)
    }

    /// Check whether the path lives under `prefix`
    ///
    /// `prefix` is compared textually and is expected to end with a separator.
    #[inline]
    #[must_use]
    pub fn is_under(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Display for SandboxPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SandboxPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for SandboxPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<SandboxPath> for String {
    fn from(path: SandboxPath) -> Self {
        path.0
    }
}

impl AsRef<str> for SandboxPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors related to sandbox paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing left after normalization
    #[error("path is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_single_leading_separator() {
        assert_eq!(SandboxPath::normalize("App.tsx").unwrap().as_str(), "/App.tsx");
        assert_eq!(SandboxPath::normalize("/App.tsx").unwrap().as_str(), "/App.tsx");
        assert_eq!(SandboxPath::normalize("///App.tsx").unwrap().as_str(), "/App.tsx");
    }

    #[test]
    fn normalize_rejects_empty() {
        assert_eq!(SandboxPath::normalize(""), Err(PathError::Empty));
        assert_eq!(SandboxPath::normalize("///"), Err(PathError::Empty));
        assert_eq!(SandboxPath::normalize("/  "), Err(PathError::Empty));
    }

    #[test]
    fn normalize_drops_current_and_empty_segments() {
        assert_eq!(SandboxPath::normalize("/./App.tsx").unwrap().as_str(), "/App.tsx");
        assert_eq!(
            SandboxPath::normalize("/.//payments/./Stripe.ts").unwrap().as_str(),
            "/payments/Stripe.ts"
        );
        assert_eq!(SandboxPath::normalize("./.").unwrap_err(), PathError::Empty);
    }

    #[test]
    fn normalize_maps_backslashes_to_separators() {
        let path = SandboxPath::normalize("\\admin\\Panel.tsx").unwrap();
        assert_eq!(path.as_str(), "/admin/Panel.tsx");
        assert_eq!(path.first_segment(), Some("admin"));
    }

    #[test]
    fn normalize_keeps_parent_segments() {
        let path = SandboxPath::normalize("/storefront/./../auth/Login.tsx").unwrap();
        assert_eq!(path.as_str(), "/storefront/../auth/Login.tsx");
        assert!(path.has_parent_traversal());
    }

    #[test]
    fn segments_and_first_segment() {
        let path = SandboxPath::normalize("storefront/sections/Hero.tsx").unwrap();
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec!["storefront", "sections", "Hero.tsx"]);
        assert_eq!(path.first_segment(), Some("storefront"));
        assert_eq!(path.file_name(), "Hero.tsx");
    }

    #[test]
    fn extension_of_file_name_only() {
        let path = SandboxPath::normalize("/storefront.v2/README").unwrap();
        assert_eq!(path.extension(), None);

        let path = SandboxPath::normalize("/styles/site.module.css").unwrap();
        assert_eq!(path.extension(), Some("css"));

        let path = SandboxPath::normalize("/.env").unwrap();
        assert_eq!(path.extension(), None);
    }

    #[test]
    fn detects_parent_traversal() {
        assert!(SandboxPath::normalize("/storefront/../auth/Login.tsx")
            .unwrap()
            .has_parent_traversal());
        assert!(SandboxPath::normalize("/storefront\\..\\admin.tsx")
            .unwrap()
            .has_parent_traversal());
        assert!(!SandboxPath::normalize("/storefront/..hidden.tsx")
            .unwrap()
            .has_parent_traversal());
    }

    #[test]
    fn serde_normalizes_on_deserialize() {
        let path: SandboxPath = serde_json::from_str("\"storefront/Hero.tsx\"").unwrap();
        assert_eq!(path.as_str(), "/storefront/Hero.tsx");
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/storefront/Hero.tsx\"");
    }
}
