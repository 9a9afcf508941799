//! Gate configuration
//!
//! Loaded from TOML; every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! writable_subtree = "/storefront/"
//! root_entry_file = "/App.tsx"
//! restricted_zones = ["core", "auth", "payments", "admin", "settings", "checkout", "api"]
//! max_file_bytes = 524288
//! processed_history = 256
//! ```

use crate::error::ConfigError;
use codegate_filemap::{
    IsolationPolicy, Normalizer, SandboxPath, DEFAULT_MAX_FILE_BYTES, DEFAULT_RESTRICTED_ZONES,
    DEFAULT_ROOT_ENTRY_FILE, DEFAULT_WRITABLE_SUBTREE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of processed attempt ids a session remembers
pub const DEFAULT_PROCESSED_HISTORY: usize = 256;

/// Commit gate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Directory prefix attempts are confined to in strict mode
    pub writable_subtree: String,
    /// File whose presence makes an attempt a full replacement
    pub root_entry_file: String,
    /// Top-level zones no attempt may write to
    pub restricted_zones: Vec<String>,
    /// Largest accepted file, in bytes
    pub max_file_bytes: usize,
    /// Processed attempt ids remembered per session
    pub processed_history: usize,
}

impl GateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With writable subtree
    #[inline]
    #[must_use]
    pub fn with_writable_subtree(mut self, subtree: impl Into<String>) -> Self {
        self.writable_subtree = subtree.into();
        self
    }

    /// With root entry file
    #[inline]
    #[must_use]
    pub fn with_root_entry_file(mut self, path: impl Into<String>) -> Self {
        self.root_entry_file = path.into();
        self
    }

    /// With restricted zones
    #[inline]
    #[must_use]
    pub fn with_restricted_zones(mut self, zones: Vec<String>) -> Self {
        self.restricted_zones = zones;
        self
    }

    /// With max file size
    #[inline]
    #[must_use]
    pub fn with_max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// With processed-id history size
    #[inline]
    #[must_use]
    pub fn with_processed_history(mut self, history: usize) -> Self {
        self.processed_history = history;
        self
    }

    /// Parse from TOML text and validate
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GateConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded gate config");
        Ok(config)
    }

    /// Check invariants
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the subtree is not a `/…/`
    /// prefix, the root entry is not absolute, the subtree lies inside a
    /// restricted zone, or a size bound is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let subtree = &self.writable_subtree;
        if subtree.len() < 3 || !subtree.starts_with('/') || !subtree.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "writable_subtree must look like '/dir/', got '{subtree}'"
            )));
        }
        if !self.root_entry_file.starts_with('/') || self.root_entry_file.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(format!(
                "root_entry_file must be an absolute file path, got '{}'",
                self.root_entry_file
            )));
        }
        let subtree_root = subtree.trim_matches('/').split('/').next().unwrap_or_default();
        if let Some(zone) = self
            .restricted_zones
            .iter()
            .find(|zone| zone.eq_ignore_ascii_case(subtree_root))
        {
            return Err(ConfigError::Invalid(format!(
                "writable_subtree '{subtree}' lies inside restricted zone '{zone}'"
            )));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("max_file_bytes must be positive".to_string()));
        }
        if self.processed_history == 0 {
            return Err(ConfigError::Invalid("processed_history must be positive".to_string()));
        }
        Ok(())
    }

    /// Isolation policy described by this config
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the root entry file is empty.
    pub fn isolation_policy(&self) -> Result<IsolationPolicy, ConfigError> {
        let root_entry = SandboxPath::normalize(&self.root_entry_file)
            .map_err(|e| ConfigError::Invalid(format!("root_entry_file: {e}")))?;
        Ok(IsolationPolicy::new(
            self.writable_subtree.clone(),
            root_entry,
            self.restricted_zones.iter().cloned(),
        ))
    }

    /// Payload normalizer described by this config
    #[inline]
    #[must_use]
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.max_file_bytes)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            writable_subtree: DEFAULT_WRITABLE_SUBTREE.to_string(),
            root_entry_file: DEFAULT_ROOT_ENTRY_FILE.to_string(),
            restricted_zones: DEFAULT_RESTRICTED_ZONES
                .iter()
                .map(|zone| (*zone).to_string())
                .collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            processed_history: DEFAULT_PROCESSED_HISTORY,
        }
    }
}
