//! File kinds
//!
//! Classifies sandbox paths by extension so each check knows whether a file
//! is script, markup-bearing script, stylesheet, or opaque data.

use crate::path::SandboxPath;

/// Extensions that mark a key as a source file path
///
/// Used to recognize bare path-keyed payloads that omit the `files` envelope.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "css", "scss"];

/// Kind of file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// TypeScript without markup (`.ts`)
    TypeScript,
    /// TypeScript with JSX markup (`.tsx`)
    TypeScriptJsx,
    /// JavaScript without markup (`.js`, `.mjs`, `.cjs`)
    JavaScript,
    /// JavaScript with JSX markup (`.jsx`)
    JavaScriptJsx,
    /// Stylesheets (`.css`, `.scss`)
    Stylesheet,
    /// Anything else (data, images, docs); never lexically checked
    Other,
}

impl FileKind {
    /// Classify an extension (case-insensitive, without the dot)
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" => Self::TypeScript,
            "tsx" => Self::TypeScriptJsx,
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "jsx" => Self::JavaScriptJsx,
            "css" | "scss" => Self::Stylesheet,
            _ => Self::Other,
        }
    }

    /// Classify a sandbox path
    #[inline]
    #[must_use]
    pub fn of(path: &SandboxPath) -> Self {
        path.extension().map_or(Self::Other, Self::from_extension)
    }

    /// Source-like files get the lexical checks
    #[inline]
    #[must_use]
    pub fn is_source(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Script files must read as code, not prose
    #[inline]
    #[must_use]
    pub fn is_script(self) -> bool {
        matches!(
            self,
            Self::TypeScript | Self::TypeScriptJsx | Self::JavaScript | Self::JavaScriptJsx
        )
    }

    /// Files that may contain JSX markup and get the tag balance check
    #[inline]
    #[must_use]
    pub fn has_markup(self) -> bool {
        matches!(self, Self::TypeScriptJsx | Self::JavaScriptJsx)
    }

    /// Human-readable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::TypeScriptJsx => "tsx",
            Self::JavaScript => "javascript",
            Self::JavaScriptJsx => "jsx",
            Self::Stylesheet => "stylesheet",
            Self::Other => "other",
        }
    }
}

/// Check whether a raw key ends in a recognized source/style extension
#[must_use]
pub fn looks_like_source_path(key: &str) -> bool {
    key.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && RECOGNIZED_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
    })
}
