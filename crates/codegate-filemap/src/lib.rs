//! Codegate File Maps
//!
//! The canonical representation of a generated source bundle, and the two
//! boundary checks that only need paths and raw text.
//!
//! # Core Concepts
//!
//! - [`SandboxPath`]: normalized absolute path inside the project sandbox
//! - [`FileMap`]: path-to-text mapping every downstream check sees
//! - [`PayloadShape`]: the accepted payload shapes, resolved once
//! - [`Normalizer`]: raw producer text → [`FileMap`], or a [`ShapeError`]
//! - [`IsolationPolicy`]: traversal, restricted-zone and subtree rules
//! - [`Fingerprint`]: Blake3 digest of a committed map
//!
//! # Example
//!
//! ```rust
//! use codegate_filemap::{IsolationMode, IsolationPolicy, Normalizer};
//!
//! let raw = r#"{"storefront/Hero.tsx": "export const Hero = () => <section />;"}"#;
//! let files = Normalizer::default().normalize(raw).unwrap();
//!
//! let report = IsolationPolicy::default().check(&files, IsolationMode::Strict);
//! assert!(report.is_valid());
//! ```

mod conversational;
mod hash;
mod isolation;
mod kind;
mod map;
mod path;
mod shape;

pub use conversational::{looks_conversational, CODE_TOKENS, PROSE_OPENERS};
pub use hash::Fingerprint;
pub use isolation::{
    IsolationMode, IsolationPolicy, IsolationReport, IsolationViolation, DEFAULT_RESTRICTED_ZONES,
    DEFAULT_ROOT_ENTRY_FILE, DEFAULT_WRITABLE_SUBTREE,
};
pub use kind::{looks_like_source_path, FileKind, RECOGNIZED_EXTENSIONS};
pub use map::FileMap;
pub use path::{PathError, SandboxPath, CURRENT_SEGMENT, PARENT_SEGMENT, SEPARATOR};
pub use shape::{
    check_conversational, parse_json_payload, strip_code_fence, Normalizer, PayloadShape,
    ShapeError, DEFAULT_MAX_FILE_BYTES,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
