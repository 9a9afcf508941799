//! Codegate Lexical Checks
//!
//! Defense-in-depth sanity checks over generated source text. Code is treated
//! as opaque text: nothing here builds an AST.
//!
//! - [`scan`]: one pass through the five lexical modes, producing masked
//!   text and delimiter counters
//! - [`validate`]: per-file verdict, first failing check wins
//! - [`validate_all`]: aggregate verdict over a [`FileMap`](codegate_filemap::FileMap)
//!
//! # Example
//!
//! ```rust
//! use codegate_filemap::SandboxPath;
//! use codegate_lexical::{validate, SyntaxIssue};
//!
//! let path = SandboxPath::normalize("/storefront/Hero.tsx").unwrap();
//! let issue = validate("export const Hero = () => <section>{", &path);
//! assert_eq!(issue, Some(SyntaxIssue::Truncated { last: '{' }));
//! ```

mod scanner;
mod syntax;
mod tags;

pub use scanner::{
    scan, Delimiter, DelimiterCounts, OpenLiteral, Quote, ScanReport, Underflow,
};
pub use syntax::{validate, validate_all, SyntaxIssue, SyntaxReport, DANGLING_TAIL};
pub use tags::{check_balance, TagImbalance, VOID_ELEMENTS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
