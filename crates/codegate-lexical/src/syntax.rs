//! Per-file syntax sanity checks
//!
//! Composes the scanner into a verdict for one file. Checks run in a fixed
//! order and stop at the first failure:
//!
//! 1. emptiness
//! 2. delimiter balance (extra closer first, then end totals)
//! 3. literal termination
//! 4. truncated tail
//! 5. malformed nested `url(...)`
//! 6. tag balance (markup-bearing kinds only)
//!
//! A file whose counts end positive while its tail dangles on an operator is
//! reported as truncated rather than unbalanced: the imbalance is a symptom
//! of the interrupted producer, not a separate defect.

use crate::scanner::{scan, Delimiter, OpenLiteral, Quote};
use crate::tags::{check_balance, TagImbalance};
use codegate_filemap::{FileKind, FileMap, SandboxPath};
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that cannot end a complete source file
pub const DANGLING_TAIL: &[char] = &['{', '(', '[', ',', ':', '=', '.', '+', '-', '*', '/'];

/// `url(` directly followed by another `(` or a nested `url(`
static MALFORMED_URL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:\(|['"`]?\s*url\()"#)
        .unwrap_or_else(|e| unreachable!("literal pattern compiles: {e}"))
});

/// A specific reason a file failed the sanity checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxIssue {
    /// Zero-length or whitespace-only file
    #[error("file is empty")]
    Empty,

    /// A closer arrived with nothing open
    #[error("unexpected '{}' on line {line}", .delimiter.close())]
    UnexpectedCloser {
        /// Delimiter kind
        delimiter: Delimiter,
        /// 1-based line
        line: usize,
    },

    /// End total is not zero
    #[error("{}", imbalance_message(.delimiter, .delta))]
    Imbalance {
        /// Delimiter kind
        delimiter: Delimiter,
        /// Openers minus closers
        delta: i64,
    },

    /// Quoted string never closed
    #[error("unterminated string literal ({})", quote_name(.quote))]
    UnterminatedString {
        /// Quote that opened it
        quote: Quote,
    },

    /// Block comment never closed
    #[error("unterminated block comment")]
    UnterminatedComment,

    /// Odd number of template delimiters
    #[error("unterminated template literal")]
    UnterminatedTemplate,

    /// Tail ends on a dangling operator
    #[error("output looks truncated (ends with '{last}')")]
    Truncated {
        /// Final significant character
        last: char,
    },

    /// Duplicated `url(` artifact
    #[error("malformed nested url(...) call")]
    MalformedUrlCall,

    /// Closing tag with nothing open
    #[error("closing tag </{name}> has no matching open tag")]
    UnexpectedClosingTag {
        /// Tag name, empty for a fragment
        name: String,
    },

    /// Tags left open at end of file
    #[error("{count} unclosed tag(s)")]
    UnclosedTags {
        /// Number of open tags
        count: usize,
    },
}

fn imbalance_message(delimiter: &Delimiter, delta: &i64) -> String {
    if *delta > 0 {
        format!("{delta} unclosed {delimiter}")
    } else {
        format!("{} extra closing {delimiter}", delta.unsigned_abs())
    }
}

fn quote_name(quote: &Quote) -> &'static str {
    match quote {
        Quote::Single => "single-quoted",
        Quote::Double => "double-quoted",
    }
}

impl From<TagImbalance> for SyntaxIssue {
    fn from(imbalance: TagImbalance) -> Self {
        match imbalance {
            TagImbalance::UnexpectedClose { name } => SyntaxIssue::UnexpectedClosingTag { name },
            TagImbalance::Unclosed { count } => SyntaxIssue::UnclosedTags { count },
        }
    }
}

/// Validate one file
///
/// Files whose extension is not source-like are never lexically checked
/// and always pass.
#[must_use]
pub fn validate(content: &str, path: &SandboxPath) -> Option<SyntaxIssue> {
    let kind = FileKind::of(path);
    if !kind.is_source() {
        return None;
    }
    check_source(content, kind).err()
}

fn check_source(content: &str, kind: FileKind) -> Result<(), SyntaxIssue> {
    if content.trim().is_empty() {
        return Err(SyntaxIssue::Empty);
    }

    let report = scan(content);
    let counts = report.counts();
    let dangling = report
        .last_significant_char()
        .filter(|c| DANGLING_TAIL.contains(c));

    if let Some(underflow) = report.first_underflow() {
        return Err(SyntaxIssue::UnexpectedCloser {
            delimiter: underflow.delimiter,
            line: underflow.line,
        });
    }

    if let Some(last) = dangling.filter(|_| counts.total() > 0) {
        return Err(SyntaxIssue::Truncated { last });
    }

    if let Some(delimiter) = Delimiter::ALL.into_iter().find(|d| counts.get(*d) != 0) {
        return Err(SyntaxIssue::Imbalance {
            delimiter,
            delta: counts.get(delimiter),
        });
    }

    match report.open_literal() {
        Some(OpenLiteral::String(quote)) => return Err(SyntaxIssue::UnterminatedString { quote }),
        Some(OpenLiteral::BlockComment) => return Err(SyntaxIssue::UnterminatedComment),
        None => {}
    }
    if report.has_open_template() {
        return Err(SyntaxIssue::UnterminatedTemplate);
    }

    if let Some(last) = dangling {
        return Err(SyntaxIssue::Truncated { last });
    }

    if MALFORMED_URL_CALL.is_match(content) {
        return Err(SyntaxIssue::MalformedUrlCall);
    }

    if kind.has_markup() {
        check_balance(report.masked())?;
    }

    Ok(())
}

/// Aggregate verdict over a file map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxReport {
    /// Every failing file with its reason, in path order
    pub errors: Vec<(SandboxPath, SyntaxIssue)>,
}

impl SyntaxReport {
    /// Valid only when no file failed
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate every file of a map
#[must_use]
pub fn validate_all(files: &FileMap) -> SyntaxReport {
    let errors: Vec<_> = files
        .iter()
        .filter_map(|(path, content)| validate(content, path).map(|issue| (path.clone(), issue)))
        .collect();

    if !errors.is_empty() {
        tracing::debug!(
            files = files.len(),
            failing = errors.len(),
            "syntax validation found issues"
        );
    }
    SyntaxReport { errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check(path: &str, content: &str) -> Option<SyntaxIssue> {
        validate(content, &SandboxPath::normalize(path).unwrap())
    }

    #[test]
    fn valid_component_passes() {
        assert_eq!(
            check("/App.tsx", "export default function App(){return <div>Hi</div>}"),
            None
        );
    }

    #[test]
    fn non_source_files_skip_checks() {
        assert_eq!(check("/data.json", ""), None);
        assert_eq!(check("/README.md", "{{{"), None);
    }

    #[test]
    fn empty_file_rejected() {
        assert_eq!(check("/storefront/A.ts", "  \n\t"), Some(SyntaxIssue::Empty));
    }

    #[test]
    fn extra_closer_reported_with_line() {
        assert_eq!(
            check("/storefront/a.ts", "const a = 1;\n}\n{"),
            Some(SyntaxIssue::UnexpectedCloser {
                delimiter: Delimiter::Brace,
                line: 2
            })
        );
    }

    #[test]
    fn end_imbalance_reported() {
        let issue = check("/storefront/a.ts", "function f() {\n  return [1, 2;\n}\n").unwrap();
        assert_eq!(
            issue,
            SyntaxIssue::Imbalance {
                delimiter: Delimiter::Bracket,
                delta: 1
            }
        );
        assert_eq!(issue.to_string(), "1 unclosed brackets");
    }

    #[test]
    fn dangling_open_brace_reads_as_truncation() {
        let issue = check(
            "/storefront/Hero.tsx",
            "export const Hero = () => <section>{",
        )
        .unwrap();
        assert_eq!(issue, SyntaxIssue::Truncated { last: '{' });
    }

    #[test]
    fn dangling_operator_with_balanced_counts() {
        assert_eq!(
            check("/storefront/a.js", "const total = a +"),
            Some(SyntaxIssue::Truncated { last: '+' })
        );
    }

    #[test]
    fn literal_termination() {
        assert_eq!(
            check("/storefront/a.ts", "const s = \"open;"),
            Some(SyntaxIssue::UnterminatedString {
                quote: Quote::Double
            })
        );
        assert_eq!(
            check("/storefront/a.ts", "const a = 1; /* note"),
            Some(SyntaxIssue::UnterminatedComment)
        );
        assert_eq!(
            check("/storefront/a.ts", "const t = `hello;"),
            Some(SyntaxIssue::UnterminatedTemplate)
        );
    }

    #[test]
    fn malformed_url_call() {
        assert_eq!(
            check(
                "/storefront/theme.css",
                ".hero { background: url(url('/img/a.png')); }"
            ),
            Some(SyntaxIssue::MalformedUrlCall)
        );
        assert_eq!(
            check("/storefront/theme.css", ".hero { background: url('/img/a.png'); }"),
            None
        );
    }

    #[test]
    fn tag_balance_only_for_markup_kinds() {
        let content = "export const A = () => <section><div></div>;";
        assert_eq!(
            check("/storefront/A.tsx", content),
            Some(SyntaxIssue::UnclosedTags { count: 1 })
        );
        assert_eq!(check("/storefront/A.ts", content), None);
    }

    #[test]
    fn braces_in_strings_and_comments_ignored() {
        let content = "// {\nexport const s = '{[(';\n/* ) */\n";
        assert_eq!(check("/storefront/a.ts", content), None);
    }

    #[test]
    fn validate_all_aggregates() {
        let files = FileMap::from_raw_pairs([
            ("/App.tsx", "export default function App(){return <div>Hi</div>}"),
            ("/storefront/Bad.tsx", "export const Bad = () => <section>{"),
            ("/storefront/Empty.ts", ""),
        ])
        .unwrap();

        let report = validate_all(&files);

        assert!(!report.is_valid());
        let failing: Vec<_> = report.errors.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(failing, vec!["/storefront/Bad.tsx", "/storefront/Empty.ts"]);
    }
}
