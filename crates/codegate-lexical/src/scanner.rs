//! Single-pass lexical scanner
//!
//! Walks source text once, character by character, through five mutually
//! exclusive modes. The walk produces:
//!
//! - a masked copy of the input where string and comment contents are
//!   blanked (newlines kept), so structural checks never fire on text that
//!   only looks like code
//! - running counters for `{}`, `()` and `[]`
//! - the first point where a closer had no opener
//! - literal termination state at end of input
//!
//! Template interpolations (`${ ... }`) return to code mode for counting and
//! resume template mode at the matching `}`, nesting to any depth.

use std::fmt::{self, Display, Formatter};

/// Paired delimiter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `{` `}`
    Brace,
    /// `(` `)`
    Paren,
    /// `[` `]`
    Bracket,
}

impl Delimiter {
    /// All kinds in reporting order
    pub const ALL: [Delimiter; 3] = [Delimiter::Brace, Delimiter::Paren, Delimiter::Bracket];

    /// Opening character
    #[inline]
    #[must_use]
    pub fn open(self) -> char {
        match self {
            Delimiter::Brace => '{',
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
        }
    }

    /// Closing character
    #[inline]
    #[must_use]
    pub fn close(self) -> char {
        match self {
            Delimiter::Brace => '}',
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
        }
    }

    /// Plural noun for diagnostics
    #[inline]
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Delimiter::Brace => "braces",
            Delimiter::Paren => "parentheses",
            Delimiter::Bracket => "brackets",
        }
    }

    fn classify(c: char) -> Option<(Self, i64)> {
        match c {
            '{' => Some((Delimiter::Brace, 1)),
            '}' => Some((Delimiter::Brace, -1)),
            '(' => Some((Delimiter::Paren, 1)),
            ')' => Some((Delimiter::Paren, -1)),
            '[' => Some((Delimiter::Bracket, 1)),
            ']' => Some((Delimiter::Bracket, -1)),
            _ => None,
        }
    }
}

impl Display for Delimiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Quote character of a plain string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `'`
    Single,
    /// `"`
    Double,
}

impl Quote {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

/// Literal left open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenLiteral {
    /// Single- or double-quoted string
    String(Quote),
    /// `/* ...` without `*/`
    BlockComment,
}

/// Lexical mode of the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Quoted { quote: Quote, escaped: bool },
    Template { escaped: bool },
}

/// Net count per delimiter kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelimiterCounts {
    /// `{` minus `}`
    pub brace: i64,
    /// `(` minus `)`
    pub paren: i64,
    /// `[` minus `]`
    pub bracket: i64,
}

impl DelimiterCounts {
    /// Net count for one kind
    #[inline]
    #[must_use]
    pub fn get(&self, delimiter: Delimiter) -> i64 {
        match delimiter {
            Delimiter::Brace => self.brace,
            Delimiter::Paren => self.paren,
            Delimiter::Bracket => self.bracket,
        }
    }

    /// Sum over all kinds
    #[inline]
    #[must_use]
    pub fn total(&self) -> i64 {
        self.brace + self.paren + self.bracket
    }

    /// True when every kind is back at zero
    #[inline]
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        Delimiter::ALL.iter().all(|d| self.get(*d) == 0)
    }

    fn bump(&mut self, delimiter: Delimiter, by: i64) -> i64 {
        let slot = match delimiter {
            Delimiter::Brace => &mut self.brace,
            Delimiter::Paren => &mut self.paren,
            Delimiter::Bracket => &mut self.bracket,
        };
        *slot += by;
        *slot
    }
}

/// First closer seen without a matching opener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow {
    /// Delimiter kind that went negative
    pub delimiter: Delimiter,
    /// 1-based line of the closer
    pub line: usize,
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    masked: String,
    counts: DelimiterCounts,
    first_underflow: Option<Underflow>,
    open_literal: Option<OpenLiteral>,
    template_delimiters: usize,
}

impl ScanReport {
    /// Input with string and comment contents blanked
    #[inline]
    #[must_use]
    pub fn masked(&self) -> &str {
        &self.masked
    }

    /// Delimiter counts at end of input
    #[inline]
    #[must_use]
    pub fn counts(&self) -> DelimiterCounts {
        self.counts
    }

    /// First closer that drove a count negative
    #[inline]
    #[must_use]
    pub fn first_underflow(&self) -> Option<Underflow> {
        self.first_underflow
    }

    /// Quoted string or block comment still open at end of input
    #[inline]
    #[must_use]
    pub fn open_literal(&self) -> Option<OpenLiteral> {
        self.open_literal
    }

    /// Unescaped backticks seen outside strings and comments
    #[inline]
    #[must_use]
    pub fn template_delimiters(&self) -> usize {
        self.template_delimiters
    }

    /// An odd backtick count leaves a template literal open
    #[inline]
    #[must_use]
    pub fn has_open_template(&self) -> bool {
        self.template_delimiters % 2 == 1
    }

    /// Last non-whitespace character of the masked text
    #[must_use]
    pub fn last_significant_char(&self) -> Option<char> {
        self.masked.chars().rev().find(|c| !c.is_whitespace())
    }
}

/// Scan text once
#[must_use]
pub fn scan(text: &str) -> ScanReport {
    let mut scanner = Scanner::new(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        scanner.step(c, chars.peek().copied(), &mut chars);
    }
    scanner.finish()
}

/// Walk state
struct Scanner {
    mode: Mode,
    masked: String,
    counts: DelimiterCounts,
    first_underflow: Option<Underflow>,
    template_delimiters: usize,
    /// Brace depth at each open `${`, innermost last
    interpolations: Vec<i64>,
    line: usize,
}

impl Scanner {
    fn new(capacity: usize) -> Self {
        Self {
            mode: Mode::Code,
            masked: String::with_capacity(capacity),
            counts: DelimiterCounts::default(),
            first_underflow: None,
            template_delimiters: 0,
            interpolations: Vec::new(),
            line: 1,
        }
    }

    /// Consume `c`; `next` is the lookahead, `rest` lets two-char tokens
    /// (`//`, `/*`, `*/`, `${`) consume their second char.
    fn step(&mut self, c: char, next: Option<char>, rest: &mut impl Iterator<Item = char>) {
        if c == '\n' {
            self.line += 1;
        }

        match self.mode {
            Mode::Code => self.step_code(c, next, rest),
            Mode::LineComment => {
                if c == '\n' {
                    self.mode = Mode::Code;
                }
                self.blank(c);
            }
            Mode::BlockComment => {
                if c == '*' && next == Some('/') {
                    rest.next();
                    self.masked.push_str("  ");
                    self.mode = Mode::Code;
                } else {
                    self.blank(c);
                }
            }
            Mode::Quoted { quote, escaped } => {
                if escaped {
                    self.mode = Mode::Quoted { quote, escaped: false };
                    self.blank(c);
                } else if c == '\\' {
                    self.mode = Mode::Quoted { quote, escaped: true };
                    self.blank(c);
                } else if c == quote.as_char() {
                    self.mode = Mode::Code;
                    self.masked.push(c);
                } else {
                    self.blank(c);
                }
            }
            Mode::Template { escaped } => {
                if escaped {
                    self.mode = Mode::Template { escaped: false };
                    self.blank(c);
                } else if c == '\\' {
                    self.mode = Mode::Template { escaped: true };
                    self.blank(c);
                } else if c == '`' {
                    self.template_delimiters += 1;
                    self.mode = Mode::Code;
                    self.masked.push(c);
                } else if c == '$' && next == Some('{') {
                    rest.next();
                    self.interpolations.push(self.counts.brace);
                    self.mode = Mode::Code;
                    self.masked.push_str("${");
                } else {
                    self.blank(c);
                }
            }
        }
    }

    fn step_code(&mut self, c: char, next: Option<char>, rest: &mut impl Iterator<Item = char>) {
        match c {
            // `scheme://` inside an unquoted stylesheet url is not a comment
            '/' if next == Some('/') && self.masked.chars().next_back() != Some(':') => {
                rest.next();
                self.masked.push_str("  ");
                self.mode = Mode::LineComment;
            }
            '/' if next == Some('*') => {
                rest.next();
                self.masked.push_str("  ");
                self.mode = Mode::BlockComment;
            }
            '`' => {
                self.template_delimiters += 1;
                self.mode = Mode::Template { escaped: false };
                self.masked.push(c);
            }
            '}' if self.interpolations.last() == Some(&self.counts.brace) => {
                self.interpolations.pop();
                self.mode = Mode::Template { escaped: false };
                self.masked.push(c);
            }
            _ => {
                if let Some(quote) = Quote::from_char(c) {
                    self.mode = Mode::Quoted { quote, escaped: false };
                } else if let Some((delimiter, by)) = Delimiter::classify(c) {
                    let now = self.counts.bump(delimiter, by);
                    if now < 0 && self.first_underflow.is_none() {
                        self.first_underflow = Some(Underflow {
                            delimiter,
                            line: self.line,
                        });
                    }
                }
                self.masked.push(c);
            }
        }
    }

    fn blank(&mut self, c: char) {
        self.masked.push(if c == '\n' { '\n' } else { ' ' });
    }

    fn finish(self) -> ScanReport {
        let open_literal = match self.mode {
            Mode::Quoted { quote, .. } => Some(OpenLiteral::String(quote)),
            Mode::BlockComment => Some(OpenLiteral::BlockComment),
            Mode::Code | Mode::LineComment | Mode::Template { .. } => None,
        };
        ScanReport {
            masked: self.masked,
            counts: self.counts,
            first_underflow: self.first_underflow,
            open_literal,
            template_delimiters: self.template_delimiters,
        }
    }
}
