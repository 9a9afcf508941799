//! Conversational text guard
//!
//! Catches producers that answered in natural language instead of emitting
//! code. Only script files are checked; stylesheets and data files carry
//! none of the code-indicating tokens.

/// Openers that mark a reply as prose or an internal section marker
///
/// Matched case-insensitively against the trimmed start of the file, on a
/// word boundary.
pub const PROSE_OPENERS: &[&str] = &[
    "sure",
    "certainly",
    "of course",
    "absolutely",
    "okay",
    "ok",
    "great",
    "hello",
    "hi",
    "hey",
    "thanks",
    "thank you",
    "here's",
    "here is",
    "here are",
    "i'll",
    "i will",
    "i've",
    "i have",
    "i'm",
    "let me",
    "below is",
    "as requested",
    "[plan]",
    "[summary]",
    "[thinking]",
    "## plan",
    "## summary",
    "plan:",
    "summary:",
];

/// Tokens whose presence marks text as code
pub const CODE_TOKENS: &[&str] = &["export", "import", "function", "const", "return"];

/// Check whether content reads as prose rather than code
///
/// Whitespace-only content is not judged here; the syntax layer reports it
/// as an empty file.
#[must_use]
pub fn looks_conversational(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    if PROSE_OPENERS
        .iter()
        .any(|opener| starts_with_word(&lowered, opener))
    {
        return true;
    }
    !(CODE_TOKENS.iter().any(|token| trimmed.contains(token)) || has_markup_open(trimmed))
}

fn starts_with_word(text: &str, word: &str) -> bool {
    let Some(rest) = text.strip_prefix(word) else {
        return false;
    };
    let ends_in_word_char = word
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    !ends_in_word_char
        || rest
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
}

fn has_markup_open(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'>'))
}
