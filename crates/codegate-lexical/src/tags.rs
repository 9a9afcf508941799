//! Markup tag balance
//!
//! Runs over masked text only. Tags are matched by count, not by name:
//! conditional rendering can legitimately interleave tag identities, so a
//! same-depth `<div>` … `</span>` pair is accepted.

/// Elements that never take a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Tag balance failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagImbalance {
    /// A closing tag arrived with nothing open
    UnexpectedClose {
        /// Tag name, empty for a fragment
        name: String,
    },
    /// Tags still open at end of input
    Unclosed {
        /// Number of open tags
        count: usize,
    },
}

/// A tag-like token found in masked text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    /// Index just past the closing `>`
    end: usize,
}

/// Check open/close balance of tag-like tokens
///
/// # Errors
/// Returns the first [`TagImbalance`] found.
pub fn check_balance(masked: &str) -> Result<(), TagImbalance> {
    let chars: Vec<char> = masked.chars().collect();
    let mut open = 0usize;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '<' || follows_operand(&chars, i) {
            i += 1;
            continue;
        }
        let Some(tag) = read_tag(&chars, i) else {
            i += 1;
            continue;
        };
        i = tag.end;

        if tag.closing {
            if open == 0 {
                return Err(TagImbalance::UnexpectedClose { name: tag.name });
            }
            open -= 1;
        } else if !tag.self_closing && !is_void(&tag.name) {
            open += 1;
        }
    }

    if open > 0 {
        return Err(TagImbalance::Unclosed { count: open });
    }
    Ok(())
}

/// `a<b`, `Array<T>`, `f()<x`: a comparison or type argument, not a tag
///
/// `</` never starts an expression, so closing tags after text still count.
fn follows_operand(chars: &[char], at: usize) -> bool {
    if chars.get(at + 1) == Some(&'/') {
        return false;
    }
    at.checked_sub(1)
        .map(|prev| chars[prev])
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | ')' | ']'))
}

fn read_tag(chars: &[char], start: usize) -> Option<Tag> {
    let mut j = start + 1;
    let closing = chars.get(j) == Some(&'/');
    if closing {
        j += 1;
    }

    // Fragments: `<>` and `</>`
    if chars.get(j) == Some(&'>') {
        return Some(Tag {
            name: String::new(),
            closing,
            self_closing: false,
            end: j + 1,
        });
    }

    if !chars.get(j)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = j;
    while chars
        .get(j)
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'))
    {
        j += 1;
    }
    let name: String = chars[name_start..j].iter().collect();

    // Attributes: `>` inside `{...}` belongs to an expression. Outside
    // braces, statement punctuation and arrows mean this was a comparison.
    let mut depth = 0usize;
    let mut last_significant = None;
    while let Some(&c) = chars.get(j) {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ';' | '(' | ')' | '<' if depth == 0 => return None,
            '=' if depth == 0 && chars.get(j + 1) == Some(&'>') => return None,
            '>' if depth == 0 => {
                return Some(Tag {
                    name,
                    closing,
                    self_closing: last_significant == Some('/'),
                    end: j + 1,
                });
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        j += 1;
    }
    None
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_markup() {
        assert_eq!(
            check_balance("<div className={x > 1 ? 'a' : 'b'}><Hero.Title /><br><img src={s}></div>"),
            Ok(())
        );
    }

    #[test]
    fn fragments_count() {
        assert_eq!(check_balance("<><p></p></>"), Ok(()));
        assert_eq!(check_balance("<><p></p>"), Err(TagImbalance::Unclosed { count: 1 }));
    }

    #[test]
    fn closing_with_nothing_open() {
        assert_eq!(
            check_balance("<p></p></section>"),
            Err(TagImbalance::UnexpectedClose {
                name: "section".to_string()
            })
        );
    }

    #[test]
    fn unclosed_tags_counted() {
        assert_eq!(
            check_balance("<section><div>"),
            Err(TagImbalance::Unclosed { count: 2 })
        );
    }

    #[test]
    fn mismatched_names_at_same_depth_accepted() {
        assert_eq!(check_balance("<div><b>x</i></span>"), Ok(()));
    }

    #[test]
    fn closing_tag_after_text() {
        assert_eq!(check_balance("<div>Hi</div>"), Ok(()));
    }

    #[test]
    fn comparisons_and_generics_are_not_tags() {
        assert_eq!(
            check_balance("const a = i<n; const s = useState<string>(''); if (a < b) {}"),
            Ok(())
        );
    }

    #[test]
    fn spaced_comparison_before_arrow_is_not_a_tag() {
        assert_eq!(
            check_balance("if (n <max) { return null; } const f = () => 1;"),
            Ok(())
        );
        assert_eq!(check_balance("while (i <limit) i++; <p>done</p>"), Ok(()));
    }

    #[test]
    fn arrow_inside_attribute_braces_stays_in_tag() {
        assert_eq!(
            check_balance("<button onClick={() => go(1)} disabled>Go</button>"),
            Ok(())
        );
    }
}
