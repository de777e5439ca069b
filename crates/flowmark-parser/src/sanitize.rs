//! Rule-based repair of flowchart label syntax.
//!
//! AI-generated sources regularly put characters into bracketed node labels
//! that the drawing engine reads as syntax: a `/` turns a label into a
//! parallelogram token, a `:` or `(` ends the label early, and so on. Quoting
//! the label makes the engine read its content verbatim.
//!
//! [`sanitize`] runs an ordered list of [`Rule`]s over the text. Each quoting
//! rule inspects every bracketed label and wraps it in quotes when its trigger
//! matches. Labels that are already fully quoted, and labels whose content is
//! itself a shape token such as `[(db)]` or `[/io/]`, are never touched, which
//! keeps the whole pass idempotent.

use std::{ops::Range, sync::LazyLock};

use log::{debug, trace};
use regex::{Captures, Regex};

/// Bracketed label content: no nested brackets, no line breaks.
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\n]*)\]").expect("label pattern is valid"));

/// A fully quoted label. Its content may hold brackets of its own.
static QUOTED_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\["[^"\n]*"\]"#).expect("quoted label pattern is valid"));

/// A label wrapped in two or more quotes on both sides.
static DOUBLED_QUOTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[""+([^\[\]\n]*?)""+\]"#).expect("doubled quote pattern is valid")
});

/// A line-break marker followed by more content.
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:<br\s*/?>|\\n)\s*\S").expect("line break pattern is valid")
});

const BYTE_ORDER_MARK: char = '\u{feff}';

const SPECIAL_CHARACTERS: [char; 14] = [
    '#', '@', '!', '$', '%', '^', '*', '+', '=', '|', '\\', '<', '>', '?',
];

const SMART_DOUBLE_QUOTES: [char; 5] = ['\u{201c}', '\u{201d}', '\u{201e}', '\u{201f}', '\u{2033}'];
const SMART_SINGLE_QUOTES: [char; 5] = ['\u{2018}', '\u{2019}', '\u{201a}', '\u{201b}', '\u{2032}'];

/// One step of the repair pass.
enum Rule {
    /// Quote every eligible label whose content matches `trigger`.
    Quote {
        name: &'static str,
        trigger: fn(&str) -> bool,
    },
    /// `[""x""]` → `["x"]`.
    CollapseDoubledQuotes,
    /// Typographic quotes → ASCII, then collapse what that produced.
    NormalizeSmartQuotes,
}

/// The repair pass, in application order.
const RULES: &[Rule] = &[
    Rule::Quote {
        name: "slash",
        trigger: has_unescaped_slash,
    },
    Rule::Quote {
        name: "line-break",
        trigger: has_line_break,
    },
    Rule::Quote {
        name: "spaced-hyphen",
        trigger: has_spaced_hyphen,
    },
    Rule::CollapseDoubledQuotes,
    Rule::Quote {
        name: "colon",
        trigger: has_colon,
    },
    Rule::Quote {
        name: "ampersand",
        trigger: has_ampersand,
    },
    Rule::Quote {
        name: "parentheses",
        trigger: has_parentheses,
    },
    Rule::NormalizeSmartQuotes,
    Rule::Quote {
        name: "special-character",
        trigger: has_special_character,
    },
];

/// Repairs common label defects in a flowchart source.
///
/// Strips byte-order marks and surrounding whitespace, then applies the
/// quoting and normalization rules in order. The function is total and
/// idempotent: `sanitize(&sanitize(s)) == sanitize(s)`.
///
/// # Examples
///
/// ```
/// use flowmark_parser::sanitize;
///
/// let fixed = sanitize("A[Revenue/Cost] --> B[Done]");
/// assert_eq!(fixed, r#"A["Revenue/Cost"] --> B[Done]"#);
/// ```
pub fn sanitize(source: &str) -> String {
    let mut text = source
        .trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK)
        .to_string();

    for rule in RULES {
        text = match rule {
            Rule::Quote { name, trigger } => quote_labels(&text, name, *trigger),
            Rule::CollapseDoubledQuotes => collapse_doubled_quotes(&text),
            Rule::NormalizeSmartQuotes => collapse_doubled_quotes(&normalize_smart_quotes(&text)),
        };
    }

    debug!(input_len = source.len(), output_len = text.len(); "Sanitized diagram source");
    text
}

fn quote_labels(text: &str, rule: &'static str, trigger: fn(&str) -> bool) -> String {
    let protected = quoted_spans(text);
    let mut fired = 0usize;
    let result = LABEL.replace_all(text, |caps: &Captures<'_>| {
        let content = &caps[1];
        let inside_quotes = caps
            .get(0)
            .is_some_and(|label| protected.iter().any(|span| overlaps(span, &label.range())));
        if inside_quotes || is_fully_quoted(content) || is_shape_token(content) || !trigger(content)
        {
            return caps[0].to_string();
        }
        fired += 1;
        quote(content)
    });
    if fired > 0 {
        trace!(rule, labels = fired; "Quoted labels");
    }
    result.into_owned()
}

/// Byte ranges of the fully quoted labels in `text`.
fn quoted_spans(text: &str) -> Vec<Range<usize>> {
    QUOTED_LABEL.find_iter(text).map(|label| label.range()).collect()
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Wraps `content` in quotes, escaping inner quotes as `#quot;`.
fn quote(content: &str) -> String {
    format!("[\"{}\"]", content.replace('"', "#quot;"))
}

fn collapse_doubled_quotes(text: &str) -> String {
    DOUBLED_QUOTES.replace_all(text, "[\"$1\"]").into_owned()
}

fn normalize_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|c| {
            if SMART_DOUBLE_QUOTES.contains(&c) {
                '"'
            } else if SMART_SINGLE_QUOTES.contains(&c) {
                '\''
            } else {
                c
            }
        })
        .collect()
}

fn is_fully_quoted(content: &str) -> bool {
    content.len() >= 2 && content.starts_with('"') && content.ends_with('"')
}

/// Content that the engine reads as a shape: `(…)` cylinders and the
/// slash/backslash-delimited parallelograms and trapezoids.
fn is_shape_token(content: &str) -> bool {
    let mut chars = content.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return false;
    };
    (first == '(' && last == ')') || (matches!(first, '/' | '\\') && matches!(last, '/' | '\\'))
}

fn has_unescaped_slash(content: &str) -> bool {
    content
        .char_indices()
        .any(|(index, c)| c == '/' && !content[..index].ends_with('\\'))
}

fn has_line_break(content: &str) -> bool {
    LINE_BREAK.is_match(content)
}

fn has_spaced_hyphen(content: &str) -> bool {
    content.contains(" - ")
}

fn has_colon(content: &str) -> bool {
    content.contains(':')
}

fn has_ampersand(content: &str) -> bool {
    content.contains('&')
}

fn has_parentheses(content: &str) -> bool {
    content.contains(['(', ')'])
}

fn has_special_character(content: &str) -> bool {
    content.contains(SPECIAL_CHARACTERS)
}
