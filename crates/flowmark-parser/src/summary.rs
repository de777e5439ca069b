//! Short synopses of free-text workflow descriptions.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use flowmark_core::summary::{ParsedDescriptionSummary, SummarySection};

/// `N. Title:` at the start of a line or after whitespace.
static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|\s)(\d+)\.\s+([^:\n]+?):").expect("segment pattern is valid")
});

const LISTED_TITLES: usize = 5;
const WORD_LIMIT: usize = 60;
const TRUNCATED_WORDS: usize = 55;

const BULLET_MARKERS: &[char] = &['-', '*', '•'];

/// Condenses a description into a one-line summary.
///
/// A description made of numbered segments (`1. Intake: …  2. Review: …`)
/// is summarized by its segment titles, and each segment's body is split into
/// items. Any other description longer than sixty words is cut to its first
/// fifty-five words; shorter ones are returned unchanged.
///
/// # Examples
///
/// ```
/// use flowmark_parser::summarize;
///
/// let parsed = summarize("1. Intake: read form 2. Review: check data");
/// assert_eq!(parsed.summary, "Key steps: Intake, Review.");
/// assert_eq!(parsed.sections[1].items, vec!["check data"]);
/// ```
pub fn summarize(description: &str) -> ParsedDescriptionSummary {
    let segments: Vec<_> = SEGMENT.captures_iter(description).collect();

    if segments.is_empty() {
        return ParsedDescriptionSummary {
            summary: truncate_words(description),
            sections: Vec::new(),
        };
    }

    let sections: Vec<SummarySection> = segments
        .iter()
        .enumerate()
        .map(|(index, caps)| {
            let body_start = caps.get(0).map_or(0, |m| m.end());
            let body_end = segments
                .get(index + 1)
                .and_then(|next| next.get(0))
                .map_or(description.len(), |m| m.start());
            SummarySection {
                title: caps[2].trim().to_string(),
                items: split_items(&description[body_start..body_end]),
            }
        })
        .collect();

    let summary = key_steps(&sections);
    debug!(segments = sections.len(); "Summarized segmented description");

    ParsedDescriptionSummary { summary, sections }
}

fn key_steps(sections: &[SummarySection]) -> String {
    let listed: Vec<&str> = sections
        .iter()
        .take(LISTED_TITLES)
        .map(|section| section.title.as_str())
        .collect();
    let remaining = sections.len().saturating_sub(LISTED_TITLES);

    if remaining > 0 {
        format!("Key steps: {}, and {remaining} more.", listed.join(", "))
    } else {
        format!("Key steps: {}.", listed.join(", "))
    }
}

fn split_items(body: &str) -> Vec<String> {
    body.split([';', '\n'])
        .map(|item| item.trim().trim_start_matches(BULLET_MARKERS).trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn truncate_words(description: &str) -> String {
    let words: Vec<&str> = description.split_whitespace().collect();
    if words.len() > WORD_LIMIT {
        format!("{}...", words[..TRUNCATED_WORDS].join(" "))
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_segments_have_no_tail_clause() {
        let parsed = summarize("1. T1: a\n2. T2: b\n3. T3: c\n4. T4: d");
        assert_eq!(parsed.summary, "Key steps: T1, T2, T3, T4.");
        assert_eq!(parsed.sections.len(), 4);
    }

    #[test]
    fn test_more_than_five_segments_count_the_rest() {
        let description = (1..=8)
            .map(|n| format!("{n}. Step{n}: body"))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = summarize(&description);
        assert_eq!(
            parsed.summary,
            "Key steps: Step1, Step2, Step3, Step4, Step5, and 3 more."
        );
        assert_eq!(parsed.sections.len(), 8);
    }

    #[test]
    fn test_segment_bodies_become_items() {
        let description = "1. Intake: receive order; validate address\n- log request\n2. Ship: pack";
        let parsed = summarize(description);
        assert_eq!(
            parsed.sections[0],
            SummarySection {
                title: "Intake".into(),
                items: vec![
                    "receive order".into(),
                    "validate address".into(),
                    "log request".into()
                ],
            }
        );
        assert_eq!(parsed.sections[1].items, vec!["pack"]);
    }

    #[test]
    fn test_inline_segments_are_detected() {
        let parsed = summarize("Overview. 1. Load: data 2. Save: results");
        assert_eq!(parsed.summary, "Key steps: Load, Save.");
    }

    #[test]
    fn test_long_text_is_truncated() {
        let description = vec!["word"; 61].join(" ");
        let parsed = summarize(&description);
        assert_eq!(parsed.summary, format!("{}...", vec!["word"; 55].join(" ")));
        assert!(parsed.sections.is_empty());
    }

    #[test]
    fn test_short_text_passes_through() {
        let description = vec!["word"; 60].join(" ");
        assert_eq!(summarize(&description).summary, description);
        assert_eq!(summarize("").summary, "");
    }
}
