//! Step extraction from flowchart sources.
//!
//! The extractor reads the source line by line in a single forward pass.
//! Grouping blocks (`subgraph id[Title]` … `end`) become [`Section`]s; node
//! declarations become [`Step`]s. Lines that carry no node declaration of
//! their own (headers, comments, edges, style definitions) are skipped.
//!
//! Node shapes are recognized with small `winnow` parsers tried in a fixed
//! priority order, so a line that could be read as two shapes always resolves
//! to the earlier one.

use std::{collections::HashSet, sync::LazyLock};

use log::{debug, trace};
use regex::Regex;
use winnow::{
    Parser as _,
    ascii::{space0, space1},
    combinator::{alt, delimited, preceded},
    error::{ContextError, ErrMode},
    token::{take_until, take_while},
};

use flowmark_core::outline::{MAIN_FLOW_TITLE, Section, Step, StepKind, WorkflowOutline};

type Input<'src> = &'src str;
type IResult<O> = Result<O, ErrMode<ContextError>>;

/// Leading keywords of lines that never declare a node.
const SKIP_KEYWORDS: &[&str] = &[
    "flowchart",
    "graph",
    "direction",
    "classDef",
    "class",
    "style",
    "linkStyle",
    "click",
];

/// Connector tokens that mark a line as an edge definition.
const EDGE_TOKENS: &[&str] = &["-->", "---", "-.-", "==>", "===", "<--", "--o", "--x"];

static HTML_LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"));

/// Classification of one trimmed source line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'src> {
    Skip,
    GroupOpen { id: &'src str, title: &'src str },
    GroupClose,
    Node {
        id: &'src str,
        label: &'src str,
        kind: StepKind,
    },
    Unrecognized,
}

/// Extracts the sectioned step outline of a flowchart source.
///
/// Steps are deduplicated by id across the whole outline; the first
/// declaration wins. Nodes outside any grouping block are collected in a
/// "Main Flow" section placed where the first such node appeared. Sections
/// without steps are dropped.
///
/// # Examples
///
/// ```
/// use flowmark_parser::extract_outline;
///
/// let source = r#"
/// flowchart TD
///     subgraph S1["🚀 Intake"]
///         n1[Validate Input]
///     end
/// "#;
///
/// let outline = extract_outline(source);
/// let section = &outline.sections()[0];
/// assert_eq!(section.title(), "Intake");
/// assert_eq!(section.step("n1").unwrap().label(), "Validate Input");
/// ```
pub fn extract_outline(source: &str) -> WorkflowOutline {
    let mut builder = OutlineBuilder::default();

    for raw_line in source.lines() {
        match classify(raw_line) {
            Line::GroupOpen { id, title } => builder.open_section(id, title),
            Line::GroupClose => builder.close_section(),
            Line::Node { id, label, kind } => builder.add_node(id, label, kind),
            Line::Skip | Line::Unrecognized => {}
        }
    }

    let outline = builder.finish();
    debug!(
        sections = outline.len(),
        steps = outline.step_count();
        "Extracted workflow outline"
    );
    outline
}

#[derive(Default)]
struct OutlineBuilder {
    outline: WorkflowOutline,
    current: Option<Section>,
    main_flow: Option<usize>,
    seen: HashSet<String>,
}

impl OutlineBuilder {
    fn open_section(&mut self, id: &str, title: &str) {
        self.flush();
        let title = clean_title(title);
        let title = if title.is_empty() { id } else { title };
        trace!(id, title; "Opening section");
        self.current = Some(Section::new(title));
    }

    fn close_section(&mut self) {
        self.flush();
    }

    fn add_node(&mut self, id: &str, raw_label: &str, kind: StepKind) {
        let label = clean_label(raw_label);
        if label.is_empty() || label == id || self.seen.contains(id) {
            trace!(id; "Skipping node");
            return;
        }

        let step = Step::new(id, label, kind);
        match self.current.as_mut() {
            Some(section) => {
                section.push(step);
            }
            None => {
                let index = *self.main_flow.get_or_insert_with(|| {
                    self.outline.push_section(Section::new(MAIN_FLOW_TITLE));
                    self.outline.len() - 1
                });
                if let Some(section) = self.outline.section_mut(index) {
                    section.push(step);
                }
            }
        }
        self.seen.insert(id.to_string());
    }

    /// Moves the open section into the outline if it holds any steps.
    fn flush(&mut self) {
        if let Some(section) = self.current.take()
            && !section.is_empty()
        {
            self.outline.push_section(section);
        }
    }

    fn finish(mut self) -> WorkflowOutline {
        self.flush();
        self.outline
    }
}

fn classify(raw_line: &str) -> Line<'_> {
    let line = raw_line.trim().trim_end_matches(';').trim_end();

    if line.is_empty() || line.starts_with("%%") {
        return Line::Skip;
    }
    if line == "end" {
        return Line::GroupClose;
    }

    let first_word = line.split_whitespace().next().unwrap_or_default();
    if first_word == "subgraph" {
        return match group_open.parse_peek(line) {
            Ok((_, (id, title))) => Line::GroupOpen { id, title },
            Err(_) => Line::Unrecognized,
        };
    }
    if SKIP_KEYWORDS.contains(&first_word) || has_edge_token(line) {
        return Line::Skip;
    }

    match node_declaration.parse_peek(line) {
        Ok((_, (id, (kind, label)))) => Line::Node { id, label, kind },
        Err(_) => Line::Unrecognized,
    }
}

/// Looks for connector tokens outside quoted label text.
fn has_edge_token(line: &str) -> bool {
    line.split('"')
        .step_by(2)
        .any(|segment| EDGE_TOKENS.iter().any(|token| segment.contains(token)))
}

// =============================================================================
// Parsers
// =============================================================================

fn node_id<'src>(input: &mut Input<'src>) -> IResult<&'src str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

/// `subgraph <id>[<title>]`, with optional space before the bracket.
fn group_open<'src>(input: &mut Input<'src>) -> IResult<(&'src str, &'src str)> {
    preceded(
        ("subgraph", space1),
        (node_id, preceded(space0, enclosed("[", "]"))),
    )
    .parse_next(input)
}

/// `<id><shape>`; anything after the shape is ignored.
fn node_declaration<'src>(input: &mut Input<'src>) -> IResult<(&'src str, (StepKind, &'src str))> {
    (node_id, shape).parse_next(input)
}

/// Node shapes in priority order.
fn shape<'src>(input: &mut Input<'src>) -> IResult<(StepKind, &'src str)> {
    alt((
        enclosed("((", "))").map(|label| (StepKind::Start, label)),
        enclosed("[[", "]]").map(|label| (StepKind::End, label)),
        enclosed("{{", "}}").map(|label| (StepKind::Decision, label)),
        enclosed("{", "}").map(|label| (StepKind::Decision, label)),
        enclosed("[(", ")]").map(|label| (StepKind::Data, label)),
        enclosed("[\"", "\"]").map(|label| (StepKind::Process, label)),
        enclosed("[", "]").map(|label| (StepKind::Process, label)),
    ))
    .parse_next(input)
}

fn enclosed<'src>(
    open: &'static str,
    close: &'static str,
) -> impl FnMut(&mut Input<'src>) -> IResult<&'src str> {
    move |input: &mut Input<'src>| delimited(open, take_until(0.., close), close).parse_next(input)
}

// =============================================================================
// Label cleanup
// =============================================================================

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

fn clean_label(raw: &str) -> String {
    let unquoted = strip_quotes(raw);
    let without_breaks = HTML_LINE_BREAK.replace_all(unquoted, " ");
    without_breaks.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips quotes and leading non-word glyphs such as emoji.
fn clean_title(raw: &str) -> &str {
    strip_quotes(raw)
        .trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
        .trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps_of(outline: &WorkflowOutline, section: usize) -> Vec<(String, String, StepKind)> {
        outline.sections()[section]
            .steps()
            .map(|step| (step.id().to_string(), step.label().to_string(), step.kind()))
            .collect()
    }

    #[test]
    fn test_subgraph_section_with_emoji_title() {
        let source = "flowchart TD\n  subgraph S1[\"🚀 Intake\"]\n    n1[Validate Input]\n  end\n";
        let outline = extract_outline(source);

        assert_eq!(outline.len(), 1);
        assert_eq!(outline.sections()[0].title(), "Intake");
        assert_eq!(
            steps_of(&outline, 0),
            vec![("n1".into(), "Validate Input".into(), StepKind::Process)]
        );
    }

    #[test]
    fn test_duplicate_ids_keep_first_occurrence() {
        let source = "subgraph S[Work]\n  n2[First]\n  n2[Second]\nend";
        let outline = extract_outline(source);

        let steps = steps_of(&outline, 0);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].1, "First");
    }

    #[test]
    fn test_shape_priority_and_kinds() {
        let source = "\
a((Begin))
b[[Finish]]
c{Approved?}
d[(Orders DB)]
e[Process order]
f{{Route}}";
        let outline = extract_outline(source);
        let kinds: Vec<StepKind> = outline.steps().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Start,
                StepKind::End,
                StepKind::Decision,
                StepKind::Data,
                StepKind::Process,
                StepKind::Decision,
            ]
        );
        assert_eq!(outline.step("d").unwrap().label(), "Orders DB");
    }

    #[test]
    fn test_main_flow_collects_ungrouped_nodes_and_is_reused() {
        let source = "\
flowchart LR
start((Go))
subgraph G[Group]
  inner[Inside]
end
later[After]";
        let outline = extract_outline(source);

        let titles: Vec<&str> = outline.sections().iter().map(Section::title).collect();
        assert_eq!(titles, vec![MAIN_FLOW_TITLE, "Group"]);
        assert_eq!(outline.sections()[0].len(), 2);
        assert!(outline.sections()[0].contains("later"));
    }

    #[test]
    fn test_skip_lines_and_edges() {
        let source = "\
graph TD
%% comment a[Hidden]
classDef done fill:#0f0
style a fill:#f00
a[Alpha] --> b[Beta]
x --> y
click a callback";
        let outline = extract_outline(source);
        assert!(outline.is_empty());
    }

    #[test]
    fn test_connector_inside_quoted_label_is_a_node() {
        let source = "n1[\"Send --> queue\"]\nn2[\"See [docs] first\"]\nn1 -- \"retry\" --> n2";
        let outline = extract_outline(source);

        let labels: Vec<&str> = outline.steps().map(Step::label).collect();
        assert_eq!(labels, vec!["Send --> queue", "See [docs] first"]);
    }

    #[test]
    fn test_placeholder_and_empty_labels_are_skipped() {
        let source = "a[a]\nb[\"\"]\nc[  ]\nd[Real]";
        let outline = extract_outline(source);
        let ids: Vec<&str> = outline.steps().map(Step::id).collect();
        assert_eq!(ids, vec!["d"]);
    }

    #[test]
    fn test_label_cleanup() {
        let outline = extract_outline("n1[\"Load<br/>  config   files\"]");
        assert_eq!(outline.step("n1").unwrap().label(), "Load config files");
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        let source = "subgraph A[Empty]\nend\nsubgraph B[Full]\n  x[Item]\nend";
        let outline = extract_outline(source);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline.sections()[0].title(), "Full");
    }

    #[test]
    fn test_unterminated_section_is_flushed() {
        let outline = extract_outline("subgraph A[Open]\n  x[Item]");
        assert_eq!(outline.sections()[0].title(), "Open");
    }

    #[test]
    fn test_classify_group_open_variants() {
        assert_eq!(
            classify("  subgraph S1 [Billing]"),
            Line::GroupOpen {
                id: "S1",
                title: "Billing"
            }
        );
        assert_eq!(classify("end;"), Line::GroupClose);
        assert_eq!(classify("subgraph Loose"), Line::Unrecognized);
    }
}
