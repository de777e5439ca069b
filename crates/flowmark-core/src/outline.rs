//! Workflow outline types.
//!
//! A [`WorkflowOutline`] is the structured view of a flowchart source: an
//! ordered list of [`Section`]s, each holding the [`Step`]s declared inside
//! it. A step's [`id`](Step::id) is the node identifier used in the source,
//! which makes it the join key between the outline and the step overlay.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Title of the section that collects nodes outside any grouping block.
pub const MAIN_FLOW_TITLE: &str = "Main Flow";

/// Shape-derived classification of a step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Double-parenthesis node, `id((label))`.
    Start,
    /// Double-bracket node, `id[[label]]`.
    End,
    /// Plain bracket node, `id[label]`.
    Process,
    /// Curly-brace node, `id{label}`.
    Decision,
    /// Paren-in-bracket node, `id[(label)]`.
    Data,
    #[default]
    Default,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Start => "start",
            StepKind::End => "end",
            StepKind::Process => "process",
            StepKind::Decision => "decision",
            StepKind::Data => "data",
            StepKind::Default => "default",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    id: String,
    label: String,
    kind: StepKind,
}

impl Step {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
}

/// A titled group of steps.
///
/// Steps are keyed by id; inserting an id that is already present is a
/// no-op, so the first declaration wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    #[serde(serialize_with = "serialize_steps")]
    steps: IndexMap<String, Step>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: IndexMap::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> impl ExactSizeIterator<Item = &Step> {
        self.steps.values()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Appends `step` unless a step with the same id is already present.
    ///
    /// Returns `true` if the step was added.
    pub fn push(&mut self, step: Step) -> bool {
        if self.steps.contains_key(step.id()) {
            return false;
        }
        self.steps.insert(step.id.clone(), step);
        true
    }
}

fn serialize_steps<S: serde::Serializer>(
    steps: &IndexMap<String, Step>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(steps.values())
}

/// Ordered sequence of sections extracted from a diagram source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkflowOutline {
    sections: Vec<Section>,
}

impl WorkflowOutline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Returns a mutable reference to the section at `index`.
    pub fn section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.sections.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterates over every step in section order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.sections.iter().flat_map(Section::steps)
    }

    /// Total number of steps across all sections.
    pub fn step_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    /// Looks up a step by id across all sections.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.sections.iter().find_map(|section| section.step(id))
    }

    pub fn contains_step(&self, id: &str) -> bool {
        self.step(id).is_some()
    }
}

/// One heading line per section and one numbered line per step:
/// `  <n>. <label> [<kind>] <id>`.
impl fmt::Display for WorkflowOutline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}", section.title())?;
            for (number, step) in section.steps().enumerate() {
                writeln!(
                    f,
                    "  {}. {} [{}] {}",
                    number + 1,
                    step.label(),
                    step.kind(),
                    step.id()
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_push_keeps_first_occurrence() {
        let mut section = Section::new("Intake");
        assert!(section.push(Step::new("n1", "Validate", StepKind::Process)));
        assert!(!section.push(Step::new("n1", "Other", StepKind::Decision)));

        assert_eq!(section.len(), 1);
        assert_eq!(section.step("n1").unwrap().label(), "Validate");
    }

    #[test]
    fn test_outline_lookup_and_display() {
        let mut section = Section::new(MAIN_FLOW_TITLE);
        section.push(Step::new("a", "Begin", StepKind::Start));
        section.push(Step::new("b", "Ship it?", StepKind::Decision));

        let mut outline = WorkflowOutline::new();
        outline.push_section(section);

        assert_eq!(outline.step_count(), 2);
        assert!(outline.contains_step("b"));
        assert!(!outline.contains_step("c"));

        let text = outline.to_string();
        assert!(text.starts_with("Main Flow\n"));
        assert_eq!(text, "Main Flow\n  1. Begin [start] a\n  2. Ship it? [decision] b\n");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(StepKind::Data.to_string(), "data");
        assert_eq!(StepKind::default(), StepKind::Default);
    }
}
