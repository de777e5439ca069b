//! Step-status overlay for rendered diagrams.
//!
//! The drawing engine knows nothing about test execution. After every render,
//! and after every change to the statuses, the highlighted step, the test-mode
//! flag or the click handler, [`OverlaySynchronizer::sync`] walks the rendered
//! document and re-applies marker classes so the host stylesheet can color
//! each node by its status.
//!
//! Rendered nodes are matched to outline steps through an [`IdScheme`]: the
//! engine derives element ids from the node ids in the source by adding a
//! prefix and disambiguation suffixes.

use log::{debug, trace};

use flowmark_core::{
    document::{NodeId, SvgDocument},
    status::{self, CLICKABLE_CLASS, HIGHLIGHT_CLASS, SHAPE_HIGHLIGHT_CLASS, StepOverlay, StepStatus},
    theme::ThemeMode,
};

/// Element names that count as the visible shape of a node.
const SHAPE_ELEMENTS: &[&str] = &["rect", "circle", "polygon", "path", "ellipse"];

/// Versioned contract for recovering step ids from rendered element ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdScheme {
    version: u32,
    prefix: String,
}

impl IdScheme {
    /// Version of the mermaid flowchart scheme: `flowchart-<id>-<n>`.
    pub const MERMAID_VERSION: u32 = 1;
    pub const MERMAID_PREFIX: &'static str = "flowchart-";

    pub fn new(version: u32, prefix: impl Into<String>) -> Self {
        Self {
            version,
            prefix: prefix.into(),
        }
    }

    pub fn mermaid() -> Self {
        Self::new(Self::MERMAID_VERSION, Self::MERMAID_PREFIX)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Recovers the step id encoded in `element_id`.
    ///
    /// The prefix may appear anywhere in the element id, since engines
    /// commonly prepend the render id. Trailing `-<digits>` segments are
    /// stripped one at a time and the longest candidate found in `known_ids`
    /// wins; when none is known every numeric suffix is stripped.
    ///
    /// ```
    /// # use flowmark::overlay::IdScheme;
    /// let scheme = IdScheme::mermaid();
    /// let known = |id: &str| id == "step-2";
    /// assert_eq!(scheme.extract("flowchart-step-2-14", known), Some("step-2".to_string()));
    /// assert_eq!(scheme.extract("flowchart-n1-0", |_| false), Some("n1".to_string()));
    /// assert_eq!(scheme.extract("edge-label", |_| false), None);
    /// ```
    pub fn extract(&self, element_id: &str, known_ids: impl Fn(&str) -> bool) -> Option<String> {
        if self.prefix.is_empty() {
            return None;
        }
        let start = element_id.find(&self.prefix)? + self.prefix.len();
        let mut candidate = &element_id[start..];
        if candidate.is_empty() {
            return None;
        }

        loop {
            if known_ids(candidate) {
                return Some(candidate.to_string());
            }
            match strip_numeric_suffix(candidate) {
                Some(shorter) => candidate = shorter,
                None => break,
            }
        }

        Some(candidate.to_string())
    }
}

impl Default for IdScheme {
    fn default() -> Self {
        Self::mermaid()
    }
}

/// `abc-12` → `abc`; `None` when there is no non-empty stem before a
/// numeric suffix.
fn strip_numeric_suffix(candidate: &str) -> Option<&str> {
    let (stem, suffix) = candidate.rsplit_once('-')?;
    if stem.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(stem)
}

/// Link between a rendered element and the step it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickBinding {
    pub node: NodeId,
    pub step_id: String,
}

/// What a synchronization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Marker classes removed before re-applying.
    pub cleared: usize,
    /// Marker classes applied.
    pub applied: usize,
    /// Click targets, in document order.
    pub bindings: Vec<ClickBinding>,
}

impl OverlayReport {
    /// Step bound to `node`, if any.
    pub fn step_for(&self, node: NodeId) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| binding.node == node)
            .map(|binding| binding.step_id.as_str())
    }
}

/// Applies step overlays to rendered documents.
#[derive(Debug, Clone, Default)]
pub struct OverlaySynchronizer {
    scheme: IdScheme,
}

impl OverlaySynchronizer {
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &IdScheme {
        &self.scheme
    }

    /// Re-applies marker classes to `document`.
    ///
    /// `known_ids` are the step ids of the current outline; they let the
    /// scheme keep ids that themselves end in `-<digits>`. `clickable` marks
    /// shape sub-nodes as click targets and records bindings.
    ///
    /// Running twice with the same inputs produces the same classes.
    pub fn sync(
        &self,
        document: &mut SvgDocument,
        overlay: &StepOverlay,
        known_ids: &[&str],
        clickable: bool,
    ) -> OverlayReport {
        let mut report = OverlayReport::default();
        let elements = document.elements();
        let is_known = |id: &str| known_ids.iter().any(|known| *known == id);

        for &element in &elements {
            report.cleared += document.remove_classes_where(element, status::is_marker_class);
        }

        // Pass 1: any element whose id encodes a step.
        for &element in &elements {
            let Some(step_id) = document
                .attr(element, "id")
                .and_then(|id| self.scheme.extract(id, is_known))
            else {
                continue;
            };
            trace!(step_id = step_id.as_str(); "Matched rendered element");

            if overlay.test_mode() {
                if let Some(status) = overlay.status(&step_id) {
                    report.applied += add(document, element, &status.marker_class());
                }
                if overlay.is_highlighted(&step_id) {
                    report.applied += add(document, element, HIGHLIGHT_CLASS);
                }
            }

            if clickable {
                for shape in shape_descendants(document, element) {
                    report.applied += add(document, shape, CLICKABLE_CLASS);
                    report.bindings.push(ClickBinding {
                        node: shape,
                        step_id: step_id.clone(),
                    });
                }
                report.bindings.push(ClickBinding {
                    node: element,
                    step_id,
                });
            }
        }

        // Pass 2: node groups mark their first shape primitive.
        if overlay.test_mode() {
            for &group in &elements {
                if document.name(group) != Some("g") || !document.has_class(group, "node") {
                    continue;
                }
                let Some(step_id) = self.group_step_id(document, group, is_known) else {
                    continue;
                };
                let Some(shape) = shape_descendants(document, group).into_iter().next() else {
                    continue;
                };

                if let Some(status) = overlay.status(&step_id) {
                    report.applied += add(document, shape, &status.shape_marker_class());
                }
                if overlay.is_highlighted(&step_id) {
                    report.applied += add(document, shape, SHAPE_HIGHLIGHT_CLASS);
                }
            }
        }

        debug!(
            cleared = report.cleared,
            applied = report.applied,
            bindings = report.bindings.len();
            "Synchronized step overlay"
        );
        report
    }

    fn group_step_id(
        &self,
        document: &SvgDocument,
        group: NodeId,
        is_known: impl Fn(&str) -> bool,
    ) -> Option<String> {
        if let Some(data_id) = document.attr(group, "data-id").filter(|id| !id.is_empty()) {
            return Some(data_id.to_string());
        }
        document
            .attr(group, "id")
            .and_then(|id| self.scheme.extract(id, is_known))
    }
}

fn add(document: &mut SvgDocument, node: NodeId, class: &str) -> usize {
    if document.has_class(node, class) {
        return 0;
    }
    document.add_class(node, class);
    1
}

fn shape_descendants(document: &SvgDocument, node: NodeId) -> Vec<NodeId> {
    document
        .descendants(node)
        .into_iter()
        .filter(|&child| {
            document
                .name(child)
                .is_some_and(|name| SHAPE_ELEMENTS.contains(&name))
        })
        .collect()
}

/// CSS for the marker classes applied by [`OverlaySynchronizer::sync`].
///
/// Hosts embed it next to the rendered diagram; raster export feeds it to the
/// style inliner so exported images keep the status colors.
pub fn marker_stylesheet(theme: ThemeMode) -> String {
    let mut css = String::new();
    for status in StepStatus::ALL {
        let (fill, stroke) = status_colors(status, theme);
        css.push_str(&format!(
            ".{marker} rect, .{marker} circle, .{marker} polygon, .{marker} path, .{marker} ellipse, .{shape} {{ fill: {fill}; stroke: {stroke}; stroke-width: 2px; }}\n",
            marker = status.marker_class(),
            shape = status.shape_marker_class(),
        ));
    }

    let highlight = if theme.is_dark() { "#facc15" } else { "#ca8a04" };
    css.push_str(&format!(
        ".{HIGHLIGHT_CLASS} rect, .{HIGHLIGHT_CLASS} polygon, .{SHAPE_HIGHLIGHT_CLASS} {{ stroke: {highlight}; stroke-width: 3px; }}\n"
    ));
    css.push_str(&format!(".{CLICKABLE_CLASS} {{ cursor: pointer; }}\n"));
    css
}

fn status_colors(status: StepStatus, theme: ThemeMode) -> (&'static str, &'static str) {
    match (status, theme.is_dark()) {
        (StepStatus::Pending, false) => ("#f1f5f9", "#94a3b8"),
        (StepStatus::Pending, true) => ("#1e293b", "#64748b"),
        (StepStatus::Running, false) => ("#dbeafe", "#2563eb"),
        (StepStatus::Running, true) => ("#1e3a8a", "#60a5fa"),
        (StepStatus::Passed, false) => ("#dcfce7", "#16a34a"),
        (StepStatus::Passed, true) => ("#14532d", "#4ade80"),
        (StepStatus::Failed, false) => ("#fee2e2", "#dc2626"),
        (StepStatus::Failed, true) => ("#7f1d1d", "#f87171"),
        (StepStatus::Skipped, false) => ("#f5f5f4", "#a8a29e"),
        (StepStatus::Skipped, true) => ("#292524", "#78716c"),
    }
}
