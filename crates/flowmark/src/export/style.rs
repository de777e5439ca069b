//! Computed-style inlining for raster export.
//!
//! The rasterizer only sees the exported document, not the host page, so the
//! visual properties that stylesheets contribute are resolved here and
//! written onto each element's `style` attribute.
//!
//! Stylesheets are parsed with `simplecss`, the CSS parser `usvg` itself
//! uses. At-rules are skipped. Selectors support type, universal, `#id`,
//! `.class`, attribute and `:first-child` parts with descendant, child and
//! adjacent-sibling combinators.

use log::trace;
use simplecss::{AttributeOperator, Declaration, DeclarationTokenizer, Element, PseudoClass, Rule};

use flowmark_core::document::{NodeId, SvgDocument};

/// Properties resolved and inlined onto every element.
const INLINED_PROPERTIES: [&str; 8] = [
    "fill",
    "stroke",
    "stroke-width",
    "font-family",
    "font-size",
    "font-weight",
    "color",
    "opacity",
];

const NOT_INHERITED: &[&str] = &["opacity"];

/// Stylesheet sources in cascade order; later sources win ties.
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleSheet {
    sources: Vec<String>,
}

impl StyleSheet {
    pub(crate) fn add(&mut self, css: &str) {
        self.sources.push(css.to_string());
    }

    /// Rules of all sources, ordered by specificity and then source order.
    fn rules(&self) -> Vec<Rule<'_>> {
        let mut sheet = simplecss::StyleSheet::new();
        for css in &self.sources {
            sheet.parse_more(css);
        }
        trace!(rules = sheet.rules.len(); "Parsed stylesheets");
        sheet.rules
    }
}

/// An element of a [`SvgDocument`] as seen by selector matching.
#[derive(Clone, Copy)]
struct StyledElement<'d> {
    document: &'d SvgDocument,
    node: NodeId,
}

impl StyledElement<'_> {
    fn at(&self, node: NodeId) -> Self {
        Self {
            document: self.document,
            node,
        }
    }
}

impl Element for StyledElement<'_> {
    fn parent_element(&self) -> Option<Self> {
        self.document
            .parent(self.node)
            .filter(|&parent| self.document.is_element(parent))
            .map(|parent| self.at(parent))
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let siblings = self.document.children(self.document.parent(self.node)?);
        let position = siblings.iter().position(|&node| node == self.node)?;
        siblings[..position]
            .iter()
            .rev()
            .find(|&&node| self.document.is_element(node))
            .map(|&node| self.at(node))
    }

    fn has_local_name(&self, name: &str) -> bool {
        self.document.name(self.node) == Some(name)
    }

    fn attribute_matches(&self, local_name: &str, operator: AttributeOperator<'_>) -> bool {
        self.document
            .attr(self.node, local_name)
            .is_some_and(|value| operator.matches(value))
    }

    fn pseudo_class_matches(&self, class: PseudoClass<'_>) -> bool {
        matches!(class, PseudoClass::FirstChild) && self.prev_sibling_element().is_none()
    }
}

/// Resolved values for [`INLINED_PROPERTIES`], by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ComputedStyle([Option<String>; INLINED_PROPERTIES.len()]);

impl ComputedStyle {
    fn inherited_from(parent: &ComputedStyle) -> Self {
        let mut style = parent.clone();
        for (index, property) in INLINED_PROPERTIES.iter().enumerate() {
            if NOT_INHERITED.contains(property) {
                style.0[index] = None;
            }
        }
        style
    }

    fn set(&mut self, name: &str, value: &str, parent: &ComputedStyle) {
        let Some(index) = property_index(name) else {
            return;
        };
        self.0[index] = if value.eq_ignore_ascii_case("inherit") {
            parent.0[index].clone()
        } else {
            Some(value.to_string())
        };
    }
}

fn property_index(name: &str) -> Option<usize> {
    INLINED_PROPERTIES
        .iter()
        .position(|property| property.eq_ignore_ascii_case(name))
}

/// Writes the computed value of every inlined property onto each element.
///
/// Cascade, lowest to highest: inherited value, presentation attribute,
/// matching rules by specificity then source order, the `style` attribute.
/// `!important` is not given any extra weight.
pub(crate) fn inline_computed_styles(document: &mut SvgDocument, sheet: &StyleSheet) {
    let rules = sheet.rules();
    let mut resolved = Vec::new();
    compute(document, document.root(), &ComputedStyle::default(), &rules, &mut resolved);

    for (node, style) in resolved {
        let mut declarations: Vec<String> = document
            .attr(node, "style")
            .map(|inline| {
                DeclarationTokenizer::from(inline)
                    .filter(|declaration| property_index(declaration.name).is_none())
                    .map(format_declaration)
                    .collect()
            })
            .unwrap_or_default();
        for (index, value) in style.0.iter().enumerate() {
            if let Some(value) = value {
                declarations.push(format!("{}: {value}", INLINED_PROPERTIES[index]));
            }
        }

        if !declarations.is_empty() {
            document.set_attr(node, "style", declarations.join("; "));
        }
    }
}

fn format_declaration(declaration: Declaration<'_>) -> String {
    if declaration.important {
        format!("{}: {} !important", declaration.name, declaration.value)
    } else {
        format!("{}: {}", declaration.name, declaration.value)
    }
}

fn compute(
    document: &SvgDocument,
    node: NodeId,
    parent: &ComputedStyle,
    rules: &[Rule<'_>],
    resolved: &mut Vec<(NodeId, ComputedStyle)>,
) {
    if !document.is_element(node) {
        return;
    }

    let mut style = ComputedStyle::inherited_from(parent);

    for property in INLINED_PROPERTIES {
        if let Some(value) = document.attr(node, property) {
            style.set(property, value.trim(), parent);
        }
    }

    let element = StyledElement { document, node };
    for rule in rules.iter().filter(|rule| rule.selector.matches(&element)) {
        for declaration in &rule.declarations {
            style.set(declaration.name, declaration.value, parent);
        }
    }

    if let Some(inline) = document.attr(node, "style") {
        for declaration in DeclarationTokenizer::from(inline) {
            style.set(declaration.name, declaration.value, parent);
        }
    }

    for &child in document.children(node) {
        compute(document, child, &style, rules, resolved);
    }
    resolved.push((node, style));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_of(document: &SvgDocument, id: &str) -> String {
        let node = document.element_by_id(id).unwrap();
        document.attr(node, "style").unwrap_or_default().to_string()
    }

    fn inline(markup: &str, css: &[&str]) -> SvgDocument {
        let mut document = SvgDocument::parse(markup).unwrap();
        let mut sheet = StyleSheet::default();
        for css in css {
            sheet.add(css);
        }
        inline_computed_styles(&mut document, &sheet);
        document
    }

    #[test]
    fn test_at_rules_and_comments_are_skipped() {
        let mut sheet = StyleSheet::default();
        sheet.add(
            "/* header */ @media print { rect { fill: red; } } @import url(x.css); .a { fill: blue; } :root { --x: 1; }",
        );
        assert_eq!(sheet.rules().len(), 1);
    }

    #[test]
    fn test_rules_are_ordered_by_specificity_then_source() {
        let mut sheet = StyleSheet::default();
        sheet.add("#n rect { fill: red } .node rect { fill: blue }");
        sheet.add("rect { fill: green } .node rect { fill: black }");

        let order: Vec<String> = sheet
            .rules()
            .iter()
            .map(|rule| rule.declarations[0].value.to_string())
            .collect();
        assert_eq!(order, vec!["green", "blue", "black", "red"]);
    }

    #[test]
    fn test_cascade_order() {
        let markup = r##"<svg>
            <g id="group" class="node" fill="#111111" font-size="12px">
                <rect id="attr-only" fill="#222222"/>
                <rect id="rule-wins" class="box" fill="#222222"/>
                <rect id="inline-wins" class="box" style="fill: #444444; cursor: pointer"/>
                <text id="inherits">Label</text>
            </g>
        </svg>"##;
        let document = inline(
            markup,
            &[".node .box { fill: #333333; stroke: #000000 } rect.box { fill: #999999 }"],
        );

        assert!(style_of(&document, "attr-only").contains("fill: #222222"));
        assert!(style_of(&document, "rule-wins").contains("fill: #333333"));
        assert!(style_of(&document, "rule-wins").contains("stroke: #000000"));
        let inline = style_of(&document, "inline-wins");
        assert!(inline.contains("fill: #444444"));
        assert!(inline.contains("cursor: pointer"));
        assert!(style_of(&document, "inherits").contains("font-size: 12px"));
        assert!(style_of(&document, "inherits").contains("fill: #111111"));
    }

    #[test]
    fn test_child_and_first_child_selectors() {
        let markup = r#"<svg><g class="node"><rect id="first"/><rect id="second"/><g><rect id="nested"/></g></g></svg>"#;
        let document = inline(
            markup,
            &[".node > rect { stroke: red } .node > rect:first-child { stroke-width: 3px }"],
        );

        assert_eq!(style_of(&document, "first"), "stroke: red; stroke-width: 3px");
        assert_eq!(style_of(&document, "second"), "stroke: red");
        assert_eq!(style_of(&document, "nested"), "");
    }

    #[test]
    fn test_later_rule_wins_equal_specificity() {
        let document = inline(
            r#"<svg><rect id="r" class="a"/></svg>"#,
            &[".a { stroke: red }", ".a { stroke: green !important }"],
        );

        assert_eq!(style_of(&document, "r"), "stroke: green");
    }

    #[test]
    fn test_opacity_is_not_inherited() {
        let document = inline(r#"<svg><g id="g" opacity="0.5"><rect id="r"/></g></svg>"#, &[]);

        assert_eq!(style_of(&document, "g"), "opacity: 0.5");
        assert_eq!(style_of(&document, "r"), "");
    }
}
