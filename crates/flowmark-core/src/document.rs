//! Mutable SVG element tree.
//!
//! The drawing engine hands back serialized vector markup. [`SvgDocument`]
//! parses that markup (using the `svg` crate's event parser) into an arena of
//! element and text nodes that the overlay and export stages can inspect and
//! rewrite, and serializes it back to markup.
//!
//! # Example
//!
//! ```
//! # use flowmark_core::document::SvgDocument;
//! let mut doc = SvgDocument::parse(r#"<svg><g id="a" class="node"><rect/></g></svg>"#).unwrap();
//! let group = doc.element_by_id("a").unwrap();
//! doc.add_class(group, "step-status-passed");
//! assert!(doc.has_class(group, "node"));
//! assert!(doc.to_markup().contains(r#"class="node step-status-passed""#));
//! ```

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use log::trace;
use svg::{node::element::tag::Type, parser::Event};
use thiserror::Error;

/// Errors raised while turning markup into a [`SvgDocument`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("malformed markup: {0}")]
    Malformed(String),

    #[error("unbalanced markup: expected closing tag for `{expected}`, found `{found}`")]
    Unbalanced { expected: String, found: String },

    #[error("markup contains no root element")]
    Empty,
}

/// Handle to a node inside a [`SvgDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element {
        name: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owned, mutable SVG element tree.
///
/// Cloning produces an independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SvgDocument {
    /// Parses serialized markup.
    ///
    /// Comments, declarations and processing instructions are dropped.
    /// Attributes are stored sorted by name so serialization is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the markup cannot be tokenized, when
    /// tags are unbalanced, or when no root element is present.
    pub fn parse(markup: &str) -> Result<Self, DocumentError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        let parser = svg::read(markup).map_err(|err| DocumentError::Malformed(err.to_string()))?;

        for event in parser {
            match event {
                Event::Tag(name, Type::End, _) => {
                    let Some(open) = stack.pop() else {
                        return Err(DocumentError::Unbalanced {
                            expected: "<none>".to_string(),
                            found: name.to_string(),
                        });
                    };
                    let open_name = match &nodes[open.0].kind {
                        NodeKind::Element { name, .. } => name.as_str(),
                        NodeKind::Text(_) => "",
                    };
                    if open_name != name {
                        return Err(DocumentError::Unbalanced {
                            expected: open_name.to_string(),
                            found: name.to_string(),
                        });
                    }
                }
                Event::Tag(name, kind, attributes) => {
                    let mut sorted: Vec<(String, String)> = attributes
                        .into_iter()
                        .map(|(key, value)| (key, value.to_string()))
                        .collect();
                    sorted.sort_by(|a, b| a.0.cmp(&b.0));

                    let parent = stack.last().copied();
                    if parent.is_none() && root.is_some() {
                        return Err(DocumentError::Malformed(format!(
                            "element `{name}` appears after the root element"
                        )));
                    }

                    let id = NodeId(nodes.len());
                    nodes.push(Node {
                        kind: NodeKind::Element {
                            name: name.to_string(),
                            attributes: sorted.into_iter().collect(),
                        },
                        parent,
                        children: Vec::new(),
                    });
                    match parent {
                        Some(parent) => nodes[parent.0].children.push(id),
                        None => root = Some(id),
                    }
                    if matches!(kind, Type::Start) {
                        stack.push(id);
                    }
                }
                Event::Text(text) => {
                    if let Some(&parent) = stack.last() {
                        let id = NodeId(nodes.len());
                        nodes.push(Node {
                            kind: NodeKind::Text(text.to_string()),
                            parent: Some(parent),
                            children: Vec::new(),
                        });
                        nodes[parent.0].children.push(id);
                    }
                }
                Event::Error(err) => return Err(DocumentError::Malformed(err.to_string())),
                // Comments, declarations and processing instructions.
                _ => {}
            }
        }

        if let Some(&open) = stack.last() {
            let expected = match &nodes[open.0].kind {
                NodeKind::Element { name, .. } => name.clone(),
                NodeKind::Text(_) => String::new(),
            };
            return Err(DocumentError::Unbalanced {
                expected,
                found: "end of input".to_string(),
            });
        }

        let root = root.ok_or(DocumentError::Empty)?;
        trace!(nodes = nodes.len(); "Parsed svg document");
        Ok(Self { nodes, root })
    }

    /// The outermost element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Tag name of an element node; `None` for text nodes.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.name(node).is_some()
    }

    /// Content of a text node; `None` for elements.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated content of all text nodes below `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut content = String::new();
        if let Some(text) = self.text(node) {
            content.push_str(text);
        }
        for descendant in self.descendants(node) {
            if let Some(text) = self.text(descendant) {
                content.push_str(text);
            }
        }
        content
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Iterates over the ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&current| self.parent(current))
    }

    /// All nodes below `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            result.push(current);
            pending.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// All element nodes in document order, starting with the root.
    pub fn elements(&self) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&node| self.is_element(node))
            .collect()
    }

    /// Finds the first element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&node| self.attr(node, "id") == Some(id))
    }

    /// Element nodes with the given tag name, in document order.
    pub fn elements_by_name(&self, name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&node| self.name(node) == Some(name))
            .collect()
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Iterates over `(name, value)` pairs of an element.
    pub fn attrs(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        let attributes = match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text(_) => None,
        };
        attributes
            .into_iter()
            .flat_map(|attributes| attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Sets an attribute on an element. Has no effect on text nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes.shift_remove(name),
            NodeKind::Text(_) => None,
        }
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attr(node, "class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|existing| existing == class)
    }

    /// Adds `class` unless already present.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let updated = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", updated);
    }

    /// Removes every class for which `predicate` returns `true`.
    ///
    /// Returns the number of classes removed. An emptied `class` attribute
    /// is removed entirely.
    pub fn remove_classes_where(&mut self, node: NodeId, predicate: impl Fn(&str) -> bool) -> usize {
        let Some(existing) = self.attr(node, "class") else {
            return 0;
        };
        let (removed, kept): (Vec<&str>, Vec<&str>) =
            existing.split_whitespace().partition(|class| predicate(class));
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        let kept = kept.join(" ");
        if kept.is_empty() {
            self.remove_attr(node, "class");
        } else {
            self.set_attr(node, "class", kept);
        }
        count
    }

    /// Appends a new empty element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.append(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attributes: IndexMap::new(),
            },
        )
    }

    /// Appends a raw text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Serializes the tree back to markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&value.replace('"', "&quot;"));
                    out.push('"');
                }
                let children = &self.nodes[node.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

impl FromStr for SvgDocument {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}
