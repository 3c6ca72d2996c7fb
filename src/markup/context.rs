//! Contexts describing a tree node well enough to find it again after
//! the source is edited.
//!
//! A [`PointContext`] is plain data: it is built from a tree once and can
//! then be scored, sent across threads and persisted without the tree.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::settings::MarkupSettings;
use super::text_hash::TextOrHash;
use crate::core::text_utils::{is_plain_word, split_words};
use crate::parser::ParsedFile;
use crate::tree::{NodeId, Tree};

/// Priority of header words made of punctuation
const PUNCTUATION_PRIORITY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedWord {
    pub text: String,
    pub priority: f64,
}

/// A leaf of the header with its value split into words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderContextElement {
    #[serde(rename = "type")]
    pub node_type: SmolStr,
    pub priority: f64,
    pub exact_match: bool,
    pub value: Vec<PrioritizedWord>,
}

impl HeaderContextElement {
    pub fn from_node(tree: &Tree, node: NodeId) -> Self {
        let options = tree.options(node);
        let exact_match = options.exact_match();
        let values = tree.value_text(node);

        let value = if exact_match {
            vec![PrioritizedWord {
                text: values.concat(),
                priority: 1.0,
            }]
        } else {
            values
                .iter()
                .flat_map(|v| split_words(v))
                .map(|word| PrioritizedWord {
                    text: word.to_string(),
                    priority: if is_plain_word(word) { 1.0 } else { PUNCTUATION_PRIORITY },
                })
                .collect()
        };

        Self {
            node_type: SmolStr::new(tree.node_type(node)),
            priority: options.priority_or_default(),
            exact_match,
            value,
        }
    }

    /// Words glued back together
    pub fn joined(&self) -> String {
        self.value.iter().map(|w| w.text.as_str()).collect()
    }

    /// Same slot in a header: type, priority and comparison mode agree
    pub fn equals_ignore_value(&self, other: &Self) -> bool {
        self.node_type == other.node_type && self.priority == other.priority && self.exact_match == other.exact_match
    }
}

/// Header of a node: the leaves that name it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderContext {
    pub sequence: Vec<HeaderContextElement>,
    /// Indices into `sequence` of the elements whose type is in the
    /// node's header core
    pub core: Vec<usize>,
    pub non_core: Vec<usize>,
}

impl HeaderContext {
    pub fn new(tree: &Tree, node: NodeId) -> Self {
        let core_types = tree.options(node).header_core();
        let mut header = Self::default();

        for (index, element) in header_nodes(tree, node).into_iter().enumerate() {
            let data = tree.node(element);
            let is_core = core_types
                .iter()
                .any(|t| *t == data.symbol || data.alias.as_deref() == Some(*t));

            if is_core {
                header.core.push(index);
            } else {
                header.non_core.push(index);
            }
            header.sequence.push(HeaderContextElement::from_node(tree, element));
        }

        header
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn core_elements(&self) -> impl Iterator<Item = &HeaderContextElement> {
        self.core.iter().filter_map(|i| self.sequence.get(*i))
    }

    pub fn equals_by_core(&self, other: &Self) -> bool {
        self.core_elements().eq(other.core_elements())
    }
}

/// Nodes forming the header of `node`, in source order
fn header_nodes(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    if !tree.node(node).value.is_empty() {
        return vec![node];
    }

    let mut result = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(node).iter().rev().copied().collect();

    while let Some(current) = stack.pop() {
        let data = tree.node(current);

        if data.is_custom_block() {
            let children = data.children();
            if children.len() > 2 {
                stack.extend(children[1..children.len() - 1].iter().rev());
            }
            continue;
        }

        let collapsed = data.children().iter().all(|c| tree.node(*c).is_custom_block());
        if collapsed && data.options().priority_or_default() > 0.0 {
            result.push(current);
        }
    }

    result
}

/// A land node enclosing the point, or one inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorsContextElement {
    #[serde(rename = "type")]
    pub node_type: SmolStr,
    pub header: HeaderContext,
}

impl AncestorsContextElement {
    pub fn from_node(tree: &Tree, node: NodeId) -> Self {
        Self {
            node_type: SmolStr::new(tree.node_type(node)),
            header: HeaderContext::new(tree, node),
        }
    }
}

/// What a node contains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InnerContext {
    /// Text of the structured descendants
    pub content: TextOrHash,
    /// The first land descendants
    pub elements: Vec<AncestorsContextElement>,
}

impl InnerContext {
    pub fn new(tree: &Tree, node: NodeId, text: &str, length: usize) -> Self {
        let mut fragments = Vec::new();
        let mut stack: Vec<NodeId> = tree.children(node).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            let data = tree.node(current);
            if data.children().is_empty() {
                continue;
            }
            if data.is_custom_block() {
                let children = data.children();
                if children.len() > 2 {
                    stack.extend(children[1..children.len() - 1].iter().rev());
                }
                continue;
            }
            if let Some(fragment) = tree.location(current).and_then(|l| l.slice(text)) {
                fragments.push(fragment);
            }
        }

        let elements = tree
            .preorder(node)
            .into_iter()
            .skip(1)
            .filter(|n| is_land(tree, *n))
            .take(length)
            .map(|n| AncestorsContextElement::from_node(tree, n))
            .collect();

        Self {
            content: TextOrHash::new(&fragments.join(" ")),
            elements,
        }
    }
}

/// Text around a node among its land siblings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiblingsContext {
    pub before: TextOrHash,
    pub after: TextOrHash,
}

impl SiblingsContext {
    pub fn new(tree: &Tree, node: NodeId, text: &str) -> Self {
        let Some(parent) = tree.ancestors(node).find(|n| is_land(tree, *n)).or_else(|| tree.root()) else {
            return Self::default();
        };
        if parent == node {
            return Self::default();
        }

        // Non-land nodes are transparent: replace them by their children
        // until only land remains
        let mut siblings: Vec<NodeId> = tree.children(parent).to_vec();
        while siblings.iter().any(|s| !is_land(tree, *s)) {
            siblings = siblings
                .into_iter()
                .flat_map(|s| {
                    if is_land(tree, s) {
                        vec![s]
                    } else {
                        tree.children(s).to_vec()
                    }
                })
                .collect();
        }

        let Some(index) = siblings.iter().position(|s| *s == node) else {
            return Self::default();
        };
        siblings.remove(index);

        let source = |nodes: &[NodeId]| -> String {
            nodes
                .iter()
                .filter_map(|n| tree.location(*n).and_then(|l| l.slice(text)))
                .collect()
        };

        let (before, after) = if tree.options(node).not_unique() {
            (source(&siblings[..index]), source(&siblings[index..]))
        } else {
            let before = index.checked_sub(1).map(|i| &siblings[i..=i]).unwrap_or(&[]);
            let after = siblings.get(index..=index).unwrap_or(&[]);
            (source(before), source(after))
        };

        Self {
            before: TextOrHash::new(&before),
            after: TextOrHash::new(&after),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Everything known about a concern point's node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointContext {
    #[serde(rename = "type")]
    pub node_type: SmolStr,
    pub file_name: String,
    pub line: Option<usize>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub header: HeaderContext,
    pub ancestors: Vec<AncestorsContextElement>,
    pub inner: InnerContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siblings: Option<SiblingsContext>,
    /// Same-typed nodes of the file that looked like this one when the
    /// context was taken
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closest: Vec<PointContext>,
    /// Fingerprint of the whole file; kept for points, not for candidates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<TextOrHash>,
}

impl PointContext {
    /// Header, ancestors and inner context of `node`, which belongs to the
    /// tree of `file`
    pub fn core(tree: &Tree, node: NodeId, file: &ParsedFile, settings: &MarkupSettings) -> Self {
        let location = tree.location(node);

        Self {
            node_type: SmolStr::new(tree.node_type(node)),
            file_name: file.name.clone(),
            line: location.and_then(|l| l.start.line),
            start_offset: location.map_or(0, |l| l.start.offset),
            end_offset: location.map_or(0, |l| l.end.offset),
            header: HeaderContext::new(tree, node),
            ancestors: tree
                .ancestors(node)
                .filter(|a| is_land(tree, *a) && !tree.node(*a).is_custom_block())
                .map(|a| AncestorsContextElement::from_node(tree, a))
                .collect(),
            inner: InnerContext::new(tree, node, &file.text, settings.inner_context_length),
            siblings: None,
            closest: Vec::new(),
            file_content: None,
        }
    }

    pub fn with_siblings(mut self, tree: &Tree, node: NodeId, file: &ParsedFile) -> Self {
        self.siblings = Some(SiblingsContext::new(tree, node, &file.text));
        self
    }

    pub fn with_closest(mut self, closest: Vec<PointContext>) -> Self {
        self.closest = closest;
        self
    }

    pub fn with_file_content(mut self, file: &ParsedFile) -> Self {
        self.file_content = Some(TextOrHash::new(&file.text));
        self
    }

    /// Copy without the closest contexts and the file fingerprint, as
    /// stored inside another context
    pub fn shallow(&self) -> Self {
        Self {
            closest: Vec::new(),
            file_content: None,
            ..self.clone()
        }
    }
}

pub(crate) fn is_land(tree: &Tree, node: NodeId) -> bool {
    tree.options(node).is_land()
}
