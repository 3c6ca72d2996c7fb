//! The markup forest: concerns grouping concern points.

use uuid::Uuid;

use super::candidate::RemapCandidateInfo;
use super::context::PointContext;
use crate::base::{PointLocation, SegmentLocation};
use crate::tree::{NodeId, Tree};

/// A marked tree node.
///
/// The point does not own its node: `tree_node` indexes the tree of the
/// file named in the context, and is only meaningful while that tree is
/// the one the point was last bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcernPoint {
    pub id: Uuid,
    pub name: String,
    pub comment: Option<String>,
    pub context: PointContext,
    pub tree_node: Option<NodeId>,
    /// The bound tree is out of date with the file
    pub has_irrelevant_location: bool,
    location: Option<SegmentLocation>,
}

impl ConcernPoint {
    pub fn new(tree: &Tree, node: NodeId, context: PointContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: default_name(tree, node),
            comment: None,
            location: tree.location(node),
            tree_node: Some(node),
            has_irrelevant_location: false,
            context,
        }
    }

    /// A point restored without a tree; dangling until remapped
    pub fn unbound(id: Uuid, name: String, comment: Option<String>, context: PointContext) -> Self {
        Self {
            id,
            name,
            comment,
            context,
            tree_node: None,
            has_irrelevant_location: false,
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Bind to `node` with a freshly built context
    pub fn relink_to(&mut self, tree: &Tree, node: NodeId, context: PointContext) {
        self.tree_node = Some(node);
        self.location = tree.location(node);
        self.context = context;
        self.has_irrelevant_location = false;
    }

    /// Bind to a scored candidate, taking over its context
    pub fn relink(&mut self, candidate: &RemapCandidateInfo) {
        self.tree_node = Some(candidate.node);
        self.context = candidate.context.clone();
        self.location = candidate.location.or_else(|| {
            let start = PointLocation {
                line: self.context.line,
                ..PointLocation::at_offset(self.context.start_offset)
            };
            Some(SegmentLocation::new(start, PointLocation::at_offset(self.context.end_offset)))
        });
        self.has_irrelevant_location = false;
    }

    pub fn unlink(&mut self) {
        self.tree_node = None;
        self.location = None;
    }

    pub fn is_dangling(&self) -> bool {
        self.tree_node.is_none()
    }

    pub fn has_invalid_location(&self) -> bool {
        self.is_dangling() || self.has_irrelevant_location
    }

    /// Location of the bound node when it was bound
    pub fn location(&self) -> Option<SegmentLocation> {
        self.location
    }
}

/// `type: values`, or the children's values with unnamed children quoted
/// by type
fn default_name(tree: &Tree, node: NodeId) -> String {
    let data = tree.node(node);
    let mut name = data.node_type().to_string();

    let parts: Vec<String> = if !data.value.is_empty() {
        data.value.clone()
    } else {
        data.children()
            .iter()
            .flat_map(|c| {
                let child = tree.node(*c);
                if child.value.is_empty() {
                    let kind = child.alias.as_deref().filter(|a| !a.is_empty()).unwrap_or(&child.symbol);
                    vec![format!("\"{}\"", kind)]
                } else {
                    child.value.clone()
                }
            })
            .collect()
    };

    if !parts.is_empty() {
        name.push_str(": ");
        name.push_str(&parts.join(" "));
    }
    name
}

/// A named group of markup elements
#[derive(Debug, Clone, PartialEq)]
pub struct Concern {
    pub id: Uuid,
    pub name: String,
    pub comment: Option<String>,
    pub elements: Vec<MarkupElement>,
}

impl Concern {
    pub fn new(name: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            comment,
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupElement {
    Concern(Concern),
    Point(ConcernPoint),
}

impl MarkupElement {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Concern(c) => c.id,
            Self::Point(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Concern(c) => &c.name,
            Self::Point(p) => &p.name,
        }
    }

    pub fn as_point(&self) -> Option<&ConcernPoint> {
        match self {
            Self::Point(p) => Some(p),
            Self::Concern(_) => None,
        }
    }

    /// Concern points of the subtree, depth first
    pub fn points(&self) -> Vec<&ConcernPoint> {
        let mut result = Vec::new();
        collect_points(std::slice::from_ref(self), &mut result);
        result
    }

    /// `self` or an element below it carries `id`
    pub fn contains(&self, id: Uuid) -> bool {
        self.id() == id
            || matches!(self, Self::Concern(c) if c.elements.iter().any(|e| e.contains(id)))
    }
}

pub(crate) fn collect_points<'a>(elements: &'a [MarkupElement], into: &mut Vec<&'a ConcernPoint>) {
    for element in elements {
        match element {
            MarkupElement::Point(p) => into.push(p),
            MarkupElement::Concern(c) => collect_points(&c.elements, into),
        }
    }
}

pub(crate) fn for_each_point_mut(elements: &mut [MarkupElement], f: &mut impl FnMut(&mut ConcernPoint)) {
    for element in elements {
        match element {
            MarkupElement::Point(p) => f(p),
            MarkupElement::Concern(c) => for_each_point_mut(&mut c.elements, f),
        }
    }
}

pub(crate) fn find_mut(elements: &mut [MarkupElement], id: Uuid) -> Option<&mut MarkupElement> {
    for element in elements {
        if element.id() == id {
            return Some(element);
        }
        if let MarkupElement::Concern(c) = element {
            if let Some(found) = find_mut(&mut c.elements, id) {
                return Some(found);
            }
        }
    }
    None
}

pub(crate) fn find<'a>(elements: &'a [MarkupElement], id: Uuid) -> Option<&'a MarkupElement> {
    elements.iter().find_map(|e| {
        if e.id() == id {
            return Some(e);
        }
        match e {
            MarkupElement::Concern(c) => find(&c.elements, id),
            MarkupElement::Point(_) => None,
        }
    })
}

/// Detach the element carrying `id` from wherever it is
pub(crate) fn take(elements: &mut Vec<MarkupElement>, id: Uuid) -> Option<MarkupElement> {
    if let Some(index) = elements.iter().position(|e| e.id() == id) {
        return Some(elements.remove(index));
    }
    elements.iter_mut().find_map(|e| match e {
        MarkupElement::Concern(c) => take(&mut c.elements, id),
        MarkupElement::Point(_) => None,
    })
}
