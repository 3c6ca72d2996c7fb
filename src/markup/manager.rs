//! Remap orchestration over the markup forest.
//!
//! The manager does not own parsed files. Operations that need trees take
//! the files to search as a slice; a point stays bound to a node id of
//! the tree it was last linked in.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::assignment::assign_exclusively;
use super::candidate::RemapCandidateInfo;
use super::context::{PointContext, is_land};
use super::error::MarkupError;
use super::finder::{ContextFinder, FindRequest, HeuristicContextFinder};
use super::point::{Concern, ConcernPoint, MarkupElement, collect_points, find, find_mut, for_each_point_mut, take};
use super::settings::MarkupSettings;
use super::text_hash::TextOrHash;
use crate::base::SegmentLocation;
use crate::parser::ParsedFile;
use crate::tree::{NodeId, Tree};

/// Candidates offered for the points that were not remapped automatically
pub type Ambiguities = IndexMap<Uuid, Vec<RemapCandidateInfo>>;

/// Which files of the search area may hold a point's new node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// The file with the point's file name, or failing that, its base name
    #[default]
    SameFile,
    /// Files whose contents resemble the point's file when it was marked
    SimilarFiles,
    AllFiles,
}

pub struct MarkupManager {
    pub(crate) markup: Vec<MarkupElement>,
    finder: Box<dyn ContextFinder>,
}

impl Default for MarkupManager {
    fn default() -> Self {
        Self::new(HeuristicContextFinder::default())
    }
}

impl MarkupManager {
    pub fn new(finder: impl ContextFinder + 'static) -> Self {
        Self {
            markup: Vec::new(),
            finder: Box::new(finder),
        }
    }

    pub fn with_settings(settings: MarkupSettings) -> Self {
        Self::new(HeuristicContextFinder::new(settings))
    }

    pub fn settings(&self) -> &MarkupSettings {
        self.finder.settings()
    }

    /// Top-level markup elements
    pub fn markup(&self) -> &[MarkupElement] {
        &self.markup
    }

    pub fn clear(&mut self) {
        self.markup.clear();
    }

    // =========================================================================
    // Editing the forest
    // =========================================================================

    fn add_element(&mut self, element: MarkupElement, parent: Option<Uuid>) -> Result<Uuid, MarkupError> {
        let id = element.id();
        match parent {
            None => self.markup.push(element),
            Some(parent) => match find_mut(&mut self.markup, parent) {
                Some(MarkupElement::Concern(concern)) => concern.elements.push(element),
                Some(MarkupElement::Point(_)) => {
                    return Err(MarkupError::invalid_parent(format!("{} is a concern point", parent)));
                }
                None => return Err(MarkupError::UnknownElement(parent)),
            },
        }
        Ok(id)
    }

    pub fn add_concern(&mut self, name: &str, comment: Option<&str>, parent: Option<Uuid>) -> Result<Uuid, MarkupError> {
        let concern = Concern::new(name, comment.map(str::to_string));
        self.add_element(MarkupElement::Concern(concern), parent)
    }

    /// Mark `node` of `file`.
    ///
    /// Points already placed on nodes of the same type in this file are
    /// remapped first, so their closest contexts describe the same tree.
    pub fn add_concern_point(
        &mut self,
        file: &ParsedFile,
        node: NodeId,
        name: Option<&str>,
        comment: Option<&str>,
        parent: Option<Uuid>,
        search_area: &[ParsedFile],
    ) -> Result<Uuid, MarkupError> {
        let tree = tree_of(file)?;
        check_node(tree, node)?;

        self.remap_type(tree.node_type(node), &file.name, search_area);

        let context = self.build_context(tree, node, file);
        let mut point = ConcernPoint::new(tree, node, context).with_comment(comment.map(str::to_string));
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            point = point.with_name(name);
        }

        self.add_element(MarkupElement::Point(point), parent)
    }

    /// Mark every land node of `file`, one concern per symbol and one
    /// sub-concern per alias
    pub fn add_land(&mut self, file: &ParsedFile) -> Result<(), MarkupError> {
        let tree = tree_of(file)?;
        let Some(root) = tree.root() else {
            return Ok(());
        };

        let mut groups: IndexMap<SmolStr, IndexMap<Option<SmolStr>, Vec<NodeId>>> = IndexMap::new();
        for node in tree.preorder(root).into_iter().filter(|n| is_land(tree, *n)) {
            let data = tree.node(node);
            let symbol = data.userified.clone().unwrap_or_else(|| data.symbol.clone());
            let alias = data.alias.clone().filter(|a| !a.is_empty());
            groups.entry(symbol).or_default().entry(alias).or_default().push(node);
        }

        for (symbol, by_alias) in groups {
            let concern = self.add_concern(&symbol, None, None)?;

            for (alias, nodes) in by_alias {
                let parent = match alias {
                    Some(alias) => self.add_concern(&alias, None, Some(concern))?,
                    None => concern,
                };
                for node in nodes {
                    let context = self.build_context(tree, node, file);
                    let point = ConcernPoint::new(tree, node, context);
                    self.add_element(MarkupElement::Point(point), Some(parent))?;
                }
            }
        }

        Ok(())
    }

    /// Land nodes whose location covers `selection`, innermost first
    pub fn get_concern_point_candidates(&self, tree: &Tree, selection: &SegmentLocation) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = tree.root();

        while let Some(node) = current {
            if is_land(tree, node) {
                result.insert(0, node);
            }
            current = tree
                .children(node)
                .iter()
                .copied()
                .find(|c| tree.location(*c).is_some_and(|l| l.includes(selection)));
        }

        result
    }

    pub fn relink_concern_point(&mut self, point: Uuid, file: &ParsedFile, node: NodeId) -> Result<(), MarkupError> {
        let tree = tree_of(file)?;
        check_node(tree, node)?;
        let context = self.build_context(tree, node, file);

        self.point_mut(point)?.relink_to(tree, node, context);
        Ok(())
    }

    pub fn relink_to_candidate(&mut self, point: Uuid, candidate: &RemapCandidateInfo) -> Result<(), MarkupError> {
        self.point_mut(point)?.relink(candidate);
        Ok(())
    }

    /// All concern points, depth first
    pub fn concern_points(&self) -> Vec<&ConcernPoint> {
        let mut points = Vec::new();
        collect_points(&self.markup, &mut points);
        points
    }

    pub fn point(&self, id: Uuid) -> Option<&ConcernPoint> {
        find(&self.markup, id).and_then(MarkupElement::as_point)
    }

    pub fn element(&self, id: Uuid) -> Option<&MarkupElement> {
        find(&self.markup, id)
    }

    fn point_mut(&mut self, id: Uuid) -> Result<&mut ConcernPoint, MarkupError> {
        match find_mut(&mut self.markup, id) {
            Some(MarkupElement::Point(point)) => Ok(point),
            Some(MarkupElement::Concern(_)) => Err(MarkupError::invalid_node(format!("{} is a concern", id))),
            None => Err(MarkupError::UnknownElement(id)),
        }
    }

    /// Move an element under `new_parent`, or to the top level
    pub fn move_to(&mut self, element: Uuid, new_parent: Option<Uuid>) -> Result<(), MarkupError> {
        if let Some(parent) = new_parent {
            let moved = find(&self.markup, element).ok_or(MarkupError::UnknownElement(element))?;
            if moved.contains(parent) {
                return Err(MarkupError::invalid_parent(format!("{} is inside the moved element", parent)));
            }
            match find(&self.markup, parent) {
                Some(MarkupElement::Concern(_)) => {}
                Some(MarkupElement::Point(_)) => {
                    return Err(MarkupError::invalid_parent(format!("{} is a concern point", parent)));
                }
                None => return Err(MarkupError::UnknownElement(parent)),
            }
        }

        let taken = take(&mut self.markup, element).ok_or(MarkupError::UnknownElement(element))?;
        self.add_element(taken, new_parent)?;
        Ok(())
    }

    pub fn remove_element(&mut self, id: Uuid) -> Option<MarkupElement> {
        take(&mut self.markup, id)
    }

    /// Mark points of `file_name` as bound to an outdated tree
    pub fn invalidate_points(&mut self, file_name: &str) {
        for_each_point_mut(&mut self.markup, &mut |point| {
            if point.context.file_name == file_name {
                point.unlink();
                point.has_irrelevant_location = true;
            }
        });
    }

    /// Every point is bound to a current tree
    pub fn is_valid(&self) -> bool {
        !self.concern_points().iter().any(|p| p.has_invalid_location())
    }

    pub fn referenced_files(&self) -> IndexSet<String> {
        self.concern_points()
            .iter()
            .map(|p| p.context.file_name.clone())
            .collect()
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    fn candidate_context(&self, tree: &Tree, node: NodeId, file: &ParsedFile) -> PointContext {
        let context = PointContext::core(tree, node, file, self.settings());
        if self.settings().use_siblings {
            context.with_siblings(tree, node, file)
        } else {
            context
        }
    }

    fn same_type_candidates(&self, tree: &Tree, file: &ParsedFile, node_type: &str) -> Vec<RemapCandidateInfo> {
        let Some(root) = tree.root() else {
            return Vec::new();
        };

        tree.preorder(root)
            .into_iter()
            .filter(|n| tree.node_type(*n) == node_type)
            .map(|n| {
                RemapCandidateInfo::new(n, file.name.clone(), self.candidate_context(tree, n, file))
                    .with_location(tree.location(n))
            })
            .collect()
    }

    /// Same-typed nodes of the file the point could be mistaken for
    fn closest(&self, tree: &Tree, node: NodeId, file: &ParsedFile, context: &PointContext) -> Vec<PointContext> {
        let settings = self.settings();
        let mut candidates = self.same_type_candidates(tree, file, &context.node_type);
        candidates.retain(|c| c.node != node);

        let scored = self.finder.evaluate(context, candidates);
        let mut closest: Vec<PointContext> = scored
            .iter()
            .take(settings.closest_context_count)
            .take_while(|c| c.similarity_or_zero() >= settings.closest_context_threshold)
            .map(|c| c.context.shallow())
            .collect();

        if !context.header.core.is_empty() {
            let confused = scored.iter().find(|c| {
                c.context.ancestors == context.ancestors && c.context.header.equals_by_core(&context.header)
            });
            if let Some(confused) = confused {
                let shallow = confused.context.shallow();
                if !closest.contains(&shallow) {
                    closest.push(shallow);
                }
            }
        }

        closest
    }

    fn build_context(&self, tree: &Tree, node: NodeId, file: &ParsedFile) -> PointContext {
        let context = self.candidate_context(tree, node, file);
        let closest = self.closest(tree, node, file, &context);
        context.with_closest(closest).with_file_content(file)
    }

    // =========================================================================
    // Remapping
    // =========================================================================

    /// Files of `search_area` that `mode` allows for a point with this
    /// context. `contents` are the fingerprints of the search area, needed
    /// for [`SearchMode::SimilarFiles`] only.
    fn files_to_search<'a>(
        &self,
        search_area: &'a [ParsedFile],
        contents: &[TextOrHash],
        context: &PointContext,
        mode: SearchMode,
    ) -> Vec<&'a ParsedFile> {
        match (mode, context.file_content.as_ref()) {
            (SearchMode::AllFiles, _) => search_area.iter().collect(),
            (SearchMode::SimilarFiles, Some(content)) => search_area
                .iter()
                .zip(contents)
                .filter(|(_, c)| self.settings().are_files_similar(content.similarity(c)))
                .map(|(file, _)| file)
                .collect(),
            // Also taken by points saved without a fingerprint
            _ => files_named(search_area, &context.file_name),
        }
    }

    fn fingerprints(search_area: &[ParsedFile], mode: SearchMode) -> Vec<TextOrHash> {
        match mode {
            SearchMode::SimilarFiles => search_area.iter().map(|f| TextOrHash::new(&f.text)).collect(),
            _ => Vec::new(),
        }
    }

    /// Score the points accepted by `filter` against same-typed nodes of
    /// the files `mode` selects, then make the auto decisions of every
    /// (type, file) group exclusive
    fn search(
        &self,
        filter: impl Fn(&ConcernPoint) -> bool,
        search_area: &[ParsedFile],
        mode: SearchMode,
        cancel: &CancellationToken,
    ) -> Option<Vec<(Uuid, Vec<RemapCandidateInfo>)>> {
        let mut groups: IndexMap<(SmolStr, String), Vec<&ConcernPoint>> = IndexMap::new();
        for point in self.concern_points().into_iter().filter(|p| filter(*p)) {
            groups
                .entry((point.context.node_type.clone(), point.context.file_name.clone()))
                .or_default()
                .push(point);
        }

        let contents = Self::fingerprints(search_area, mode);
        let mut candidates_per_group = Vec::with_capacity(groups.len());
        for ((node_type, _), points) in &groups {
            let context = points
                .iter()
                .map(|p| &p.context)
                .find(|c| c.file_content.is_some())
                .or_else(|| points.first().map(|p| &p.context));

            let mut candidates = Vec::new();
            if let Some(context) = context {
                for file in self.files_to_search(search_area, &contents, context, mode) {
                    if let Some(tree) = file.tree.as_ref() {
                        candidates.extend(self.same_type_candidates(tree, file, node_type));
                    }
                }
            }
            candidates_per_group.push(candidates);
        }

        let mut ids = Vec::new();
        let mut requests = Vec::new();
        for (points, candidates) in groups.values().zip(&candidates_per_group) {
            for point in points {
                ids.push(point.id);
                requests.push(FindRequest {
                    point: &point.context,
                    candidates,
                });
            }
        }

        let mut results = self.finder.find(&requests, cancel)?.into_iter();
        let mut ids = ids.into_iter();
        let mut assigned = Vec::with_capacity(requests.len());
        for points in groups.values() {
            let mut group: Vec<Vec<RemapCandidateInfo>> = results.by_ref().take(points.len()).collect();
            assign_exclusively(&mut group, self.settings());
            assigned.extend(ids.by_ref().take(points.len()).zip(group));
        }
        Some(assigned)
    }

    /// Bind the point to its top candidate if that one is auto, otherwise
    /// leave it dangling. Returns true if the point was bound.
    fn apply(&mut self, id: Uuid, candidates: &[RemapCandidateInfo], search_area: &[ParsedFile]) -> bool {
        let target = candidates.first().filter(|c| c.is_auto).and_then(|first| {
            files_named(search_area, &first.file_name)
                .into_iter()
                .find(|f| f.tree.is_some())
                .map(|file| (first, file))
        });

        let relinked = target.and_then(|(first, file)| {
            let tree = file.tree.as_ref()?;
            let closest = self.closest(tree, first.node, file, &first.context);
            let mut candidate = first.clone();
            candidate.context = candidate.context.shallow().with_closest(closest).with_file_content(file);
            Some(candidate)
        });

        let Ok(point) = self.point_mut(id) else {
            return false;
        };
        match relinked {
            Some(candidate) => {
                debug!("{} remapped automatically: {}", point.name, candidate);
                point.relink(&candidate);
                true
            }
            None => {
                debug!("{} left dangling", point.name);
                point.unlink();
                false
            }
        }
    }

    /// Remap every point against the files of `search_area` that `mode`
    /// selects.
    ///
    /// Points whose best candidate is not auto-accepted (or all points if
    /// `allow_auto` is false) are left dangling and reported with their
    /// top candidates. No two points are bound to the same node. Returns
    /// `None` if cancelled.
    pub fn remap(
        &mut self,
        search_area: &[ParsedFile],
        mode: SearchMode,
        allow_auto: bool,
        cancel: &CancellationToken,
    ) -> Option<Ambiguities> {
        let results = self.search(|_| true, search_area, mode, cancel)?;
        let top = self.settings().ambiguity_top_count;

        let mut ambiguous = Ambiguities::new();
        for (id, mut candidates) in results {
            candidates.truncate(top);
            let bound = if allow_auto {
                self.apply(id, &candidates, search_area)
            } else {
                if let Ok(point) = self.point_mut(id) {
                    point.unlink();
                }
                false
            };
            if !bound {
                ambiguous.insert(id, candidates);
            }
        }

        debug!("remap left {} points ambiguous", ambiguous.len());
        Some(ambiguous)
    }

    /// Remap the points of one type in one file, ignoring candidates
    /// below the garbage threshold
    pub fn remap_type(&mut self, node_type: &str, file_name: &str, search_area: &[ParsedFile]) -> Ambiguities {
        if files_named(search_area, file_name).is_empty() {
            return Ambiguities::new();
        }

        let filter = |p: &ConcernPoint| p.context.node_type == node_type && p.context.file_name == file_name;
        let Some(results) = self.search(filter, search_area, SearchMode::SameFile, &CancellationToken::new()) else {
            return Ambiguities::new();
        };
        let (top, garbage) = (self.settings().ambiguity_top_count, self.settings().garbage_threshold);

        let mut ambiguous = Ambiguities::new();
        for (id, candidates) in results {
            let candidates: Vec<RemapCandidateInfo> = candidates
                .into_iter()
                .take_while(|c| c.similarity_or_zero() >= garbage)
                .take(top)
                .collect();
            if !self.apply(id, &candidates, search_area) {
                ambiguous.insert(id, candidates);
            }
        }
        ambiguous
    }

    /// Score the nodes of the files `mode` selects for a point without
    /// changing it
    pub fn find(
        &self,
        point: Uuid,
        search_area: &[ParsedFile],
        mode: SearchMode,
    ) -> Result<Vec<RemapCandidateInfo>, MarkupError> {
        let point = self.point(point).ok_or(MarkupError::UnknownElement(point))?;
        let contents = Self::fingerprints(search_area, mode);

        let mut candidates = Vec::new();
        for file in self.files_to_search(search_area, &contents, &point.context, mode) {
            if let Some(tree) = file.tree.as_ref() {
                candidates.extend(self.same_type_candidates(tree, file, &point.context.node_type));
            }
        }
        Ok(self.finder.evaluate(&point.context, candidates))
    }
}

fn tree_of(file: &ParsedFile) -> Result<&Tree, MarkupError> {
    file.tree.as_ref().ok_or_else(|| MarkupError::unknown_file(&file.name))
}

fn check_node(tree: &Tree, node: NodeId) -> Result<(), MarkupError> {
    if node.index() < tree.len() {
        Ok(())
    } else {
        Err(MarkupError::invalid_node(format!("no node {} in the tree", node.index())))
    }
}

/// Files with exactly this name, or failing that, with the same base name
fn files_named<'a>(search_area: &'a [ParsedFile], name: &str) -> Vec<&'a ParsedFile> {
    let exact: Vec<&ParsedFile> = search_area.iter().filter(|f| f.name == name).collect();
    if !exact.is_empty() {
        return exact;
    }

    let base_name = std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    search_area.iter().filter(|f| f.base_name() == base_name).collect()
}
