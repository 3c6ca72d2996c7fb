//! Tree shaping after parsing, and text preprocessing around it.
//!
//! [`Pipeline::run`] applies the shaping passes in their fixed order:
//!
//! ```text
//! remove auto → ghost/list → leaf → merge Any → custom blocks → userify → markup options
//! ```
//!
//! Preprocessors rewrite the text before parsing and repair the tree
//! afterwards; [`SegmentShift`] moves leaf locations back into the
//! coordinates of the unprocessed text.

use tracing::debug;

use super::custom_blocks::{CustomBlock, CustomBlockInserter};
use super::factory::NodeFactory;
use super::node::Tree;
use super::visitor::TreeVisitor;
use super::visitors::{
    GhostListVisitor, LeafVisitor, MarkupOptionsVisitor, MergeAnyVisitor, RemoveAutoVisitor, UserifyVisitor,
};
use crate::base::{Message, PointLocation, SegmentLocation};
use crate::grammar::Grammar;

/// The shaping passes for one grammar
pub struct Pipeline<'g> {
    grammar: &'g Grammar,
    factory: &'g NodeFactory,
}

impl<'g> Pipeline<'g> {
    pub fn new(grammar: &'g Grammar, factory: &'g NodeFactory) -> Self {
        Self { grammar, factory }
    }

    /// Shape a raw tree in place and splice in the custom blocks found by
    /// the lexer. Blocks that cannot be placed are logged as warnings.
    pub fn run(&self, tree: &mut Tree, blocks: Vec<CustomBlock>, log: &mut Vec<Message>) {
        let passes: [(&str, &mut dyn TreeVisitor); 4] = [
            ("remove-auto", &mut RemoveAutoVisitor),
            ("ghost-list", &mut GhostListVisitor::new(self.grammar)),
            ("leaf", &mut LeafVisitor::new(self.grammar)),
            ("merge-any", &mut MergeAnyVisitor),
        ];
        for (name, pass) in passes {
            debug!("tree pass: {}", name);
            tree.accept(pass);
        }

        if !blocks.is_empty() {
            debug!("tree pass: custom-blocks ({} top-level)", blocks.len());
            let mut inserter = CustomBlockInserter::new(self.factory);
            inserter.insert(tree, blocks);
            log.extend(inserter.report());
        }

        debug!("tree pass: userify");
        tree.accept(&mut UserifyVisitor::new(self.grammar));
        debug!("tree pass: markup-options");
        tree.accept(&mut MarkupOptionsVisitor::new(self.grammar));
    }
}

// ============================================================================
// Preprocessing
// ============================================================================

/// Result of preprocessing a text
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub text: String,
    /// The text must not be parsed if this is false
    pub success: bool,
    pub log: Vec<Message>,
}

impl Preprocessed {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            log: Vec::new(),
        }
    }
}

/// Text rewriting before parsing, tree repair after it
pub trait Preprocessor {
    fn preprocess(&mut self, text: &str) -> Preprocessed;

    fn postprocess(&mut self, tree: &mut Tree, log: &mut Vec<Message>);
}

/// Runs several preprocessors one after another
#[derive(Default)]
pub struct PipelinePreprocessor {
    stages: Vec<Box<dyn Preprocessor>>,
}

impl PipelinePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl Preprocessor + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }
}

impl Preprocessor for PipelinePreprocessor {
    /// A failing stage yields the original text, unsuccessfully
    fn preprocess(&mut self, text: &str) -> Preprocessed {
        let mut current = text.to_string();
        let mut log = Vec::new();

        for stage in &mut self.stages {
            let result = stage.preprocess(&current);
            log.extend(result.log);

            if !result.success {
                return Preprocessed {
                    text: text.to_string(),
                    success: false,
                    log,
                };
            }
            current = result.text;
        }

        Preprocessed {
            text: current,
            success: true,
            log,
        }
    }

    /// Stages repair the tree in reverse order
    fn postprocess(&mut self, tree: &mut Tree, log: &mut Vec<Message>) {
        for stage in self.stages.iter_mut().rev() {
            stage.postprocess(tree, log);
        }
    }
}

/// A piece of text removed by a preprocessor, in the coordinates of the
/// text it was removed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedSegment {
    pub location: SegmentLocation,
    /// Line breaks inside the removed text
    pub lines: usize,
}

/// Moves leaf locations back over removed text
#[derive(Debug, Clone, Default)]
pub struct SegmentShift {
    removed: Vec<RemovedSegment>,
}

impl SegmentShift {
    /// `removed` must be sorted by start offset
    pub fn new(removed: Vec<RemovedSegment>) -> Self {
        Self { removed }
    }

    pub fn removed(&self) -> &[RemovedSegment] {
        &self.removed
    }

    /// Lines and characters removed before `offset` of the processed text
    fn shift_for(&self, offset: usize) -> (usize, usize) {
        let (mut lines, mut chars) = (0, 0);
        for segment in &self.removed {
            if segment.location.start.offset > offset + chars {
                break;
            }
            lines += segment.lines;
            chars += segment.location.len();
        }
        (lines, chars)
    }

    pub fn apply(&self, tree: &mut Tree) {
        let Some(root) = tree.root() else {
            return;
        };
        if self.removed.is_empty() {
            return;
        }

        for node in tree.preorder(root) {
            if !tree.is_leaf(node) {
                tree.reset_location(node);
                continue;
            }

            let Some(mut location) = tree.location(node) else {
                continue;
            };
            let (lines, chars) = self.shift_for(location.start.offset);
            if chars > 0 {
                location.shift(lines as isize, 0, chars as isize);
                tree.set_location(node, Some(location));
            }
        }
    }
}

impl Preprocessor for SegmentShift {
    fn preprocess(&mut self, text: &str) -> Preprocessed {
        Preprocessed::ok(text)
    }

    fn postprocess(&mut self, tree: &mut Tree, _log: &mut Vec<Message>) {
        self.apply(tree);
    }
}

/// Removes `#if false` ... `#endif` regions, nested `#if` included
#[derive(Debug, Clone, Default)]
pub struct DirectiveStripper {
    shift: SegmentShift,
}

impl DirectiveStripper {
    const SOURCE: &'static str = "DirectiveStripper";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Preprocessor for DirectiveStripper {
    fn preprocess(&mut self, text: &str) -> Preprocessed {
        let mut output = String::with_capacity(text.len());
        let mut removed = Vec::new();
        let mut log = Vec::new();

        // (start offset, start line, nesting depth) of the region being dropped
        let mut region: Option<(usize, usize, usize)> = None;
        let mut offset = 0;

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let line_number = index + 1;
            let directive = line.trim();

            match region.as_mut() {
                None if directive == "#if false" => region = Some((offset, line_number, 0)),
                None => output.push_str(line),
                Some((_, _, depth)) if directive.starts_with("#if") => *depth += 1,
                Some((_, _, depth)) if directive == "#endif" && *depth > 0 => *depth -= 1,
                Some(&mut (start, start_line, _)) if directive == "#endif" => {
                    let end = offset + line.len() - 1;
                    removed.push(RemovedSegment {
                        location: SegmentLocation::new(
                            PointLocation::new(start_line, 0, start),
                            PointLocation::new(line_number, line.len() - 1, end),
                        ),
                        lines: line_number - start_line + usize::from(line.ends_with('\n')),
                    });
                    region = None;
                }
                Some(_) => {}
            }

            offset += line.len();
        }

        if let Some((start, start_line, _)) = region {
            log.push(Message::error(
                Self::SOURCE,
                "`#if false` is never closed by `#endif`",
                Some(PointLocation::new(start_line, 0, start)),
            ));
            return Preprocessed {
                text: text.to_string(),
                success: false,
                log,
            };
        }

        debug!("directive stripper removed {} regions", removed.len());
        self.shift = SegmentShift::new(removed);

        Preprocessed {
            text: output,
            success: true,
            log,
        }
    }

    fn postprocess(&mut self, tree: &mut Tree, _log: &mut Vec<Message>) {
        self.shift.apply(tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripper_removes_disabled_region() {
        let text = "a\n#if false\nb\n#if x\nc\n#endif\n#endif\nd\n";
        let mut stripper = DirectiveStripper::new();

        let result = stripper.preprocess(text);

        assert!(result.success);
        assert_eq!(result.text, "a\nd\n");
        let removed = stripper.shift.removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].location, SegmentLocation::from_offsets(2, 35));
        assert_eq!(removed[0].lines, 6);
    }

    #[test]
    fn test_unclosed_region_fails() {
        let mut stripper = DirectiveStripper::new();
        let result = stripper.preprocess("a\n#if false\nb\n");

        assert!(!result.success);
        assert_eq!(result.text, "a\n#if false\nb\n");
        assert!(result.log[0].kind.is_error());
    }

    #[test]
    fn test_shift_restores_original_offsets() {
        let text = "a\n#if false\nb\n#endif\nd\n";
        let mut stripper = DirectiveStripper::new();
        let stripped = stripper.preprocess(text).text;
        assert_eq!(stripped, "a\nd\n");

        let mut tree = Tree::new();
        let root = tree.new_node("file");
        let a = tree.new_leaf("ID", "a", SegmentLocation::new(PointLocation::new(1, 0, 0), PointLocation::new(1, 0, 0)));
        let d = tree.new_leaf("ID", "d", SegmentLocation::new(PointLocation::new(2, 0, 2), PointLocation::new(2, 0, 2)));
        tree.add_last_child(root, a);
        tree.add_last_child(root, d);
        tree.set_root(root);

        stripper.postprocess(&mut tree, &mut Vec::new());

        let d_location = tree.location(d).expect("located");
        assert_eq!(&text[d_location.start.offset..=d_location.end.offset], "d");
        assert_eq!(d_location.start.line, Some(5));
        assert_eq!(tree.location(a), Some(SegmentLocation::from_offsets(0, 0)));
        assert_eq!(tree.location(root), Some(SegmentLocation::from_offsets(0, 21)));
    }

    struct Failing;

    impl Preprocessor for Failing {
        fn preprocess(&mut self, _text: &str) -> Preprocessed {
            Preprocessed {
                text: String::new(),
                success: false,
                log: vec![Message::error("Failing", "nope", None)],
            }
        }

        fn postprocess(&mut self, _tree: &mut Tree, _log: &mut Vec<Message>) {}
    }

    #[test]
    fn test_failing_stage_returns_original_text() {
        let mut pipeline = PipelinePreprocessor::new()
            .with_stage(DirectiveStripper::new())
            .with_stage(Failing);

        let result = pipeline.preprocess("a\n#if false\nb\n#endif\n");

        assert!(!result.success);
        assert_eq!(result.text, "a\n#if false\nb\n#endif\n");
        assert_eq!(result.log.len(), 1);
    }
}
