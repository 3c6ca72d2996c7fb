//! JSON persistence of the markup forest.
//!
//! Points are stored with their full context and come back unbound: the
//! next remap binds them to the trees of the current files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;
use uuid::Uuid;

use super::context::PointContext;
use super::error::MarkupError;
use super::manager::MarkupManager;
use super::point::{Concern, ConcernPoint, MarkupElement};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MarkupRecord {
    version: u32,
    elements: Vec<ElementRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ElementRecord {
    Concern {
        id: Uuid,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        elements: Vec<ElementRecord>,
    },
    Point {
        id: Uuid,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        node_type: SmolStr,
        /// Header joined into one line, for readers of the file
        header: String,
        file: String,
        start_offset: usize,
        end_offset: usize,
        context: PointContext,
    },
}

impl ElementRecord {
    fn from_element(element: &MarkupElement, relative_to: Option<&Path>) -> Self {
        match element {
            MarkupElement::Concern(concern) => Self::Concern {
                id: concern.id,
                name: concern.name.clone(),
                comment: concern.comment.clone(),
                elements: concern
                    .elements
                    .iter()
                    .map(|e| Self::from_element(e, relative_to))
                    .collect(),
            },
            MarkupElement::Point(point) => {
                let file = relative_name(&point.context.file_name, relative_to);
                let mut context = point.context.clone();
                context.file_name = file.clone();

                Self::Point {
                    id: point.id,
                    name: point.name.clone(),
                    comment: point.comment.clone(),
                    node_type: context.node_type.clone(),
                    header: context
                        .header
                        .sequence
                        .iter()
                        .map(|h| h.joined())
                        .collect::<Vec<_>>()
                        .join(" "),
                    file,
                    start_offset: context.start_offset,
                    end_offset: context.end_offset,
                    context,
                }
            }
        }
    }

    fn into_element(self) -> MarkupElement {
        match self {
            Self::Concern {
                id,
                name,
                comment,
                elements,
            } => MarkupElement::Concern(Concern {
                id,
                name,
                comment,
                elements: elements.into_iter().map(Self::into_element).collect(),
            }),
            Self::Point {
                id,
                name,
                comment,
                node_type,
                file,
                start_offset,
                end_offset,
                mut context,
                ..
            } => {
                context.node_type = node_type;
                context.file_name = file;
                context.start_offset = start_offset;
                context.end_offset = end_offset;
                MarkupElement::Point(ConcernPoint::unbound(id, name, comment, context))
            }
        }
    }
}

/// `name` relative to `base` when it lies below it, with `/` separators
fn relative_name(name: &str, base: Option<&Path>) -> String {
    base.and_then(|base| Path::new(name).strip_prefix(base).ok())
        .map(|relative| {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_else(|| name.to_string())
}

impl MarkupManager {
    /// Write the markup to `path`. File names below `relative_to` are
    /// stored relative to it.
    pub fn save(&self, path: &Path, relative_to: Option<&Path>) -> Result<(), MarkupError> {
        let record = MarkupRecord {
            version: FORMAT_VERSION,
            elements: self
                .markup
                .iter()
                .map(|e| ElementRecord::from_element(e, relative_to))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&record)?;
        fs::write(path, json)?;
        debug!("saved {} top-level elements to {}", record.elements.len(), path.display());
        Ok(())
    }

    /// Replace the markup with the one stored at `path`
    pub fn load(&mut self, path: &Path) -> Result<(), MarkupError> {
        let json = fs::read_to_string(path)?;
        let record: MarkupRecord = serde_json::from_str(&json)?;
        if record.version != FORMAT_VERSION {
            return Err(MarkupError::json(format!("unsupported markup version {}", record.version)));
        }

        self.markup = record.elements.into_iter().map(ElementRecord::into_element).collect();
        debug!("loaded {} concern points from {}", self.concern_points().len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("/work/src/a.cs", Some("/work"), "src/a.cs")]
    #[case("/work/src/a.cs", Some("/other"), "/work/src/a.cs")]
    #[case("a.cs", None, "a.cs")]
    fn test_relative_name(#[case] name: &str, #[case] base: Option<&str>, #[case] expected: &str) {
        assert_eq!(relative_name(name, base.map(Path::new)), expected);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().expect("temp dir");
        let name = dir.path().join("a.cs").to_string_lossy().into_owned();
        let file = Parser::sample().parse(&name, "int Foo(int x) {}");
        let tree = file.tree.as_ref().expect("tree");
        let method = tree.children(tree.root().expect("root"))[0];

        let mut manager = MarkupManager::default();
        let concern = manager.add_concern("api", Some("public surface"), None).expect("concern");
        let point = manager
            .add_concern_point(&file, method, Some("foo"), None, Some(concern), &[])
            .expect("point");

        let path = dir.path().join("markup.json");
        manager.save(&path, Some(dir.path())).expect("saved");

        let mut restored = MarkupManager::default();
        restored.load(&path).expect("loaded");

        assert_eq!(restored.markup().len(), 1);
        assert_eq!(restored.markup()[0].name(), "api");
        let loaded = restored.point(point).expect("point");
        assert!(loaded.is_dangling());
        assert_eq!(loaded.name, "foo");
        assert_eq!(loaded.context.file_name, "a.cs");
        assert_eq!(loaded.context.header, manager.point(point).expect("point").context.header);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("markup.json");
        fs::write(&path, "{ not json").expect("written");

        let mut manager = MarkupManager::default();
        assert!(matches!(manager.load(&path), Err(MarkupError::Json(_))));
        assert!(matches!(
            manager.load(&dir.path().join("missing.json")),
            Err(MarkupError::Io(_))
        ));
    }
}
