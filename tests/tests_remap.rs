//! End-to-end remapping through the markup manager.

mod helpers;

use helpers::{NESTED_CLASSES, TWO_METHODS_IN_CLASS, manager, named, nodes_of_type, parse, tree};
use land::markup::{MarkupElement, MarkupManager, MarkupSettings, SearchMode};
use std::slice;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[test]
fn test_mark_methods_of_a_class() {
    let file = parse("c.cs", TWO_METHODS_IN_CLASS);
    let mut manager = manager();
    let concern = manager.add_concern("methods", None, None).expect("concern");

    for name in ["Foo", "Bar"] {
        let node = named(&file, "method", name);
        manager
            .add_concern_point(&file, node, None, None, Some(concern), slice::from_ref(&file))
            .expect("point");
    }

    let points = manager.concern_points();
    assert_eq!(points.len(), 2);
    for point in &points {
        assert_eq!(point.context.ancestors.len(), 1);
        assert_eq!(point.context.ancestors[0].node_type, "class");
        assert!(point.context.siblings.as_ref().is_some_and(|s| !s.is_empty()));
    }
}

#[test]
fn test_renamed_parameter_is_remapped_automatically() {
    let old = parse("a.cs", "int Foo(int a) { return a; }\nint Bar(int a) { return 0; }");
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "Foo"), None, None, None, slice::from_ref(&old))
        .expect("point");

    let new = parse("a.cs", "int Foo(int renamed) { return renamed; }\nint Bar(int a) { return 0; }");
    let ambiguous = manager
        .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    assert!(ambiguous.is_empty());
    let point = manager.point(id).expect("point");
    assert_eq!(point.tree_node, Some(named(&new, "method", "Foo")));
    assert_eq!(
        point.location().and_then(|l| l.slice(&new.text)),
        Some("int Foo(int renamed) { return renamed; }")
    );
}

#[test]
fn test_duplicated_method_needs_a_decision() {
    let old = parse("a.cs", "int Foo() { return 1; }");
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "Foo"), None, None, None, &[])
        .expect("point");

    let new = parse("a.cs", "int Foo() { return 1; }\nint Foo() { return 1; }");
    let ambiguous = manager
        .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    let candidates = &ambiguous[&id];
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| !c.is_auto));
    assert!(manager.point(id).expect("point").is_dangling());

    manager.relink_to_candidate(id, &candidates[1]).expect("relinked");
    assert_eq!(manager.point(id).expect("point").tree_node, Some(candidates[1].node));
}

#[test]
fn test_point_survives_wrapping_in_custom_block() {
    let old = parse("a.cs", "int Foo() {}\nint Bar() { return 2; }\nint Qux() {}\n");
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "Bar"), None, None, None, &[])
        .expect("point");

    let text = "int Foo() {}\n//#region hot\nint Bar() { return 2; }\n//#endregion\nint Qux() {}\n";
    let new = parse("a.cs", text);
    let ambiguous = manager
        .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    assert!(ambiguous.is_empty());
    let point = manager.point(id).expect("point");
    let node = point.tree_node.expect("bound");
    let parent = tree(&new).parent(node).expect("parent");
    assert!(tree(&new).node(parent).is_custom_block());
    assert_eq!(point.location().and_then(|l| l.slice(text)), Some("int Bar() { return 2; }"));
    assert!(point.context.ancestors.is_empty());
}

#[test]
fn test_remap_finds_file_by_base_name() {
    let old = parse("/old/src/a.cs", "int Foo() {}");
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "Foo"), None, None, None, &[])
        .expect("point");

    let moved = parse("/new/src/a.cs", "int Foo() {}");
    let other = parse("/new/src/b.cs", "int Foo() {}");
    let ambiguous = manager
        .remap(&[other, moved.clone()], SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    assert!(ambiguous.is_empty());
    assert_eq!(manager.point(id).expect("point").context.file_name, moved.name);
}

#[test]
fn test_deleted_overload_does_not_take_the_remaining_one() {
    let old = parse("a.cs", "int Foo(int a) { return a; }\nint Foo(string b) { return 0; }");
    let overloads = nodes_of_type(&old, "method");
    let mut manager = manager();
    let kept = manager
        .add_concern_point(&old, overloads[0], None, None, None, slice::from_ref(&old))
        .expect("point");
    let deleted = manager
        .add_concern_point(&old, overloads[1], None, None, None, slice::from_ref(&old))
        .expect("point");

    let new = parse("a.cs", "int Foo(int a) { return a; }");
    let ambiguous = manager
        .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    assert_eq!(manager.point(kept).expect("point").tree_node, Some(named(&new, "method", "Foo")));
    assert!(manager.point(deleted).expect("point").is_dangling());
    assert!(!ambiguous.contains_key(&kept));
    assert!(ambiguous[&deleted].iter().all(|c| !c.is_auto));
}

#[test]
fn test_no_two_points_share_a_node() {
    let old = parse("a.cs", NESTED_CLASSES);
    let mut manager = manager();
    manager.add_land(&old).expect("land");

    let new = parse("a.cs", "class Outer { int count; }");
    manager
        .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");

    let bound: Vec<_> = manager.concern_points().iter().filter_map(|p| p.tree_node).collect();
    let mut unique = bound.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(bound.len(), unique.len());
    assert!(manager.concern_points().iter().any(|p| p.is_dangling()));
}

#[test]
fn test_point_follows_renamed_file() {
    let old = parse("a.cs", NESTED_CLASSES);
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "getValue"), None, None, None, &[])
        .expect("point");

    let renamed = parse("renamed.cs", NESTED_CLASSES);
    let area = slice::from_ref(&renamed);

    let ambiguous = manager
        .remap(area, SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");
    assert!(ambiguous[&id].is_empty());
    assert!(manager.point(id).expect("point").is_dangling());

    let ambiguous = manager
        .remap(area, SearchMode::AllFiles, true, &CancellationToken::new())
        .expect("not cancelled");
    assert!(ambiguous.is_empty());

    let node = named(&renamed, "method", "getValue");
    let point = manager.point(id).expect("point");
    assert_eq!(point.tree_node, Some(node));
    assert_eq!(point.context.file_name, "renamed.cs");

    let expected = tree(&renamed).location(node).expect("located");
    let location = point.location().expect("located");
    assert!(expected.start.line.is_some());
    assert_eq!(location.start.line, expected.start.line);
    assert_eq!(location.start.column, expected.start.column);
}

#[test]
fn test_similar_files_skip_unrelated_ones() {
    let old = parse("a.cs", NESTED_CLASSES);
    let mut manager = manager();
    let id = manager
        .add_concern_point(&old, named(&old, "method", "getValue"), None, None, None, &[])
        .expect("point");

    let renamed = parse("renamed.cs", &NESTED_CLASSES.replace("return count;", "return count + 1;"));
    let unrelated = parse(
        "other.cs",
        "class Ledger {\n    long total;\n    string owner;\n    string currency;\n    long limit;\n    \
         bool archived;\n    int getValue() { return 42; }\n    string describe() { return owner; }\n}\n",
    );
    let area = [unrelated, renamed.clone()];

    let everywhere = manager.find(id, &area, SearchMode::AllFiles).expect("found");
    assert_eq!(everywhere.len(), 3);
    let similar = manager.find(id, &area, SearchMode::SimilarFiles).expect("found");
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].file_name, "renamed.cs");

    let ambiguous = manager
        .remap(&area, SearchMode::SimilarFiles, true, &CancellationToken::new())
        .expect("not cancelled");
    assert!(ambiguous.is_empty());
    let point = manager.point(id).expect("point");
    assert_eq!(point.context.file_name, "renamed.cs");
    assert_eq!(point.tree_node, Some(named(&renamed, "method", "getValue")));
}

#[test]
fn test_cancelled_remap_changes_nothing() {
    let file = parse("a.cs", "int Foo() {}");
    let mut manager = manager();
    let id = manager
        .add_concern_point(&file, named(&file, "method", "Foo"), None, None, None, &[])
        .expect("point");

    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(manager.remap(slice::from_ref(&file), SearchMode::SameFile, true, &cancel).is_none());
    assert!(!manager.point(id).expect("point").is_dangling());
}

#[test]
fn test_parallel_and_sequential_remaps_agree() {
    let old = parse("a.cs", NESTED_CLASSES);
    let new = parse("a.cs", &NESTED_CLASSES.replace("return count;", "return count + 1;"));

    let run = |settings: MarkupSettings| {
        let mut manager = MarkupManager::with_settings(settings);
        manager.add_land(&old).expect("land");
        let ambiguous = manager
            .remap(slice::from_ref(&new), SearchMode::SameFile, true, &CancellationToken::new())
            .expect("not cancelled");
        let bound: Vec<_> = manager.concern_points().iter().map(|p| p.tree_node).collect();
        (ambiguous.len(), bound)
    };

    let sequential = run(MarkupSettings::default().with_parallel(false));
    let parallel = run(MarkupSettings::default());
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.0, 0);
    assert_eq!(sequential.1.len(), nodes_of_type(&old, "class").len() + 2);
}

#[test]
fn test_land_survives_save_and_load() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("markup.json");
    let file = parse("a.cs", NESTED_CLASSES);

    let mut manager = manager();
    manager.add_land(&file).expect("land");
    manager.save(&path, None).expect("saved");

    let mut restored = helpers::manager();
    restored.load(&path).expect("loaded");
    assert!(!restored.is_valid());
    let names: Vec<&str> = restored.markup().iter().map(MarkupElement::name).collect();
    assert_eq!(names, vec!["class", "field", "method"]);

    let ambiguous = restored
        .remap(slice::from_ref(&file), SearchMode::SameFile, true, &CancellationToken::new())
        .expect("not cancelled");
    assert!(ambiguous.is_empty());
    assert!(restored.is_valid());
}
