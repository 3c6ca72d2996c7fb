//! Similarity and scoring properties on contexts taken from real trees.

mod helpers;

use helpers::{NESTED_CLASSES, named, nodes_of_type, parse, tree};
use land::markup::similarity::{Signal, similarity};
use land::markup::{
    ContextFinder, ContextKind, HeuristicContextFinder, MarkupSettings, PointContext, RemapCandidateInfo,
};
use land::parser::ParsedFile;
use rstest::rstest;

fn context_of(file: &ParsedFile, node_type: &str, name: &str) -> PointContext {
    let node = named(file, node_type, name);
    PointContext::core(tree(file), node, file, &MarkupSettings::default()).with_siblings(tree(file), node, file)
}

fn candidates_of_type(file: &ParsedFile, node_type: &str) -> Vec<RemapCandidateInfo> {
    let settings = MarkupSettings::default();
    nodes_of_type(file, node_type)
        .into_iter()
        .map(|n| {
            let context = PointContext::core(tree(file), n, file, &settings).with_siblings(tree(file), n, file);
            RemapCandidateInfo::new(n, file.name.clone(), context)
        })
        .collect()
}

fn finder() -> HeuristicContextFinder {
    HeuristicContextFinder::new(MarkupSettings::default().with_parallel(false))
}

#[rstest]
#[case("")]
#[case("x")]
#[case("int getValue() { return count; }")]
fn test_chars_self_similarity(#[case] text: &str) {
    assert_eq!(similarity(Signal::Chars(text), Signal::Chars(text)), 1.0);
}

#[test]
fn test_empty_conventions() {
    assert_eq!(similarity(Signal::Chars(""), Signal::Chars("")), 1.0);
    assert_eq!(similarity(Signal::Chars(""), Signal::Chars("abc")), 0.0);
    assert_eq!(similarity(Signal::Digests(&[]), Signal::Digests(&[1, 2])), 0.0);
}

#[test]
fn test_context_signals_self_similarity() {
    let file = parse("a.cs", NESTED_CLASSES);
    let context = context_of(&file, "method", "getValue");

    assert_eq!(
        similarity(Signal::Header(&context.header.sequence), Signal::Header(&context.header.sequence)),
        1.0
    );
    assert_eq!(
        similarity(Signal::Ancestors(&context.ancestors), Signal::Ancestors(&context.ancestors)),
        1.0
    );
    assert_eq!(context.inner.content.similarity(&context.inner.content), 1.0);
}

#[test]
fn test_unchanged_node_scores_one() {
    let file = parse("a.cs", NESTED_CLASSES);
    let point = context_of(&file, "method", "getValue");

    let ranked = finder().evaluate(&point, candidates_of_type(&file, "method"));

    assert_eq!(ranked[0].similarity, Some(1.0));
    assert!(ranked[0].is_auto);
}

#[test]
fn test_signals_empty_everywhere_get_zero_weight() {
    let old = parse("a.cs", "int Foo() {}");
    let new = parse("a.cs", "int Fob() {}\nint Bar() {}");
    let point = context_of(&old, "method", "Foo");

    let ranked = finder().evaluate(&point, candidates_of_type(&new, "method"));

    assert_eq!(ranked.len(), 2);
    for candidate in &ranked {
        let weights = candidate.weights.expect("weights are tuned");
        assert!(weights.is_zero(ContextKind::Ancestors));
        assert_eq!(candidate.ancestors, 1.0);

        let others = ContextKind::ALL.into_iter().filter(|k| *k != ContextKind::Ancestors);
        let (weighted, total) = others.fold((0.0, 0.0), |(weighted, total), kind| {
            let weight = weights.resolved(kind);
            (weighted + weight * candidate.score(kind), total + weight)
        });
        assert!(total > 0.0);
        let similarity = candidate.similarity.expect("scored");
        assert!((similarity - weighted / total).abs() < 1e-9, "{} != {}", similarity, weighted / total);
    }
    assert_eq!(ranked[0].node, named(&new, "method", "Fob"));
}

#[test]
fn test_unrelated_addition_keeps_auto_decision() {
    let old = parse("a.cs", "int Foo(int a) { return a; }\nint Bar() {}");
    let point = context_of(&old, "method", "Foo");

    let edited = parse("a.cs", "int Foo(int b) { return b; }\nint Bar() {}");
    let ranked = finder().evaluate(&point, candidates_of_type(&edited, "method"));
    assert!(ranked[0].is_auto);

    let extended = parse(
        "a.cs",
        "int Foo(int b) { return b; }\nint Bar() {}\nstring Unrelated(string s, string t) { while (true) {} }",
    );
    let ranked = finder().evaluate(&point, candidates_of_type(&extended, "method"));
    assert!(ranked[0].is_auto);
    assert_eq!(ranked[0].node, named(&extended, "method", "Foo"));
}
