//! Edit-distance similarity over context signals.
//!
//! Every signal reduces to one weighted Wagner–Fischer distance:
//!
//! * inserting or deleting an element costs its priority;
//! * substituting `a` by `b` costs `priority(a) * (1 - sim(a, b))`, where
//!   `sim` recurses into the elements;
//! * elements that cannot stand for each other are never substituted.
//!
//! The distance is normalised to a similarity `1 - d / denominator`, and
//! the denominator depends on the signal.

use rustc_hash::FxHashMap;

use super::context::{AncestorsContextElement, HeaderContextElement, PrioritizedWord};

/// A context signal to compare
#[derive(Debug, Clone, Copy)]
pub enum Signal<'a> {
    Chars(&'a str),
    Words(&'a [PrioritizedWord]),
    Header(&'a [HeaderContextElement]),
    HeaderElement(&'a HeaderContextElement),
    Ancestors(&'a [AncestorsContextElement]),
    AncestorElement(&'a AncestorsContextElement),
    Digests(&'a [u64]),
}

/// Similarity of two signals of the same kind in `[0, 1]`.
///
/// Two empty sequences are identical; an empty and a non-empty one share
/// nothing. Signals of different kinds are unrelated.
pub fn similarity(a: Signal<'_>, b: Signal<'_>) -> f64 {
    match (a, b) {
        (Signal::Chars(a), Signal::Chars(b)) => {
            let a: Vec<char> = a.chars().collect();
            let b: Vec<char> = b.chars().collect();
            levenshtein(&a, &b, max_length)
        }
        (Signal::Words(a), Signal::Words(b)) => levenshtein(a, b, max_weight),
        (Signal::Header(a), Signal::Header(b)) => levenshtein(a, b, socket_weight),
        (Signal::HeaderElement(a), Signal::HeaderElement(b)) => a.similarity_to(b).unwrap_or(0.0),
        (Signal::Ancestors(a), Signal::Ancestors(b)) => levenshtein(a, b, max_length),
        (Signal::AncestorElement(a), Signal::AncestorElement(b)) => a.similarity_to(b).unwrap_or(0.0),
        (Signal::Digests(a), Signal::Digests(b)) => levenshtein(a, b, max_length),
        _ => 0.0,
    }
}

/// An element of a compared sequence
pub(crate) trait Element: PartialEq {
    /// Cost of inserting or deleting the element
    fn cost(&self) -> f64 {
        1.0
    }

    /// `None` if `other` can never stand in for `self`
    fn similarity_to(&self, other: &Self) -> Option<f64>;
}

impl Element for char {
    fn similarity_to(&self, other: &Self) -> Option<f64> {
        Some(if self == other { 1.0 } else { 0.0 })
    }
}

impl Element for u64 {
    fn similarity_to(&self, other: &Self) -> Option<f64> {
        Some(if self == other { 1.0 } else { 0.0 })
    }
}

impl Element for PrioritizedWord {
    fn cost(&self) -> f64 {
        self.priority
    }

    fn similarity_to(&self, other: &Self) -> Option<f64> {
        Some(similarity(Signal::Chars(&self.text), Signal::Chars(&other.text)))
    }
}

impl Element for HeaderContextElement {
    fn cost(&self) -> f64 {
        self.priority
    }

    fn similarity_to(&self, other: &Self) -> Option<f64> {
        if !self.equals_ignore_value(other) {
            return None;
        }

        if self.exact_match {
            Some(if self.joined() == other.joined() { 1.0 } else { 0.0 })
        } else {
            Some(similarity(Signal::Words(&self.value), Signal::Words(&other.value)))
        }
    }
}

impl Element for AncestorsContextElement {
    fn similarity_to(&self, other: &Self) -> Option<f64> {
        if self.node_type != other.node_type {
            return Some(0.0);
        }
        Some(similarity(
            Signal::Header(&self.header.sequence),
            Signal::Header(&other.header.sequence),
        ))
    }
}

fn max_length<T>(a: &[T], b: &[T]) -> f64 {
    a.len().max(b.len()) as f64
}

fn max_weight<T: Element>(a: &[T], b: &[T]) -> f64 {
    let weight = |s: &[T]| s.iter().map(Element::cost).sum::<f64>();
    weight(a).max(weight(b))
}

/// Total priority of `a`, plus the priority of the elements of `b` that
/// have no same-typed counterpart in `a`
fn socket_weight(a: &[HeaderContextElement], b: &[HeaderContextElement]) -> f64 {
    let mut sockets: FxHashMap<(&str, u64, bool), (f64, isize)> = FxHashMap::default();

    for element in a {
        let entry = sockets
            .entry((element.node_type.as_str(), element.priority.to_bits(), element.exact_match))
            .or_insert((element.priority, 0));
        entry.1 += 1;
    }
    let mut denominator: f64 = sockets.values().map(|(p, count)| p * *count as f64).sum();

    for element in b {
        let entry = sockets
            .entry((element.node_type.as_str(), element.priority.to_bits(), element.exact_match))
            .or_insert((element.priority, 0));
        entry.1 -= 1;
        if entry.1 < 0 {
            denominator += element.priority;
        }
    }

    denominator
}

/// Weighted edit-distance similarity of two sequences. `denominator` sees
/// the untrimmed sequences.
fn levenshtein<T: Element>(a: &[T], b: &[T], denominator: impl FnOnce(&[T], &[T]) -> f64) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let denominator = denominator(a, b);

    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut previous: Vec<f64> = std::iter::once(0.0)
        .chain(b.iter().scan(0.0, |acc, y| {
            *acc += y.cost();
            Some(*acc)
        }))
        .collect();
    let mut current = vec![0.0; b.len() + 1];

    for x in a {
        current[0] = previous[0] + x.cost();
        for (j, y) in b.iter().enumerate() {
            let mut best = (previous[j + 1] + x.cost()).min(current[j] + y.cost());
            if let Some(sim) = x.similarity_to(y) {
                best = best.min(previous[j] + x.cost() * (1.0 - sim));
            }
            current[j + 1] = best;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let distance = previous[b.len()];
    if denominator <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }

    (1.0 - distance / denominator).clamp(0.0, 1.0)
}
