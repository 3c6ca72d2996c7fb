//! Normalised text fragments and their fuzzy fingerprints.
//!
//! Short fragments are compared as text. Long ones carry a sequence of
//! chunk digests: a rolling hash over a small window cuts the text at
//! content-defined boundaries, so an edit only disturbs the chunks it
//! touches and the sequences can be compared by edit distance.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::similarity::{Signal, similarity};
use crate::core::normalize_text;

/// Characters the rolling hash looks at
const WINDOW: usize = 4;
/// Expected chunk length
const BLOCK: u32 = 8;
const BASE: u32 = 257;

/// Text of a source fragment, its fuzzy hash, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOrHash {
    /// Lowercased text without layout characters; kept for short fragments
    pub text: Option<String>,
    /// Chunk digests; computed for long fragments
    pub hash: Option<Vec<u64>>,
    /// Length of the normalised text in characters
    pub text_length: usize,
}

impl TextOrHash {
    /// Fragments longer than this get a hash
    pub const MIN_TEXT_LENGTH: usize = 25;
    /// Fragments longer than this drop their text
    pub const MAX_TEXT_LENGTH: usize = 100;

    pub fn new(text: &str) -> Self {
        let normalized = normalize_text(text);
        let text_length = normalized.chars().count();

        let hash = (text_length > Self::MIN_TEXT_LENGTH).then(|| chunk_digests(&normalized));
        let text = (text_length <= Self::MAX_TEXT_LENGTH).then_some(normalized);

        Self {
            text,
            hash,
            text_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_length == 0
    }

    /// Similarity in `[0, 1]`; scores under `MIN_TEXT_LENGTH / MAX_TEXT_LENGTH`
    /// are treated as noise and floored to 0
    pub fn similarity(&self, other: &TextOrHash) -> f64 {
        let score = match (&self.text, &other.text, &self.hash, &other.hash) {
            (Some(a), Some(b), _, _) => similarity(Signal::Chars(a), Signal::Chars(b)),
            (_, _, Some(a), Some(b)) => similarity(Signal::Digests(a), Signal::Digests(b)),
            _ => 0.0,
        };

        if score < Self::MIN_TEXT_LENGTH as f64 / Self::MAX_TEXT_LENGTH as f64 {
            0.0
        } else {
            score
        }
    }
}

fn digest(chunk: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(chunk.as_bytes());
    hasher.finish()
}

/// Cut `text` where the rolling hash of the last `WINDOW` characters hits
/// `BLOCK - 1` modulo `BLOCK`, and digest each chunk
fn chunk_digests(text: &str) -> Vec<u64> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let outgoing_factor = BASE.wrapping_pow(WINDOW as u32 - 1);

    let mut digests = Vec::new();
    let mut rolling: u32 = 0;
    let mut chunk_start = 0;

    for (i, (offset, c)) in chars.iter().enumerate() {
        if i >= WINDOW {
            let outgoing = chars[i - WINDOW].1 as u32;
            rolling = rolling.wrapping_sub(outgoing.wrapping_mul(outgoing_factor));
        }
        rolling = rolling.wrapping_mul(BASE).wrapping_add(*c as u32);

        if i + 1 >= WINDOW && rolling % BLOCK == BLOCK - 1 {
            let end = offset + c.len_utf8();
            digests.push(digest(&text[chunk_start..end]));
            chunk_start = end;
        }
    }

    if chunk_start < text.len() {
        digests.push(digest(&text[chunk_start..]));
    }

    digests
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LONG: &str = "public int Compute(int left, int right) { var sum = left + right; return sum * 2; }";

    #[rstest]
    #[case("", None, false)]
    #[case("a b\tc", Some("abc"), false)]
    #[case(LONG, None, true)]
    fn test_text_and_hash_presence(#[case] text: &str, #[case] kept: Option<&str>, #[case] hashed: bool) {
        let value = TextOrHash::new(text);
        if let Some(kept) = kept {
            assert_eq!(value.text.as_deref(), Some(kept));
        }
        assert_eq!(value.hash.is_some(), hashed);
    }

    #[test]
    fn test_medium_text_keeps_both() {
        let value = TextOrHash::new("int Foo(int bar, string baz, long q)");
        assert_eq!(value.text.as_deref(), Some("intfoo(intbar,stringbaz,longq)"));
        assert!(value.hash.is_some());
        assert_eq!(value.text_length, 30);
    }

    #[test]
    fn test_long_text_is_hash_only() {
        let text = LONG.repeat(2);
        let value = TextOrHash::new(&text);
        assert!(value.text.is_none());
        assert!(value.hash.as_ref().is_some_and(|h| !h.is_empty()));
    }

    #[test]
    fn test_formatting_does_not_matter() {
        let a = TextOrHash::new("{ return  x; }");
        let b = TextOrHash::new("{\n\treturn x;\n}");
        assert_eq!(a.similarity(&b), 1.0);
    }

    #[test]
    fn test_similar_long_texts_stay_close() {
        let original = LONG.repeat(3);
        let edited = original.replacen("sum * 2", "sum * 3", 1);
        let a = TextOrHash::new(&original);
        let b = TextOrHash::new(&edited);

        assert!(a.similarity(&b) > 0.8);
        assert_eq!(a.similarity(&a), 1.0);
    }

    #[test]
    fn test_unrelated_short_texts_floor_to_zero() {
        let a = TextOrHash::new("abcd");
        let b = TextOrHash::new("wxyz");
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_text_and_hash_only_are_incomparable() {
        let short = TextOrHash::new("abc");
        let long = TextOrHash::new(&LONG.repeat(2));
        assert_eq!(short.similarity(&long), 0.0);
    }
}
