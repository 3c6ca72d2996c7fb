//! Text manipulation utilities for header words and content fingerprints.

/// Check if a character is considered part of a word (identifier).
///
/// Uses Unicode Standard Annex #31 rules for identifier characters.
#[inline]
pub fn is_word_character(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Whitespace characters dropped by [`normalize_text`]
#[inline]
fn is_layout(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{000C}' | '\t' | ' ')
}

/// Lowercase `text` and remove all layout characters.
///
/// Used to compare source fragments independently of formatting.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !is_layout(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split an identifier-like string into words.
///
/// Parts are separated by `_` and spaces, then split further at
/// camel-case humps (`fooBar`, `HTTPServer`), at changes between word and
/// non-word characters, and at changes between digits and non-digits.
///
/// # Example
/// ```
/// use land::core::text_utils::split_words;
///
/// assert_eq!(split_words("getHTTPResponse2"), vec!["get", "HTTP", "Response", "2"]);
/// assert_eq!(split_words("foo_bar(x)"), vec!["foo", "bar", "(", "x", ")"]);
/// ```
pub fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();

    for part in text.split(['_', ' ']).filter(|p| !p.is_empty()) {
        let chars: Vec<(usize, char)> = part.char_indices().collect();
        let mut first = 0;

        for i in 1..chars.len() {
            let prev = chars[i - 1].1;
            let curr = chars[i].1;
            let next = chars.get(i + 1).map(|(_, c)| *c);

            let hump = prev.is_lowercase() && curr.is_uppercase();
            let acronym_end = prev.is_uppercase() && curr.is_uppercase() && next.is_some_and(char::is_lowercase);
            let class_change = is_word_character(prev) != is_word_character(curr);
            let digit_change = prev.is_numeric() != curr.is_numeric();

            if hump || acronym_end || class_change || digit_change {
                words.push(&part[chars[first].0..chars[i].0]);
                first = i;
            }
        }

        words.push(&part[chars[first].0..]);
    }

    words
}

/// True if every character of `word` is a word character
pub fn is_plain_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(is_word_character)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foo", vec!["foo"])]
    #[case("fooBar", vec!["foo", "Bar"])]
    #[case("HTTPServer", vec!["HTTP", "Server"])]
    #[case("snake_case_name", vec!["snake", "case", "name"])]
    #[case("item42x", vec!["item", "42", "x"])]
    #[case("Foo(int x)", vec!["Foo", "(", "int", "x", ")"])]
    #[case("__", vec![])]
    fn test_split_words(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_words(input), expected);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Foo\n\t(Bar ) "), "foo(bar)");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_is_plain_word() {
        assert!(is_plain_word("abc1"));
        assert!(!is_plain_word("a+b"));
        assert!(!is_plain_word(""));
    }
}
