//! Word and punctuation tokenizer
//!
//! Letters and combining marks of any script group into one word, as do runs
//! of digits. Every other visible character stands alone as punctuation.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Token, TokenKind};

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<word>[\p{L}\p{M}]+|\d+)|(?P<punct>[^\s\p{L}\p{M}\d])")
        .expect("token pattern is valid")
});

/// Split text into ordered word and punctuation tokens
///
/// # Examples
/// ```
/// use dictation::tokenizer::tokenize;
///
/// let tokens = tokenize("Hei, verden!");
/// let raw: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
/// assert_eq!(raw, vec!["Hei", ",", "verden", "!"]);
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
    TOKEN_PATTERN
        .captures_iter(text)
        .enumerate()
        .map(|(index, caps)| match caps.name("word") {
            Some(word) => Token::new(word.as_str(), TokenKind::Word, index),
            None => Token::new(&caps[0], TokenKind::Punct, index),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(text: &str) -> Vec<String> {
        tokenize(text).into_iter().map(|t| t.raw).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n").is_empty());
    }

    #[test]
    fn test_words_and_punctuation() {
        let tokens = tokenize("Det var fint.");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].raw, "Det");
        assert_eq!(tokens[0].norm, "det");
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[3].raw, ".");
        assert_eq!(tokens[3].kind, TokenKind::Punct);
        assert!(tokens[..3].iter().all(Token::is_word));
        assert!(tokens[3].is_punct() && !tokens[3].is_word());
        assert_eq!(
            tokens.iter().map(|t| t.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_non_latin_scripts() {
        assert_eq!(raws("Привет, мир"), vec!["Привет", ",", "мир"]);
        assert_eq!(raws("blåbær søt"), vec!["blåbær", "søt"]);
    }

    #[test]
    fn test_combining_marks_stay_in_word() {
        // "e" followed by U+0301 COMBINING ACUTE ACCENT
        let tokens = tokenize("cafe\u{301} noir");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].raw, "cafe\u{301}");
    }

    #[test]
    fn test_digits_split_from_letters() {
        assert_eq!(raws("abc123def"), vec!["abc", "123", "def"]);
        assert_eq!(tokenize("2024")[0].kind, TokenKind::Word);
    }

    #[test]
    fn test_each_punctuation_char_is_a_token() {
        assert_eq!(raws("...?!"), vec![".", ".", ".", "?", "!"]);
        assert_eq!(raws("don't"), vec!["don", "'", "t"]);
    }

    #[test]
    fn test_whitespace_is_never_a_token() {
        assert_eq!(raws("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn test_stable() {
        let text = "«Hei» – sa hun … 3 ganger!";
        assert_eq!(tokenize(text), tokenize(text));
    }

    #[test]
    fn test_preserves_non_whitespace_order() {
        let text = "Jeg  så (en) rød-bil , i går!";
        let joined: String = tokenize(text).iter().map(|t| t.raw.as_str()).collect();
        let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(joined, expected);
    }
}
