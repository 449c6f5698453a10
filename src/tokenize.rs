//! Document preprocessing: normalization, whitespace tokenization and
//! alphabet-based token cleaning.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::ConfigError;

/// Letters kept when cleaning tokens (digits are always kept).
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz\
ÀÂÄĂÇÈÉÊËÎÏÒÓÔÖȘȚÙÛÜàâäăçèéêëìîïòóôöșțùûüÿŸ";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Characters dropped before tokenization: NOT SIGN and SOFT HYPHEN, both
/// used as line-break hyphenation marks in scanned or typeset text.
const INVISIBLE_HYPHENS: [char; 2] = ['\u{00AC}', '\u{00AD}'];

/// A whitespace-delimited token of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub index: usize,
    /// The token as it appears in the normalized document.
    pub surface: String,
    /// The surface with outer non-alphabet characters stripped.
    pub cleaned: String,
}

/// A preprocessed document: the normalized text and its tokens.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Strips characters outside a configured alphabet.
#[derive(Debug, Clone)]
pub struct Cleaner {
    leading: Regex,
    trailing: Regex,
    interior: Regex,
}

impl Cleaner {
    pub fn new(alphabet: &str) -> Result<Self, ConfigError> {
        let class: String = alphabet
            .chars()
            .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
            .collect();
        let outside = format!("[^{class}0-9]+");
        let build = |pattern: String| Regex::new(&pattern).map_err(|source| ConfigError::Alphabet { source });
        Ok(Self {
            leading: build(format!("^{outside}"))?,
            trailing: build(format!("{outside}$"))?,
            interior: build(outside)?,
        })
    }

    /// Remove leading and trailing characters outside the alphabet.
    pub fn clean(&self, token: &str) -> String {
        let stripped = self.trailing.replace(token, "");
        self.leading.replace(&stripped, "").into_owned()
    }

    /// Longest alphabetic sub-token of `token`, used as the dictionary key.
    ///
    /// Outer punctuation is stripped, inner runs of it split the token; the
    /// first of several equally long pieces wins.
    pub fn longest_subtoken(&self, token: &str) -> String {
        let cleaned = self.clean(token);
        let spaced = self.interior.replace_all(&cleaned, " ");
        let mut longest = "";
        let mut longest_len = 0;
        for piece in spaced.split_whitespace() {
            let len = piece.chars().count();
            if len > longest_len {
                longest = piece;
                longest_len = len;
            }
        }
        longest.to_string()
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        // The default alphabet is a compile-time constant.
        Self::new(DEFAULT_ALPHABET).unwrap()
    }
}

/// NFC-normalize, drop invisible hyphens and collapse whitespace runs.
pub fn normalize_text(text: &str) -> String {
    let composed: String = text
        .nfc()
        .filter(|c| !INVISIBLE_HYPHENS.contains(c))
        .collect();
    WHITESPACE.replace_all(&composed, " ").trim().to_string()
}

/// Normalize `text` and split it on whitespace into cleaned tokens.
pub fn tokenize(text: &str, cleaner: &Cleaner) -> Document {
    let text = normalize_text(text);
    let tokens = text
        .split_whitespace()
        .enumerate()
        .map(|(index, surface)| Token {
            index,
            surface: surface.to_string(),
            cleaned: cleaner.clean(surface),
        })
        .collect();
    Document { text, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_outer_punctuation_only() {
        let cleaner = Cleaner::default();
        assert_eq!(cleaner.clean("«bonjour»,"), "bonjour");
        assert_eq!(cleaner.clean("(l'école)"), "l'école");
        assert_eq!(cleaner.clean("2022."), "2022");
        assert_eq!(cleaner.clean("..."), "");
    }

    #[test]
    fn longest_subtoken_splits_on_inner_punctuation() {
        let cleaner = Cleaner::default();
        assert_eq!(cleaner.longest_subtoken("l'école,"), "école");
        assert_eq!(cleaner.longest_subtoken("well-known"), "known");
        assert_eq!(cleaner.longest_subtoken("ab-cd"), "ab");
        assert_eq!(cleaner.longest_subtoken("?!"), "");
    }

    #[test]
    fn custom_alphabet_with_regex_metacharacters() {
        let cleaner = Cleaner::new("ab-^]").unwrap();
        assert_eq!(cleaner.clean("zz-ab^zz"), "-ab^");
        assert_eq!(cleaner.clean("xx"), "");
    }

    #[test]
    fn normalization_drops_hyphen_marks_and_collapses_whitespace() {
        let text = "hel\u{00AD}lo \t\n  wor\u{00AC}ld  ";
        assert_eq!(normalize_text(text), "hello world");
    }

    #[test]
    fn normalization_composes_accents() {
        // "e" followed by a combining acute accent.
        let decomposed = "e\u{0301}cole";
        assert_eq!(normalize_text(decomposed), "école");
        let cleaner = Cleaner::default();
        assert_eq!(cleaner.clean(&normalize_text("«e\u{0301}»")), "é");
    }

    #[test]
    fn tokenize_keeps_surface_and_cleaned_forms() {
        let doc = tokenize("Hello, bonjour  world!", &Cleaner::default());
        assert_eq!(doc.text, "Hello, bonjour world!");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.tokens[0].surface, "Hello,");
        assert_eq!(doc.tokens[0].cleaned, "Hello");
        assert_eq!(doc.tokens[2].cleaned, "world");
        assert_eq!(doc.tokens[2].index, 2);
    }

    #[test]
    fn tokenize_empty_text() {
        let doc = tokenize("   \n ", &Cleaner::default());
        assert!(doc.is_empty());
        assert_eq!(doc.text, "");
    }
}
