//! Splits text into the word and punctuation tokens that the vocabulary assigns IDs to, implemented
//! as a Rust [`Iterator`].
//!
//! The policy is deliberately simple and entirely independent of any vocabulary state:
//!
//! - The text is lowercased first.
//! - A maximal run of ASCII letters and digits is one token.
//! - Any other single character that is neither whitespace nor a word character is one token on
//!   its own.  `"!!"` is two tokens.
//! - Whitespace separates tokens and is never emitted.  So is `_`, which counts as a word
//!   character but not as alphanumeric, so it is neither half of the pattern.

use crate::TokenString;
use once_cell::sync::Lazy;
use regex::Regex;

const TOKEN_PATTERN: &str = r"[a-zA-Z0-9]+|[^\s0-9A-Za-z_]";

static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(TOKEN_PATTERN).expect("BUG: token regex is not valid"));

/// Iterator over the tokens of a piece of text.
///
/// Tokens are found one regex match at a time as the iterator is advanced, but the lowercased copy
/// of the input is made up front, so the iterator owns everything it needs and doesn't borrow the
/// caller's text.
#[derive(Clone, Debug)]
pub struct Tokens {
    /// The lowercased input text
    text: String,

    /// The offset into `text` where the next match attempt should start
    pos: usize,
}

impl Tokens {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().to_lowercase(),
            pos: 0,
        }
    }
}

impl Iterator for Tokens {
    type Item = TokenString;

    fn next(&mut self) -> Option<Self::Item> {
        TOKEN_REGEX.find_at(&self.text, self.pos).map(|m| {
            self.pos = m.end();

            m.as_str().to_owned()
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Every token consumes at least one byte, so what's left of the text bounds the count
        (0, Some(self.text.len() - self.pos))
    }
}

/// Split `text` into its tokens, in the order they appear.
///
/// Same input, same output, every time.  Text with no letters, digits, or symbols in it produces an
/// empty `Vec`.
pub fn tokenize(text: impl AsRef<str>) -> Vec<TokenString> {
    Tokens::new(text).collect()
}
