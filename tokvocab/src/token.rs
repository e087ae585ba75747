/// The integer form of a token, as assigned by a [`crate::Vocabulary`].
///
/// IDs are handed out in increasing order starting at [`FIRST_TOKEN_ID`] the first time a token
/// is seen, and are never reused.  Zero is never assigned.
pub type TokenId = u64;

/// A token in its text form: either a run of ASCII letters and digits, or a single punctuation or
/// symbol character.  Always lowercase.
pub type TokenString = String;

/// The first ID a fresh vocabulary assigns.
pub const FIRST_TOKEN_ID: TokenId = 1;

/// Substituted by decoding for any ID the vocabulary doesn't know.
///
/// The tokenizer emits `<` and `>` as single-character tokens, so this string can never be
/// produced by tokenizing text and is never ambiguous with a real token.
pub const UNKNOWN_TOKEN: &str = "<UNK>";

/// The ID for a number that was written in floating point form, such as `5.0` or `1e2`.
///
/// Only finite, non-negative, integral values small enough to be a [`TokenId`] qualify.
pub fn id_from_f64(value: f64) -> Option<TokenId> {
    // `TokenId::MAX as f64` rounds up to 2^64, which is itself out of range
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < TokenId::MAX as f64)
        .then_some(value as TokenId)
}
