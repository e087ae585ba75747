use crate::{
    error::IdSpaceExhaustedSnafu, tokenize::Tokens, Result, TokenId, TokenString, FIRST_TOKEN_ID,
    UNKNOWN_TOKEN,
};
use itertools::Itertools;
use snafu::ensure;
use tracing::*;

mod hash;

pub use hash::{TokenDecoder, TokenEncoder};

/// An append-only, in-memory vocabulary mapping tokens to IDs and back.
///
/// New tokens get the next unused ID, counting up from [`FIRST_TOKEN_ID`].  Tokens are never
/// removed and IDs are never reused, so once a token has an ID it keeps it for the life of the
/// vocabulary.
///
/// This type knows nothing about persistence; see [`crate::VocabularyStore`] for the type that
/// writes the vocabulary back to storage after each change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    /// Token string to ID
    forward: TokenEncoder,

    /// ID to token string.  Always the exact inverse of `forward`.
    backward: TokenDecoder,

    /// The ID the next new token will get.  Always greater than every ID in `backward`.
    next_id: TokenId,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// A vocabulary with no tokens in it
    pub fn new() -> Self {
        Self {
            forward: TokenEncoder::default(),
            backward: TokenDecoder::default(),
            next_id: FIRST_TOKEN_ID,
        }
    }

    /// Assemble a vocabulary from tables that the caller has already checked are consistent.
    pub(crate) fn from_parts(
        forward: TokenEncoder,
        backward: TokenDecoder,
        next_id: TokenId,
    ) -> Self {
        debug_assert_eq!(forward.len(), backward.len());
        debug_assert!(backward.max_id().map_or(true, |max| max < next_id));

        Self {
            forward,
            backward,
            next_id,
        }
    }

    pub fn forward(&self) -> &TokenEncoder {
        &self.forward
    }

    pub fn backward(&self) -> &TokenDecoder {
        &self.backward
    }

    /// The ID that will be assigned to the next previously-unseen token
    pub fn next_id(&self) -> TokenId {
        self.next_id
    }

    /// Number of distinct tokens in the vocabulary
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn id_for_token(&self, token: &str) -> Option<TokenId> {
        self.forward.id_for_token(token)
    }

    pub fn token_for_id(&self, id: TokenId) -> Option<&str> {
        self.backward.token_for_id(id)
    }

    /// Get the ID for `token`, assigning it the next ID if it hasn't been seen before.
    ///
    /// The second element of the result is `true` if the token was added by this call.
    ///
    /// Fails without changing anything if the token is new and the next ID has reached
    /// [`TokenId::MAX`], which is never assigned.
    pub fn intern(&mut self, token: TokenString) -> Result<(TokenId, bool)> {
        if let Some(id) = self.forward.id_for_token(&token) {
            return Ok((id, false));
        }

        ensure!(self.next_id < TokenId::MAX, IdSpaceExhaustedSnafu { token });

        let id = self.next_id;
        trace!(id, token = %token, "Assigning new token ID");

        self.backward.insert(id, token.clone());
        self.forward.insert(token, id);
        self.next_id += 1;

        Ok((id, true))
    }

    /// Tokenize `text` and return the ID of each token in order, adding any new tokens to the
    /// vocabulary along the way.
    ///
    /// Repeated tokens produce repeated IDs.  If the ID space runs out partway through, the tokens
    /// already added stay added and the error is returned.
    pub fn encode(&mut self, text: impl AsRef<str>) -> Result<Vec<TokenId>> {
        let tokens = Tokens::new(text);
        let mut ids = Vec::with_capacity(tokens.size_hint().0);
        let mut added = 0usize;

        for token in tokens {
            let (id, is_new) = self.intern(token)?;
            if is_new {
                added += 1;
            }
            ids.push(id);
        }

        debug!(
            tokens = ids.len(),
            added,
            vocab_size = self.len(),
            "Encoded text"
        );

        Ok(ids)
    }

    /// Turn IDs back into text, with a single space between tokens.
    ///
    /// IDs this vocabulary has never assigned come out as [`UNKNOWN_TOKEN`].  This is an
    /// approximate inverse of [`Self::encode`]: case and the original spacing are gone, so what
    /// comes back is the lowercase token sequence, space-joined.
    pub fn decode(&self, ids: &[TokenId]) -> String {
        self.decode_ids(ids.iter().copied().map(Some))
    }

    /// Like [`Self::decode`], but each ID is optional.  `None` stands for an input that wasn't a
    /// valid ID at all (not a number, negative, fractional) and always decodes as
    /// [`UNKNOWN_TOKEN`].
    pub fn decode_ids<I>(&self, ids: I) -> String
    where
        I: IntoIterator<Item = Option<TokenId>>,
    {
        ids.into_iter()
            .map(|id| {
                id.and_then(|id| self.token_for_id(id))
                    .unwrap_or(UNKNOWN_TOKEN)
            })
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tokenize, TokvocabError};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn fresh_vocab_assigns_from_one() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vec![1, 2, 3, 4], vocab.encode("hello, world!").unwrap());
        assert_eq!(5, vocab.next_id());
        assert_eq!(4, vocab.len());
    }

    #[test]
    fn repeated_tokens_reuse_ids() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vec![1, 2, 1, 2, 1], vocab.encode("a b a b A").unwrap());
        assert_eq!(vec![2, 1], vocab.encode("B a").unwrap());
        assert_eq!(3, vocab.next_id());
    }

    #[test]
    fn empty_text_encodes_to_nothing() {
        let mut vocab = Vocabulary::new();
        assert!(vocab.encode("").unwrap().is_empty());
        assert!(vocab.encode("  \n ").unwrap().is_empty());
        assert!(vocab.is_empty());
        assert_eq!(FIRST_TOKEN_ID, vocab.next_id());
    }

    #[test]
    fn decode_joins_with_spaces() {
        let mut vocab = Vocabulary::new();
        vocab.encode("hello, world!").unwrap();
        assert_eq!("hello , world !", vocab.decode(&[1, 2, 3, 4]));
        assert_eq!("world hello", vocab.decode(&[3, 1]));
        assert_eq!("", vocab.decode(&[]));
    }

    #[test]
    fn decode_substitutes_unknown_ids() {
        let mut vocab = Vocabulary::new();
        vocab.encode("hello").unwrap();
        assert_eq!("<UNK>", vocab.decode(&[999]));
        assert_eq!("<UNK> hello <UNK>", vocab.decode(&[0, 1, TokenId::MAX]));
        assert_eq!("hello <UNK>", vocab.decode_ids([Some(1), None]));
    }

    #[test]
    fn decode_does_not_mutate() {
        let mut vocab = Vocabulary::new();
        vocab.encode("one two").unwrap();
        let before = vocab.clone();
        vocab.decode(&[1, 2, 3, 4]);
        assert_eq!(before, vocab);
    }

    #[test]
    fn intern_reports_new_tokens() {
        let mut vocab = Vocabulary::new();
        assert_eq!((1, true), vocab.intern("x".to_string()).unwrap());
        assert_eq!((1, false), vocab.intern("x".to_string()).unwrap());
        assert_eq!((2, true), vocab.intern("y".to_string()).unwrap());
    }

    #[test]
    fn last_id_is_never_assigned() {
        let mut vocab = Vocabulary::from_parts(
            TokenEncoder::new([("a", TokenId::MAX - 2)]),
            TokenDecoder::new([("a", TokenId::MAX - 2)]),
            TokenId::MAX - 1,
        );

        assert_matches!(
            vocab.encode("a b c"),
            Err(TokvocabError::IdSpaceExhausted { token }) if token == "c"
        );
        assert_eq!(Some(TokenId::MAX - 1), vocab.id_for_token("b"));
        assert_eq!(None, vocab.id_for_token("c"));
        assert_eq!(TokenId::MAX, vocab.next_id());

        // Known tokens still encode, and decoding is unaffected
        assert_eq!(vec![TokenId::MAX - 2, TokenId::MAX - 1], vocab.encode("A B").unwrap());
        assert_eq!("a b <UNK>", vocab.decode(&[TokenId::MAX - 2, TokenId::MAX - 1, TokenId::MAX]));
        assert_matches!(vocab.encode("c"), Err(TokvocabError::IdSpaceExhausted { .. }));
    }

    proptest! {
        #[test]
        fn ids_are_stable_across_calls(a in "\\PC*", b in "\\PC*") {
            let mut vocab = Vocabulary::new();
            let first = vocab.encode(&a).unwrap();
            vocab.encode(&b).unwrap();
            prop_assert_eq!(first, vocab.encode(&a).unwrap());
        }

        #[test]
        fn maps_stay_exact_inverses(texts in proptest::collection::vec("\\PC*", 0..8)) {
            let mut vocab = Vocabulary::new();
            for text in &texts {
                vocab.encode(text).unwrap();
            }

            prop_assert_eq!(vocab.forward().len(), vocab.backward().len());
            for (token, id) in vocab.forward().tokens() {
                prop_assert_eq!(Some(token.as_str()), vocab.token_for_id(id));
            }
        }

        #[test]
        fn ids_are_gap_free_from_one(texts in proptest::collection::vec("\\PC*", 0..8)) {
            let mut vocab = Vocabulary::new();
            let mut last_seen_max = 0;
            for text in &texts {
                for id in vocab.encode(text).unwrap() {
                    // A brand new ID is always exactly one past the largest seen so far
                    prop_assert!(id <= last_seen_max + 1);
                    last_seen_max = last_seen_max.max(id);
                }
            }

            prop_assert_eq!(vocab.len() as TokenId + 1, vocab.next_id());
            for id in FIRST_TOKEN_ID..vocab.next_id() {
                prop_assert!(vocab.token_for_id(id).is_some());
            }
        }

        #[test]
        fn decode_reproduces_lowercase_tokens(s in "\\PC*") {
            let mut vocab = Vocabulary::new();
            let ids = vocab.encode(&s).unwrap();
            prop_assert_eq!(tokenize(&s).join(" "), vocab.decode(&ids));
        }

        #[test]
        fn decode_is_total(ids in proptest::collection::vec(any::<TokenId>(), 0..32)) {
            let mut vocab = Vocabulary::new();
            vocab.encode("some words here").unwrap();
            let decoded = vocab.decode(&ids);
            prop_assert_eq!(ids.len(), decoded.split(' ').filter(|s| !s.is_empty()).count());
        }
    }
}
