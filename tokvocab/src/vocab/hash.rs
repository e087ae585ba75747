//! The lookup tables behind a [`super::Vocabulary`].
//!
//! Both directions are kept as separate hash maps so that encoding and decoding are each a single
//! lookup.  Keeping them consistent with one another is the job of the vocabulary, not of these
//! types.
use crate::token::{TokenId, TokenString};

use rustc_hash::FxHashMap as HashMap;

/// Maps token strings to the IDs assigned to them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenEncoder(HashMap<TokenString, TokenId>);

/// The reverse mapping, from a token's ID back to its string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenDecoder(HashMap<TokenId, TokenString>);

// Any iterator of token string/token id pairs can be used to construct either an encoder or
// decoder

impl TokenEncoder {
    pub fn new<Iter, Str>(items: Iter) -> Self
    where
        Iter: IntoIterator<Item = (Str, TokenId)>,
        Str: Into<TokenString>,
    {
        Self(
            items
                .into_iter()
                .map(|(token, id)| (token.into(), id))
                .collect(),
        )
    }

    pub fn id_for_token(&self, token: &str) -> Option<TokenId> {
        self.0.get(token).copied()
    }

    pub(crate) fn insert(&mut self, token: TokenString, id: TokenId) {
        self.0.insert(token, id);
    }

    /// Invert the lookup table so the keys become the values, which is another way of describing a
    /// decoder
    pub fn invert(&self) -> TokenDecoder {
        TokenDecoder::new(self.0.iter().map(|(token, id)| (token.clone(), *id)))
    }

    /// All of the string/id pairs, in no particular order
    pub fn tokens(&self) -> impl Iterator<Item = (&TokenString, TokenId)> {
        self.0.iter().map(|(s, i)| (s, *i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TokenDecoder {
    pub fn new<Iter, Str>(items: Iter) -> Self
    where
        Iter: IntoIterator<Item = (Str, TokenId)>,
        Str: Into<TokenString>,
    {
        Self(
            items
                .into_iter()
                .map(|(token, id)| (id, token.into()))
                .collect(),
        )
    }

    pub fn token_for_id(&self, id: TokenId) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub(crate) fn insert(&mut self, id: TokenId, token: TokenString) {
        self.0.insert(id, token);
    }

    /// Invert back into an encoder.  Used to rebuild a lost forward map from a surviving reverse
    /// map.
    pub fn invert(&self) -> TokenEncoder {
        TokenEncoder::new(self.0.iter().map(|(id, token)| (token.clone(), *id)))
    }

    /// All of the id/string pairs, in no particular order
    pub fn tokens(&self) -> impl Iterator<Item = (TokenId, &TokenString)> {
        self.0.iter().map(|(i, s)| (*i, s))
    }

    /// The largest ID in the table, if there are any
    pub fn max_id(&self) -> Option<TokenId> {
        self.0.keys().max().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
