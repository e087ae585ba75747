//! The on-disk shape of a vocabulary, and the rules for turning whatever was read back into a
//! [`Vocabulary`] that upholds its invariants.
//!
//! ```json
//! {
//!   "vocab": { "hello": 1, ",": 2 },
//!   "reverseVocab": { "1": "hello", "2": "," },
//!   "nextId": 3
//! }
//! ```
//!
//! JSON object keys are always strings, so the integer keys of `reverseVocab` are written as
//! strings and parsed back into [`TokenId`]s on read.  A key that doesn't parse makes the whole
//! document malformed.
//!
//! IDs are read leniently: besides plain integers, a number with an integral value written in
//! floating point form (`3.0`, `1e2`) is accepted, since that's how some JSON writers emit every
//! number.
use crate::vocab::{TokenDecoder, TokenEncoder, Vocabulary};
use crate::{id_from_f64, TokenId, TokenString, FIRST_TOKEN_ID};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use snafu::{ensure, ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Reasons a persisted vocabulary can't be used at all.  The store recovers from all of these by
/// starting over with an empty vocabulary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    #[snafu(display("Persisted vocabulary is not valid JSON of the expected shape: {source}"))]
    Malformed { source: serde_json::Error },

    #[snafu(display("'vocab' has {forward} entries but 'reverseVocab' has {backward}"))]
    SizeMismatch { forward: usize, backward: usize },

    #[snafu(display(
        "Token '{token}' has ID {id} in 'vocab' but 'reverseVocab' maps that ID to {}",
        found.as_deref().map_or_else(|| "nothing".to_string(), |t| format!("'{t}'"))
    ))]
    Inconsistent {
        token: TokenString,
        id: TokenId,
        found: Option<TokenString>,
    },

    /// 0 and [`TokenId::MAX`] are never assigned
    #[snafu(display("Token '{token}' has ID {id}, which is never assigned"))]
    ReservedId { token: TokenString, id: TokenId },
}

/// Fixes applied to a persisted vocabulary that was usable, but not quite right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Repair {
    /// `vocab` was missing or empty; rebuilt by inverting `reverseVocab`
    RebuiltForward { tokens: usize },

    /// `reverseVocab` was missing or empty; rebuilt by inverting `vocab`
    RebuiltBackward { tokens: usize },

    /// `nextId` wasn't greater than every ID in use
    RaisedNextId { from: TokenId, to: TokenId },
}

impl Display for Repair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repair::RebuiltForward { tokens } => {
                write!(f, "rebuilt 'vocab' from {tokens} 'reverseVocab' entries")
            }
            Repair::RebuiltBackward { tokens } => {
                write!(f, "rebuilt 'reverseVocab' from {tokens} 'vocab' entries")
            }
            Repair::RaisedNextId { from, to } => {
                write!(f, "raised 'nextId' from {from} to {to}")
            }
        }
    }
}

/// The persisted document.
///
/// Every field is optional on read: a field that's absent or `null` takes its initial value.  On
/// write all three are always present.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedVocab {
    #[serde(default, deserialize_with = "lenient_vocab")]
    pub vocab: Option<BTreeMap<TokenString, TokenId>>,

    #[serde(default)]
    pub reverse_vocab: Option<BTreeMap<TokenId, TokenString>>,

    #[serde(default, deserialize_with = "lenient_next_id")]
    pub next_id: Option<TokenId>,
}

/// A token ID as read from a document: an integer, or a float with an integral value.
struct LenientId(TokenId);

impl<'de> Deserialize<'de> for LenientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = serde_json::Number::deserialize(deserializer)?;
        number
            .as_u64()
            .or_else(|| number.as_f64().and_then(id_from_f64))
            .map(LenientId)
            .ok_or_else(|| D::Error::custom(format!("{number} is not a valid token ID")))
    }
}

fn lenient_vocab<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<TokenString, TokenId>>, D::Error> {
    let vocab = Option::<BTreeMap<TokenString, LenientId>>::deserialize(deserializer)?;
    Ok(vocab.map(|vocab| {
        vocab
            .into_iter()
            .map(|(token, LenientId(id))| (token, id))
            .collect()
    }))
}

fn lenient_next_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TokenId>, D::Error> {
    let next_id = Option::<LenientId>::deserialize(deserializer)?;
    Ok(next_id.map(|LenientId(id)| id))
}

impl PersistedVocab {
    /// Snapshot a vocabulary in its persisted form.
    ///
    /// `BTreeMap` keeps the output sorted, so the same vocabulary always serializes to the same
    /// text.
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        Self {
            vocab: Some(
                vocab
                    .forward()
                    .tokens()
                    .map(|(token, id)| (token.clone(), id))
                    .collect(),
            ),
            reverse_vocab: Some(
                vocab
                    .backward()
                    .tokens()
                    .map(|(id, token)| (id, token.clone()))
                    .collect(),
            ),
            next_id: Some(vocab.next_id()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).context(MalformedSnafu)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Validate the document and build the vocabulary it describes.
    ///
    /// Defaults are applied to missing fields first.  Then, if only one of the two maps survived,
    /// the other is rebuilt from it; after that the maps must be exact inverses of each other or
    /// the document is rejected.  Finally `nextId` is raised if needed so it's past every ID in
    /// use.  Any such fixes are returned alongside the vocabulary.
    pub fn into_vocabulary(self) -> Result<(Vocabulary, Vec<Repair>), SchemaError> {
        let mut repairs = Vec::new();

        let mut forward = TokenEncoder::new(self.vocab.unwrap_or_default());
        let mut backward = TokenDecoder::new(
            self.reverse_vocab
                .unwrap_or_default()
                .into_iter()
                .map(|(id, token)| (token, id)),
        );

        if forward.is_empty() && !backward.is_empty() {
            forward = backward.invert();
            repairs.push(Repair::RebuiltForward {
                tokens: forward.len(),
            });
        } else if backward.is_empty() && !forward.is_empty() {
            backward = forward.invert();
            repairs.push(Repair::RebuiltBackward {
                tokens: backward.len(),
            });
        }

        ensure!(
            forward.len() == backward.len(),
            SizeMismatchSnafu {
                forward: forward.len(),
                backward: backward.len(),
            }
        );

        for (token, id) in forward.tokens() {
            ensure!(
                id != 0 && id != TokenId::MAX,
                ReservedIdSnafu {
                    token: token.clone(),
                    id
                }
            );

            let found = backward.token_for_id(id);
            ensure!(
                found == Some(token.as_str()),
                InconsistentSnafu {
                    token: token.clone(),
                    id,
                    found: found.map(str::to_owned),
                }
            );
        }

        // `nextId` of 0 can only come from a hand-edited or foreign file; treat it like a missing
        // field.  A `nextId` of `TokenId::MAX` is kept: the vocabulary loads, but can't grow.
        let next_id = self.next_id.filter(|id| *id != 0).unwrap_or(FIRST_TOKEN_ID);

        // Every ID in use is below `TokenId::MAX` by now, so `max + 1` can't overflow
        let next_id = match backward.max_id() {
            Some(max) if max >= next_id => {
                repairs.push(Repair::RaisedNextId {
                    from: next_id,
                    to: max + 1,
                });
                max + 1
            }
            _ => next_id,
        };

        Ok((Vocabulary::from_parts(forward, backward, next_id), repairs))
    }
}
