//! A [`Vocabulary`] bound to a place to persist it.
use crate::error::SerializeSnafu;
use crate::persist::schema::{PersistedVocab, Repair};
use crate::persist::{JsonFileBackend, VocabBackend};
use crate::{Result, TokenId, TokenString, Vocabulary};
use snafu::ResultExt;
use std::path::PathBuf;
use tracing::*;

/// What [`VocabularyStore::load`] found in the backend, and therefore what it did about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The persisted vocabulary was loaded as-is
    Loaded { tokens: usize },

    /// The persisted vocabulary was usable after some fixes.  The fixes are written back on the
    /// next save.
    Repaired { tokens: usize, repairs: Vec<Repair> },

    /// Nothing was persisted yet, so a fresh vocabulary was created
    Missing,

    /// The persisted document was empty or only whitespace, so it was replaced with a fresh
    /// vocabulary
    Empty,

    /// The persisted document couldn't be read or wasn't a valid vocabulary, so it was replaced
    /// with a fresh vocabulary
    Corrupt { reason: String },
}

impl LoadOutcome {
    /// Whether loading threw away (or never had) a persisted vocabulary and started fresh
    pub fn started_fresh(&self) -> bool {
        matches!(
            self,
            LoadOutcome::Missing | LoadOutcome::Empty | LoadOutcome::Corrupt { .. }
        )
    }
}

/// A crash-recoverable, append-only token vocabulary.
///
/// The store is loaded once, explicitly, from a [`VocabBackend`], and written back to it after
/// every [`Self::encode`].  There's no global instance: construct one and pass it by reference to
/// whatever needs it.
///
/// A failed save is returned to the caller, but the in-memory vocabulary keeps whatever was added
/// before the save was attempted.  After such a failure the persisted state is behind the in-memory
/// state until the next successful save.
#[derive(Debug)]
pub struct VocabularyStore<B = JsonFileBackend> {
    vocab: Vocabulary,
    backend: B,
    load_outcome: LoadOutcome,
}

impl VocabularyStore<JsonFileBackend> {
    /// Load the store kept in the JSON file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::load(JsonFileBackend::new(path))
    }
}

impl<B: VocabBackend> VocabularyStore<B> {
    /// Load the persisted vocabulary from `backend`.
    ///
    /// This never fails.  If nothing is persisted, or what's persisted is empty, unreadable or not
    /// a valid vocabulary, the store starts with an empty vocabulary and immediately persists it,
    /// overwriting whatever was there.  Missing fields take their initial values, and a vocabulary
    /// that is usable but not quite consistent is repaired; see
    /// [`PersistedVocab::into_vocabulary`].
    ///
    /// Should persisting the fresh vocabulary fail, the failure is logged and the store carries on
    /// in memory; the next [`Self::encode`] will report the write failure.
    pub fn load(backend: B) -> Self {
        let location = backend.location();

        let (vocab, load_outcome) = match backend.read() {
            Ok(None) => {
                info!(%location, "No persisted vocabulary found.  Creating a fresh vocabulary.");
                (Vocabulary::new(), LoadOutcome::Missing)
            }
            Ok(Some(raw)) if raw.trim().is_empty() => {
                warn!(%location, "Persisted vocabulary is empty.  Creating a fresh vocabulary.");
                (Vocabulary::new(), LoadOutcome::Empty)
            }
            Ok(Some(raw)) => {
                match PersistedVocab::from_json(&raw).and_then(PersistedVocab::into_vocabulary) {
                    Ok((vocab, repairs)) if repairs.is_empty() => {
                        debug!(%location, tokens = vocab.len(), next_id = vocab.next_id(), "Loaded vocabulary");
                        let tokens = vocab.len();
                        (vocab, LoadOutcome::Loaded { tokens })
                    }
                    Ok((vocab, repairs)) => {
                        for repair in &repairs {
                            warn!(%location, %repair, "Repaired persisted vocabulary");
                        }
                        let tokens = vocab.len();
                        (vocab, LoadOutcome::Repaired { tokens, repairs })
                    }
                    Err(e) => {
                        warn!(%location, err = %e,
                            "Persisted vocabulary is corrupted.  Creating a fresh vocabulary.");
                        (
                            Vocabulary::new(),
                            LoadOutcome::Corrupt {
                                reason: e.to_string(),
                            },
                        )
                    }
                }
            }
            Err(e) => {
                let reason = error_chain(&e);
                warn!(%location, err = %reason,
                    "Persisted vocabulary could not be read.  Creating a fresh vocabulary.");
                (Vocabulary::new(), LoadOutcome::Corrupt { reason })
            }
        };

        let mut store = Self {
            vocab,
            backend,
            load_outcome,
        };

        if store.load_outcome.started_fresh() {
            if let Err(e) = store.save() {
                error!(%location, err = %error_chain(&e),
                    "Failed to persist the fresh vocabulary.  Continuing in memory only.");
            }
        }

        store
    }

    /// Write the whole vocabulary to the backend in a single write.
    pub fn save(&mut self) -> Result<()> {
        let json = PersistedVocab::from_vocabulary(&self.vocab)
            .to_json()
            .context(SerializeSnafu)?;

        self.backend.write(&json)?;

        debug!(
            location = %self.backend.location(),
            tokens = self.vocab.len(),
            next_id = self.vocab.next_id(),
            "Saved vocabulary"
        );

        Ok(())
    }

    /// Split text into tokens.  Doesn't touch the vocabulary; see [`crate::tokenize()`].
    pub fn tokenize(text: impl AsRef<str>) -> Vec<TokenString> {
        crate::tokenize(text)
    }

    /// Encode `text` into token IDs, assigning IDs to any tokens not seen before, then persist the
    /// vocabulary.
    ///
    /// The vocabulary is saved exactly once per call, whether or not anything new was added, and
    /// even when `text` has no tokens in it at all.  The one exception is running out of IDs, which
    /// fails before anything is saved.
    pub fn encode(&mut self, text: impl AsRef<str>) -> Result<Vec<TokenId>> {
        let ids = self.vocab.encode(text)?;
        self.save()?;

        Ok(ids)
    }

    /// Decode IDs back into space-separated lowercase tokens.  See [`Vocabulary::decode`].
    ///
    /// Never fails, never changes the vocabulary, never writes to the backend.
    pub fn decode(&self, ids: &[TokenId]) -> String {
        self.vocab.decode(ids)
    }

    /// See [`Vocabulary::decode_ids`]
    pub fn decode_ids<I>(&self, ids: I) -> String
    where
        I: IntoIterator<Item = Option<TokenId>>,
    {
        self.vocab.decode_ids(ids)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

/// Render an error followed by each of its sources, the way `anyhow` does with `{:#}`
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut rendered = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }

    rendered
}
