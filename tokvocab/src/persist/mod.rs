//! Where a [`crate::VocabularyStore`] keeps its vocabulary between runs.
//!
//! Backends only move text around.  Parsing, validation and recovery from bad contents all live
//! in the store and in [`schema`], so every backend gets the same recovery behavior for free.
use crate::Result;

mod file;
mod memory;
pub mod schema;

pub use file::{JsonFileBackend, DEFAULT_VOCAB_FILE};
pub use memory::MemoryBackend;

/// Storage for the serialized vocabulary document.
pub trait VocabBackend {
    /// A human-readable description of where the vocabulary is stored, for log messages
    fn location(&self) -> String;

    /// Read the whole persisted document.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.  That's the normal first-run
    /// condition, not an error.
    fn read(&self) -> Result<Option<String>>;

    /// Replace the persisted document with `contents`.
    ///
    /// This must be all or nothing: when it fails, the previously persisted document must still be
    /// intact.
    fn write(&mut self, contents: &str) -> Result<()>;
}

impl<B: VocabBackend + ?Sized> VocabBackend for Box<B> {
    fn location(&self) -> String {
        (**self).location()
    }

    fn read(&self) -> Result<Option<String>> {
        (**self).read()
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        (**self).write(contents)
    }
}
