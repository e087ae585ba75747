use super::VocabBackend;
use crate::error::InjectedWriteFailureSnafu;
use crate::Result;

/// Keeps the persisted document in memory.
///
/// Useful for tests that need a store without touching the filesystem.  It can be seeded with
/// arbitrary contents (including garbage) and can be told to fail writes, so every load and save
/// path can be exercised.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    contents: Option<String>,
    fail_writes: Option<String>,
    writes: usize,
}

impl MemoryBackend {
    /// An empty backend, as if nothing had ever been persisted
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds `contents`
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            ..Default::default()
        }
    }

    /// The currently persisted document, if any
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Make every following write fail with `reason`, leaving the contents untouched
    pub fn fail_writes(&mut self, reason: impl Into<String>) {
        self.fail_writes = Some(reason.into());
    }

    /// Undo [`Self::fail_writes`]
    pub fn allow_writes(&mut self) {
        self.fail_writes = None;
    }
}

impl VocabBackend for MemoryBackend {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        if let Some(reason) = &self.fail_writes {
            return InjectedWriteFailureSnafu {
                reason: reason.clone(),
            }
            .fail();
        }

        self.contents = Some(contents.to_owned());
        self.writes += 1;

        Ok(())
    }
}
