use super::VocabBackend;
use crate::error::{PersistReadSnafu, PersistReplaceSnafu, PersistWriteSnafu};
use crate::Result;
use snafu::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::*;

/// The file name used when no other location is configured
pub const DEFAULT_VOCAB_FILE: &str = "vocab.json";

/// Keeps the vocabulary in a JSON file on the local filesystem.
///
/// Writes go to a temporary file next to the target which is then renamed over it, so a crash or
/// a failed write never leaves a half-written vocabulary behind.
#[derive(Clone, Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory the temporary file is created in.  It has to be on the same filesystem as the
    /// target for the rename to be atomic.
    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Default for JsonFileBackend {
    fn default() -> Self {
        Self::new(DEFAULT_VOCAB_FILE)
    }
}

impl VocabBackend for JsonFileBackend {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(PersistReadSnafu {
                path: self.path.clone(),
            }),
        }
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        let mut file = tempfile::NamedTempFile::new_in(self.dir()).context(PersistWriteSnafu {
            path: self.path.clone(),
        })?;

        file.write_all(contents.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .context(PersistWriteSnafu {
                path: self.path.clone(),
            })?;

        file.persist(&self.path).context(PersistReplaceSnafu {
            path: self.path.clone(),
        })?;

        trace!(path = %self.path.display(), bytes = contents.len(), "Wrote vocabulary file");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokvocabError;
    use assert_matches::assert_matches;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("vocab.json"));

        assert_matches!(backend.read(), Ok(None));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("vocab.json"));

        backend.write("{\"nextId\": 1}").unwrap();
        assert_eq!(Some("{\"nextId\": 1}".to_string()), backend.read().unwrap());

        backend.write("{}").unwrap();
        assert_eq!(Some("{}".to_string()), backend.read().unwrap());

        // Nothing but the target itself should be left in the directory
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(1, entries);
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("no/such/dir/vocab.json"));

        assert_matches!(backend.write("{}"), Err(TokvocabError::PersistWrite { .. }));
    }

    #[test]
    fn unreadable_path_is_an_error() {
        // A directory where the file should be can't be read as a file
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());

        assert_matches!(backend.read(), Err(TokvocabError::PersistRead { .. }));
    }

    #[test]
    fn bare_file_name_uses_current_directory() {
        let backend = JsonFileBackend::default();
        assert_eq!(Path::new("."), backend.dir());
        assert_eq!(DEFAULT_VOCAB_FILE, backend.location());
    }
}
