use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TokvocabError {
    #[snafu(display("Error reading persisted vocabulary from '{}'", path.display()))]
    PersistRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error writing persisted vocabulary to '{}'", path.display()))]
    PersistWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error atomically replacing persisted vocabulary at '{}'", path.display()))]
    PersistReplace {
        path: PathBuf,
        source: tempfile::PersistError,
    },

    #[snafu(display("Error serializing vocabulary to JSON"))]
    Serialize { source: serde_json::Error },

    #[snafu(display("Error reading commands from or writing responses to the session console"))]
    Console { source: std::io::Error },

    /// The vocabulary has handed out every ID there is.  [`crate::TokenId::MAX`] is never assigned,
    /// so a vocabulary whose next ID has reached it can't grow any further.
    #[snafu(display("No token IDs are left to assign to new token '{token}'"))]
    IdSpaceExhausted { token: String },

    /// Only produced by [`crate::MemoryBackend`] when a test has asked it to fail writes
    #[snafu(display("Write to in-memory vocabulary backend failed: {reason}"))]
    InjectedWriteFailure { reason: String },
}
