//! A word and punctuation tokenizer with a persistent, append-only vocabulary.
//!
//! Text is split into lowercase words and single punctuation characters (see [`tokenize()`]).
//! Each distinct token is given an integer ID the first time it's seen, and keeps that ID for as
//! long as the vocabulary exists.  The vocabulary is written back to storage after every encode so
//! that IDs stay stable from one run to the next.
//!
//! ```no_run
//! use tokvocab::VocabularyStore;
//!
//! let mut store = VocabularyStore::open("vocab.json");
//! let ids = store.encode("Hello, world!")?;
//! assert_eq!("hello , world !", store.decode(&ids));
//! # Ok::<(), tokvocab::TokvocabError>(())
//! ```
mod error;
pub mod persist;
pub mod session;
mod store;
mod token;
mod tokenize;
mod vocab;

pub use error::*;
pub use persist::{JsonFileBackend, MemoryBackend, VocabBackend};
pub use store::*;
pub use token::*;
pub use tokenize::{tokenize, Tokens};
pub use vocab::*;

pub type Result<T> = std::result::Result<T, TokvocabError>;
