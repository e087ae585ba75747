//! The interactive command surface: one command per line, one response per command.
//!
//! ```text
//! encode Hello, world!
//! Encoded IDs: 1 2 3 4
//! decode 1 2 3 4 999
//! Decoded: hello , world ! <UNK>
//! ```
//!
//! This is deliberately thin.  All the interesting behavior is in [`VocabularyStore`]; this
//! module only turns lines of text into calls on it and renders what comes back.
use crate::error::ConsoleSnafu;
use crate::persist::VocabBackend;
use crate::{id_from_f64, Result, TokenId, VocabularyStore};
use itertools::Itertools;
use snafu::ResultExt;
use std::borrow::Cow;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;
use strum::{EnumString, IntoStaticStr};
use tracing::*;

/// Printed once when an interactive session starts
pub const BANNER: &str = "\
tkv tokenizer console
Commands:
  encode <text>   convert text to token IDs
  decode <ids>    convert IDs back to text (IDs space-separated)
Press Ctrl+C to exit.
";

/// The command words the session understands.  Matched without regard to ASCII case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum CommandName {
    Encode,
    Decode,
}

/// One parsed line of input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Encode everything on the line after the command word
    Encode { text: String },

    /// Decode the IDs on the line.  An argument that isn't a usable ID is kept as `None`, which
    /// decodes as the unknown-token placeholder.
    Decode { ids: Vec<Option<TokenId>> },

    /// Anything else, including an empty line
    Unrecognized { name: String },
}

impl Command {
    /// Parse one line of input.  Parsing never fails; a line that isn't a known command becomes
    /// [`Command::Unrecognized`].
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));

        match CommandName::from_str(name) {
            Ok(CommandName::Encode) => Command::Encode {
                text: rest.to_string(),
            },
            Ok(CommandName::Decode) => Command::Decode {
                ids: rest.split_whitespace().map(parse_id).collect(),
            },
            Err(_) => Command::Unrecognized {
                name: name.to_string(),
            },
        }
    }

    /// Run this command against `store`.
    ///
    /// Only encoding can fail, and only if the vocabulary can't be persisted afterwards.
    pub fn execute<B: VocabBackend>(self, store: &mut VocabularyStore<B>) -> Result<Response> {
        match self {
            Command::Encode { text } => Ok(Response::Encoded(store.encode(text)?)),
            Command::Decode { ids } => Ok(Response::Decoded(store.decode_ids(ids))),
            Command::Unrecognized { name } => {
                debug!(%name, "Unrecognized command");
                Ok(Response::Unrecognized { name })
            }
        }
    }
}

/// Parse a single `decode` argument.
///
/// Plain non-negative integers are IDs, as are hex, octal and binary integers with a `0x`, `0o` or
/// `0b` prefix.  So is any other number that has an exact non-negative integer value, like `1.0` or
/// `1e2`.  Everything else (negative, fractional, not a number at all) is `None`.
pub fn parse_id(arg: &str) -> Option<TokenId> {
    if let Ok(id) = arg.parse::<TokenId>() {
        return Some(id);
    }

    if let Some(radix) = radix_prefix(arg) {
        let digits = &arg[2..];
        // `from_str_radix` would also take a sign, which a prefixed literal can't have
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return TokenId::from_str_radix(digits, radix).ok();
    }

    arg.parse::<f64>().ok().and_then(id_from_f64)
}

fn radix_prefix(arg: &str) -> Option<u32> {
    let prefix = arg.get(..2)?;
    if prefix.eq_ignore_ascii_case("0x") {
        Some(16)
    } else if prefix.eq_ignore_ascii_case("0o") {
        Some(8)
    } else if prefix.eq_ignore_ascii_case("0b") {
        Some(2)
    } else {
        None
    }
}

/// What a command produced, ready to be printed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Encoded(Vec<TokenId>),
    Decoded(String),
    Unrecognized { name: String },
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Encoded(ids) if ids.is_empty() => write!(f, "Encoded IDs:"),
            Response::Encoded(ids) => write!(f, "Encoded IDs: {}", ids.iter().join(" ")),
            Response::Decoded(text) => write!(f, "Decoded: {text}"),
            Response::Unrecognized { .. } => {
                let encode: &'static str = CommandName::Encode.into();
                let decode: &'static str = CommandName::Decode.into();
                write!(
                    f,
                    "Unknown command. Use '{encode} <text>' or '{decode} <ids>'."
                )
            }
        }
    }
}

/// Read commands from `input` one line at a time until it runs out, writing each response to
/// `output`.
///
/// Input that isn't valid UTF-8 doesn't end the session: invalid bytes are replaced with U+FFFD
/// and the line is handled like any other.
///
/// Stops at the first error.  Apart from console I/O errors, the only possible errors come from an
/// `encode`: either the vocabulary couldn't be persisted, after which the in-memory and persisted
/// vocabularies no longer agree and carrying on would hide that, or it has run out of IDs.
pub fn run<B, R, W>(store: &mut VocabularyStore<B>, mut input: R, mut output: W) -> Result<()>
where
    B: VocabBackend,
    R: BufRead,
    W: Write,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context(ConsoleSnafu)? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = &line {
            warn!("Session input line did not decode as clean UTF-8.  \
                Invalid bytes have been replaced with a UTF-8 placeholder sequence.");
        }

        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let command = Command::parse(line);
        trace!(?command, "Parsed command");

        let response = command.execute(store)?;

        writeln!(output, "{response}").context(ConsoleSnafu)?;
        output.flush().context(ConsoleSnafu)?;
    }

    debug!("End of session input");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryBackend;
    use crate::test_helpers::init_test_logging;
    use crate::TokvocabError;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn session(lines: &str) -> (VocabularyStore<MemoryBackend>, String) {
        let mut store = VocabularyStore::load(MemoryBackend::new());
        let mut output = Vec::new();
        run(&mut store, Cursor::new(lines), &mut output).unwrap();

        (store, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parse_commands() {
        assert_eq!(
            Command::Encode {
                text: "hello, world!".to_string()
            },
            Command::parse("encode hello, world!")
        );
        assert_eq!(
            Command::Encode {
                text: String::new()
            },
            Command::parse("  ENCODE  ")
        );
        assert_eq!(
            Command::Decode {
                ids: vec![Some(1), None, Some(3)]
            },
            Command::parse("Decode 1 abc   3")
        );
        assert_eq!(
            Command::Unrecognized {
                name: "frobnicate".to_string()
            },
            Command::parse("frobnicate 1 2")
        );
        assert_eq!(
            Command::Unrecognized {
                name: String::new()
            },
            Command::parse("")
        );
    }

    #[test]
    fn parse_decode_arguments() {
        assert_eq!(Some(42), parse_id("42"));
        assert_eq!(Some(0), parse_id("0"));
        assert_eq!(Some(1), parse_id("1.0"));
        assert_eq!(Some(100), parse_id("1e2"));
        assert_eq!(None, parse_id("-3"));
        assert_eq!(None, parse_id("1.5"));
        assert_eq!(None, parse_id("NaN"));
        assert_eq!(None, parse_id("inf"));
        assert_eq!(None, parse_id("hello"));
    }

    #[test]
    fn parse_prefixed_decode_arguments() {
        assert_eq!(Some(16), parse_id("0x10"));
        assert_eq!(Some(31), parse_id("0X1F"));
        assert_eq!(Some(7), parse_id("0o7"));
        assert_eq!(Some(5), parse_id("0b101"));
        assert_eq!(Some(TokenId::MAX), parse_id("0xffffffffffffffff"));
        assert_eq!(None, parse_id("0x"));
        assert_eq!(None, parse_id("0x+1"));
        assert_eq!(None, parse_id("0o8"));
        assert_eq!(None, parse_id("0b2"));
        assert_eq!(None, parse_id("-0x10"));
        assert_eq!(None, parse_id("0x10000000000000000"));
    }

    #[test]
    fn example_session() {
        init_test_logging();

        let (store, output) = session(
            "encode hello, world!\n\
             encode hello\n\
             decode 1 2 3 4\n\
             decode 999\n\
             decode -1 0 x\n\
             encode\n\
             what\n",
        );

        expect_test::expect![[r#"
            Encoded IDs: 1 2 3 4
            Encoded IDs: 1
            Decoded: hello , world !
            Decoded: <UNK>
            Decoded: <UNK> <UNK> <UNK>
            Encoded IDs:
            Unknown command. Use 'encode <text>' or 'decode <ids>'.
        "#]]
        .assert_eq(&output);

        assert_eq!(5, store.vocabulary().next_id());
    }

    #[test]
    fn unrecognized_commands_change_nothing() {
        init_test_logging();

        let (store, _) = session("hello world\nENCODING x\n");
        assert!(store.vocabulary().is_empty());
        // Only the initial save of the fresh vocabulary
        assert_eq!(1, store.backend().write_count());
    }

    #[test]
    fn invalid_utf8_input_does_not_end_the_session() {
        init_test_logging();

        let mut store = VocabularyStore::load(MemoryBackend::new());
        let mut output = Vec::new();
        run(
            &mut store,
            Cursor::new(&b"encode caf\xe9\r\nencode a\ndecode 1 2 3"[..]),
            &mut output,
        )
        .unwrap();

        assert_eq!(
            "Encoded IDs: 1 2\nEncoded IDs: 3\nDecoded: caf \u{fffd} a\n",
            String::from_utf8(output).unwrap()
        );
    }

    #[test]
    fn persistence_failure_stops_the_session() {
        init_test_logging();

        let mut store = VocabularyStore::load(MemoryBackend::new());
        store.backend_mut().fail_writes("read-only filesystem");

        let mut output = Vec::new();
        let result = run(
            &mut store,
            Cursor::new("decode 1\nencode a\nencode b\n"),
            &mut output,
        );

        assert_matches!(result, Err(TokvocabError::InjectedWriteFailure { .. }));
        assert_eq!("Decoded: <UNK>\n", String::from_utf8(output).unwrap());
        assert_eq!(None, store.vocabulary().id_for_token("b"));
    }
}
