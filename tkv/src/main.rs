use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;
use tokvocab::{session, tokenize, VocabularyStore};
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Globals {
    /// The JSON file the vocabulary is kept in.  Created if it doesn't exist.
    #[arg(
        long,
        value_name = "FILE",
        env = "TKV_VOCAB_FILE",
        default_value = tokvocab::persist::DEFAULT_VOCAB_FILE,
        global = true
    )]
    vocab_file: PathBuf,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Read `encode <text>` and `decode <ids>` commands from stdin, one per line
    ///
    /// This is the default when no command is given.
    Repl,

    /// Encode text into token IDs, adding any new tokens to the vocabulary
    Encode {
        /// The text to encode.  Multiple arguments are joined with spaces.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Decode token IDs back into text
    Decode {
        /// The IDs to decode.  Anything that isn't a valid ID decodes as `<UNK>`.
        #[arg(allow_hyphen_values = true)]
        ids: Vec<String>,
    },

    /// Show how text splits into tokens, without touching the vocabulary
    Tokenize {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
}

impl Commands {
    fn execute(self, globals: &Globals) -> anyhow::Result<()> {
        use Commands::*;
        match self {
            Repl => {
                let mut store = VocabularyStore::open(&globals.vocab_file);

                print!("{}", session::BANNER);
                println!();
                std::io::stdout().flush()?;

                let stdin = std::io::stdin();
                session::run(&mut store, stdin.lock(), std::io::stdout())
                    .context("Interactive session failed")?;
            }
            Encode { text } => {
                let mut store = VocabularyStore::open(&globals.vocab_file);
                let ids = store.encode(text.join(" ")).with_context(|| {
                    format!(
                        "Failed to persist vocabulary to {}",
                        globals.vocab_file.display()
                    )
                })?;

                println!("{}", session::Response::Encoded(ids));
            }
            Decode { ids } => {
                let store = VocabularyStore::open(&globals.vocab_file);
                let text = store.decode_ids(ids.iter().map(|id| session::parse_id(id)));

                println!("{}", session::Response::Decoded(text));
            }
            Tokenize { text } => {
                for token in tokenize(text.join(" ")) {
                    println!("{token}");
                }
            }
        }

        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    // You can see how many times a particular flag or argument occurred
    // Note, only flags can have multiple occurrences
    let default_log_directive = match cli.globals.debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // Logs go to stderr so they never mix with command output on stdout
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_directive.into())
                .from_env_lossy(),
        )
        .json()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    debug!(vocab_file = %cli.globals.vocab_file.display(), "Using vocabulary file");

    let command = cli.command.unwrap_or(Commands::Repl);
    if let Err(e) = command.execute(&cli.globals) {
        error!("{:#}", e);
        exit(1);
    } else {
        debug!("command executed successfully");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that there aren't any invalid attributes in the CLI specification that can only be
    /// detected at runtime
    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    #[test]
    fn repl_is_the_default() {
        let cli = Cli::try_parse_from(["tkv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(0, cli.globals.debug);
    }

    #[test]
    fn decode_accepts_negative_ids() {
        let cli = Cli::try_parse_from(["tkv", "decode", "1", "-2", "x"]).unwrap();
        match cli.command {
            Some(Commands::Decode { ids }) => assert_eq!(vec!["1", "-2", "x"], ids),
            _ => panic!("expected a decode command"),
        }
    }

    #[test]
    fn encode_and_decode_against_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let globals = Globals {
            vocab_file: dir.path().join("vocab.json"),
            debug: 0,
        };

        Commands::Encode {
            text: vec!["hello,".to_string(), "world!".to_string()],
        }
        .execute(&globals)
        .unwrap();

        let store = VocabularyStore::open(&globals.vocab_file);
        assert_eq!(Some(3), store.vocabulary().id_for_token("world"));
        assert_eq!("hello , world !", store.decode(&[1, 2, 3, 4]));
    }
}
