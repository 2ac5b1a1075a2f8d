use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use dicta_cli::commands::{config_ops, dict_ops};
use dicta_cli::logging;

#[derive(Parser)]
#[command(name = "dicttool", about = "Dicta dictionary build and debug tool")]
struct Cli {
    /// Log engine events to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Also write a JSON-lines trace of engine events to dicttool-trace.jsonl in DIR
    #[arg(long, global = true, value_name = "DIR")]
    trace_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a tab-separated word list into a main dictionary
    Build {
        /// Locale tag (e.g. en_US)
        #[arg(long)]
        locale: String,
        /// Dictionary id (default: main:<language tag>)
        #[arg(long)]
        id: Option<String>,
        /// Dictionary version attribute
        #[arg(long, default_value = "1")]
        version: String,
        /// Free-form description attribute
        #[arg(long)]
        description: Option<String>,
        /// Word list (word<TAB>frequency[<TAB>attributes])
        input_file: String,
        /// Output dictionary file
        output_file: String,
    },
    /// Show header attributes and entry counts
    Info {
        /// Dictionary file
        dict_file: String,
    },
    /// List every word and n-gram
    Dump {
        /// Dictionary file
        dict_file: String,
        /// Print JSON instead of aligned text
        #[arg(long)]
        json: bool,
    },
    /// Query suggestions for a typed prefix
    Suggest {
        /// Dictionary file
        dict_file: String,
        /// Typed word (empty for next-word predictions)
        #[arg(default_value = "")]
        typed: String,
        /// Previous word, oldest first; repeat for longer contexts ("<S>" for a sentence start)
        #[arg(long = "prev")]
        prev_words: Vec<String>,
        /// Number of suggestions
        #[arg(short, long, default_value = "10")]
        n: usize,
        /// Treat the input as a gesture (batch) input
        #[arg(long)]
        gesture: bool,
        /// Drop possibly-offensive words
        #[arg(long)]
        block_offensive: bool,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump with the clock frozen at a Unix timestamp
    Decay {
        /// Dictionary file
        dict_file: String,
        /// Seconds since the Unix epoch
        #[arg(long)]
        at: i32,
        /// Print JSON instead of aligned text
        #[arg(long)]
        json: bool,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn init_logging(verbose: bool, trace_dir: Option<&Path>) {
    let mut layers = vec![logging::stderr_layer(verbose)];
    if let Some(dir) = trace_dir {
        layers.push(logging::trace_layer(dir));
    }
    tracing_subscriber::registry().with(layers).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.trace_dir.as_deref());

    match cli.command {
        Command::Build {
            locale,
            id,
            version,
            description,
            input_file,
            output_file,
        } => {
            let opts = dict_ops::BuildOptions {
                locale: &locale,
                id: id.as_deref(),
                version: &version,
                description: description.as_deref(),
            };
            dict_ops::build(&input_file, &output_file, &opts);
        }
        Command::Info { dict_file } => dict_ops::info(&dict_file),
        Command::Dump { dict_file, json } => dict_ops::dump(&dict_file, json),
        Command::Suggest {
            dict_file,
            typed,
            prev_words,
            n,
            gesture,
            block_offensive,
            json,
        } => {
            let opts = dict_ops::SuggestOptions {
                n,
                gesture,
                block_offensive,
                json,
            };
            dict_ops::suggest(&dict_file, &typed, &prev_words, &opts);
        }
        Command::Decay { dict_file, at, json } => dict_ops::decay(&dict_file, at, json),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
