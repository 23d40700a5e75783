use anyhow::Result;
use clap::{Parser, Subcommand};
use stringref::commands::{escape_command, goto_command, scan_command, GotoTarget, SearchArgs};

/// String-literal search over managed module dumps.
///
/// This CLI is a thin wrapper around `stringref-core`. Scanning, escaping,
/// indexing and navigation all live in the library.
#[derive(Parser, Debug)]
#[command(
    name = "stringref",
    version,
    about = "Find, escape and navigate string literals in managed modules",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan module dumps and list every string literal load.
    Scan {
        #[command(flatten)]
        search: SearchArgs,

        /// Print raw literals instead of the escaped display form.
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Follow one string reference to its source position.
    Goto {
        #[command(flatten)]
        search: SearchArgs,

        /// Zero-based position in the filtered, sorted list.
        #[arg(long, conflicts_with = "literal", required_unless_present = "literal")]
        position: Option<usize>,

        /// Raw literal text to look for.
        #[arg(long)]
        literal: Option<String>,

        /// Open the method in a new tab.
        #[arg(long, default_value_t = false)]
        new_tab: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show how a literal is displayed in the reference list.
    Escape {
        text: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Scan { search, raw, json } => scan_command(&search, raw, json)?,
        Command::Goto { search, position, literal, new_tab, json } => {
            let target = match (position, literal) {
                (Some(position), _) => GotoTarget::Position(position),
                (None, Some(text)) => GotoTarget::Literal(text),
                (None, None) => GotoTarget::Position(0),
            };
            goto_command(&search, &target, new_tab, json)?
        }
        Command::Escape { text, json } => escape_command(&text, json)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
