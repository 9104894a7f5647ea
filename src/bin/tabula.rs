use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabula::{ExecutionContext, Repl, Shell, TabulaError, repl::print_event};

#[derive(Parser)]
#[command(author, version, about = "Symbol table shell for an Octave-style interpreter")]
struct Args {
    /// Seed for generated names
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Register an autoload entry, NAME=FILE
    #[arg(long = "autoload", value_parser = parse_entry, global = true)]
    autoloads: Vec<(String, PathBuf)>,
    /// Put a function on the search path, NAME=FILE
    #[arg(long = "path", value_parser = parse_entry, global = true)]
    search_path: Vec<(String, PathBuf)>,
    /// Declare an additional built-in function
    #[arg(long = "builtin", global = true)]
    builtins: Vec<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a file of shell commands
    Run { script: PathBuf },
    /// Start an interactive session
    Repl,
    /// Execute commands given on the command line
    Eval { source: String },
}

fn parse_entry(text: &str) -> Result<(String, PathBuf), String> {
    match text.split_once('=') {
        Some((name, file)) if !name.is_empty() && !file.is_empty() => {
            Ok((name.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected NAME=FILE, found '{text}'")),
    }
}

fn main() -> Result<(), TabulaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TABULA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let context = ExecutionContext {
        seed: args.seed,
        builtins: args.builtins,
        search_path: args.search_path,
        autoloads: args.autoloads,
    };
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => {
            let source = fs::read_to_string(&script)?;
            Shell::new(context).execute(&source, print_event)
        }
        Command::Repl => Repl::new(context).run(),
        Command::Eval { source } => Shell::new(context).execute(&source, print_event),
    }
}
