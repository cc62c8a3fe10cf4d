//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for roundtable results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Report, iteration history and the final document
    Full,
    /// Only the convergence outcome
    Summary,
    /// JSON output
    Json,
}

/// CLI arguments for roundtable
#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(author, version, about = "Roundtable - Iterative multi-reviewer document refinement")]
#[command(long_about = r#"
Roundtable refines a document through repeated review-then-refine iterations.

Each iteration:
1. Review: every participant reviews the current version in parallel
2. Refine: a moderator rewrites the document to address the reviews
3. Check: the loop stops when no High severity issue remains, the document
   stops changing, or the iteration ceiling is reached

Configuration files are loaded from (in priority order):
1. ROUNDTABLE_* environment variables
2. --config <path>        Explicit config file
3. ./roundtable.toml      Project-level config
4. ~/.config/roundtable/config.toml   Global config

Example:
  roundtable run prd.md --document-type prd
  roundtable continue session_20250101_120000_1a2b3c4d --max-iterations 5
  roundtable show session_20250101_120000_1a2b3c4d --version 2
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Directory holding session data (overrides [storage] data_dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new session from a document file
    Run(RunArgs),

    /// Resume a failed session, or extend a finished one with more iterations
    Continue(ContinueArgs),

    /// List sessions, newest first
    List {
        /// Show at most this many sessions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a session's report or one of its document versions
    Show {
        session_id: String,

        /// Print this document version and its reviews instead of the report
        #[arg(long, value_name = "N")]
        version: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "full")]
        output: OutputFormat,
    },

    /// Delete a session and all of its versions
    Delete { session_id: String },

    /// Show configuration sources and the effective configuration
    Config,
}

/// Loop limits shared by `run` and `continue`
#[derive(Args, Debug, Clone, Default)]
pub struct LoopArgs {
    /// Iteration ceiling (overrides [roundtable] max_iterations)
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// Stop once consecutive versions differ by less than this fraction
    #[arg(long, value_name = "FRACTION")]
    pub delta_threshold: Option<f64>,

    /// Keep iterating after a review round with no High issues
    #[arg(long)]
    pub force_max_iterations: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Markdown or text file with the initial document
    pub file: PathBuf,

    /// Document title (defaults to the file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Kind of document, e.g. "prd" or "design-doc"
    #[arg(long, default_value = "document")]
    pub document_type: String,

    /// Context handed to every participant (repeatable)
    #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub context: Vec<(String, String)>,

    #[command(flatten)]
    pub limits: LoopArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ContinueArgs {
    pub session_id: String,

    #[command(flatten)]
    pub limits: LoopArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
