use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

/// Convert APA references into BibTeX entries.
///
/// Interactive mode reads stdin line by line: each line replaces the input
/// and is converted once typing pauses. Lines starting with `:` are commands
/// (`:convert`, `:save`, `:clear`, `:quit`).
#[derive(Debug, Parser)]
#[command(name = "apa2bib", version)]
pub struct Cli {
    /// Settings file (RON). Defaults to <config dir>/apa2bib/settings.ron.
    #[arg(long, env = "APA2BIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model identifier, overriding the settings file.
    #[arg(long)]
    pub model: Option<String>,

    /// Read the whole of stdin as one reference, print its BibTeX, and exit.
    #[arg(long)]
    pub once: bool,

    /// Append converted entries to this .bib file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Where log lines go.
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log debug detail.
    #[arg(short, long)]
    pub verbose: bool,
}
