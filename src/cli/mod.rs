//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::import::ImportSource;
use crate::model::{Layer, Source};

pub mod commands;

/// Lifeline - import life data exports into one timeline
#[derive(Parser, Debug)]
#[command(name = "lifeline", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.lifeline/data/lifeline.db)
    #[arg(long, global = true, env = "LIFELINE_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import export files into the timeline
    Import(ImportArgs),

    /// List stored events
    Events(EventsArgs),

    /// Show stored event counts and recent imports
    Stats {
        /// Number of recent import runs to show
        #[arg(long, default_value_t = 5)]
        runs: usize,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Export format to import.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceArg {
    /// Detect from file names
    #[default]
    Auto,
    Linkedin,
    Google,
    Facebook,
    Csv,
    Ical,
}

impl SourceArg {
    /// The explicit source, or `None` for auto-detection.
    #[must_use]
    pub const fn resolve(self) -> Option<ImportSource> {
        match self {
            Self::Auto => None,
            Self::Linkedin => Some(ImportSource::LinkedIn),
            Self::Google => Some(ImportSource::Google),
            Self::Facebook => Some(ImportSource::Facebook),
            Self::Csv => Some(ImportSource::Csv),
            Self::Ical => Some(ImportSource::Ical),
        }
    }
}

// ============================================================================
// Import
// ============================================================================

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Files or unzipped export folders
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Export format
    #[arg(long, short, value_enum, default_value_t)]
    pub source: SourceArg,

    /// Owner applied to imported events
    #[arg(long, env = "LIFELINE_USER")]
    pub user: Option<String>,

    /// Layer for CSV rows and calendar entries that don't name one
    #[arg(long, value_parser = parse_layer)]
    pub layer: Option<Layer>,

    /// Event type for CSV rows that don't name one
    #[arg(long)]
    pub event_type: Option<String>,

    /// CSV column mapping, e.g. --map title=Headline (repeatable)
    #[arg(long = "map", value_name = "FIELD=COLUMN")]
    pub mappings: Vec<String>,

    /// Parse and report without storing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Also write accepted events to a JSONL file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

// ============================================================================
// Events
// ============================================================================

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Show a single event by ID
    pub id: Option<String>,

    /// Filter by layer
    #[arg(long, value_parser = parse_layer)]
    pub layer: Option<Layer>,

    /// Filter by source
    #[arg(long, value_parser = parse_source)]
    pub source: Option<Source>,

    /// Maximum number of events
    #[arg(long, short = 'n', default_value_t = 50)]
    pub limit: usize,
}

fn parse_layer(value: &str) -> std::result::Result<Layer, String> {
    value.parse()
}

fn parse_source(value: &str) -> std::result::Result<Source, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::parse_from([
            "lifeline",
            "import",
            "--source",
            "csv",
            "--layer",
            "travel",
            "--map",
            "title=Headline",
            "--map",
            "startDate=When",
            "--dry-run",
            "trips.csv",
        ]);
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };

        assert_eq!(args.source.resolve(), Some(ImportSource::Csv));
        assert_eq!(args.layer, Some(Layer::Travel));
        assert_eq!(args.mappings.len(), 2);
        assert!(args.dry_run);
        assert_eq!(args.paths, vec![PathBuf::from("trips.csv")]);
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let result = Cli::try_parse_from(["lifeline", "events", "--layer", "hobbies"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_defaults_to_auto() {
        let cli = Cli::parse_from(["lifeline", "import", "export"]);
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.source.resolve(), None);
    }
}
