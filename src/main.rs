//! Scrumdeck - shuttle agile stories between slide decks and text files.
//!
//! The deck side of every command is a JSON extraction of the presentation
//! produced by an external collaborator; the text side is one TOML file per
//! story. See the library documentation for the data formats.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scrumdeck::app::{self, BurndownOptions, ExportOptions, ImportOptions};
use scrumdeck::Status;

/// Shuttle agile stories between slide decks and text files
#[derive(Parser)]
#[command(name = "scrumdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export stories from a deck to text files, one per slide
    Export {
        /// Deck JSON file with story slides
        deck: PathBuf,

        /// Target directory for the story files; must not exist
        out_dir: PathBuf,

        /// Field map file learned from the template
        #[arg(long, default_value_os_t = app::default_field_map_path())]
        field_map: PathBuf,

        /// Route stories into a kanban directory structure
        #[arg(long)]
        kanban: bool,

        /// Lowest story status to be considered
        #[arg(long, default_value = "none", value_parser = parse_status)]
        status_first: Status,

        /// Highest story status to be considered
        #[arg(long, default_value = "out", value_parser = parse_status)]
        status_last: Status,

        /// Add up to this many title characters to the story file name
        #[arg(long, default_value_t = 35)]
        with_title: usize,

        /// Prefix the story file name with a priority from the value field
        #[arg(long)]
        with_values: bool,

        /// Prefix the story file name with the id field
        #[arg(long)]
        with_ids: bool,
    },

    /// Import story files into a deck, one story and one tasks slide each
    Import {
        /// Deck JSON file to import the story slides into
        deck: PathBuf,

        /// Story text files to import
        #[arg(required = true)]
        stories: Vec<PathBuf>,

        /// Field map file learned from the template
        #[arg(long, default_value_os_t = app::default_field_map_path())]
        field_map: PathBuf,

        /// Start from an empty deck instead of appending
        #[arg(long)]
        empty: bool,

        /// Lowest story status to be considered
        #[arg(long, default_value = "none", value_parser = parse_status)]
        status_first: Status,

        /// Highest story status to be considered
        #[arg(long, default_value = "out", value_parser = parse_status)]
        status_last: Status,
    },

    /// Update a single exported story file from its deck slide
    Modify {
        /// Deck JSON file with the story slide
        deck: PathBuf,

        /// The story file to update; must exist
        story: PathBuf,

        /// Restrict the update to one field
        #[arg(long)]
        field: Option<String>,

        /// Field map file learned from the template
        #[arg(long, default_value_os_t = app::default_field_map_path())]
        field_map: PathBuf,
    },

    /// Learn the placeholder layout from a labeled template slide
    Learn {
        /// Deck JSON file containing the template slide
        deck: PathBuf,

        /// 1-based number of the template slide
        slide: usize,

        /// Field map file to populate; must name the fields in order
        #[arg(long, default_value_os_t = app::default_field_map_path())]
        field_map: PathBuf,
    },

    /// Aggregate the sprint burndown and check team capacity
    Burndown {
        /// Deck JSON file with the sprint's story slides
        deck: PathBuf,

        /// Field map file learned from the template
        #[arg(long, default_value_os_t = app::default_field_map_path())]
        field_map: PathBuf,

        /// Sprint setup file
        #[arg(short, long, default_value_os_t = app::default_sprint_path())]
        sprint_file: PathBuf,

        /// Truncate overlong size series instead of rejecting the run
        #[arg(long)]
        lenient: bool,

        /// Write the aggregated series and verdict as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Bring story task points in line with each story's status
    Consolidate {
        /// Story text files to consolidate in place
        #[arg(required = true)]
        stories: Vec<PathBuf>,

        /// Sprint setup file
        #[arg(short, long, default_value_os_t = app::default_sprint_path())]
        sprint_file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn parse_status(token: &str) -> Result<Status, String> {
    token.parse().map_err(|err| format!("{err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Export {
            deck,
            out_dir,
            field_map,
            kanban,
            status_first,
            status_last,
            with_title,
            with_values,
            with_ids,
        } => {
            let opts = ExportOptions {
                kanban,
                status_first,
                status_last,
                with_title,
                with_values,
                with_ids,
                dry_run: cli.dry_run,
            };
            app::export(&deck, &out_dir, &field_map, &opts)?;
        }
        Commands::Import { deck, stories, field_map, empty, status_first, status_last } => {
            let opts = ImportOptions {
                status_first,
                status_last,
                empty,
                dry_run: cli.dry_run,
            };
            app::import(&deck, &stories, &field_map, &opts)?;
        }
        Commands::Modify { deck, story, field, field_map } => {
            app::modify(&deck, &story, &field_map, field.as_deref(), cli.dry_run)?;
        }
        Commands::Learn { deck, slide, field_map } => {
            app::learn(&deck, slide, &field_map)?;
        }
        Commands::Burndown { deck, field_map, sprint_file, lenient, out } => {
            let opts = BurndownOptions { lenient, out, dry_run: cli.dry_run };
            app::burndown(&deck, &field_map, &sprint_file, &opts)?;
        }
        Commands::Consolidate { stories, sprint_file } => {
            app::consolidate(&stories, &sprint_file, cli.dry_run)?;
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "scrumdeck", &mut io::stdout());
        }
    }

    Ok(())
}
