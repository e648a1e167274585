//! CLI entry point for the nearshot embedding index.
//!
//! Provides commands for adding embeddings, querying nearest neighbors, and
//! inspecting the persisted index.

use anyhow::{Context, Result, anyhow};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use nearshot::display::create_progress_bar;
use nearshot::io::{ExitCode, OutputFormat, OutputManager, parse_vector, read_records, read_vector};
use nearshot::{IndexError, IndexOptions, Settings, VectorIndex};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{Level, debug, info};

/// Records handed to the index per progress update.
const ADD_CHUNK_SIZE: usize = 256;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Nearest-neighbor search over projected embeddings
#[derive(Parser)]
#[command(
    name = "nearshot",
    version = env!("CARGO_PKG_VERSION"),
    about = "Nearest-neighbor search over projected embeddings",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .nearshot directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Add embeddings from a JSON Lines file
    #[command(
        about = "Add embeddings to the index",
        after_help = "Input format, one record per line:\n  {\"id\": \"IMG_0001\", \"vector\": [0.12, -0.5, ...]}"
    )]
    Add {
        /// JSON Lines file of {"id", "vector"} records
        path: PathBuf,

        /// Clear the index before adding
        #[arg(long)]
        replace: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Query nearest neighbors
    #[command(
        about = "Find the stored embeddings closest to a query",
        after_help = "Examples:\n  nearshot search --vector '[1.0, 0.0, 0.0]' -k 2\n  nearshot search --input query.json --max-distance 0.5 --json"
    )]
    Search {
        /// Query embedding as a JSON array
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        vector: Option<String>,

        /// File holding the query embedding
        #[arg(long)]
        input: Option<PathBuf>,

        /// Number of results (overrides search.default_k)
        #[arg(short)]
        k: Option<usize>,

        /// Drop hits farther than this squared distance
        #[arg(long)]
        max_distance: Option<f32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    #[command(about = "Show entry count, dimensions and searcher")]
    Info {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove every entry
    #[command(about = "Replace the index file with an empty one")]
    Clear,

    /// Show current configuration settings
    #[command(about = "Display active settings from .nearshot/settings.toml")]
    Config,
}

impl Commands {
    fn output_format(&self) -> OutputFormat {
        match self {
            Commands::Add { json, .. }
            | Commands::Search { json, .. }
            | Commands::Info { json } => OutputFormat::from_json_flag(*json),
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddSummary {
    added: usize,
    total: usize,
    index_path: PathBuf,
}

impl fmt::Display for AddSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Added {} embeddings ({} total) to {}",
            self.added,
            self.total,
            self.index_path.display()
        )
    }
}

#[derive(Debug, Serialize)]
struct IndexInfo {
    index_path: PathBuf,
    saved: bool,
    entries: usize,
    input_dimension: Option<usize>,
    working_dimension: Option<usize>,
    projector: Option<PathBuf>,
    searcher: &'static str,
}

impl fmt::Display for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dim(value: Option<usize>) -> String {
            value.map_or_else(|| "not fixed".to_string(), |d| d.to_string())
        }

        writeln!(f, "Index Information")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Index file:        {}", self.index_path.display())?;
        if !self.saved {
            writeln!(f, "                   (not saved yet)")?;
        }
        writeln!(f, "Entries:           {}", self.entries)?;
        writeln!(f, "Input dimension:   {}", dim(self.input_dimension))?;
        writeln!(f, "Working dimension: {}", dim(self.working_dimension))?;
        match &self.projector {
            Some(path) => writeln!(f, "Projector:         {}", path.display())?,
            None => writeln!(f, "Projector:         none (identity)")?,
        }
        write!(f, "Searcher:          {}", self.searcher)
    }
}

/// Installs the stderr log subscriber.
fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    // A subscriber may already be set when embedded; keep it
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Settings::load().context("loading configuration"),
    }
}

/// Builds the index from settings and loads the saved store if present.
fn open_index(settings: &Settings) -> Result<VectorIndex> {
    let mut index = VectorIndex::with_options(IndexOptions::from(settings))?;
    let path = settings.index_file();
    let loaded = index.load_or_empty(&path)?;
    debug!(
        "Opened {} ({} entries, loaded: {loaded})",
        path.display(),
        index.count()
    );
    Ok(index)
}

fn run(command: Commands, settings: &Settings, output: &mut OutputManager) -> Result<ExitCode> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
            output.info(&format!("Created configuration file at: {}", path.display()))?;
            output.info("Edit this file to customize your settings.")?;
            Ok(ExitCode::Success)
        }

        Commands::Add { path, replace, .. } => {
            let start = Instant::now();
            let records = read_records(&path)?;
            let mut index = if replace {
                VectorIndex::with_options(IndexOptions::from(settings))?
            } else {
                open_index(settings)?
            };

            let pb = create_progress_bar(
                records.len() as u64,
                "embeddings",
                !output.format().is_json() && records.len() > ADD_CHUNK_SIZE,
            );
            for chunk in records.chunks(ADD_CHUNK_SIZE) {
                index.add_batch(
                    chunk
                        .iter()
                        .map(|record| (record.vector.as_slice(), record.id.clone())),
                )?;
                pb.inc(chunk.len() as u64);
            }
            pb.finish_and_clear();

            let index_path = settings.index_file();
            index.save(&index_path)?;
            info!(
                "Added {} embeddings in {:?}",
                records.len(),
                start.elapsed()
            );

            Ok(output.success(AddSummary {
                added: records.len(),
                total: index.count(),
                index_path,
            })?)
        }

        Commands::Search {
            vector,
            input,
            k,
            max_distance,
            ..
        } => {
            let query = match (vector, input) {
                (Some(text), _) => parse_vector(&text)?,
                (None, Some(path)) => read_vector(&path)?,
                (None, None) => return Err(anyhow!("either --vector or --input is required")),
            };

            let index = open_index(settings)?;
            let k = k.unwrap_or(settings.search.default_k);
            let hits = match max_distance.or(settings.search.max_distance) {
                Some(max_distance) => index.search_within(&query, k, max_distance)?,
                None => index.search(&query, k)?,
            };
            debug!("Search returned {} of k={k}", hits.len());

            Ok(output.collection(hits, "matches")?)
        }

        Commands::Info { .. } => {
            let index = open_index(settings)?;
            let index_path = settings.index_file();

            Ok(output.success(IndexInfo {
                saved: index_path.exists(),
                index_path,
                entries: index.count(),
                input_dimension: index.input_dimension().map(|d| d.get()),
                working_dimension: index.dimension().map(|d| d.get()),
                projector: settings
                    .projector_path
                    .as_deref()
                    .map(|path| settings.resolve(path)),
                searcher: index.searcher_name(),
            })?)
        }

        Commands::Clear => {
            // Not loaded first, so a corrupted file can still be cleared
            let index = VectorIndex::with_options(IndexOptions::from(settings))?;
            let index_path = settings.index_file();
            index.save(&index_path)?;
            output.info(&format!("Cleared index at {}", index_path.display()))?;
            Ok(ExitCode::Success)
        }

        Commands::Config => {
            output.info("Current Configuration:")?;
            output.info(&"=".repeat(50))?;
            output.info(&toml::to_string_pretty(settings)?)?;
            Ok(ExitCode::Success)
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        // init --force must be able to replace a broken settings file
        Err(_) if matches!(cli.command, Commands::Init { .. }) => Settings::default(),
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::ConfigError.into();
        }
    };
    init_tracing(cli.debug || settings.debug);

    let format = cli.command.output_format();
    let mut output = OutputManager::new(format);

    match run(cli.command, &settings, &mut output) {
        Ok(code) => code.into(),
        Err(e) => match e.downcast_ref::<IndexError>() {
            Some(index_error) => output
                .error(index_error)
                .unwrap_or_else(|_| ExitCode::from_error(index_error))
                .into(),
            None => {
                eprintln!("Error: {e:#}");
                ExitCode::GeneralError.into()
            }
        },
    }
}
