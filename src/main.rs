//! pairs CLI - bidirectional key/value tables on SQLite

mod commands;

use clap::{Parser, Subcommand};
use pairs::config::{self, CliConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_TABLE};
use pairs::{Codec, PairStore, PairsConfig, TypeSpec};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pairs")]
#[command(version)]
#[command(about = "Cached bidirectional key/value store on a single SQLite table")]
#[command(long_about = r#"
pairs maps keys to values and values back to keys in one SQLite table,
with an in-process lookup cache in front of the database.

Example usage:
  pairs set 1 hello
  pairs get 1
  pairs key --add world
  pairs --types 'TEXT PRIMARY KEY|BLOB|0|0' set user:1 '{"a":1}' --codec json-deflate
"#)]
struct Cli {
    /// Path to the database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Table holding the pairs
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Column types as `key_type|value_type|index_key|index_value`
    #[arg(long, global = true)]
    types: Option<String>,

    /// Maximum cached keys before the cache is flushed
    #[arg(long, global = true)]
    cache_size: Option<usize>,

    /// Path to the config file (defaults to ./pairs.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of styled output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value under a key, replacing any previous value
    Set {
        key: String,
        value: String,

        /// Value encoding (raw, integer, json, json-deflate)
        #[arg(long, default_value = "raw")]
        codec: Codec,
    },

    /// Look up the value stored under a key
    Get {
        key: String,

        /// Value encoding (raw, integer, json, json-deflate)
        #[arg(long, default_value = "raw")]
        codec: Codec,
    },

    /// Look up the key a value is stored under
    Key {
        value: String,

        /// Insert the value under a fresh key when it is missing
        #[arg(short, long)]
        add: bool,

        /// Report the key as stored instead of as an integer
        #[arg(long)]
        raw: bool,
    },

    /// Delete the pair stored under a key
    Unset {
        key: String,

        /// Value expected under the key; its reverse lookup is forgotten too
        value: Option<String>,
    },

    /// Delete every pair in the table
    Reset,

    /// Intern every line of a file, assigning keys to new values
    Import {
        /// File with one value per line
        file: PathBuf,
    },

    /// Show table and cache statistics
    Stats,

    /// Run a raw SQL query and print its rows
    Query { sql: String },

    /// Write a pairs.toml with the current settings
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Set { .. }
                | Commands::Key { add: true, .. }
                | Commands::Unset { .. }
                | Commands::Reset
                | Commands::Import { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Settings after merging `pairs.toml` under the command-line flags
pub struct Settings {
    pub database: PathBuf,
    pub config_path: PathBuf,
    pub store: PairsConfig,
}

impl Settings {
    fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let file = config::load_config(cli.config.as_deref())?.unwrap_or_default();

        let database = cli
            .database
            .clone()
            .or_else(|| file.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("pairs.db"));
        let table = cli
            .table
            .clone()
            .or(file.table)
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let types = match cli.types.as_deref().or(file.types.as_deref()) {
            Some(spec) => spec.parse::<TypeSpec>()?,
            None => TypeSpec::default(),
        };
        let capacity = cli
            .cache_size
            .or(file.cache_size)
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        Ok(Self {
            database,
            config_path: cli.config.clone().unwrap_or_else(config::default_config_path),
            store: PairsConfig::new(table)
                .writable(cli.command.mutates())
                .types(types)
                .cache_capacity(capacity),
        })
    }

    fn open(&self) -> anyhow::Result<PairStore<'static>> {
        if self.store.writable {
            config::ensure_db_dir(&self.database)?;
        }
        tracing::debug!(database = %self.database.display(), table = %self.store.table, "opening store");
        Ok(PairStore::open(&self.database, self.store.clone())?)
    }

    fn to_file_config(&self) -> CliConfig {
        CliConfig {
            database: Some(self.database.display().to_string()),
            table: Some(self.store.table.clone()),
            types: Some(self.store.types.to_string()),
            cache_size: Some(self.store.cache_capacity),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode) {
        if output_mode.is_human() {
            pairs::ui::error(&format!("{:#}", err));
        } else {
            let envelope = serde_json::json!({
                "ok": false,
                "error": format!("{:#}", err),
            });
            println!("{}", envelope);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Commands::Init { force } => commands::run_init(&settings, force, output_mode),
        Commands::Set { key, value, codec } => {
            let mut store = settings.open()?;
            commands::run_set(&mut store, &key, &value, codec, output_mode)
        }
        Commands::Get { key, codec } => {
            let mut store = settings.open()?;
            commands::run_get(&mut store, &key, codec, output_mode)
        }
        Commands::Key { value, add, raw } => {
            let mut store = settings.open()?;
            commands::run_key(&mut store, &value, add, raw, output_mode)
        }
        Commands::Unset { key, value } => {
            let mut store = settings.open()?;
            commands::run_unset(&mut store, &key, value.as_deref(), output_mode)
        }
        Commands::Reset => {
            let mut store = settings.open()?;
            commands::run_reset(&mut store, output_mode)
        }
        Commands::Import { file } => {
            let mut store = settings.open()?;
            commands::run_import(&mut store, &file, output_mode)
        }
        Commands::Stats => {
            let store = settings.open()?;
            commands::run_stats(&store, &settings, output_mode)
        }
        Commands::Query { sql } => {
            let store = settings.open()?;
            commands::run_query(&store, &sql, output_mode)
        }
    }
}
