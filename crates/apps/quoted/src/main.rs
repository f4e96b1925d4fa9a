//! quoted - command-line front end for the quote collection
//!
//! Owns the `QuoteStore` and the `SyncEngine` and wires them to
//! subcommands. Failures are reported as messages; none of them damage the
//! stored collection.

use clap::{Parser, Subcommand};
use log::{error, info};
use quotes::{
    CategoryFilter, HttpQuoteSource, InMemoryKeyValueStore, KeyValueStore, QuoteStore,
    QuotebookConfig, SqliteKeyValueStore, SyncEngine,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod commands;
mod observer;
mod shell;

use observer::ConsoleObserver;

#[derive(Parser)]
#[command(name = "quoted")]
#[command(author, version, about = "Random quotes by category, synced with a server")]
#[command(propagate_version = true)]
struct Cli {
    /// Use this SQLite database instead of the configured one
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a random quote
    Show {
        /// Category to pick from (defaults to the saved filter)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add a new quote
    Add {
        /// Quote text
        text: String,
        /// Category for the quote
        category: String,
    },

    /// List categories
    Categories,

    /// Save the category filter used by `show`
    Filter {
        /// Category name, or "all"
        category: String,
    },

    /// List quotes, optionally limited to one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Export all quotes to a JSON file
    Export {
        /// Output file
        #[arg(default_value = "quotes.json")]
        output: PathBuf,
    },

    /// Import quotes from a JSON file
    Import {
        /// Input file holding a JSON array of quotes
        input: PathBuf,
    },

    /// Sync with the server once (server wins on conflict)
    Sync,

    /// Push local quotes to the server
    Push,

    /// Sync periodically until interrupted
    Watch {
        /// Seconds between syncs (defaults to the configured interval)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Interactive session with periodic background sync
    Shell {
        /// Disable background sync
        #[arg(long)]
        no_sync: bool,
    },
}

/// Everything a command needs, constructed once at startup
pub struct App {
    pub config: QuotebookConfig,
    pub store: QuoteStore,
    pub engine: Arc<SyncEngine>,
}

impl App {
    fn open(config: QuotebookConfig) -> anyhow::Result<Self> {
        let db_path = config
            .resolved_database_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine database path"))?;
        info!("Using database {}", db_path.display());

        let durable: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(&db_path)?);
        let session: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let store = QuoteStore::restore(durable, session);

        let source = HttpQuoteSource::from_config(&config)?;
        info!("Syncing with {}", source.endpoint());
        let engine = SyncEngine::new(Arc::new(source)).with_observer(Arc::new(ConsoleObserver));

        Ok(Self {
            config,
            store,
            engine: Arc::new(engine),
        })
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {:#}", e);
    }

    let mut config = match QuotebookConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(path) = QuotebookConfig::default_config_path() {
                eprintln!("Check the settings in {}", path.display());
            }
            return ExitCode::FAILURE;
        }
    };
    if let Some(database) = cli.database {
        config.database_path = Some(database);
    }

    let mut app = match App::open(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Show { category } => commands::show(&app, category.as_deref()),
        Commands::Add { text, category } => commands::add(&mut app, &text, &category),
        Commands::Categories => commands::categories(&app),
        Commands::Filter { category } => {
            commands::set_filter(&app, &CategoryFilter::parse(&category))
        }
        Commands::List { category } => commands::list(&app, category.as_deref()),
        Commands::Export { output } => commands::export(&app, &output),
        Commands::Import { input } => commands::import(&mut app, &input),
        Commands::Sync => commands::sync(&mut app),
        Commands::Push => commands::push(&mut app),
        Commands::Watch { interval } => commands::watch(&mut app, interval),
        Commands::Shell { no_sync } => shell::run(app, !no_sync),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_interval_must_be_positive() {
        assert!(Cli::try_parse_from(["quoted", "watch", "--interval", "0"]).is_err());

        let cli = Cli::try_parse_from(["quoted", "watch", "-i", "15"]).unwrap();
        assert!(matches!(cli.command, Commands::Watch { interval: Some(15) }));
    }

    #[test]
    fn test_database_flag_is_global() {
        let cli = Cli::try_parse_from(["quoted", "list", "--database", "/tmp/q.sqlite"]).unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/q.sqlite")));
    }
}
