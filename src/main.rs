use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use rusqlite::types::Value;
use tracing::{debug, info};

use cerberus_db::config::{self, Config, DatabaseConfig};
use cerberus_db::core::db::{binder, row_to_json, RequestExecutor, SqlitePool};
use cerberus_db::core::{CerberusError, Result};

/// Exit code for command-line usage errors.
const EXIT_USAGE: i32 = 64;

#[derive(Parser, Debug)]
#[command(name = "cerberus-db", author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    ///
    /// Defaults to <config dir>/cerberus/db.toml when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the configured path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the first row as a JSON object, or null
    Query(Request),
    /// Print every row as a JSON array
    List(Request),
    /// Run a write and print the number of affected rows
    Update(Request),
}

#[derive(clap::Args, Debug, PartialEq)]
struct Request {
    /// SQL text with ?N placeholders
    sql: String,

    /// Values bound positionally; integers when they parse, text otherwise
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    params: Vec<String>,
}

impl Request {
    fn values(&self) -> Vec<Value> {
        self.params.iter().map(|raw| parse_param(raw)).collect()
    }
}

fn parse_param(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::Text(raw.to_string()),
    }
}

/// Explicit `--config`, then the default location if it exists, then `--db` alone.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let file = match &cli.config {
        Some(path) => Some(config::load_config(path)?),
        None => match config::default_config_path().filter(|path| path.exists()) {
            Some(path) => Some(config::load_config(path)?),
            None => None,
        },
    };

    match (file, &cli.db) {
        (Some(mut config), Some(db_path)) => {
            config.database.path = db_path.clone();
            Ok(config)
        }
        (Some(config), None) => Ok(config),
        (None, Some(db_path)) => Ok(Config::from_database(DatabaseConfig::new(db_path.clone()))),
        (None, None) => Err(CerberusError::Command(
            "no database given: use --db or a configuration file".to_string(),
        )),
    }
}

fn run(command: Command, config: Config) -> Result<()> {
    let executor =
        RequestExecutor::new(SqlitePool::new(config.database.clone())).with_classifier(config.error_classifier());
    debug!("Running {:?} against {:?}", command, config.database.path);

    match command {
        Command::Query(request) => {
            let row = executor.execute_query(&request.sql, binder::values(request.values()), row_to_json)?;
            println!("{}", serde_json::to_string(&row)?);
        }
        Command::List(request) => {
            let rows = executor.execute_query_list(&request.sql, binder::values(request.values()), row_to_json)?;
            println!("{}", serde_json::to_string(&rows)?);
        }
        Command::Update(request) => {
            let count = executor.execute_update(&request.sql, binder::values(request.values()))?;
            println!("{}", count);
        }
    }
    Ok(())
}

fn exit_code(error: &CerberusError) -> i32 {
    match error {
        CerberusError::Command(_) => EXIT_USAGE,
        CerberusError::DataAccess(e) if e.is_duplicate() => 2,
        _ => 1,
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(EXIT_USAGE);
            }
        },
    };

    let result = resolve_config(&cli).and_then(|config| {
        // Initialize the logging system using tracing subscriber
        tracing_subscriber::fmt()
            .with_max_level(config.log_level()?)
            .with_writer(std::io::stderr)
            .init();
        info!("Starting cerberus-db...");
        run(cli.command, config)
    });

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(exit_code(&e));
    }
}
