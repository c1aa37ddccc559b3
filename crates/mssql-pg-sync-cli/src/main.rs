//! mssql-pg-sync CLI - full-snapshot table sync from SQL Server to PostgreSQL.

use clap::{Parser, Subcommand};
use mssql_pg_sync::error::{EXIT_CONFIG_ERROR, EXIT_SUCCESS, EXIT_TRANSFER_ERROR};
use mssql_pg_sync::{
    ConnectionResolver, DatabaseConnector, DispatchResult, Dispatcher, Mode, Orchestrator,
    Settings, SyncError, SyncRequest, SyncResponse, TableRegistry, TableSyncEngine,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mssql-pg-sync")]
#[command(about = "Full-snapshot table sync from SQL Server to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Path to a YAML table registry (defaults to the built-in tables)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Output the JSON response to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync tables in order (all tables in the default order when none are given)
    Sync {
        /// Comma-separated table names
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
    },

    /// Sync a single table
    SyncTable {
        /// Table name
        name: String,
    },

    /// Test source and destination connectivity per table
    Test {
        /// Comma-separated table names
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
    },

    /// Describe the registered tables
    Describe,

    /// Resolve every connection profile the registry needs
    CheckConfig,

    /// Handle a raw JSON request object
    Invoke {
        /// Request JSON, e.g. '{"mode": "sync-one", "table_name": "customer"}'
        #[arg(long)]
        request: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);
    load_env(cli.env_file.as_ref())?;

    let registry = match &cli.registry {
        Some(path) => {
            let registry = TableRegistry::load(path)?;
            info!("Loaded table registry from {:?}", path);
            registry
        }
        None => TableRegistry::builtin()?,
    };
    let resolver = ConnectionResolver::new(Settings::from_env());

    if let Commands::CheckConfig = cli.command {
        let report = resolver.validate_all(&registry)?;
        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Configuration OK");
            for source in &report.sources {
                println!("  Source {}: {}", source.system_id, source.endpoint());
            }
            println!("  Destination: {}", report.destination.endpoint());
        }
        return Ok(EXIT_SUCCESS);
    }

    let engine = TableSyncEngine::new(Arc::new(DatabaseConnector::new(resolver)));
    let dispatcher = Dispatcher::new(Orchestrator::new(Arc::new(registry), engine));

    let response = match cli.command {
        Commands::CheckConfig => unreachable!(), // Handled above
        Commands::Sync { tables } => {
            dispatcher
                .handle(SyncRequest::new(Mode::SyncMany).with_tables(tables))
                .await
        }
        Commands::SyncTable { name } => {
            dispatcher
                .handle(SyncRequest::new(Mode::SyncOne).with_table_name(name))
                .await
        }
        Commands::Test { tables } => {
            dispatcher
                .handle(SyncRequest::new(Mode::TestMany).with_tables(tables))
                .await
        }
        Commands::Describe => dispatcher.handle(SyncRequest::new(Mode::Describe)).await,
        Commands::Invoke { request } => dispatcher.handle_json(&request).await,
    };

    if cli.output_json {
        println!("{}", response.to_json()?);
    } else {
        print_summary(&response);
    }

    Ok(match response.status_code {
        200 => EXIT_SUCCESS,
        400 => EXIT_CONFIG_ERROR,
        _ => EXIT_TRANSFER_ERROR,
    })
}

/// An explicit env file must exist; the implicit ./.env is optional.
fn load_env(path: Option<&PathBuf>) -> Result<(), SyncError> {
    match path {
        Some(path) => match dotenv::from_path(path) {
            Ok(()) => Ok(()),
            Err(dotenv::Error::Io(e)) => Err(SyncError::Io(e)),
            Err(e) => Err(SyncError::Config(format!(
                "Failed to load env file {:?}: {}",
                path, e
            ))),
        },
        None => {
            dotenv::dotenv().ok();
            Ok(())
        }
    }
}

fn print_summary(response: &SyncResponse) {
    let body = &response.body;

    match &body.result {
        Some(DispatchResult::Batch(report)) => {
            println!("\nSync {}", if report.succeeded { "completed!" } else { "finished with failures" });
            println!("  Run ID: {}", report.run_id);
            println!("  Duration: {:.2}s", report.elapsed_seconds);
            println!(
                "  Tables: {}/{}",
                report.successful_tables, report.processed_tables
            );
            println!("  Rows: {}", report.total_transferred);
            println!("  Throughput: {} rows/sec", report.rows_per_second);
            for table in &report.tables {
                let status = if table.succeeded { "OK" } else { "FAILED" };
                println!(
                    "    {} {} ({} rows, {:.2}s)",
                    status, table.table_name, table.rows_transferred, table.elapsed_seconds
                );
                if let Some(ref err) = table.error {
                    println!("      Error: {}", err);
                }
            }
        }
        Some(DispatchResult::Table(outcome)) => {
            println!(
                "\n{}: {}",
                outcome.table_name,
                if outcome.succeeded { "OK" } else { "FAILED" }
            );
            println!("  Rows: {}", outcome.rows_transferred);
            println!("  Duration: {:.2}s", outcome.elapsed_seconds);
            println!(
                "  Validation: {}",
                if outcome.validation_passed { "passed" } else { "not passed" }
            );
            if let Some(stage) = outcome.failed_stage {
                println!("  Failed stage: {}", stage);
            }
        }
        Some(DispatchResult::Connectivity(report)) => {
            println!("Connectivity Results:");
            for table in &report.tables {
                println!(
                    "  {}: source {}, destination {}",
                    table.table_name,
                    if table.source_ok { "OK" } else { "FAILED" },
                    if table.destination_ok { "OK" } else { "FAILED" }
                );
                if let Some(ref err) = table.source_error {
                    println!("    Source error: {}", err);
                }
                if let Some(ref err) = table.destination_error {
                    println!("    Destination error: {}", err);
                }
            }
            println!(
                "\n  Overall: {}/{} tables reachable",
                report.successful_connections, report.tested_tables
            );
        }
        Some(DispatchResult::Catalog(catalog)) => {
            println!("Registered tables (default order: {}):", catalog.default_order.join(", "));
            for table in &catalog.tables {
                println!(
                    "  {} -> {} ({} columns, source {})",
                    table.name, table.destination_object, table.column_count, table.source_system
                );
                if !table.description.is_empty() {
                    println!("    {}", table.description);
                }
            }
        }
        None => {}
    }

    if let Some(ref err) = body.error {
        eprintln!("Error: {}", err);
    }
    if let Some(ref modes) = body.valid_modes {
        eprintln!("Valid modes: {}", modes.join(", "));
    }
    if let Some(ref tables) = body.available_tables {
        eprintln!("Available tables: {}", tables.join(", "));
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
