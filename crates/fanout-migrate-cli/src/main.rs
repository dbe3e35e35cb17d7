//! fanout-migrate CLI - copy a MySQL database into JSON files, MongoDB and Cassandra.

use clap::{Parser, Subcommand};
use fanout_migrate::{
    Config, Destination, MigrateError, MigrationResult, Orchestrator, OutcomeStatus,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "fanout-migrate")]
#[command(about = "Copy a MySQL database into JSON files, a document store and a column-family store")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml", conflicts_with = "from_env")]
    config: PathBuf,

    /// Read configuration from MYSQL_*, MONGO_* and CASSANDRA_* environment variables
    #[arg(long)]
    from_env: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Timeout in seconds for graceful shutdown (default: 60)
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate every table to the configured destinations
    Run {
        /// Destinations to run, in order (file, document, column_family)
        #[arg(long, value_delimiter = ',')]
        destinations: Option<Vec<Destination>>,

        /// Override the JSON output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override number of tables migrated concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Only migrate tables matching these glob patterns
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Skip tables matching these glob patterns
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// List the source tables selected for migration
    ListTables,

    /// Test source and destination connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = if cli.from_env {
        info!("Loading configuration from environment");
        Config::from_env()?
    } else {
        let config = Config::load(&cli.config)?;
        info!("Loaded configuration from {:?}", cli.config);
        config
    };

    match cli.command {
        Commands::Run {
            destinations,
            output_dir,
            workers,
            include,
            exclude,
        } => {
            // Apply overrides
            if let Some(destinations) = destinations {
                config.migration.destinations = destinations;
            }
            if let Some(dir) = output_dir {
                config.file.get_or_insert_with(Default::default).output_dir = dir;
            }
            if let Some(w) = workers {
                config.migration.table_workers = w;
            }
            if !include.is_empty() {
                config.migration.include_tables = include;
            }
            if !exclude.is_empty() {
                config.migration.exclude_tables = exclude;
            }
            config.validate()?;

            // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
            let cancel_token = setup_signal_handler(cli.shutdown_timeout)?;

            let orchestrator = Orchestrator::connect(&config)
                .await?
                .with_cancel(cancel_token);
            let result = orchestrator.run().await;
            orchestrator.close().await;
            let result = result?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }

            if result.status == "cancelled" {
                return Ok(ExitCode::from(MigrateError::Cancelled.exit_code()));
            }
            if result.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::ListTables => {
            let source = fanout_migrate::orchestrator::connect_source(&config).await?;
            let orchestrator = Orchestrator::new(Arc::clone(&source), Vec::new(), config.migration);
            let tables = orchestrator.list_tables().await;
            source.close().await;
            let tables = tables?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::connect(&config).await?;
            let checks = orchestrator.health_check().await;
            orchestrator.close().await;
            let healthy = checks.iter().all(|c| c.ok);

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                println!("Health Check Results:");
                for check in &checks {
                    println!(
                        "  {}: {}",
                        check.component,
                        if check.ok { "OK" } else { "FAILED" }
                    );
                    if let Some(ref err) = check.error {
                        println!("    Error: {}", err);
                    }
                }
                println!(
                    "\n  Overall: {}",
                    if healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !healthy {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(result: &MigrationResult) {
    println!("\nMigration {}", result.status);
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Tables: {}", result.tables_total);
    println!("  Records written: {}", result.records_written);

    for report in &result.destinations {
        println!("\n  {}:", report.destination);
        for outcome in &report.outcomes {
            match &outcome.status {
                OutcomeStatus::Succeeded => {
                    println!("    ok      {} ({} records)", outcome.table, outcome.records_written)
                }
                OutcomeStatus::Partial {
                    failed_records,
                    first_error,
                } => println!(
                    "    partial {} ({} written, {} rejected: {})",
                    outcome.table, outcome.records_written, failed_records, first_error
                ),
                OutcomeStatus::Failed { reason } => {
                    println!("    failed  {}: {}", outcome.table, reason)
                }
            }
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}

/// Force the process down if started tables do not finish in time.
fn arm_shutdown_timer(shutdown_timeout: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
        eprintln!("Shutdown timeout of {}s exceeded, exiting", shutdown_timeout);
        std::process::exit(i32::from(MigrateError::Cancelled.exit_code()));
    });
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!(
            "\nReceived {}. Finishing started tables (timeout: {}s)...",
            name, shutdown_timeout
        );
        token.cancel();
        arm_shutdown_timer(shutdown_timeout);
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing started tables...");
            token.cancel();
            arm_shutdown_timer(shutdown_timeout);
        }
    });

    Ok(cancel_token)
}
