//! gatesql-migrate CLI
//!
//! Command-line tool for syncing declared schemas into live databases.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gatesql_migrate::{Config, MigrateError, TablePlan};

/// Keeps SQL tables in line with their declared schema.
#[derive(Parser)]
#[command(name = "gatesql-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file declaring databases and schemas.
    #[arg(short, long, env = "GATESQL_CONFIG", default_value = "gatesql.json")]
    config: PathBuf,

    /// Database alias to work on (every enabled database if not specified).
    #[arg(short, long)]
    alias: Option<String>,

    /// Per-query timeout in milliseconds.
    #[arg(long, env = "GATESQL_QUERY_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements that would bring tables in sync.
    Diff {
        /// Table to diff (all declared tables if not specified).
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Apply schema changes.
    Sync {
        /// Table to sync (all declared tables if not specified).
        #[arg(short, long)]
        table: Option<String>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the raw catalog description of a table.
    Describe {
        table: String,
    },

    /// Print a table's schema as read back from the database.
    Inspect {
        table: String,
    },
}

fn print_plans(alias: &str, plans: &[TablePlan]) {
    for plan in plans {
        if plan.is_empty() {
            println!("-- {alias}.{}: in sync", plan.table);
            continue;
        }
        println!("-- {alias}.{}", plan.table);
        for statement in &plan.statements {
            println!("{statement};");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;
    let timeout = Duration::from_millis(cli.timeout_ms);
    let aliases = config.aliases(cli.alias.as_deref())?;

    match cli.command {
        Commands::Diff { table } => {
            for alias in &aliases {
                let sync = gatesql_migrate::connect(&config, alias, timeout).await?;
                let plans = match &table {
                    Some(table) => vec![sync.plan_table(table).await?],
                    None => sync.plan_all().await?,
                };
                print_plans(alias, &plans);
            }
        }

        Commands::Sync { table, dry_run } => {
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            for alias in &aliases {
                let sync = gatesql_migrate::connect(&config, alias, timeout).await?;
                let plans = match (&table, dry_run) {
                    (Some(table), true) => vec![sync.plan_table(table).await?],
                    (Some(table), false) => vec![sync.sync_table(table).await?],
                    (None, true) => sync.plan_all().await?,
                    (None, false) => sync.sync_all().await?,
                };
                print_plans(alias, &plans);
                let applied = plans.iter().map(|plan| plan.statements.len()).sum::<usize>();
                info!(alias = %alias, statements = applied, dry_run, "Sync finished");
            }
        }

        Commands::Describe { table } => {
            let [alias] = aliases.as_slice() else {
                return Err(single_alias_required().into());
            };
            let sync = gatesql_migrate::connect(&config, alias, timeout).await?;
            let description = sync.crud().describe_table(&table).await?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }

        Commands::Inspect { table } => {
            let [alias] = aliases.as_slice() else {
                return Err(single_alias_required().into());
            };
            let sync = gatesql_migrate::connect(&config, alias, timeout).await?;
            let fields = sync.inspect_table(&table).await?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
    }

    Ok(())
}

fn single_alias_required() -> MigrateError {
    MigrateError::Config(String::from(
        "several databases are enabled, choose one with --alias",
    ))
}
