use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use taskies_db::config::Configuration;
use taskies_db::db::monitoring::gather_metrics;
use taskies_db::db::{open_database, register_hooks};
use taskies_db::environment::{Environment, DATA_DIR_ENV};
use taskies_db::{migration_status, DirectoryRegistry, EmbeddedRegistry, MigrationRegistry, Migrator};

#[derive(Parser, Debug)]
#[command(name = "taskies-migrate", version, about = "Apply Taskies database migrations")]
struct Cli {
    /// Database file (defaults to the configured/application path)
    #[arg(long, env = "TASKIES_DATABASE")]
    database: Option<PathBuf>,

    /// Read *.sql migrations from this directory instead of the embedded set
    #[arg(long)]
    migrations_dir: Option<PathBuf>,

    /// Application data directory
    #[arg(long, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Dump Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Apply pending migrations (default)
    Up,
    /// Show applied and pending migrations
    Status,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        eprintln!("Failed to run migrations: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Окружение и конфиг нужны только для пути по умолчанию.
    let database = match cli.database.clone() {
        Some(path) => path,
        None => {
            let env = Environment::resolve(cli.data_dir.clone())?;
            let config = Configuration::load(&env)?;
            env.prepare()?;
            config.database_path(&env)
        }
    };

    let registry: Box<dyn MigrationRegistry> = match &cli.migrations_dir {
        Some(dir) => Box::new(DirectoryRegistry::new(dir)),
        None => Box::new(EmbeddedRegistry),
    };

    let mut conn = open_database(&database)
        .with_context(|| format!("cannot open {}", database.display()))?;
    register_hooks(&conn);

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            let report = Migrator::new(&mut conn).migrate(registry.as_ref())?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for name in &report.applied {
                    println!("applied  {name}");
                }
                println!(
                    "{} applied, {} already present ({})",
                    report.applied.len(),
                    report.skipped.len(),
                    database.display()
                );
            }
            info!("Migrations finished for {}", database.display());
        }
        Command::Status => {
            let status = migration_status(&conn, registry.as_ref())?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                for name in &status.applied {
                    println!("applied  {name}");
                }
                for name in &status.pending {
                    println!("pending  {name}");
                }
            }
        }
    }

    if cli.metrics {
        print!("{}", gather_metrics());
    }
    Ok(())
}
