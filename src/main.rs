//! tenant-migrate CLI
//!
//! Entry point for the command-line tool.
//!
//! Exit codes:
//! - 0: Success
//! - 1: A run or rollback halted on a tenant (unreachable, migration failed, ledger error)
//! - 2: Tool error (config error, bad arguments, missing or unreadable migrations)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tenant_migrate::config::OutputFormat;
use tenant_migrate::report::{JsonReporter, TextReporter};
use tenant_migrate::sqlite::{SqlExecutor, SqliteDirectory, SqliteLedger};
use tenant_migrate::{
    Config, FsDiscovery, MigrateError, MigrationPolicy, Note, Reporter, SchemaCreator,
    TenantMigrator,
};

/// Default config file name used when --config is not explicitly provided.
const DEFAULT_CONFIG_FILE: &str = "tenant-migrate.toml";

#[derive(Parser, Debug)]
#[command(name = "tenant-migrate")]
#[command(about = "Apply and revert schema migrations across tenant databases", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override progress format (text, json)
    #[arg(long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply outstanding migrations to every tenant
    Migrate {
        /// Migration directory (defaults to migrations.path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Show what would run without changing any tenant
        #[arg(long)]
        pretend: bool,
    },

    /// Revert the latest migration batch of every tenant
    Rollback {
        /// Migration directory to load definitions from (defaults to migrations.path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Show what would be reverted without changing any tenant
        #[arg(long)]
        pretend: bool,
    },

    /// List the migrations the policy admits, without touching tenants
    Queued {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Create or drop a tenant database
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
}

#[derive(Subcommand, Debug)]
enum TenantAction {
    Create { name: String },
    Drop { name: String },
}

type CliMigrator = TenantMigrator<SqliteDirectory, SqliteLedger, SqlExecutor, Box<dyn Reporter>>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {:#}", err);
        let code = match err.downcast_ref::<MigrateError>() {
            Some(MigrateError::Discovery(_) | MigrateError::Load(_)) | None => 2,
            Some(_) => 1,
        };
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args.config)?;

    let format = match &args.format {
        Some(name) => OutputFormat::parse(name)?,
        None => OutputFormat::parse(&config.output.format)?,
    };

    match args.command {
        Command::Migrate { path, pretend } => {
            let path = path.unwrap_or_else(|| config.migrations.path.clone());
            let mut migrator = build_migrator(&config, format)?;
            migrator
                .run(&path, pretend)
                .context("Migration run halted")?;
        }
        Command::Rollback { path, pretend } => {
            let path = path.unwrap_or_else(|| config.migrations.path.clone());
            let mut migrator = build_migrator(&config, format)?;
            migrator.use_path(path);
            let count = migrator.rollback(pretend).context("Rollback halted")?;
            eprintln!("tenant-migrate: {} migration(s) rolled back", count);
        }
        Command::Queued { path } => {
            let path = path.unwrap_or_else(|| config.migrations.path.clone());
            let migrator = build_migrator(&config, format)?;
            let eligible = migrator.eligible_migrations(&path)?;
            for migration in &eligible {
                migrator.reporter().note(&Note::Queued {
                    migration: migration.id.clone(),
                });
            }
            eprintln!("tenant-migrate: {} migration(s) queued", eligible.len());
        }
        Command::Tenant { action } => {
            let directory = SqliteDirectory::new(&config.tenants.data_dir);
            match action {
                TenantAction::Create { name } => {
                    if directory.create_schema(&name)? {
                        eprintln!("Created tenant '{}'", name);
                    } else {
                        eprintln!("Tenant '{}' already exists", name);
                    }
                }
                TenantAction::Drop { name } => {
                    if directory.drop_schema(&name)? {
                        eprintln!("Dropped tenant '{}'", name);
                    } else {
                        eprintln!("Tenant '{}' does not exist", name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn build_migrator(config: &Config, format: OutputFormat) -> Result<CliMigrator> {
    let reporter: Box<dyn Reporter> = match format {
        OutputFormat::Json => Box::new(JsonReporter::stdout()),
        OutputFormat::Text => Box::new(TextReporter::stdout()),
    };

    let directory = SqliteDirectory::new(&config.tenants.data_dir)
        .with_tenants(config.tenants.names.clone());
    let ledger = SqliteLedger::new(config.ledger.table.clone())?;
    let discovery = FsDiscovery::new(config.migrations.extensions.clone());

    Ok(
        TenantMigrator::new(directory, ledger, SqlExecutor::new(), discovery)
            .with_policy(MigrationPolicy::from_provider(config))
            .with_reporter(reporter),
    )
}

/// Load configuration from file.
///
/// If `config_path` is `Some`, the user explicitly passed `--config` and the file
/// must exist (error if not found). If `None`, the default config path is used;
/// a missing default config file is not an error (falls back to defaults with a warning).
fn load_config(config_path: &Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path).context("Failed to load configuration")
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Config::from_file(&default_path).context("Failed to load configuration")
            } else {
                log::warn!(
                    "Config file {} not found, using defaults",
                    default_path.display()
                );
                Ok(Config::default())
            }
        }
    }
}
