//! Configuration file parsing
//!
//! Reads tenant-migrate.toml configuration files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::policy::PolicyProvider;
use crate::sqlite::is_sql_identifier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub migrations: MigrationsConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationsConfig {
    /// Directory holding the shared migration files
    #[serde(default = "default_migrations_path")]
    pub path: PathBuf,

    /// File extensions treated as migrations
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            path: default_migrations_path(),
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// "only" makes `names` an allow-list; any other value a deny-list
    #[serde(default)]
    pub behavior: String,

    /// Logical migration names
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantsConfig {
    /// Directory holding one database per tenant
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Explicit tenant order. Empty means every database in `data_dir`.
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Ledger table inside each tenant database
    #[serde(default = "default_ledger_table")]
    pub table: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: default_ledger_table(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Progress format: "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_migrations_path() -> PathBuf {
    PathBuf::from("db/migrations")
}

fn default_extensions() -> Vec<String> {
    vec!["sql".to_string()]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("tenants")
}

fn default_ledger_table() -> String {
    "migrations".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

/// Progress output format, as named in `output.format` and `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse a format name, listing the valid ones on failure.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        name.parse().map_err(|_| {
            let valid: Vec<String> = OutputFormat::iter().map(|f| f.to_string()).collect();
            ConfigError::Validation(format!(
                "invalid output format '{}'. Valid values: {}",
                name,
                valid.join(", ")
            ))
        })
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_sql_identifier(&self.ledger.table) {
            return Err(ConfigError::Validation(format!(
                "invalid ledger table '{}'. Use letters, digits and underscores, not starting with a digit",
                self.ledger.table
            )));
        }
        OutputFormat::parse(&self.output.format)?;
        if self.migrations.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "migrations.extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }
}

impl PolicyProvider for Config {
    fn tenant_migrations(&self) -> BTreeSet<String> {
        self.policy.names.iter().cloned().collect()
    }

    fn migration_behavior(&self) -> String {
        self.policy.behavior.clone()
    }
}
