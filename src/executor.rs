//! Migration execution interface
//!
//! The executor turns a migration unit into work against one tenant's
//! connection. The migrator decides which units run and where; how a unit's
//! statements are executed is left entirely to the implementation.

use std::path::PathBuf;

use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};
use thiserror::Error;

use crate::discovery::MigrationFile;
use crate::tenant::{BoxError, TenantContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration '{0}' has not been loaded")]
    NotLoaded(String),

    #[error("Migration '{0}' has no down section")]
    Irreversible(String),

    #[error("Migration '{migration}' failed: {source}")]
    Failed {
        migration: String,
        #[source]
        source: BoxError,
    },
}

/// Loads migration definitions and runs them against a tenant.
///
/// `run_up` and `run_down` return the statements they executed, or would
/// have executed when `pretend` is set. In pretend mode nothing touches the
/// tenant's data.
pub trait MigrationExecutor<C> {
    /// Register the definitions of the given files for later execution.
    /// Loading a file again replaces its earlier definition.
    fn load(&mut self, migrations: &[MigrationFile]) -> Result<(), ExecError>;

    fn run_up(
        &mut self,
        ctx: &mut TenantContext<C>,
        migration: &MigrationFile,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError>;

    /// Revert a migration identified by its logical name.
    fn run_down(
        &mut self,
        ctx: &mut TenantContext<C>,
        logical_name: &str,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError>;
}
