//! Errors surfaced by the tenant migrator
//!
//! The migrator performs no recovery of its own. Collaborator failures are
//! wrapped with the tenant (and migration) they happened on and returned
//! unchanged as the `source`.

use thiserror::Error;

use crate::discovery::LoadError;
use crate::executor::{Direction, ExecError};
use crate::ledger::LedgerError;
use crate::tenant::DirectoryError;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// The tenant list could not be read. Nothing has been touched.
    #[error("Tenant source unavailable")]
    TenantSourceUnavailable(#[source] DirectoryError),

    /// A tenant's connection could not be opened. Halts the whole run.
    #[error("Connection bootstrap failed for tenant '{tenant}'")]
    ConnectionBootstrapFailed {
        tenant: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Migration '{migration}' ({direction}) failed on tenant '{tenant}'")]
    MigrationExecution {
        tenant: String,
        migration: String,
        direction: Direction,
        #[source]
        source: ExecError,
    },

    #[error("Ledger error on tenant '{tenant}'")]
    Ledger {
        tenant: String,
        #[source]
        source: LedgerError,
    },

    #[error("Cannot discover migrations")]
    Discovery(#[from] LoadError),

    #[error("Cannot load migration definitions")]
    Load(#[source] ExecError),
}

impl MigrateError {
    /// Tenant the failure happened on, when it is tenant-specific.
    pub fn tenant(&self) -> Option<&str> {
        match self {
            MigrateError::ConnectionBootstrapFailed { tenant, .. }
            | MigrateError::MigrationExecution { tenant, .. }
            | MigrateError::Ledger { tenant, .. } => Some(tenant),
            MigrateError::TenantSourceUnavailable(_)
            | MigrateError::Discovery(_)
            | MigrateError::Load(_) => None,
        }
    }
}
