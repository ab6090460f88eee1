//! Tenant directory interfaces
//!
//! The directory owns the list of tenants and knows how to open a connection
//! to each one. The migrator only reads it: it takes one snapshot of the
//! tenant list per run and bootstraps connections in that order.

use serde::Serialize;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Tenant {
    /// Unique tenant name. Also keys the tenant's connection and ledger.
    pub name: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Everything one tenant's migration step works against.
///
/// Built fresh for each tenant by the migrator and handed explicitly to the
/// ledger and the executor, so no connection is ever shared between tenants.
#[derive(Debug)]
pub struct TenantContext<C> {
    pub tenant: Tenant,
    pub connection: C,
}

impl<C> TenantContext<C> {
    pub fn new(tenant: Tenant, connection: C) -> Self {
        Self { tenant, connection }
    }

    /// Ledger source key for this tenant.
    pub fn source(&self) -> &str {
        &self.tenant.name
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Tenant directory unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unknown tenant '{0}'")]
    UnknownTenant(String),

    #[error("Invalid tenant name '{0}'")]
    InvalidName(String),

    #[error("Cannot connect to tenant '{tenant}': {source}")]
    Connection {
        tenant: String,
        #[source]
        source: BoxError,
    },
}

/// Registry of tenants and their data sources.
pub trait TenantDirectory {
    /// Per-tenant connection handle produced by [`bootstrap`](Self::bootstrap).
    type Connection;

    /// All known tenants, in processing order.
    fn tenants(&self) -> Result<Vec<Tenant>, DirectoryError>;

    /// Open the data source for one tenant.
    fn bootstrap(&self, tenant: &Tenant) -> Result<Self::Connection, DirectoryError>;
}

/// Creates and drops the physical schema backing a tenant.
pub trait SchemaCreator {
    /// Returns `true` if the schema was created, `false` if it already existed.
    fn create_schema(&self, name: &str) -> Result<bool, DirectoryError>;

    /// Returns `true` if the schema was dropped, `false` if it did not exist.
    fn drop_schema(&self, name: &str) -> Result<bool, DirectoryError>;
}
