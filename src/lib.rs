//! tenant-migrate: tenant-aware schema migrations
//!
//! This library applies and reverts one shared pool of migrations across
//! many tenant databases. A deployment policy selects which migrations are
//! eligible, every tenant keeps its own ledger of what ran in which batch,
//! and tenants are processed one after another in directory order.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod memory;
pub mod migrator;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod sqlite;
pub mod tenant;

// Re-export commonly used types
pub use config::Config;
pub use discovery::{FsDiscovery, MigrationDiscovery, MigrationFile};
pub use error::MigrateError;
pub use executor::{Direction, MigrationExecutor};
pub use ledger::{Ledger, LedgerEntry};
pub use migrator::TenantMigrator;
pub use policy::{MigrationPolicy, PolicyMode, PolicyProvider};
pub use report::{Note, Reporter};
pub use resolver::resolve_migration_name;
pub use tenant::{SchemaCreator, Tenant, TenantContext, TenantDirectory};
