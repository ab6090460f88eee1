//! Per-tenant record of executed migrations
//!
//! Every tenant keeps its own ledger. Entries are keyed by logical migration
//! name and grouped by batch: all migrations applied to a tenant by one
//! `run` share a batch number, and rollback reverts the latest batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tenant::{BoxError, TenantContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Tenant whose ledger holds this entry.
    pub tenant_source: String,
    pub migration_name: String,
    pub batch: u32,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    Storage(#[source] BoxError),

    #[error("Ledger entry '{migration}' not found for tenant '{tenant}'")]
    MissingEntry { tenant: String, migration: String },

    #[error("Invalid ledger table name '{0}'")]
    InvalidTable(String),
}

/// Ledger operations, always scoped to the tenant in the given context.
///
/// `begin_batch`, `commit_batch` and `abandon_batch` bracket the units of a
/// batch together with their ledger writes. A backend whose storage is
/// transactional opens one transaction on the tenant connection so that the
/// units and the ledger either all land or none do. The defaults do nothing.
pub trait Ledger<C> {
    /// Logical names of every migration already run for the tenant.
    fn ran(&self, ctx: &mut TenantContext<C>) -> Result<Vec<String>, LedgerError>;

    /// Entries of the tenant's most recent batch, most recently applied first.
    /// Empty when nothing has run.
    fn last_batch(&self, ctx: &mut TenantContext<C>) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// One past the highest batch recorded for the tenant (1 for a fresh ledger).
    fn next_batch_number(&self, ctx: &mut TenantContext<C>) -> Result<u32, LedgerError>;

    /// Record a whole batch. Either every entry is written or none is.
    fn record_batch(
        &self,
        ctx: &mut TenantContext<C>,
        entries: &[LedgerEntry],
    ) -> Result<(), LedgerError>;

    /// Remove a single reverted entry.
    fn delete(&self, ctx: &mut TenantContext<C>, entry: &LedgerEntry) -> Result<(), LedgerError>;

    fn begin_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        Ok(())
    }

    fn commit_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        Ok(())
    }

    /// Discard everything since `begin_batch`. Called after a failure.
    fn abandon_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        Ok(())
    }
}
