//! Tenant migration orchestrator
//!
//! [`TenantMigrator`] runs the shared migration pool against every tenant
//! in the directory, one tenant at a time:
//!
//! 1. snapshot the tenant list,
//! 2. filter the discovered migrations through the policy and load them
//!    (exactly once per run, before any tenant is touched),
//! 3. for each tenant in snapshot order: open its connection, diff against
//!    its ledger, execute, record.
//!
//! Any failure halts the run. Tenants already processed stay migrated, the
//! rest are left untouched.

use std::path::{Path, PathBuf};

use crate::discovery::{MigrationDiscovery, MigrationFile};
use crate::engine::Engine;
use crate::error::MigrateError;
use crate::executor::{Direction, MigrationExecutor};
use crate::ledger::Ledger;
use crate::policy::MigrationPolicy;
use crate::report::{LogReporter, Note, Reporter};
use crate::tenant::{Tenant, TenantContext, TenantDirectory};

pub struct TenantMigrator<D, L, E, R = LogReporter> {
    directory: D,
    ledger: L,
    executor: E,
    discovery: Box<dyn MigrationDiscovery>,
    policy: MigrationPolicy,
    reporter: R,
    rollback_path: Option<PathBuf>,
}

impl<D, L, E> TenantMigrator<D, L, E, LogReporter> {
    /// Create a migrator that admits every migration and reports to the log.
    pub fn new(
        directory: D,
        ledger: L,
        executor: E,
        discovery: impl MigrationDiscovery + 'static,
    ) -> Self {
        Self {
            directory,
            ledger,
            executor,
            discovery: Box::new(discovery),
            policy: MigrationPolicy::allow_all(),
            reporter: LogReporter,
            rollback_path: None,
        }
    }
}

impl<D, L, E, R> TenantMigrator<D, L, E, R> {
    pub fn with_policy(mut self, policy: MigrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> TenantMigrator<D, L, E, R2> {
        TenantMigrator {
            directory: self.directory,
            ledger: self.ledger,
            executor: self.executor,
            discovery: self.discovery,
            policy: self.policy,
            reporter,
            rollback_path: self.rollback_path,
        }
    }

    /// Scope subsequent rollbacks to the migrations at `path`.
    ///
    /// The filtered set at that path is loaded before reverting so the
    /// executor can find every definition. Which entries get reverted is
    /// still decided by each tenant's ledger.
    pub fn use_path(&mut self, path: impl Into<PathBuf>) {
        self.rollback_path = Some(path.into());
    }

    pub fn policy(&self) -> &MigrationPolicy {
        &self.policy
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Discover the migrations at `path` and keep those the policy admits.
    pub fn eligible_migrations(&self, path: &Path) -> Result<Vec<MigrationFile>, MigrateError> {
        let available = self.discovery.list_migration_files(path)?;
        let eligible = self.policy.filter(&available);
        log::debug!(
            "Policy '{}' admitted {} of {} migration(s) from {}",
            self.policy.mode,
            eligible.len(),
            available.len(),
            path.display()
        );
        Ok(eligible)
    }
}

impl<D, L, E, R> TenantMigrator<D, L, E, R>
where
    D: TenantDirectory,
    L: Ledger<D::Connection>,
    E: MigrationExecutor<D::Connection>,
    R: Reporter,
{
    /// Apply every outstanding eligible migration at `path` to every tenant.
    ///
    /// Success is the absence of an error; progress goes to the reporter.
    pub fn run(&mut self, path: &Path, pretend: bool) -> Result<(), MigrateError> {
        let tenants = self.snapshot_tenants()?;
        let eligible = self.include_migrations(path)?;

        self.reporter.note(&Note::Assembling);
        for migration in &eligible {
            self.reporter.note(&Note::Queued {
                migration: migration.id.clone(),
            });
        }

        for tenant in tenants {
            let mut ctx = self.bootstrap(tenant)?;
            self.reporter.note(&Note::Running {
                tenant: ctx.source().to_string(),
            });

            let entries = Engine::new(&self.ledger, &mut self.executor, &self.reporter)
                .apply(&mut ctx, &eligible, pretend)?;

            if !entries.is_empty() {
                self.reporter.note(&Note::TenantComplete {
                    tenant: ctx.source().to_string(),
                    direction: Direction::Up,
                    count: entries.len(),
                });
            }
        }

        Ok(())
    }

    /// Revert the most recent batch of every tenant.
    ///
    /// Returns the number of ledger entries reverted across all tenants.
    /// Tenants with nothing to revert are reported and skipped.
    pub fn rollback(&mut self, pretend: bool) -> Result<usize, MigrateError> {
        let tenants = self.snapshot_tenants()?;

        if let Some(path) = self.rollback_path.clone() {
            self.reporter.note(&Note::RollbackPath {
                path: path.display().to_string(),
            });
            self.include_migrations(&path)?;
        }

        let mut total = 0;
        for tenant in tenants {
            let mut ctx = self.bootstrap(tenant)?;

            let count = Engine::new(&self.ledger, &mut self.executor, &self.reporter)
                .revert_last(&mut ctx, pretend)?;

            if count > 0 {
                self.reporter.note(&Note::TenantComplete {
                    tenant: ctx.source().to_string(),
                    direction: Direction::Down,
                    count,
                });
            }
            total += count;
        }

        Ok(total)
    }

    fn snapshot_tenants(&self) -> Result<Vec<Tenant>, MigrateError> {
        let tenants = self
            .directory
            .tenants()
            .map_err(MigrateError::TenantSourceUnavailable)?;
        log::debug!("Tenant snapshot: {} tenant(s)", tenants.len());
        Ok(tenants)
    }

    /// Filter, then register the selected definitions with the executor.
    fn include_migrations(&mut self, path: &Path) -> Result<Vec<MigrationFile>, MigrateError> {
        let eligible = self.eligible_migrations(path)?;
        self.executor.load(&eligible).map_err(MigrateError::Load)?;
        Ok(eligible)
    }

    fn bootstrap(&self, tenant: Tenant) -> Result<TenantContext<D::Connection>, MigrateError> {
        let connection = self.directory.bootstrap(&tenant).map_err(|source| {
            MigrateError::ConnectionBootstrapFailed {
                tenant: tenant.name.clone(),
                source,
            }
        })?;
        self.reporter.note(&Note::Bootstrapped {
            tenant: tenant.name.clone(),
        });
        Ok(TenantContext::new(tenant, connection))
    }
}
