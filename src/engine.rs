//! Per-tenant batch engine
//!
//! Applies an ordered list of migration units to one tenant, diffing against
//! that tenant's ledger, and reverts the tenant's latest batch. It knows
//! nothing about how tenants are enumerated; [`TenantMigrator`] drives it
//! once per tenant.
//!
//! [`TenantMigrator`]: crate::migrator::TenantMigrator

use std::collections::HashSet;

use crate::discovery::MigrationFile;
use crate::error::MigrateError;
use crate::executor::{Direction, MigrationExecutor};
use crate::ledger::{Ledger, LedgerEntry, LedgerError};
use crate::report::{Note, Reporter};
use crate::tenant::TenantContext;

/// Eligible migrations not yet in `ran`, in eligible order.
pub fn outstanding<'a>(eligible: &'a [MigrationFile], ran: &HashSet<String>) -> Vec<&'a MigrationFile> {
    eligible
        .iter()
        .filter(|m| !ran.contains(&m.logical_name))
        .collect()
}

pub struct Engine<'a, L, E, R: ?Sized> {
    ledger: &'a L,
    executor: &'a mut E,
    reporter: &'a R,
}

impl<'a, L, E, R: Reporter + ?Sized> Engine<'a, L, E, R> {
    pub fn new(ledger: &'a L, executor: &'a mut E, reporter: &'a R) -> Self {
        Self {
            ledger,
            executor,
            reporter,
        }
    }

    /// Run every outstanding eligible migration for the tenant.
    ///
    /// All applied units share one new batch number and are written to the
    /// ledger together once the last one succeeds. The whole batch runs
    /// between the ledger's `begin_batch` and `commit_batch`; if any unit
    /// fails the batch is abandoned and the ledger is left untouched. With
    /// `pretend`, nothing is written and the returned entries describe what
    /// would have been recorded.
    pub fn apply<C>(
        &mut self,
        ctx: &mut TenantContext<C>,
        eligible: &[MigrationFile],
        pretend: bool,
    ) -> Result<Vec<LedgerEntry>, MigrateError>
    where
        L: Ledger<C>,
        E: MigrationExecutor<C>,
    {
        let ran: HashSet<String> = self
            .ledger
            .ran(ctx)
            .map_err(|e| ledger_error(ctx, e))?
            .into_iter()
            .collect();

        let pending = outstanding(eligible, &ran);
        log::debug!(
            "Tenant '{}': {} ran, {} eligible, {} outstanding",
            ctx.source(),
            ran.len(),
            eligible.len(),
            pending.len()
        );

        if pending.is_empty() {
            self.reporter.note(&Note::NothingToMigrate {
                tenant: ctx.source().to_string(),
            });
            return Ok(Vec::new());
        }

        if !pretend {
            self.ledger
                .begin_batch(ctx)
                .map_err(|e| ledger_error(ctx, e))?;
        }

        let applied = self.apply_pending(ctx, &pending, pretend);
        if pretend {
            return applied;
        }
        match applied {
            Ok(entries) => {
                self.ledger
                    .commit_batch(ctx)
                    .map_err(|e| ledger_error(ctx, e))?;
                Ok(entries)
            }
            Err(err) => {
                self.abandon(ctx);
                Err(err)
            }
        }
    }

    fn apply_pending<C>(
        &mut self,
        ctx: &mut TenantContext<C>,
        pending: &[&MigrationFile],
        pretend: bool,
    ) -> Result<Vec<LedgerEntry>, MigrateError>
    where
        L: Ledger<C>,
        E: MigrationExecutor<C>,
    {
        let batch = self
            .ledger
            .next_batch_number(ctx)
            .map_err(|e| ledger_error(ctx, e))?;

        let mut entries = Vec::with_capacity(pending.len());
        for migration in pending {
            let statements = self
                .executor
                .run_up(ctx, migration, pretend)
                .map_err(|source| MigrateError::MigrationExecution {
                    tenant: ctx.source().to_string(),
                    migration: migration.id.clone(),
                    direction: Direction::Up,
                    source,
                })?;

            if pretend {
                self.note_pretend(ctx.source(), &migration.id, statements);
            } else {
                log::info!("Applied {} to '{}' (batch {})", migration.id, ctx.source(), batch);
                self.reporter.note(&Note::Migrated {
                    tenant: ctx.source().to_string(),
                    migration: migration.id.clone(),
                });
            }

            entries.push(LedgerEntry {
                tenant_source: ctx.source().to_string(),
                migration_name: migration.logical_name.clone(),
                batch,
            });
        }

        if !pretend {
            self.ledger
                .record_batch(ctx, &entries)
                .map_err(|e| ledger_error(ctx, e))?;
        }

        Ok(entries)
    }

    /// Revert the tenant's most recent batch, newest entry first.
    ///
    /// Returns the number of entries reverted (or that would be, with
    /// `pretend`). An empty ledger is reported and yields 0.
    pub fn revert_last<C>(
        &mut self,
        ctx: &mut TenantContext<C>,
        pretend: bool,
    ) -> Result<usize, MigrateError>
    where
        L: Ledger<C>,
        E: MigrationExecutor<C>,
    {
        let entries = self
            .ledger
            .last_batch(ctx)
            .map_err(|e| ledger_error(ctx, e))?;

        if entries.is_empty() {
            self.reporter.note(&Note::NothingToRollback {
                tenant: ctx.source().to_string(),
            });
            return Ok(0);
        }

        for entry in &entries {
            self.reporter.note(&Note::RollingBack {
                tenant: ctx.source().to_string(),
                migration: entry.migration_name.clone(),
            });

            if pretend {
                let statements = self.revert_one(ctx, entry, true)?;
                self.note_pretend(ctx.source(), &entry.migration_name, statements);
                continue;
            }

            self.ledger
                .begin_batch(ctx)
                .map_err(|e| ledger_error(ctx, e))?;
            if let Err(err) = self.revert_one(ctx, entry, false) {
                self.abandon(ctx);
                return Err(err);
            }
            self.ledger
                .commit_batch(ctx)
                .map_err(|e| ledger_error(ctx, e))?;
            log::info!(
                "Reverted {} on '{}' (batch {})",
                entry.migration_name,
                ctx.source(),
                entry.batch
            );
        }

        Ok(entries.len())
    }

    /// Run one entry's down step and, unless pretending, drop it from the ledger.
    fn revert_one<C>(
        &mut self,
        ctx: &mut TenantContext<C>,
        entry: &LedgerEntry,
        pretend: bool,
    ) -> Result<Vec<String>, MigrateError>
    where
        L: Ledger<C>,
        E: MigrationExecutor<C>,
    {
        let statements = self
            .executor
            .run_down(ctx, &entry.migration_name, pretend)
            .map_err(|source| MigrateError::MigrationExecution {
                tenant: ctx.source().to_string(),
                migration: entry.migration_name.clone(),
                direction: Direction::Down,
                source,
            })?;

        if !pretend {
            self.ledger
                .delete(ctx, entry)
                .map_err(|e| ledger_error(ctx, e))?;
        }
        Ok(statements)
    }

    /// The original failure is what gets reported, so a failed abandon is only logged.
    fn abandon<C>(&self, ctx: &mut TenantContext<C>)
    where
        L: Ledger<C>,
    {
        if let Err(e) = self.ledger.abandon_batch(ctx) {
            log::error!("Could not discard partial batch on '{}': {}", ctx.source(), e);
        }
    }

    fn note_pretend(&self, tenant: &str, migration: &str, statements: Vec<String>) {
        for statement in statements {
            self.reporter.note(&Note::Pretend {
                tenant: tenant.to_string(),
                migration: migration.to_string(),
                statement,
            });
        }
    }
}

fn ledger_error<C>(ctx: &TenantContext<C>, source: LedgerError) -> MigrateError {
    MigrateError::Ledger {
        tenant: ctx.source().to_string(),
        source,
    }
}
