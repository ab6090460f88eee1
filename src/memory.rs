//! In-memory collaborators
//!
//! A tenant directory, ledger, executor, discovery source and reporter that
//! keep everything in process memory. Used for dry runs and tests; each one
//! records what was asked of it so callers can inspect the interaction.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::discovery::{LoadError, MigrationDiscovery, MigrationFile};
use crate::executor::{Direction, ExecError, MigrationExecutor};
use crate::ledger::{Ledger, LedgerEntry, LedgerError};
use crate::report::{Note, Reporter};
use crate::tenant::{DirectoryError, SchemaCreator, Tenant, TenantContext, TenantDirectory};

/// Connection handle for an in-memory tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConnection {
    pub tenant: String,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    tenants: RefCell<Vec<Tenant>>,
    unavailable: bool,
    unreachable: HashSet<String>,
    bootstrapped: RefCell<Vec<String>>,
}

impl MemoryDirectory {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tenants: RefCell::new(names.into_iter().map(Tenant::new).collect()),
            ..Self::default()
        }
    }

    /// Make [`TenantDirectory::tenants`] fail.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Make bootstrapping the named tenant fail.
    pub fn with_unreachable(mut self, name: impl Into<String>) -> Self {
        self.unreachable.insert(name.into());
        self
    }

    /// Tenant names in the order their connections were opened.
    pub fn bootstrapped(&self) -> Vec<String> {
        self.bootstrapped.borrow().clone()
    }
}

impl TenantDirectory for MemoryDirectory {
    type Connection = MemoryConnection;

    fn tenants(&self) -> Result<Vec<Tenant>, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable {
                message: "in-memory directory marked unavailable".to_string(),
                source: None,
            });
        }
        Ok(self.tenants.borrow().clone())
    }

    fn bootstrap(&self, tenant: &Tenant) -> Result<MemoryConnection, DirectoryError> {
        if !self.tenants.borrow().contains(tenant) {
            return Err(DirectoryError::UnknownTenant(tenant.name.clone()));
        }
        if self.unreachable.contains(&tenant.name) {
            return Err(DirectoryError::Connection {
                tenant: tenant.name.clone(),
                source: "connection refused".into(),
            });
        }
        self.bootstrapped.borrow_mut().push(tenant.name.clone());
        Ok(MemoryConnection {
            tenant: tenant.name.clone(),
        })
    }
}

impl SchemaCreator for MemoryDirectory {
    fn create_schema(&self, name: &str) -> Result<bool, DirectoryError> {
        let mut tenants = self.tenants.borrow_mut();
        if tenants.iter().any(|t| t.name == name) {
            return Ok(false);
        }
        tenants.push(Tenant::new(name));
        Ok(true)
    }

    fn drop_schema(&self, name: &str) -> Result<bool, DirectoryError> {
        let mut tenants = self.tenants.borrow_mut();
        let before = tenants.len();
        tenants.retain(|t| t.name != name);
        Ok(tenants.len() != before)
    }
}

/// Ledger holding every tenant's entries in application order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RefCell<BTreeMap<String, Vec<LedgerEntry>>>,
    open: RefCell<Option<BTreeMap<String, Vec<LedgerEntry>>>>,
    committed: Cell<usize>,
    abandoned: Cell<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a tenant's ledger.
    pub fn seed(&self, tenant: &str, entries: Vec<LedgerEntry>) {
        self.entries
            .borrow_mut()
            .entry(tenant.to_string())
            .or_default()
            .extend(entries);
    }

    pub fn entries_for(&self, tenant: &str) -> Vec<LedgerEntry> {
        self.entries
            .borrow()
            .get(tenant)
            .cloned()
            .unwrap_or_default()
    }

    pub fn ran_for(&self, tenant: &str) -> Vec<String> {
        self.entries_for(tenant)
            .into_iter()
            .map(|e| e.migration_name)
            .collect()
    }

    /// Number of batch scopes that were committed.
    pub fn committed(&self) -> usize {
        self.committed.get()
    }

    /// Number of batch scopes that were abandoned after a failure.
    pub fn abandoned(&self) -> usize {
        self.abandoned.get()
    }
}

impl<C> Ledger<C> for MemoryLedger {
    fn ran(&self, ctx: &mut TenantContext<C>) -> Result<Vec<String>, LedgerError> {
        Ok(self.ran_for(ctx.source()))
    }

    fn last_batch(&self, ctx: &mut TenantContext<C>) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.entries_for(ctx.source());
        let Some(last) = entries.iter().map(|e| e.batch).max() else {
            return Ok(Vec::new());
        };
        Ok(entries.into_iter().rev().filter(|e| e.batch == last).collect())
    }

    fn next_batch_number(&self, ctx: &mut TenantContext<C>) -> Result<u32, LedgerError> {
        let last = self
            .entries_for(ctx.source())
            .iter()
            .map(|e| e.batch)
            .max()
            .unwrap_or(0);
        Ok(last + 1)
    }

    fn record_batch(
        &self,
        ctx: &mut TenantContext<C>,
        entries: &[LedgerEntry],
    ) -> Result<(), LedgerError> {
        self.seed(ctx.source(), entries.to_vec());
        Ok(())
    }

    fn delete(&self, ctx: &mut TenantContext<C>, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut all = self.entries.borrow_mut();
        let tenant_entries = all.entry(ctx.source().to_string()).or_default();
        match tenant_entries.iter().rposition(|e| e == entry) {
            Some(idx) => {
                tenant_entries.remove(idx);
                Ok(())
            }
            None => Err(LedgerError::MissingEntry {
                tenant: ctx.source().to_string(),
                migration: entry.migration_name.clone(),
            }),
        }
    }

    fn begin_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        let snapshot = self.entries.borrow().clone();
        *self.open.borrow_mut() = Some(snapshot);
        Ok(())
    }

    fn commit_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        self.open.borrow_mut().take();
        self.committed.set(self.committed.get() + 1);
        Ok(())
    }

    fn abandon_batch(&self, _ctx: &mut TenantContext<C>) -> Result<(), LedgerError> {
        if let Some(snapshot) = self.open.borrow_mut().take() {
            *self.entries.borrow_mut() = snapshot;
        }
        self.abandoned.set(self.abandoned.get() + 1);
        Ok(())
    }
}

/// One call made to a [`MemoryExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub tenant: String,
    pub direction: Direction,
    pub migration: String,
    pub pretend: bool,
}

/// Executor that records calls instead of running anything.
///
/// `run_up` requires the migration to have been loaded first. Failures can
/// be injected per (tenant, logical name).
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    loaded: HashSet<String>,
    load_calls: usize,
    failures: HashSet<(String, String)>,
    executions: Vec<Execution>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given migration fail on the given tenant, in either direction.
    pub fn failing_on(mut self, tenant: impl Into<String>, logical_name: impl Into<String>) -> Self {
        self.failures.insert((tenant.into(), logical_name.into()));
        self
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls
    }

    pub fn is_loaded(&self, logical_name: &str) -> bool {
        self.loaded.contains(logical_name)
    }

    fn execute<C>(
        &mut self,
        ctx: &TenantContext<C>,
        direction: Direction,
        logical_name: &str,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        if self
            .failures
            .contains(&(ctx.source().to_string(), logical_name.to_string()))
        {
            return Err(ExecError::Failed {
                migration: logical_name.to_string(),
                source: format!("injected {direction} failure").into(),
            });
        }
        self.executions.push(Execution {
            tenant: ctx.source().to_string(),
            direction,
            migration: logical_name.to_string(),
            pretend,
        });
        Ok(vec![format!("{direction} {logical_name}")])
    }
}

impl<C> MigrationExecutor<C> for MemoryExecutor {
    fn load(&mut self, migrations: &[MigrationFile]) -> Result<(), ExecError> {
        self.load_calls += 1;
        self.loaded
            .extend(migrations.iter().map(|m| m.logical_name.clone()));
        Ok(())
    }

    fn run_up(
        &mut self,
        ctx: &mut TenantContext<C>,
        migration: &MigrationFile,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        if !self.loaded.contains(&migration.logical_name) {
            return Err(ExecError::NotLoaded(migration.logical_name.clone()));
        }
        self.execute(ctx, Direction::Up, &migration.logical_name, pretend)
    }

    fn run_down(
        &mut self,
        ctx: &mut TenantContext<C>,
        logical_name: &str,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        self.execute(ctx, Direction::Down, logical_name, pretend)
    }
}

/// Discovery backed by a fixed map of path to migration files.
#[derive(Debug, Default)]
pub struct MemoryDiscovery {
    sources: HashMap<PathBuf, Vec<MigrationFile>>,
    calls: Cell<usize>,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the identifiers available at `path`, in discovery order.
    pub fn with_source<I, S>(mut self, path: impl Into<PathBuf>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.into();
        let files = ids
            .into_iter()
            .map(|id| {
                let id: String = id.into();
                MigrationFile::from_path(path.join(id))
            })
            .collect();
        self.sources.insert(path, files);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MigrationDiscovery for MemoryDiscovery {
    fn list_migration_files(&self, path: &Path) -> Result<Vec<MigrationFile>, LoadError> {
        self.calls.set(self.calls.get() + 1);
        self.sources
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Path does not exist: {}", path.display()),
                ),
            })
    }
}

/// Reporter that keeps every note.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    notes: RefCell<Vec<Note>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.borrow().clone()
    }

    /// Rendered text of every note, one per element.
    pub fn lines(&self) -> Vec<String> {
        self.notes.borrow().iter().map(ToString::to_string).collect()
    }
}

impl Reporter for MemoryReporter {
    fn note(&self, note: &Note) {
        self.notes.borrow_mut().push(note.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(tenant: &str) -> TenantContext<MemoryConnection> {
        TenantContext::new(
            Tenant::new(tenant),
            MemoryConnection {
                tenant: tenant.to_string(),
            },
        )
    }

    fn entry(tenant: &str, name: &str, batch: u32) -> LedgerEntry {
        LedgerEntry {
            tenant_source: tenant.to_string(),
            migration_name: name.to_string(),
            batch,
        }
    }

    #[test]
    fn test_ledger_last_batch_newest_first() {
        let ledger = MemoryLedger::new();
        ledger.seed(
            "acme",
            vec![entry("acme", "a", 1), entry("acme", "b", 2), entry("acme", "c", 2)],
        );
        let mut ctx = ctx("acme");

        let last = Ledger::last_batch(&ledger, &mut ctx).expect("last");
        let names: Vec<&str> = last.iter().map(|e| e.migration_name.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
        assert_eq!(Ledger::next_batch_number(&ledger, &mut ctx).expect("next"), 3);
    }

    #[test]
    fn test_ledger_is_scoped_per_tenant() {
        let ledger = MemoryLedger::new();
        ledger.seed("acme", vec![entry("acme", "a", 4)]);
        let mut globex = ctx("globex");

        assert!(Ledger::ran(&ledger, &mut globex).expect("ran").is_empty());
        assert!(Ledger::last_batch(&ledger, &mut globex).expect("last").is_empty());
        assert_eq!(Ledger::next_batch_number(&ledger, &mut globex).expect("next"), 1);
    }

    #[test]
    fn test_ledger_abandon_restores_entries() {
        let ledger = MemoryLedger::new();
        ledger.seed("acme", vec![entry("acme", "a", 1)]);
        let mut acme = ctx("acme");

        Ledger::begin_batch(&ledger, &mut acme).expect("begin");
        Ledger::record_batch(&ledger, &mut acme, &[entry("acme", "b", 2)]).expect("record");
        Ledger::abandon_batch(&ledger, &mut acme).expect("abandon");
        assert_eq!(ledger.ran_for("acme"), vec!["a"]);

        Ledger::begin_batch(&ledger, &mut acme).expect("begin");
        Ledger::record_batch(&ledger, &mut acme, &[entry("acme", "c", 2)]).expect("record");
        Ledger::commit_batch(&ledger, &mut acme).expect("commit");
        assert_eq!(ledger.ran_for("acme"), vec!["a", "c"]);
        assert_eq!((ledger.committed(), ledger.abandoned()), (1, 1));
    }

    #[test]
    fn test_ledger_delete_missing_entry() {
        let ledger = MemoryLedger::new();
        let mut acme = ctx("acme");
        let err = Ledger::delete(&ledger, &mut acme, &entry("acme", "a", 1)).unwrap_err();
        assert!(matches!(err, LedgerError::MissingEntry { .. }));
    }

    #[test]
    fn test_directory_bootstrap_order_and_failures() {
        let directory = MemoryDirectory::new(["acme", "globex"]).with_unreachable("globex");

        directory.bootstrap(&Tenant::new("acme")).expect("acme");
        assert!(matches!(
            directory.bootstrap(&Tenant::new("globex")),
            Err(DirectoryError::Connection { .. })
        ));
        assert!(matches!(
            directory.bootstrap(&Tenant::new("initech")),
            Err(DirectoryError::UnknownTenant(_))
        ));
        assert_eq!(directory.bootstrapped(), vec!["acme"]);
    }

    #[test]
    fn test_schema_creator() {
        let directory = MemoryDirectory::new(["acme"]);
        assert!(!directory.create_schema("acme").expect("create"));
        assert!(directory.create_schema("globex").expect("create"));
        assert!(directory.drop_schema("acme").expect("drop"));
        assert!(!directory.drop_schema("acme").expect("drop"));

        let names: Vec<String> = directory
            .tenants()
            .expect("tenants")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["globex"]);
    }

    #[test]
    fn test_executor_requires_load_for_up() {
        let mut executor = MemoryExecutor::new();
        let migration = MigrationFile::from_identifier("2020_01_01_a.sql");
        let mut acme = ctx("acme");

        let err = MigrationExecutor::run_up(&mut executor, &mut acme, &migration, false)
            .unwrap_err();
        assert!(matches!(err, ExecError::NotLoaded(_)));

        MigrationExecutor::<MemoryConnection>::load(&mut executor, &[migration.clone()])
            .expect("load");
        let statements = MigrationExecutor::run_up(&mut executor, &mut acme, &migration, true)
            .expect("up");
        assert_eq!(statements, vec!["up a"]);
        assert!(executor.executions()[0].pretend);
    }
}
