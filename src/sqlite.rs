//! SQLite tenant backend
//!
//! Each tenant is one SQLite database file, `<data_dir>/<name>.db`. The
//! tenant's ledger lives in a table inside that same database, and migration
//! scripts are plain SQL files split into `up` and `down` sections:
//!
//! ```sql
//! -- migrate:up
//! CREATE TABLE widgets (id INTEGER PRIMARY KEY);
//!
//! -- migrate:down
//! DROP TABLE widgets;
//! ```
//!
//! A script without section markers is treated as `up` only.
//!
//! A tenant's batch runs inside one transaction opened by
//! [`SqliteLedger::begin_batch`]: the scripts and the ledger rows commit
//! together or not at all. Scripts must not issue their own `BEGIN`/`COMMIT`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};

use crate::discovery::MigrationFile;
use crate::executor::{ExecError, MigrationExecutor};
use crate::ledger::{Ledger, LedgerEntry, LedgerError};
use crate::tenant::{DirectoryError, SchemaCreator, Tenant, TenantContext, TenantDirectory};

const DATABASE_EXTENSION: &str = "db";
const UP_MARKER: &str = "-- migrate:up";
const DOWN_MARKER: &str = "-- migrate:down";

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Tenant names become file names, so they are restricted to a safe set.
pub fn is_valid_tenant_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Storage(Box::new(e))
    }
}

/// Tenant directory over a folder of SQLite databases.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    data_dir: PathBuf,
    names: Vec<String>,
}

impl SqliteDirectory {
    /// Tenants are discovered by scanning `data_dir` for `*.db` files.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            names: Vec::new(),
        }
    }

    /// Use an explicit tenant list, in this order, instead of scanning.
    pub fn with_tenants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.{DATABASE_EXTENSION}"))
    }

    fn scan(&self) -> Result<Vec<Tenant>, DirectoryError> {
        let unavailable = |e: std::io::Error| DirectoryError::Unavailable {
            message: format!("cannot read {}", self.data_dir.display()),
            source: Some(Box::new(e)),
        };

        let mut names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            let is_database = path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == DATABASE_EXTENSION)
                    .unwrap_or(false);
            if !is_database {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_tenant_name(stem) => names.push(stem.to_string()),
                _ => log::warn!(
                    "Skipping {}: not a valid tenant name",
                    path.display()
                ),
            }
        }

        names.sort();
        Ok(names.into_iter().map(Tenant::new).collect())
    }
}

impl TenantDirectory for SqliteDirectory {
    type Connection = Connection;

    fn tenants(&self) -> Result<Vec<Tenant>, DirectoryError> {
        if !self.data_dir.is_dir() {
            return Err(DirectoryError::Unavailable {
                message: format!("{} is not a directory", self.data_dir.display()),
                source: None,
            });
        }
        if self.names.is_empty() {
            return self.scan();
        }
        Ok(self.names.iter().map(Tenant::new).collect())
    }

    fn bootstrap(&self, tenant: &Tenant) -> Result<Connection, DirectoryError> {
        if !is_valid_tenant_name(&tenant.name) {
            return Err(DirectoryError::InvalidName(tenant.name.clone()));
        }
        let path = self.database_path(&tenant.name);
        if !path.is_file() {
            return Err(DirectoryError::UnknownTenant(tenant.name.clone()));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            DirectoryError::Connection {
                tenant: tenant.name.clone(),
                source: Box::new(e),
            }
        })?;
        log::debug!("Opened {} for tenant '{}'", path.display(), tenant.name);
        Ok(conn)
    }
}

impl SchemaCreator for SqliteDirectory {
    fn create_schema(&self, name: &str) -> Result<bool, DirectoryError> {
        if !is_valid_tenant_name(name) {
            return Err(DirectoryError::InvalidName(name.to_string()));
        }
        let path = self.database_path(name);
        if path.exists() {
            return Ok(false);
        }

        std::fs::create_dir_all(&self.data_dir).map_err(|e| DirectoryError::Unavailable {
            message: format!("cannot create {}", self.data_dir.display()),
            source: Some(Box::new(e)),
        })?;
        // Opening with the default flags creates the file.
        Connection::open(&path).map_err(|e| DirectoryError::Connection {
            tenant: name.to_string(),
            source: Box::new(e),
        })?;
        log::info!("Created tenant database {}", path.display());
        Ok(true)
    }

    fn drop_schema(&self, name: &str) -> Result<bool, DirectoryError> {
        if !is_valid_tenant_name(name) {
            return Err(DirectoryError::InvalidName(name.to_string()));
        }
        let path = self.database_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Dropped tenant database {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DirectoryError::Connection {
                tenant: name.to_string(),
                source: Box::new(e),
            }),
        }
    }
}

/// Ledger stored in a table of each tenant's own database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    table: String,
}

impl SqliteLedger {
    pub fn new(table: impl Into<String>) -> Result<Self, LedgerError> {
        let table = table.into();
        if !is_sql_identifier(&table) {
            return Err(LedgerError::InvalidTable(table));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn exists(&self, conn: &Connection) -> Result<bool, LedgerError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![self.table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 migration TEXT    NOT NULL,
                 batch     INTEGER NOT NULL
             )",
            self.table
        )
    }
}

impl Default for SqliteLedger {
    fn default() -> Self {
        Self {
            table: "migrations".to_string(),
        }
    }
}

impl Ledger<Connection> for SqliteLedger {
    fn ran(&self, ctx: &mut TenantContext<Connection>) -> Result<Vec<String>, LedgerError> {
        if !self.exists(&ctx.connection)? {
            return Ok(Vec::new());
        }
        let mut stmt = ctx.connection.prepare(&format!(
            "SELECT migration FROM \"{}\" ORDER BY batch, id",
            self.table
        ))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn last_batch(
        &self,
        ctx: &mut TenantContext<Connection>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        if !self.exists(&ctx.connection)? {
            return Ok(Vec::new());
        }
        let source = ctx.source().to_string();
        let mut stmt = ctx.connection.prepare(&format!(
            "SELECT migration, batch FROM \"{table}\"
             WHERE batch = (SELECT MAX(batch) FROM \"{table}\")
             ORDER BY id DESC",
            table = self.table
        ))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LedgerEntry {
                    tenant_source: source.clone(),
                    migration_name: row.get(0)?,
                    batch: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn next_batch_number(&self, ctx: &mut TenantContext<Connection>) -> Result<u32, LedgerError> {
        if !self.exists(&ctx.connection)? {
            return Ok(1);
        }
        let last: u32 = ctx.connection.query_row(
            &format!("SELECT COALESCE(MAX(batch), 0) FROM \"{}\"", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(last + 1)
    }

    fn record_batch(
        &self,
        ctx: &mut TenantContext<Connection>,
        entries: &[LedgerEntry],
    ) -> Result<(), LedgerError> {
        let sp = ctx.connection.savepoint()?;
        sp.execute_batch(&self.create_table_sql())?;
        {
            let mut insert = sp.prepare(&format!(
                "INSERT INTO \"{}\" (migration, batch) VALUES (?1, ?2)",
                self.table
            ))?;
            for entry in entries {
                insert.execute(params![entry.migration_name, entry.batch])?;
            }
        }
        sp.commit()?;
        Ok(())
    }

    fn delete(
        &self,
        ctx: &mut TenantContext<Connection>,
        entry: &LedgerEntry,
    ) -> Result<(), LedgerError> {
        let missing = || LedgerError::MissingEntry {
            tenant: ctx.source().to_string(),
            migration: entry.migration_name.clone(),
        };
        if !self.exists(&ctx.connection)? {
            return Err(missing());
        }
        let deleted = ctx.connection.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE migration = ?1 AND batch = ?2",
                self.table
            ),
            params![entry.migration_name, entry.batch],
        )?;
        if deleted == 0 {
            return Err(missing());
        }
        Ok(())
    }

    fn begin_batch(&self, ctx: &mut TenantContext<Connection>) -> Result<(), LedgerError> {
        ctx.connection.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_batch(&self, ctx: &mut TenantContext<Connection>) -> Result<(), LedgerError> {
        ctx.connection.execute_batch("COMMIT")?;
        Ok(())
    }

    fn abandon_batch(&self, ctx: &mut TenantContext<Connection>) -> Result<(), LedgerError> {
        // A failed COMMIT or a constraint error may already have ended it.
        if !ctx.connection.is_autocommit() {
            ctx.connection.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Up and down SQL of one migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub up: String,
    pub down: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Split a migration file into its up and down sections.
pub fn parse_script(source: &str) -> MigrationScript {
    let is_marker = |line: &str, marker: &str| line.trim().eq_ignore_ascii_case(marker);
    let has_markers = source
        .lines()
        .any(|l| is_marker(l, UP_MARKER) || is_marker(l, DOWN_MARKER));

    if !has_markers {
        return MigrationScript {
            up: source.trim().to_string(),
            down: None,
        };
    }

    let mut section = Section::Preamble;
    let mut up = String::new();
    let mut down: Option<String> = None;

    for line in source.lines() {
        if is_marker(line, UP_MARKER) {
            section = Section::Up;
            continue;
        }
        if is_marker(line, DOWN_MARKER) {
            section = Section::Down;
            down.get_or_insert_with(String::new);
            continue;
        }
        let buf = match section {
            Section::Preamble => continue,
            Section::Up => &mut up,
            Section::Down => down.get_or_insert_with(String::new),
        };
        buf.push_str(line);
        buf.push('\n');
    }

    MigrationScript {
        up: up.trim().to_string(),
        down: down
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    }
}

/// Runs SQL migration scripts against a tenant's SQLite connection.
///
/// Each unit executes in a savepoint, nested in the batch transaction when
/// one is open. Every [`load`](MigrationExecutor::load) re-reads the files
/// it is given, so a long-lived executor picks up edited scripts.
#[derive(Debug, Default)]
pub struct SqlExecutor {
    scripts: HashMap<String, MigrationScript>,
}

impl SqlExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, logical_name: &str) -> Option<&MigrationScript> {
        self.scripts.get(logical_name)
    }

    fn execute(
        conn: &mut Connection,
        logical_name: &str,
        sql: &str,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        if sql.is_empty() {
            return Ok(Vec::new());
        }
        if !pretend {
            let failed = |e: rusqlite::Error| ExecError::Failed {
                migration: logical_name.to_string(),
                source: Box::new(e),
            };
            let sp = conn.savepoint().map_err(failed)?;
            sp.execute_batch(sql).map_err(failed)?;
            sp.commit().map_err(failed)?;
        }
        Ok(vec![sql.to_string()])
    }
}

impl MigrationExecutor<Connection> for SqlExecutor {
    fn load(&mut self, migrations: &[MigrationFile]) -> Result<(), ExecError> {
        for migration in migrations {
            let source =
                std::fs::read_to_string(&migration.path).map_err(|e| ExecError::Io {
                    path: migration.path.clone(),
                    source: e,
                })?;
            self.scripts
                .insert(migration.logical_name.clone(), parse_script(&source));
        }
        Ok(())
    }

    fn run_up(
        &mut self,
        ctx: &mut TenantContext<Connection>,
        migration: &MigrationFile,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        let script = self
            .scripts
            .get(&migration.logical_name)
            .ok_or_else(|| ExecError::NotLoaded(migration.logical_name.clone()))?;
        Self::execute(&mut ctx.connection, &migration.logical_name, &script.up, pretend)
    }

    fn run_down(
        &mut self,
        ctx: &mut TenantContext<Connection>,
        logical_name: &str,
        pretend: bool,
    ) -> Result<Vec<String>, ExecError> {
        let script = self
            .scripts
            .get(logical_name)
            .ok_or_else(|| ExecError::NotLoaded(logical_name.to_string()))?;
        let down = script
            .down
            .as_deref()
            .ok_or_else(|| ExecError::Irreversible(logical_name.to_string()))?;
        Self::execute(&mut ctx.connection, logical_name, down, pretend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_sections() {
        let script = parse_script(
            "-- widgets\n-- migrate:up\nCREATE TABLE widgets (id INTEGER);\n\n-- migrate:down\nDROP TABLE widgets;\n",
        );
        assert_eq!(script.up, "CREATE TABLE widgets (id INTEGER);");
        assert_eq!(script.down.as_deref(), Some("DROP TABLE widgets;"));
    }

    #[test]
    fn test_parse_script_without_markers_is_up_only() {
        let script = parse_script("CREATE TABLE widgets (id INTEGER);\n");
        assert_eq!(script.up, "CREATE TABLE widgets (id INTEGER);");
        assert_eq!(script.down, None);
    }

    #[test]
    fn test_parse_script_empty_down_is_irreversible() {
        let script = parse_script("-- migrate:up\nSELECT 1;\n-- migrate:down\n\n");
        assert_eq!(script.down, None);
    }

    #[test]
    fn test_parse_script_markers_are_case_insensitive() {
        let script = parse_script("  -- MIGRATE:UP\nSELECT 1;\n-- Migrate:Down\nSELECT 2;");
        assert_eq!(script.up, "SELECT 1;");
        assert_eq!(script.down.as_deref(), Some("SELECT 2;"));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_sql_identifier("migrations"));
        assert!(is_sql_identifier("_tenant_migrations2"));
        assert!(!is_sql_identifier("2migrations"));
        assert!(!is_sql_identifier("migrations; DROP TABLE x"));
        assert!(!is_sql_identifier(""));
    }

    #[test]
    fn test_tenant_name_validation() {
        assert!(is_valid_tenant_name("acme"));
        assert!(is_valid_tenant_name("tenant-042_eu"));
        assert!(!is_valid_tenant_name(""));
        assert!(!is_valid_tenant_name("../etc"));
        assert!(!is_valid_tenant_name("a/b"));
    }

    #[test]
    fn test_ledger_rejects_bad_table() {
        assert!(matches!(
            SqliteLedger::new("bad name"),
            Err(LedgerError::InvalidTable(_))
        ));
    }

    fn memory_ctx() -> TenantContext<Connection> {
        TenantContext::new(
            Tenant::new("acme"),
            Connection::open_in_memory().expect("open"),
        )
    }

    fn entry(name: &str, batch: u32) -> LedgerEntry {
        LedgerEntry {
            tenant_source: "acme".to_string(),
            migration_name: name.to_string(),
            batch,
        }
    }

    #[test]
    fn test_ledger_roundtrip_on_fresh_database() {
        let ledger = SqliteLedger::default();
        let mut ctx = memory_ctx();

        assert!(ledger.ran(&mut ctx).expect("ran").is_empty());
        assert!(ledger.last_batch(&mut ctx).expect("last").is_empty());
        assert_eq!(ledger.next_batch_number(&mut ctx).expect("next"), 1);

        ledger
            .record_batch(&mut ctx, &[entry("a", 1), entry("b", 1)])
            .expect("record");
        ledger.record_batch(&mut ctx, &[entry("c", 2)]).expect("record");

        assert_eq!(ledger.ran(&mut ctx).expect("ran"), vec!["a", "b", "c"]);
        assert_eq!(ledger.next_batch_number(&mut ctx).expect("next"), 3);
        assert_eq!(ledger.last_batch(&mut ctx).expect("last"), vec![entry("c", 2)]);

        ledger.delete(&mut ctx, &entry("c", 2)).expect("delete");
        let last: Vec<String> = ledger
            .last_batch(&mut ctx)
            .expect("last")
            .into_iter()
            .map(|e| e.migration_name)
            .collect();
        assert_eq!(last, vec!["b", "a"]);
    }

    #[test]
    fn test_ledger_delete_missing() {
        let ledger = SqliteLedger::default();
        let mut ctx = memory_ctx();
        assert!(matches!(
            ledger.delete(&mut ctx, &entry("a", 1)),
            Err(LedgerError::MissingEntry { .. })
        ));
    }

    #[test]
    fn test_executor_pretend_does_not_touch_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("2020_01_01_create_widgets_table.sql");
        std::fs::write(
            &path,
            "-- migrate:up\nCREATE TABLE widgets (id INTEGER);\n-- migrate:down\nDROP TABLE widgets;\n",
        )
        .expect("write");
        let migration = MigrationFile::from_path(&path);

        let mut executor = SqlExecutor::new();
        executor.load(&[migration.clone()]).expect("load");
        let mut ctx = memory_ctx();

        let statements = executor.run_up(&mut ctx, &migration, true).expect("pretend");
        assert_eq!(statements, vec!["CREATE TABLE widgets (id INTEGER);"]);
        let tables: i64 = ctx
            .connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'widgets'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(tables, 0);

        executor.run_up(&mut ctx, &migration, false).expect("up");
        executor
            .run_down(&mut ctx, "create_widgets_table", false)
            .expect("down");
    }

    #[test]
    fn test_executor_reload_picks_up_edited_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("2020_01_01_seed.sql");
        std::fs::write(&path, "SELECT 1;").expect("write");
        let migration = MigrationFile::from_path(&path);

        let mut executor = SqlExecutor::new();
        executor.load(&[migration.clone()]).expect("load");
        assert_eq!(executor.script("seed").map(|s| s.up.as_str()), Some("SELECT 1;"));

        std::fs::write(&path, "-- migrate:up\nSELECT 2;\n-- migrate:down\nSELECT 3;\n")
            .expect("rewrite");
        executor.load(&[migration]).expect("reload");
        let script = executor.script("seed").expect("loaded");
        assert_eq!(script.up, "SELECT 2;");
        assert_eq!(script.down.as_deref(), Some("SELECT 3;"));
    }

    #[test]
    fn test_executor_irreversible_and_not_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("2020_01_01_seed.sql");
        std::fs::write(&path, "SELECT 1;").expect("write");
        let migration = MigrationFile::from_path(&path);

        let mut executor = SqlExecutor::new();
        let mut ctx = memory_ctx();
        assert!(matches!(
            executor.run_up(&mut ctx, &migration, false),
            Err(ExecError::NotLoaded(_))
        ));

        executor.load(&[migration]).expect("load");
        assert!(matches!(
            executor.run_down(&mut ctx, "seed", false),
            Err(ExecError::Irreversible(_))
        ));
    }

    #[test]
    fn test_directory_scan_and_schema_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let directory = SqliteDirectory::new(dir.path());

        assert!(directory.create_schema("globex").expect("create"));
        assert!(directory.create_schema("acme").expect("create"));
        assert!(!directory.create_schema("acme").expect("create again"));
        std::fs::write(dir.path().join("notes.txt"), "").expect("write");

        let names: Vec<String> = directory
            .tenants()
            .expect("tenants")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["acme", "globex"]);

        directory.bootstrap(&Tenant::new("acme")).expect("bootstrap");
        assert!(directory.drop_schema("acme").expect("drop"));
        assert!(!directory.drop_schema("acme").expect("drop again"));
        assert!(matches!(
            directory.bootstrap(&Tenant::new("acme")),
            Err(DirectoryError::UnknownTenant(_))
        ));
    }

    #[test]
    fn test_directory_scan_skips_invalid_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let directory = SqliteDirectory::new(dir.path());
        directory.create_schema("acme").expect("create");
        directory.create_schema("zeta").expect("create");
        std::fs::write(dir.path().join("backup copy.db"), "").expect("write");
        std::fs::write(dir.path().join(".old.db"), "").expect("write");

        let names: Vec<String> = directory
            .tenants()
            .expect("tenants")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["acme", "zeta"]);
    }

    #[test]
    fn test_directory_missing_data_dir_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let directory = SqliteDirectory::new(dir.path().join("missing"));
        assert!(matches!(
            directory.tenants(),
            Err(DirectoryError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_explicit_tenant_order_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let directory = SqliteDirectory::new(dir.path()).with_tenants(["zeta", "alpha"]);
        let names: Vec<String> = directory
            .tenants()
            .expect("tenants")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
