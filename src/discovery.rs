//! Migration file discovery
//!
//! Lists the migration units available at a path, in the order they should
//! be applied. Discovery only locates files; reading their up/down logic is
//! the executor's job.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::resolver::resolve_migration_name;

/// One migration unit as found in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MigrationFile {
    /// File name as discovered, e.g. `2020_01_01_create_widgets_table.sql`.
    pub id: String,

    /// Storage location of the definition.
    pub path: PathBuf,

    /// Canonical name used for policy matching and as the ledger key.
    pub logical_name: String,
}

impl MigrationFile {
    /// Build from a storage path. The id is the final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let logical_name = resolve_migration_name(&id);
        Self {
            id,
            path,
            logical_name,
        }
    }

    /// Build from a bare identifier that doubles as its own path.
    pub fn from_identifier(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            path: PathBuf::from(&id),
            logical_name: resolve_migration_name(&id),
            id,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migrations {first} and {second} both resolve to '{name}'")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },
}

/// Lists migration files available at a path.
pub trait MigrationDiscovery {
    /// Return the migration files at `path` in application order.
    fn list_migration_files(&self, path: &Path) -> Result<Vec<MigrationFile>, LoadError>;
}

/// Discovers migration files in a directory on the local filesystem.
///
/// Files are matched by extension (case-insensitive) and sorted
/// lexicographically by file name, which orders them by their timestamp
/// prefix. Subdirectories are not searched.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    extensions: Vec<String>,
}

impl FsDiscovery {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    fn has_migration_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| ext.eq_ignore_ascii_case(wanted.as_str()))
            })
            .unwrap_or(false)
    }
}

impl Default for FsDiscovery {
    fn default() -> Self {
        Self::new(["sql"])
    }
}

impl MigrationDiscovery for FsDiscovery {
    fn list_migration_files(&self, path: &Path) -> Result<Vec<MigrationFile>, LoadError> {
        let mut files: Vec<PathBuf> = Vec::new();

        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

            for entry in entries {
                let entry = entry.map_err(|e| LoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                let candidate = entry.path();
                if candidate.is_file() && self.has_migration_extension(&candidate) {
                    files.push(candidate);
                }
            }
        } else if path.is_file() {
            if self.has_migration_extension(path) {
                files.push(path.to_path_buf());
            }
        } else {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Path does not exist: {}", path.display()),
                ),
            });
        }

        files.sort_by(|a, b| {
            let a_name = a.file_name().unwrap_or_default();
            let b_name = b.file_name().unwrap_or_default();
            a_name.cmp(b_name)
        });

        let migrations: Vec<MigrationFile> =
            files.into_iter().map(MigrationFile::from_path).collect();
        check_unique_names(&migrations)?;

        log::debug!(
            "Discovered {} migration file(s) in {}",
            migrations.len(),
            path.display()
        );
        Ok(migrations)
    }
}

/// Two files sharing a logical name would share a ledger key.
fn check_unique_names(migrations: &[MigrationFile]) -> Result<(), LoadError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for m in migrations {
        if let Some(first) = seen.insert(&m.logical_name, &m.id) {
            return Err(LoadError::DuplicateName {
                name: m.logical_name.clone(),
                first: first.to_string(),
                second: m.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_path_uses_file_name_as_id() {
        let m = MigrationFile::from_path("db/migrations/2020_01_01_create_widgets_table.sql");
        assert_eq!(m.id, "2020_01_01_create_widgets_table.sql");
        assert_eq!(m.logical_name, "create_widgets_table");
        assert_eq!(
            m.path,
            PathBuf::from("db/migrations/2020_01_01_create_widgets_table.sql")
        );
    }

    #[test]
    fn test_lists_sorted_by_file_name() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in [
            "2020_01_03_c.sql",
            "2020_01_01_a.sql",
            "2020_01_02_b.SQL",
            "notes.md",
        ] {
            fs::write(dir.path().join(name), "").expect("write");
        }
        fs::create_dir(dir.path().join("nested.sql")).expect("mkdir");

        let found = FsDiscovery::default()
            .list_migration_files(dir.path())
            .expect("list");
        let ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["2020_01_01_a.sql", "2020_01_02_b.SQL", "2020_01_03_c.sql"]
        );
    }

    #[test]
    fn test_custom_extensions() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("2020_01_01_a.php"), "").expect("write");
        fs::write(dir.path().join("2020_01_02_b.sql"), "").expect("write");

        let found = FsDiscovery::new(["php"])
            .list_migration_files(dir.path())
            .expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].logical_name, "a");
    }

    #[test]
    fn test_single_file_path() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("2020_01_01_a.sql");
        fs::write(&file, "").expect("write");

        let found = FsDiscovery::default()
            .list_migration_files(&file)
            .expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, file);
    }

    #[test]
    fn test_missing_path_is_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = FsDiscovery::default()
            .list_migration_files(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_duplicate_logical_names_rejected() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("2020_01_01_create_users.sql"), "").expect("write");
        fs::write(dir.path().join("2021_01_01_create_users.sql"), "").expect("write");

        let err = FsDiscovery::default()
            .list_migration_files(dir.path())
            .unwrap_err();
        match err {
            LoadError::DuplicateName { name, first, second } => {
                assert_eq!(name, "create_users");
                assert_eq!(first, "2020_01_01_create_users.sql");
                assert_eq!(second, "2021_01_01_create_users.sql");
            }
            other => panic!("expected DuplicateName, got {other:?}"),
        }
    }
}
