//! Progress reporting
//!
//! The migrator emits a [`Note`] at each visible step: queued migrations,
//! bootstrapped tenants, applied and reverted units, per-tenant outcomes.
//! Reporters are passive sinks. They cannot fail the run and never
//! influence control flow.

use serde::Serialize;
use strum_macros::IntoStaticStr;

use crate::executor::Direction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Note {
    /// Start of a forward run, before the queued list.
    Assembling,
    Queued { migration: String },
    /// Rollback was scoped to a migration path.
    RollbackPath { path: String },
    Bootstrapped { tenant: String },
    Running { tenant: String },
    Migrated { tenant: String, migration: String },
    /// A statement that would have run in pretend mode.
    Pretend {
        tenant: String,
        migration: String,
        statement: String,
    },
    NothingToMigrate { tenant: String },
    RollingBack { tenant: String, migration: String },
    NothingToRollback { tenant: String },
    TenantComplete {
        tenant: String,
        direction: Direction,
        count: usize,
    },
}

impl Note {
    /// Stable snake_case label, e.g. `nothing_to_rollback`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Tenant the note is about, if any.
    pub fn tenant(&self) -> Option<&str> {
        match self {
            Note::Assembling | Note::Queued { .. } | Note::RollbackPath { .. } => None,
            Note::Bootstrapped { tenant }
            | Note::Running { tenant }
            | Note::Migrated { tenant, .. }
            | Note::Pretend { tenant, .. }
            | Note::NothingToMigrate { tenant }
            | Note::RollingBack { tenant, .. }
            | Note::NothingToRollback { tenant }
            | Note::TenantComplete { tenant, .. } => Some(tenant),
        }
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Note::Assembling => f.write_str("Assembling tenant migrations list..."),
            Note::Queued { migration } => write!(f, "Queued: {migration}"),
            Note::RollbackPath { path } => {
                write!(f, "Rollback command initiated with path \"{path}\"")
            }
            Note::Bootstrapped { tenant } => write!(f, "Bootstrapped connection for: {tenant}"),
            Note::Running { tenant } => write!(f, "Running migrations on: {tenant}"),
            Note::Migrated { migration, .. } => write!(f, "Migrated: {migration}"),
            Note::Pretend {
                migration,
                statement,
                ..
            } => write!(f, "{migration}: {statement}"),
            Note::NothingToMigrate { tenant } => write!(f, "Nothing to migrate on \"{tenant}\"."),
            Note::RollingBack { migration, .. } => write!(f, "Rolling back \"{migration}\"."),
            Note::NothingToRollback { tenant } => {
                write!(f, "Nothing to rollback on \"{tenant}\".")
            }
            Note::TenantComplete {
                tenant,
                direction,
                count,
            } => {
                let verb = match direction {
                    Direction::Up => "applied",
                    Direction::Down => "rolled back",
                };
                write!(f, "Finished \"{tenant}\": {count} migration(s) {verb}.")
            }
        }
    }
}

/// Sink for progress notes. Best effort: implementations swallow their own
/// output errors.
pub trait Reporter {
    fn note(&self, note: &Note);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn note(&self, note: &Note) {
        (**self).note(note)
    }
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn note(&self, note: &Note) {
        (**self).note(note)
    }
}

/// Forwards notes to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn note(&self, note: &Note) {
        log::info!(target: "tenant_migrate::progress", "{}", note);
    }
}

pub mod json;
pub mod text;

pub use json::JsonReporter;
pub use text::TextReporter;
