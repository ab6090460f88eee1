//! Human-readable progress output
//!
//! One line per note, in the order the migrator emits them:
//! ```text
//! Queued: 2020_01_01_create_widgets_table.sql
//! Bootstrapped connection for: acme
//! Running migrations on: acme
//! Migrated: 2020_01_01_create_widgets_table.sql
//! ```

use std::io::Write;
use std::sync::Mutex;

use crate::report::{Note, Reporter};

/// Writes notes as plain text lines.
pub struct TextReporter<W: Write = std::io::Stdout> {
    out: Mutex<W>,
}

impl TextReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn note(&self, note: &Note) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Progress output is best effort; a closed pipe must not abort a migration.
        let _ = writeln!(out, "{note}");
        let _ = out.flush();
    }
}
