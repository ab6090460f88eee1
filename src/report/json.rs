//! JSON Lines progress output
//!
//! Each note is written as one JSON object on its own line, tagged with its
//! `kind`, for consumption by log shippers and scripts.

use std::io::Write;
use std::sync::Mutex;

use crate::report::{Note, Reporter};

pub struct JsonReporter<W: Write = std::io::Stdout> {
    out: Mutex<W>,
}

impl JsonReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn note(&self, note: &Note) {
        let line = match serde_json::to_string(note) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Cannot serialize progress note {}: {}", note.kind(), e);
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}
