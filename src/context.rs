//! Shared execution context
//!
//! One `Context` lives for the whole process and is handed to every
//! operator as an explicit `Arc` rather than ambient global state, so
//! tests can build isolated contexts per scenario. Host facts are
//! write-once at construction; the modified-file set grows as template
//! steps rewrite files and is consulted by service steps deciding whether
//! a restart is warranted.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::facts::Facts;

/// Process-wide state shared by all drivers and operators.
#[derive(Debug, Default)]
pub struct Context {
    pub facts: Facts,
    modified_files: Mutex<Vec<PathBuf>>,
}

impl Context {
    pub fn new(facts: Facts) -> Self {
        Self {
            facts,
            modified_files: Mutex::new(Vec::new()),
        }
    }

    /// Record that a rendered file's content actually changed this run.
    ///
    /// Duplicates are possible and harmless; the readers only ask whether
    /// a path appears at all.
    pub fn note_modified(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::debug!("noting modified file: {}", path.display());
        self.modified_files.lock().unwrap().push(path);
    }

    /// Whether exactly this path changed during this run.
    pub fn was_modified(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.modified_files.lock().unwrap().iter().any(|p| p == path)
    }

    /// Whether any changed path contains the given fragment.
    pub fn any_modified_containing(&self, fragment: &str) -> bool {
        self.modified_files
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.to_string_lossy().contains(fragment))
    }
}
