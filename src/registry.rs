//! Script registry
//!
//! Owns the in-memory catalog. Entries are loaded wholesale from the
//! [`CatalogStore`], searched by keyword with recency ordering, and the only
//! mutation is recording a run timestamp, which is persisted immediately.

use crate::catalog::{CatalogStore, ScriptEntry};
use crate::error::{LoadError, PersistError};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{Span, debug, error, info};

/// Searchable catalog of scripts
#[derive(Debug)]
pub struct Registry {
    store: CatalogStore,
    /// Catalog in load order. The lock also covers persistence in `record_run`.
    entries: Mutex<Vec<ScriptEntry>>,
    span: Span,
}

impl Registry {
    /// Create an empty registry backed by `store`.
    ///
    /// Events are emitted under `span`.
    pub fn new(store: CatalogStore, span: Span) -> Self {
        Self {
            store,
            entries: Mutex::new(Vec::new()),
            span,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ScriptEntry>> {
        // Entries stay consistent even if a holder panicked mid-persist
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog_path(&self) -> &Path {
        self.store.path()
    }

    /// Load the catalog from storage, replacing the current entries.
    ///
    /// On error the current entries are left untouched.
    pub fn load(&self) -> Result<(), LoadError> {
        debug!(parent: &self.span, path = %self.store.path().display(), "Loading scripts");

        let loaded = self.store.read().inspect_err(|e| {
            error!(parent: &self.span, error = %e, "Failed to load scripts");
        })?;

        let count = loaded.len();
        *self.entries() = loaded;
        info!(parent: &self.span, count, "Scripts loaded");
        Ok(())
    }

    /// Find scripts whose name or keywords contain `keyword`, ignoring case.
    ///
    /// An empty keyword matches everything. Results are ordered by
    /// [`recency_order`], so the first result is the suggested default.
    pub fn search(&self, keyword: &str) -> Vec<ScriptEntry> {
        debug!(parent: &self.span, keyword, "Searching scripts");

        let mut results: Vec<ScriptEntry> = {
            let entries = self.entries();
            if keyword.is_empty() {
                entries.clone()
            } else {
                let needle = keyword.to_lowercase();
                entries.iter().filter(|e| e.matches(&needle)).cloned().collect()
            }
        };

        results.sort_by(recency_order);
        results
    }

    /// The whole catalog in load order
    pub fn get_scripts(&self) -> Vec<ScriptEntry> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Set the last-run time of the first entry named `name` and persist the
    /// catalog.
    ///
    /// The in-memory update stands even when the write fails, so the current
    /// session keeps the new ordering.
    pub fn record_run(&self, name: &str, when: DateTime<Utc>) -> Result<(), PersistError> {
        let mut entries = self.entries();

        let Some(entry) = entries.iter_mut().find(|e| e.name == name) else {
            return Err(PersistError::UnknownEntry(name.to_string()));
        };
        entry.last_run_time = Some(when);

        self.store.write(&entries).inspect_err(|e| {
            error!(parent: &self.span, script = name, error = %e, "Failed to save scripts");
        })?;

        debug!(parent: &self.span, script = name, when = %when, "Recorded script run");
        Ok(())
    }
}

/// Ordering used by search results.
///
/// Entries that have run come first, most recent first. Never-run entries
/// follow in ascending name order; name also breaks timestamp ties.
pub fn recency_order(a: &ScriptEntry, b: &ScriptEntry) -> Ordering {
    match (a.last_run_time, b.last_run_time) {
        (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}
