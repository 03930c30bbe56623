//! Active-account resolution over a persisted selection.
//!
//! A session has one "current" account. The previously persisted choice wins
//! when it still names a live account; otherwise the first available account
//! becomes the selection and is persisted so the next resolution is stable.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use px_core::types::AccountSnapshot;

/// Get/set persistence for the selected account id.
pub trait SelectionStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, account_id: &str) -> Result<()>;
}

/// Volatile store for tests and single-run sessions.
#[derive(Default)]
pub struct InMemorySelectionStore {
    value: Mutex<Option<String>>,
}

impl InMemorySelectionStore {
    pub fn new(initial: Option<String>) -> Self {
        Self { value: Mutex::new(initial) }
    }
}

impl SelectionStore for InMemorySelectionStore {
    fn load(&self) -> Option<String> {
        self.value.lock().expect("selection store poisoned").clone()
    }

    fn save(&self, account_id: &str) -> Result<()> {
        *self.value.lock().expect("selection store poisoned") = Some(account_id.to_string());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SelectionFile {
    account_id: String,
}

/// JSON-file-backed store: load-at-startup, save-on-change.
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SelectionStore for FileSelectionStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let file: SelectionFile = serde_json::from_str(&content).ok()?;
        Some(file.account_id)
    }

    fn save(&self, account_id: &str) -> Result<()> {
        let file = SelectionFile { account_id: account_id.to_string() };
        let content = serde_json::to_string(&file)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("writing selection to {}", self.path.display()))
    }
}

/// Resolve the current account for a session.
///
/// Returns the account matching the persisted id, or the first available
/// account when the persisted id is stale (deleted account, first visit).
/// Persists the id whenever the effective selection changes; calling again
/// with the same inputs yields the same output and writes nothing.
pub fn resolve_active_account<'a>(
    accounts: &'a [AccountSnapshot],
    store: &dyn SelectionStore,
) -> Option<&'a AccountSnapshot> {
    if accounts.is_empty() {
        return None;
    }

    let persisted = store.load();
    if let Some(id) = &persisted {
        if let Some(account) = accounts.iter().find(|a| &a.id == id) {
            return Some(account);
        }
    }

    // Stale or missing selection: fall back to the first account.
    let fallback = &accounts[0];
    if persisted.as_deref() != Some(fallback.id.as_str()) {
        if let Err(e) = store.save(&fallback.id) {
            warn!("failed to persist account selection: {e}");
        }
    }
    Some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(ids: &[&str]) -> Vec<AccountSnapshot> {
        ids.iter().map(|id| AccountSnapshot::flat(*id, 1_000.0, 0.0)).collect()
    }

    #[test]
    fn persisted_id_wins() {
        let list = accounts(&["a", "b", "c"]);
        let store = InMemorySelectionStore::new(Some("b".to_string()));
        let resolved = resolve_active_account(&list, &store).unwrap();
        assert_eq!(resolved.id, "b");
        assert_eq!(store.load(), Some("b".to_string()));
    }

    #[test]
    fn stale_id_falls_back_to_first_and_persists() {
        let list = accounts(&["a", "b", "c"]);
        let store = InMemorySelectionStore::new(Some("acct-9".to_string()));
        let resolved = resolve_active_account(&list, &store).unwrap();
        assert_eq!(resolved.id, "a");
        assert_eq!(store.load(), Some("a".to_string()));
    }

    #[test]
    fn first_visit_selects_first() {
        let list = accounts(&["a", "b"]);
        let store = InMemorySelectionStore::new(None);
        let resolved = resolve_active_account(&list, &store).unwrap();
        assert_eq!(resolved.id, "a");
        assert_eq!(store.load(), Some("a".to_string()));
    }

    #[test]
    fn resolution_is_idempotent() {
        let list = accounts(&["a", "b"]);
        let store = InMemorySelectionStore::new(Some("missing".to_string()));
        let first = resolve_active_account(&list, &store).unwrap().id.clone();
        let second = resolve_active_account(&list, &store).unwrap().id.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn no_accounts_resolves_none() {
        let store = InMemorySelectionStore::new(Some("a".to_string()));
        assert!(resolve_active_account(&[], &store).is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        let store = FileSelectionStore::new(&path);
        assert!(store.load().is_none());
        store.save("acct-7").unwrap();
        assert_eq!(store.load(), Some("acct-7".to_string()));
    }
}
