//! State Store - load/save of the single state document
//!
//! The document lives in one named storage slot. Loading never fails:
//! a missing, unreadable or non-object slot yields the compiled-in defaults,
//! and a single ill-typed key only falls back for that key.
//! Saving replaces the whole slot at once, so a later load sees either the
//! previous document or the new one, never a mix.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::StateDocument;

/// Name of the storage slot, also the browser build's localStorage key
pub const STORAGE_KEY: &str = "ai_sparck_state_v1";

/// Raw persistence for the serialized document
#[cfg_attr(test, mockall::automock)]
pub trait StateSlot {
    /// Read the slot; `None` when nothing has been written yet
    fn read(&self) -> Result<Option<String>>;

    /// Replace the slot contents
    fn write(&self, contents: &str) -> Result<()>;

    /// Human-readable location for logs and the CLI
    fn describe(&self) -> String;
}

impl<T: StateSlot + ?Sized> StateSlot for std::sync::Arc<T> {
    fn read(&self) -> Result<Option<String>> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<()> {
        (**self).write(contents)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// JSON file on disk, replaced via tmp file + rename
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default slot file inside the application data directory
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::data_dir()?.join(format!("{}.json", STORAGE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .context("State path has no file name")?;
        let mut tmp = file_name.to_os_string();
        tmp.push(".tmp");
        Ok(self.path.with_file_name(tmp))
    }
}

impl StateSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let tmp_path = self.temp_path()?;
        let mut tmp = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        tmp.write_all(contents.as_bytes())
            .context("Failed to write state")?;
        tmp.sync_all().context("Failed to flush state")?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process slot, used by tests and embedders without a filesystem
#[derive(Debug, Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the slot with raw contents
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    /// Raw contents as last written
    pub fn snapshot(&self) -> Option<String> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StateSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.snapshot())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", STORAGE_KEY)
    }
}

/// Handle over the storage slot holding the [`StateDocument`]
pub struct StateStore<S = FileSlot> {
    slot: S,
}

impl StateStore<FileSlot> {
    /// Open the store at an explicit file path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FileSlot::new(path))
    }
}

impl StateStore<MemorySlot> {
    pub fn in_memory() -> Self {
        Self::new(MemorySlot::new())
    }
}

impl<S: StateSlot> StateStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Load the document, falling back to defaults on any problem
    pub fn load(&self) -> StateDocument {
        let raw = match self.slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No state in {}, starting from defaults", self.slot.describe());
                return StateDocument::default();
            }
            Err(e) => {
                warn!("Could not read state from {}: {:#}", self.slot.describe(), e);
                return StateDocument::default();
            }
        };

        match serde_json::from_str::<StateDocument>(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Discarding malformed state in {}: {}", self.slot.describe(), e);
                StateDocument::default()
            }
        }
    }

    /// Persist the full document
    pub fn save(&self, doc: &StateDocument) -> Result<()> {
        let json = serde_json::to_string(doc).context("Failed to serialize state")?;
        self.slot.write(&json)?;
        debug!(
            "Saved state to {} ({} chat, {} mistakes)",
            self.slot.describe(),
            doc.chat_log.len(),
            doc.mistake_log.len()
        );
        Ok(())
    }

    /// Load, apply `f`, save
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StateDocument) -> T,
    {
        let mut doc = self.load();
        let out = f(&mut doc);
        self.save(&doc)?;
        Ok(out)
    }

    /// Zero streak and sessions, clear both logs; profile and accounts stay
    pub fn reset_progress(&self) -> Result<StateDocument> {
        let mut doc = self.load();
        doc.reset_progress();
        self.save(&doc)?;
        Ok(doc)
    }

    /// Pretty-printed JSON of the full document
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.load()).context("Failed to serialize state for export")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DateKey;
    use crate::state::{ChatEntry, MistakeEntry};
    use crate::types::Role;
    use chrono::{TimeZone, Utc};

    fn populated() -> StateDocument {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let mut doc = StateDocument::default();
        doc.profile.name = "Ana".to_string();
        doc.profile.daily_minutes = 25;
        doc.streak = 3;
        doc.last_active_day = DateKey::from_ymd(2024, 1, 2);
        doc.sessions_completed = 7;
        doc.push_chat(ChatEntry::new(Role::User, "Je veux un cafe", ts));
        doc.push_chat(ChatEntry::new(Role::Assistant, "Correction: ...", ts));
        doc.push_mistake(MistakeEntry {
            id: "m-1".to_string(),
            category: "Spelling".to_string(),
            original: "Je veux un cafe".to_string(),
            corrected: "Je veux un café".to_string(),
            explanation: "accent".to_string(),
            timestamp: ts,
        });
        doc
    }

    #[test]
    fn test_load_empty_slot_returns_defaults() {
        let store = StateStore::in_memory();
        assert_eq!(store.load(), StateDocument::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = StateStore::in_memory();
        let doc = populated();
        store.save(&doc).unwrap();
        assert_eq!(store.load(), doc);
    }

    #[test]
    fn test_corrupt_slot_returns_defaults() {
        for raw in ["{not json", "[1, 2, 3]", "\"hello\"", "{\"streak\": \"many\"}", ""] {
            let store = StateStore::new(MemorySlot::with_contents(raw));
            assert_eq!(store.load(), StateDocument::default(), "input: {:?}", raw);
        }
    }

    #[test]
    fn test_browser_build_document_with_account_loads() {
        let raw = r#"{
            "auth": {"isLoggedIn": true, "currentEmail": "ana@example.com"},
            "users": [{"email": "ana@example.com", "password": "secret1", "name": "Ana"}],
            "user": {"name": "Ana", "level": "B1", "goal": "Travel", "dailyMinutes": 15},
            "streak": 7,
            "lastActiveDay": "2024-03-09",
            "sessionsCompleted": 4,
            "chat": [{"id": "c1", "role": "assistant", "content": "Salut!", "ts": "2024-03-09T08:00:00.000Z"}],
            "mistakes": [{"id": "m1", "category": "Spelling", "original": "cafe", "corrected": "café",
                          "explanation": "accent", "ts": "2024-03-09T08:01:00.000Z"}]
        }"#;
        let store = StateStore::new(MemorySlot::with_contents(raw));

        let doc = store.load();
        assert_eq!(doc.streak(), 7);
        assert_eq!(doc.last_active_day(), DateKey::from_ymd(2024, 3, 9));
        assert_eq!(doc.sessions_completed, 4);
        assert_eq!(doc.profile.level, "B1");
        assert!(doc.auth.is_logged_in);
        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.users[0].legacy_password.as_deref(), Some("secret1"));
        assert_eq!(doc.chat_log.len(), 1);
        assert_eq!(doc.mistake_log.len(), 1);
        assert!(doc.extra.is_empty());

        // Saved under the current names, still loadable, credential kept until login
        store.save(&doc).unwrap();
        assert_eq!(store.load(), doc);
        crate::auth::log_in_to(&store, "ana@example.com", "secret1").unwrap();
        assert!(store.load().users[0].legacy_password.is_none());
    }

    #[test]
    fn test_malformed_key_keeps_the_rest() {
        let raw = r#"{
            "profile": {"name": "Ana"},
            "streak": 7,
            "sessionsCompleted": 3,
            "lastActiveDay": "2024/01/01"
        }"#;
        let doc = StateStore::new(MemorySlot::with_contents(raw)).load();
        assert_eq!(doc.profile.name, "Ana");
        assert_eq!(doc.streak(), 7);
        assert_eq!(doc.sessions_completed, 3);
        assert!(doc.last_active_day().is_none());
        assert!(!doc.extra.contains_key("lastActiveDay"));
    }

    #[test]
    fn test_malformed_list_entry_is_dropped_alone() {
        let raw = r#"{
            "streak": 2,
            "users": [
                {"email": "ana@example.com", "passwordHash": "a$b", "name": "Ana"},
                {"name": "no email"}
            ],
            "chatLog": [
                {"id": "c1", "role": "user", "content": "Bonjour", "timestamp": "2024-01-01T10:00:00Z"},
                {"id": "c2", "role": "robot", "content": "?", "timestamp": "2024-01-01T10:00:01Z"}
            ],
            "mistakeLog": "oops"
        }"#;
        let doc = StateStore::new(MemorySlot::with_contents(raw)).load();
        assert_eq!(doc.streak(), 2);
        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.users[0].email, "ana@example.com");
        assert_eq!(doc.chat_log.len(), 1);
        assert_eq!(doc.chat_log[0].id, "c1");
        assert!(doc.mistake_log.is_empty());
    }

    #[test]
    fn test_unreadable_slot_returns_defaults() {
        let mut slot = MockStateSlot::new();
        slot.expect_read().returning(|| Err(anyhow::anyhow!("disk on fire")));
        slot.expect_describe().returning(|| "mock".to_string());

        let store = StateStore::new(slot);
        assert_eq!(store.load(), StateDocument::default());
    }

    #[test]
    fn test_save_propagates_write_failure() {
        let mut slot = MockStateSlot::new();
        slot.expect_write().returning(|_| Err(anyhow::anyhow!("read-only")));

        let store = StateStore::new(slot);
        let err = store.save(&StateDocument::default()).unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_update_persists_changes() {
        let store = StateStore::in_memory();
        let count = store
            .update(|doc| {
                doc.sessions_completed += 2;
                doc.sessions_completed
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.load().sessions_completed, 2);
    }

    #[test]
    fn test_reset_progress_persists() {
        let store = StateStore::in_memory();
        store.save(&populated()).unwrap();

        store.reset_progress().unwrap();

        let doc = store.load();
        assert_eq!(doc.streak(), 0);
        assert!(doc.last_active_day().is_none());
        assert_eq!(doc.sessions_completed, 0);
        assert!(doc.chat_log.is_empty());
        assert!(doc.mistake_log.is_empty());
        assert_eq!(doc.profile.name, "Ana");
        assert_eq!(doc.profile.daily_minutes, 25);
    }

    #[test]
    fn test_file_slot_round_trip_and_no_leftover_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = StateStore::at_path(&path);

        assert_eq!(store.load(), StateDocument::default());

        let doc = populated();
        store.save(&doc).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
        assert_eq!(store.load(), doc);

        // Overwrite replaces the whole document
        store.save(&StateDocument::default()).unwrap();
        assert_eq!(store.load(), StateDocument::default());
    }

    #[test]
    fn test_export_is_self_describing_json() {
        let store = StateStore::in_memory();
        store.save(&populated()).unwrap();

        let exported = store.export_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&exported).unwrap();
        assert_eq!(value["streak"], 3);
        assert_eq!(value["lastActiveDay"], "2024-01-02");
        assert_eq!(value["chatLog"].as_array().unwrap().len(), 2);
        assert_eq!(value["mistakeLog"][0]["corrected"], "Je veux un café");
    }
}
