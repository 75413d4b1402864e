//! Persistent learner state
//!
//! One [`StateDocument`] holds everything the companion remembers: profile,
//! streak bookkeeping, chat transcript, mistake log and the demo account
//! records. It is owned by [`StateStore`] and handed out as a local copy for
//! the duration of a single operation.

pub mod store;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::clock::DateKey;
use crate::tutor::MistakeRecord;
use crate::types::Role;

pub use store::{FileSlot, MemorySlot, StateSlot, StateStore, STORAGE_KEY};

/// Learner profile shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// CEFR-style level label ("A1" .. "C2")
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
    #[serde(deserialize_with = "null_as_default")]
    pub goal: String,
    #[serde(deserialize_with = "null_as_default")]
    pub daily_minutes: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_LEARNER_NAME.to_string(),
            level: "A2".to_string(),
            goal: "Conversation".to_string(),
            daily_minutes: 10,
        }
    }
}

/// Name used whenever no better one is known
pub const DEFAULT_LEARNER_NAME: &str = "Learner";

/// Login session flag owned by the auth collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSession {
    #[serde(deserialize_with = "null_as_default")]
    pub is_logged_in: bool,
    pub current_email: Option<String>,
}

/// A demo account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    /// `salt$hash`; empty while only a legacy plaintext password is known
    #[serde(default, deserialize_with = "null_as_default")]
    pub password_hash: String,
    /// Plaintext password from the browser build, replaced by a hash on the next login
    #[serde(default, rename = "password", skip_serializing_if = "Option::is_none")]
    pub legacy_password: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Account {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            legacy_password: None,
            name: name.into(),
        }
    }
}

/// One line of the practice transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(alias = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// A logged correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeEntry {
    pub id: String,
    pub category: String,
    pub original: String,
    pub corrected: String,
    pub explanation: String,
    #[serde(alias = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl MistakeEntry {
    pub fn from_record(record: &MistakeRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: record.category.clone(),
            original: record.original.clone(),
            corrected: record.corrected.clone(),
            explanation: record.explanation.clone(),
            timestamp,
        }
    }
}

/// The single persisted document.
///
/// Loading merges the persisted object onto the defaults one top-level key
/// at a time: a missing, `null` or ill-typed key keeps its default without
/// costing the others. List entries are checked one by one. Keys this
/// version does not know about are carried in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub auth: AuthSession,
    pub users: Vec<Account>,
    pub profile: Profile,
    pub(crate) streak: u32,
    pub(crate) last_active_day: Option<DateKey>,
    pub sessions_completed: u32,
    pub chat_log: Vec<ChatEntry>,
    pub mistake_log: Vec<MistakeEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            auth: AuthSession::default(),
            users: Vec::new(),
            profile: Profile::default(),
            streak: 0,
            last_active_day: None,
            sessions_completed: 0,
            chat_log: Vec::new(),
            mistake_log: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl StateDocument {
    /// Consecutive active days
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Last day the streak was updated
    pub fn last_active_day(&self) -> Option<DateKey> {
        self.last_active_day
    }

    /// Clear progress while keeping profile and account data
    pub fn reset_progress(&mut self) {
        self.streak = 0;
        self.last_active_day = None;
        self.sessions_completed = 0;
        self.chat_log.clear();
        self.mistake_log.clear();
    }

    /// Drop the transcript only; corrections and streak are kept
    pub fn clear_chat(&mut self) {
        self.chat_log.clear();
    }

    pub(crate) fn push_chat(&mut self, entry: ChatEntry) {
        self.chat_log.push(entry);
    }

    pub(crate) fn push_mistake(&mut self, entry: MistakeEntry) {
        self.mistake_log.push(entry);
    }

    /// Merge a persisted JSON object onto the defaults
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let mut doc = Self::default();

        // Legacy names first so the current name wins when both are present
        merge_key(&mut object, &["auth"], &mut doc.auth);
        merge_list(&mut object, &["users"], &mut doc.users);
        merge_key(&mut object, &["user", "profile"], &mut doc.profile);
        merge_key(&mut object, &["streak"], &mut doc.streak);
        merge_key(&mut object, &["lastActiveDay"], &mut doc.last_active_day);
        merge_key(&mut object, &["sessionsCompleted"], &mut doc.sessions_completed);
        merge_list(&mut object, &["chat", "chatLog"], &mut doc.chat_log);
        merge_list(&mut object, &["mistakes", "mistakeLog"], &mut doc.mistake_log);

        doc.extra = object;
        doc
    }
}

impl<'de> Deserialize<'de> for StateDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_object(object))
    }
}

/// Take each of `keys` out of `object`, overwriting `slot` with every value that fits
fn merge_key<T: DeserializeOwned>(object: &mut Map<String, Value>, keys: &[&str], slot: &mut T) {
    for key in keys {
        let value = match object.remove(*key) {
            Some(Value::Null) | None => continue,
            Some(value) => value,
        };
        match serde_json::from_value(value) {
            Ok(parsed) => *slot = parsed,
            Err(e) => warn!("Ignoring stored '{}': {}", key, e),
        }
    }
}

/// Like [`merge_key`], but a bad list entry only drops that entry
fn merge_list<T: DeserializeOwned>(object: &mut Map<String, Value>, keys: &[&str], slot: &mut Vec<T>) {
    for key in keys {
        let items = match object.remove(*key) {
            Some(Value::Null) | None => continue,
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!("Ignoring stored '{}': expected a list, found {}", key, other);
                continue;
            }
        };
        let total = items.len();
        *slot = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if slot.len() < total {
            warn!("Dropped {} malformed entries from '{}'", total - slot.len(), key);
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
