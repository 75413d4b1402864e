//! Progress read model for the dashboard and progress views

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::state::{MistakeEntry, StateDocument, StateSlot, StateStore};

/// Default export file name
pub const EXPORT_FILE_NAME: &str = "ai-sparck-export.json";

/// Headline numbers plus the latest corrections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub streak: u32,
    pub corrections: usize,
    pub sessions_completed: u32,
    /// Newest first
    pub recent: Vec<MistakeEntry>,
}

impl ProgressSummary {
    pub fn from_doc(doc: &StateDocument, recent_limit: usize) -> Self {
        Self {
            streak: doc.streak(),
            corrections: doc.mistake_log.len(),
            sessions_completed: doc.sessions_completed,
            recent: recent_mistakes(doc, recent_limit),
        }
    }
}

/// The last `limit` mistakes, newest first
pub fn recent_mistakes(doc: &StateDocument, limit: usize) -> Vec<MistakeEntry> {
    doc.mistake_log.iter().rev().take(limit).cloned().collect()
}

/// Whole mistake log, newest first
pub fn mistakes_newest_first(doc: &StateDocument) -> Vec<&MistakeEntry> {
    doc.mistake_log.iter().rev().collect()
}

/// Coarse relative time, e.g. "5 min ago"
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hr ago", hours);
    }
    let days = hours / 24;
    format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
}

/// Write the full document as pretty JSON to `path`
pub fn write_export<S: StateSlot>(store: &StateStore<S>, path: &Path) -> Result<()> {
    let json = store.export_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(())
}
