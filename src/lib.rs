//! Sparck - Local French Practice Companion Library
//!
//! A single-learner practice tool with:
//! - Rule-based corrections for common beginner mistakes
//! - Daily practice streaks keyed by calendar day
//! - One persisted state document (profile, chat, mistake log)
//! - Local demo accounts
//!
//! # Example
//!
//! ```ignore
//! use sparck::{ChatSession, CorrectionEngine, StateStore, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = StateStore::at_path("state.json");
//!     let mut session = ChatSession::new(store, SystemClock, CorrectionEngine::builtin(), rand::rng());
//!     if let Some(exchange) = session.submit_user_message("Je veux un cafe").await? {
//!         println!("{}", exchange.assistant_entry.content);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod types;
pub mod clock;
pub mod state;  // Must come before streak/session since both mutate the document
pub mod streak;
pub mod tutor;
pub mod session;
pub mod config;
pub mod cli;

// Feature modules
pub mod auth;
pub mod progress;

// Re-export commonly used types for convenience
pub use clock::{Clock, DateKey, ManualClock, SystemClock};

pub use state::{
    StateDocument,
    StateStore,
    StateSlot,
    FileSlot,
    MemorySlot,
    ChatEntry,
    MistakeEntry,
    Profile,
};

pub use streak::{update_streak, StreakChange};

pub use tutor::{
    CorrectionEngine,
    CorrectionRule,
    MistakeRecord,
    TutorReply,
};

pub use session::{ChatSession, Exchange};

pub use auth::AuthError;

pub use progress::ProgressSummary;

pub use config::Config;

pub use types::Role;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Local French Practice Companion", NAME, VERSION)
}
