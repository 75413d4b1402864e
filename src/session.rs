//! Chat Session Orchestrator
//!
//! Ties the correction engine to the state store. Each operation reloads the
//! document, mutates its own copy and persists it; no document is held
//! across operations.
//!
//! Write ordering for a submitted message: the learner's entry is persisted
//! before the tutor runs, and the assistant reply is persisted together with
//! its mistake entries afterwards. A reader in between sees the question
//! without an answer, never the reverse.

use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::state::{ChatEntry, MistakeEntry, StateDocument, StateSlot, StateStore};
use crate::streak::{update_streak, StreakChange};
use crate::tutor::{CorrectionEngine, TutorReply};
use crate::types::Role;

/// Opening line when the transcript is empty
pub const GREETING: &str = "Salut! 😊 You’re at a café. Start by greeting me and ordering a drink.";

/// Everything one submitted message produced
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_entry: ChatEntry,
    pub assistant_entry: ChatEntry,
    pub reply: TutorReply,
    /// Mistake log entries written for this message
    pub logged: Vec<MistakeEntry>,
    pub streak: StreakChange,
}

/// A practice session over a store
pub struct ChatSession<S, C, R> {
    store: StateStore<S>,
    clock: C,
    engine: CorrectionEngine,
    rng: R,
    reply_delay: Duration,
}

impl<S, C, R> ChatSession<S, C, R>
where
    S: StateSlot,
    C: Clock,
    R: Rng,
{
    pub fn new(store: StateStore<S>, clock: C, engine: CorrectionEngine, rng: R) -> Self {
        Self {
            store,
            clock,
            engine,
            rng,
            reply_delay: Duration::ZERO,
        }
    }

    /// Simulated typing time before the reply is computed
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Load state for a practice screen, seeding the greeting on an empty transcript
    pub fn open(&self) -> Result<StateDocument> {
        let mut doc = self.store.load();
        if doc.chat_log.is_empty() {
            doc.push_chat(ChatEntry::new(Role::Assistant, GREETING, self.clock.now()));
            self.store.save(&doc)?;
            debug!("Seeded greeting");
        }
        Ok(doc)
    }

    /// Record a learner message and the tutor's reply.
    ///
    /// Blank input is ignored and returns `None` without touching state.
    pub async fn submit_user_message(&mut self, text: &str) -> Result<Option<Exchange>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let mut doc = self.store.load();
        let streak = update_streak(&mut doc, self.clock.today());
        let user_entry = ChatEntry::new(Role::User, text, self.clock.now());
        doc.push_chat(user_entry.clone());
        self.store.save(&doc)?;
        drop(doc);

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        let mut doc = self.store.load();
        let reply = self.engine.evaluate(text, &mut self.rng);
        let now = self.clock.now();

        let assistant_entry = ChatEntry::new(Role::Assistant, reply.message.clone(), now);
        doc.push_chat(assistant_entry.clone());

        let logged: Vec<MistakeEntry> = reply
            .mistakes
            .iter()
            .map(|m| MistakeEntry::from_record(m, now))
            .collect();
        for entry in &logged {
            doc.push_mistake(entry.clone());
        }
        self.store.save(&doc)?;

        if !logged.is_empty() {
            info!("Logged {} correction(s)", logged.len());
        }

        Ok(Some(Exchange {
            user_entry,
            assistant_entry,
            reply,
            logged,
            streak,
        }))
    }

    /// Mark a lesson as done: counts today toward the streak
    pub fn complete_lesson(&self) -> Result<StreakChange> {
        let today = self.clock.today();
        let change = self.store.update(|doc| {
            let change = update_streak(doc, today);
            doc.sessions_completed = doc.sessions_completed.saturating_add(1);
            change
        })?;
        info!("Lesson completed");
        Ok(change)
    }

    /// Empty the transcript only
    pub fn reset_chat(&self) -> Result<()> {
        self.store.update(StateDocument::clear_chat)
    }

    /// Clear streak, sessions and both logs
    pub fn reset_progress(&self) -> Result<()> {
        self.store.reset_progress()?;
        info!("Progress reset");
        Ok(())
    }
}
