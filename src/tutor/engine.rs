//! Correction Engine
//!
//! Runs every rule against the learner's text, keeps all matches in rule
//! declaration order, and composes a reply that surfaces at most two of
//! them followed by one randomly chosen follow-up prompt.

use anyhow::Result;
use rand::Rng;
use tracing::debug;

use super::reply::{Segment, TutorReply};
use super::rules::{builtin_rules, CorrectionRule, CustomRule, MistakeRecord};
use crate::config::TutorConfig;

/// Conversational continuations appended to every reply
pub const FOLLOW_UPS: [&str; 4] = [
    "Sur place ou à emporter ?",
    "Tu veux un café ou un thé ?",
    "Avec du sucre ?",
    "Quelle taille (petit, moyen, grand) ?",
];

/// Shown when no rule matched
pub const ENCOURAGEMENT: &str =
    "Nice! ✅ Now say it again with one extra detail (size, sugar, or “to go”).";

/// Corrections echoed in the reply text; the rest are only logged
pub const MAX_SURFACED_CORRECTIONS: usize = 2;

/// Ordered rule pipeline
pub struct CorrectionEngine {
    rules: Vec<Box<dyn CorrectionRule>>,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CorrectionEngine {
    pub fn new(rules: Vec<Box<dyn CorrectionRule>>) -> Self {
        Self { rules }
    }

    /// Engine with the built-in rule set
    pub fn builtin() -> Self {
        Self::new(builtin_rules())
    }

    /// Built-ins followed by the configured custom rules
    pub fn from_config(config: &TutorConfig) -> Result<Self> {
        let mut engine = Self::builtin();
        for rule in &config.custom_rules {
            engine.push_rule(CustomRule::from_config(rule)?);
        }
        Ok(engine)
    }

    /// Append a rule at the lowest priority
    pub fn push_rule(&mut self, rule: impl CorrectionRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn with_rule(mut self, rule: impl CorrectionRule + 'static) -> Self {
        self.push_rule(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// All mistakes in `text`, in rule order
    pub fn detect(&self, text: &str) -> Vec<MistakeRecord> {
        let text = text.trim();
        self.rules
            .iter()
            .filter_map(|rule| {
                let hit = rule.check(text);
                if hit.is_some() {
                    debug!("Rule '{}' matched", rule.name());
                }
                hit
            })
            .collect()
    }

    /// Detect mistakes and compose the reply, drawing the follow-up from `rng`
    pub fn evaluate<R: Rng>(&self, text: &str, rng: &mut R) -> TutorReply {
        let mistakes = self.detect(text);
        let follow_up = FOLLOW_UPS[rng.random_range(0..FOLLOW_UPS.len())];
        let segments = compose(&mistakes, follow_up);
        TutorReply::new(mistakes, segments)
    }
}

/// Reply layout for a set of matched mistakes
pub fn compose(mistakes: &[MistakeRecord], follow_up: &str) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(MAX_SURFACED_CORRECTIONS + 1);

    let mut surfaced = mistakes.iter().take(MAX_SURFACED_CORRECTIONS);
    match surfaced.next() {
        Some(top) => {
            segments.push(Segment::Correction {
                corrected: top.corrected.clone(),
                explanation: top.explanation.clone(),
            });
            segments.extend(surfaced.map(|m| Segment::Also {
                corrected: m.corrected.clone(),
                explanation: m.explanation.clone(),
            }));
        }
        None => segments.push(Segment::Encouragement(ENCOURAGEMENT.to_string())),
    }

    segments.push(Segment::FollowUp(follow_up.to_string()));
    segments
}
