//! Correction rules
//!
//! Each rule looks for one known mistake signature and, on a hit, produces a
//! [`MistakeRecord`] with a targeted rewrite of the learner's text. Rules are
//! independent of each other; the engine decides ordering.

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::RuleConfig;

/// One detected deviation from the expected form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeRecord {
    pub category: String,
    /// The learner's text as submitted (trimmed)
    pub original: String,
    /// `original` with the offending span rewritten
    pub corrected: String,
    pub explanation: String,
}

/// A single pattern-match-and-rewrite unit
pub trait CorrectionRule: Send + Sync {
    /// Stable identifier, used in logs
    fn name(&self) -> &str;

    /// Inspect `text` and report a mistake if the pattern is present
    fn check(&self, text: &str) -> Option<MistakeRecord>;
}

static CAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)cafe\b").unwrap());
static CAFE_ACCENTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)café").unwrap());
static JE_VEUX_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(bonjour[, ]*)?je veux\b").unwrap());
static JE_VEUX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)je veux").unwrap());
static SIL_VOUS_PLAIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s\s*il\s*vous\s*plait").unwrap());
static SIL_APOSTROPHE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)s['’]il").unwrap());

/// "cafe" written without its accent
#[derive(Debug, Default, Clone, Copy)]
pub struct CafeAccentRule;

impl CorrectionRule for CafeAccentRule {
    fn name(&self) -> &str {
        "cafe-accent"
    }

    fn check(&self, text: &str) -> Option<MistakeRecord> {
        if !CAFE.is_match(text) || CAFE_ACCENTED.is_match(text) {
            return None;
        }
        Some(MistakeRecord {
            category: "Spelling".to_string(),
            original: text.to_string(),
            corrected: CAFE.replace_all(text, "café").into_owned(),
            explanation: "In French, 'café' uses an accent: café.".to_string(),
        })
    }
}

/// A request opening with the blunt "je veux"
#[derive(Debug, Default, Clone, Copy)]
pub struct PoliteRequestRule;

impl CorrectionRule for PoliteRequestRule {
    fn name(&self) -> &str {
        "polite-request"
    }

    fn check(&self, text: &str) -> Option<MistakeRecord> {
        if !JE_VEUX_OPENING.is_match(text) {
            return None;
        }
        Some(MistakeRecord {
            category: "Politeness".to_string(),
            original: text.to_string(),
            corrected: JE_VEUX.replace_all(text, "je voudrais").into_owned(),
            explanation: "Use 'Je voudrais' to sound more polite than 'Je veux'.".to_string(),
        })
    }
}

/// "s il vous plait" missing its apostrophe and accent
#[derive(Debug, Default, Clone, Copy)]
pub struct SilVousPlaitRule;

impl CorrectionRule for SilVousPlaitRule {
    fn name(&self) -> &str {
        "sil-vous-plait"
    }

    fn check(&self, text: &str) -> Option<MistakeRecord> {
        if !SIL_VOUS_PLAIT.is_match(text) || SIL_APOSTROPHE.is_match(text) {
            return None;
        }
        Some(MistakeRecord {
            category: "Spelling".to_string(),
            original: text.to_string(),
            corrected: SIL_VOUS_PLAIT
                .replace_all(text, "s’il vous plaît")
                .into_owned(),
            explanation: "Write: s’il vous plaît (apostrophe + accent).".to_string(),
        })
    }
}

/// The built-in rule set, in priority order
pub fn builtin_rules() -> Vec<Box<dyn CorrectionRule>> {
    vec![
        Box::new(CafeAccentRule),
        Box::new(PoliteRequestRule),
        Box::new(SilVousPlaitRule),
    ]
}

/// A rule defined in configuration rather than code.
///
/// `pattern` both triggers the rule and selects the span to rewrite;
/// `replacement` may refer to capture groups (`$1`, `${name}`).
#[derive(Debug, Clone)]
pub struct CustomRule {
    name: String,
    category: String,
    pattern: Regex,
    unless: Option<Regex>,
    replacement: String,
    explanation: String,
}

impl CustomRule {
    pub fn new(
        name: &str,
        category: &str,
        pattern: &str,
        replacement: &str,
        explanation: &str,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid pattern for rule '{}'", name))?;
        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            pattern,
            unless: None,
            replacement: replacement.to_string(),
            explanation: explanation.to_string(),
        })
    }

    /// Skip the rule whenever `pattern` also matches
    pub fn unless(mut self, pattern: &str) -> Result<Self> {
        let guard = Regex::new(pattern)
            .with_context(|| format!("Invalid 'unless' pattern for rule '{}'", self.name))?;
        self.unless = Some(guard);
        Ok(self)
    }

    pub fn from_config(config: &RuleConfig) -> Result<Self> {
        let rule = Self::new(
            &config.name,
            &config.category,
            &config.pattern,
            &config.replacement,
            &config.explanation,
        )?;
        match &config.unless {
            Some(guard) => rule.unless(guard),
            None => Ok(rule),
        }
    }
}

impl CorrectionRule for CustomRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, text: &str) -> Option<MistakeRecord> {
        if !self.pattern.is_match(text) {
            return None;
        }
        if self.unless.as_ref().is_some_and(|guard| guard.is_match(text)) {
            debug!("Rule '{}' suppressed by its guard", self.name);
            return None;
        }
        Some(MistakeRecord {
            category: self.category.clone(),
            original: text.to_string(),
            corrected: self
                .pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned(),
            explanation: self.explanation.clone(),
        })
    }
}
