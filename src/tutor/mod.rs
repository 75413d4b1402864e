//! Rule-based tutor
//!
//! Scans learner utterances for known mistake signatures and answers with
//! corrections plus a follow-up prompt. No language understanding is
//! involved; every correction comes from a [`CorrectionRule`].

pub mod engine;
pub mod reply;
pub mod rules;

pub use engine::{compose, CorrectionEngine, ENCOURAGEMENT, FOLLOW_UPS, MAX_SURFACED_CORRECTIONS};
pub use reply::{plain_text, Segment, TutorReply};
pub use rules::{
    builtin_rules, CafeAccentRule, CorrectionRule, CustomRule, MistakeRecord, PoliteRequestRule,
    SilVousPlaitRule,
};
