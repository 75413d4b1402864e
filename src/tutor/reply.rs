//! Structured tutor replies
//!
//! The engine produces an ordered list of [`Segment`]s. Rendering them is
//! left to the caller; [`TutorReply::message`] carries the plain-text form
//! that goes into the chat log.

use super::MistakeRecord;

/// One block of a tutor reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// The highest-priority correction
    Correction { corrected: String, explanation: String },
    /// A second correction, shown after the first
    Also { corrected: String, explanation: String },
    /// Shown when nothing needed correcting
    Encouragement(String),
    /// Conversational continuation, always last
    FollowUp(String),
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Correction { corrected, explanation } => {
                write!(f, "Correction: {} ✅\n{}", corrected, explanation)
            }
            Segment::Also { corrected, explanation } => {
                write!(f, "Also: {} ✅\n{}", corrected, explanation)
            }
            Segment::Encouragement(text) | Segment::FollowUp(text) => write!(f, "{}", text),
        }
    }
}

/// Result of evaluating one learner utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    /// Every matched mistake, in rule order (not capped)
    pub mistakes: Vec<MistakeRecord>,
    /// Display segments
    pub segments: Vec<Segment>,
    /// Plain-text rendering of `segments`
    pub message: String,
}

impl TutorReply {
    pub fn new(mistakes: Vec<MistakeRecord>, segments: Vec<Segment>) -> Self {
        let message = plain_text(&segments);
        Self {
            mistakes,
            segments,
            message,
        }
    }

    /// The follow-up prompt closing the reply
    pub fn follow_up(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            Segment::FollowUp(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.mistakes.is_empty()
    }
}

/// Blocks separated by a blank line
pub fn plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_layout() {
        let segments = vec![
            Segment::Correction {
                corrected: "je voudrais un café".to_string(),
                explanation: "Be polite.".to_string(),
            },
            Segment::Also {
                corrected: "Je veux un café".to_string(),
                explanation: "Accent.".to_string(),
            },
            Segment::FollowUp("Avec du sucre ?".to_string()),
        ];
        assert_eq!(
            plain_text(&segments),
            "Correction: je voudrais un café ✅\nBe polite.\n\nAlso: Je veux un café ✅\nAccent.\n\nAvec du sucre ?"
        );
    }

    #[test]
    fn test_follow_up_lookup() {
        let reply = TutorReply::new(
            vec![],
            vec![
                Segment::Encouragement("Nice!".to_string()),
                Segment::FollowUp("Avec du sucre ?".to_string()),
            ],
        );
        assert_eq!(reply.follow_up(), Some("Avec du sucre ?"));
        assert!(reply.is_clean());
        assert_eq!(reply.message, "Nice!\n\nAvec du sucre ?");
    }
}
