//! Streak Engine
//!
//! Consecutive-day bookkeeping on calendar-day granularity. A day counts as
//! active the first time any activity (a chat message, a completed lesson)
//! runs the update for it; later calls on the same day are no-ops.

use tracing::info;

use crate::clock::DateKey;
use crate::state::StateDocument;

/// What an update did to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Already counted today
    Unchanged,
    /// First recorded activity
    Started,
    /// Active yesterday, so the streak grew by one
    Extended,
    /// A gap (or a clock that went backwards) restarted the streak at 1
    Reset { gap_days: i64 },
}

/// Update `streak` and `last_active_day` for activity on `today`
pub fn update_streak(doc: &mut StateDocument, today: DateKey) -> StreakChange {
    let change = match doc.last_active_day {
        Some(last) if last == today => return StreakChange::Unchanged,
        None => {
            doc.streak = 1;
            StreakChange::Started
        }
        Some(last) => match last.days_until(today) {
            1 => {
                doc.streak = doc.streak.saturating_add(1);
                StreakChange::Extended
            }
            gap_days => {
                doc.streak = 1;
                StreakChange::Reset { gap_days }
            }
        },
    };

    doc.last_active_day = Some(today);
    info!("Streak {:?} on {}: now {} day(s)", change, today, doc.streak);
    change
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn doc_with(streak: u32, last: Option<&str>) -> StateDocument {
        let mut doc = StateDocument::default();
        doc.streak = streak;
        doc.last_active_day = last.map(day);
        doc
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let mut doc = doc_with(0, None);
        assert_eq!(update_streak(&mut doc, day("2024-06-10")), StreakChange::Started);
        assert_eq!(doc.streak(), 1);
        assert_eq!(doc.last_active_day(), Some(day("2024-06-10")));
    }

    #[test]
    fn test_null_last_day_always_sets_one() {
        // A stale count without a day is not trusted
        let mut doc = doc_with(9, None);
        update_streak(&mut doc, day("2030-12-31"));
        assert_eq!(doc.streak(), 1);
    }

    #[test]
    fn test_next_day_increments() {
        let mut doc = doc_with(4, Some("2024-01-01"));
        assert_eq!(update_streak(&mut doc, day("2024-01-02")), StreakChange::Extended);
        assert_eq!(doc.streak(), 5);
        assert_eq!(doc.last_active_day(), Some(day("2024-01-02")));
    }

    #[test]
    fn test_gap_resets_to_one() {
        let mut doc = doc_with(4, Some("2024-01-01"));
        assert_eq!(
            update_streak(&mut doc, day("2024-01-05")),
            StreakChange::Reset { gap_days: 4 }
        );
        assert_eq!(doc.streak(), 1);
        assert_eq!(doc.last_active_day(), Some(day("2024-01-05")));
    }

    #[test]
    fn test_clock_moving_backwards_resets_to_one() {
        let mut doc = doc_with(6, Some("2024-01-10"));
        assert_eq!(
            update_streak(&mut doc, day("2024-01-09")),
            StreakChange::Reset { gap_days: -1 }
        );
        assert_eq!(doc.streak(), 1);
        assert_eq!(doc.last_active_day(), Some(day("2024-01-09")));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let mut once = doc_with(2, Some("2024-01-01"));
        update_streak(&mut once, day("2024-01-02"));

        let mut twice = once.clone();
        assert_eq!(update_streak(&mut twice, day("2024-01-02")), StreakChange::Unchanged);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_month_and_year_boundaries_count_as_consecutive() {
        let mut doc = doc_with(10, Some("2023-12-31"));
        update_streak(&mut doc, day("2024-01-01"));
        assert_eq!(doc.streak(), 11);

        let mut doc = doc_with(1, Some("2024-02-28"));
        update_streak(&mut doc, day("2024-02-29"));
        assert_eq!(doc.streak(), 2);
    }

    #[test]
    fn test_week_of_daily_practice() {
        let mut doc = StateDocument::default();
        let start = day("2024-03-01");
        for offset in 0..7 {
            let today = DateKey::new(start.date() + chrono::Duration::days(offset));
            update_streak(&mut doc, today);
            update_streak(&mut doc, today);
        }
        assert_eq!(doc.streak(), 7);
    }
}
