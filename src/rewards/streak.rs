// SPDX-License-Identifier: MIT
//! Streak state machine — decides whether a day's first qualifying activity
//! extends, preserves (via a freeze charge), or resets the user's streak.
//!
//! The transition function is pure: it takes a snapshot of the streak row and
//! today's UTC calendar date, and returns the next snapshot. Persistence and
//! clocks stay in the caller, so every branch is testable without a database.

use chrono::NaiveDate;

/// Value snapshot of a `user_streaks` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: i64,
    pub longest_streak: i64,
    /// `None` until the first-ever qualifying activity.
    pub last_activity_date: Option<NaiveDate>,
    pub freeze_count: i64,
}

/// What a day's first activity did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First-ever activity: streak starts at 1.
    Started,
    /// Last activity was yesterday: streak grows by 1.
    Extended,
    /// A gap of two or more days, bridged by consuming one freeze charge.
    /// One charge forgives the whole gap; the streak still grows by only 1.
    FreezeConsumed,
    /// A gap with no freeze available: streak restarts at 1.
    Reset,
}

/// Advance the streak for `today`.
///
/// Returns `None` when nothing changes: repeat activity on an already-counted
/// day, or a `last_activity_date` in the future (clock rollback — the row is
/// left alone rather than rewound).
///
/// After any transition `longest_streak >= current_streak` and
/// `last_activity_date == today`.
pub fn advance(state: &StreakState, today: NaiveDate) -> Option<(StreakState, Transition)> {
    if state.last_activity_date == Some(today) {
        return None;
    }
    let yesterday = today.pred_opt()?;

    let mut next = state.clone();
    let transition = match state.last_activity_date {
        Some(last) if last == yesterday => {
            next.current_streak += 1;
            Transition::Extended
        }
        Some(last) if last < yesterday => {
            if state.freeze_count > 0 {
                next.freeze_count -= 1;
                next.current_streak += 1;
                Transition::FreezeConsumed
            } else {
                next.current_streak = 1;
                Transition::Reset
            }
        }
        Some(_) => return None,
        None => {
            next.current_streak = 1;
            Transition::Started
        }
    };

    next.longest_streak = next.longest_streak.max(next.current_streak);
    next.last_activity_date = Some(today);
    Some((next, transition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn state(
        current: i64,
        longest: i64,
        last: Option<&str>,
        freezes: i64,
    ) -> StreakState {
        StreakState {
            current_streak: current,
            longest_streak: longest,
            last_activity_date: last.map(day),
            freeze_count: freezes,
        }
    }

    #[test]
    fn first_activity_starts_at_one() {
        let (next, t) = advance(&state(0, 0, None, 0), day("2026-08-05")).unwrap();
        assert_eq!(t, Transition::Started);
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 1);
        assert_eq!(next.last_activity_date, Some(day("2026-08-05")));
    }

    #[test]
    fn same_day_is_a_no_op() {
        let s = state(5, 8, Some("2026-08-05"), 2);
        assert!(advance(&s, day("2026-08-05")).is_none());
    }

    #[test]
    fn yesterday_extends_and_leaves_freezes_alone() {
        let (next, t) = advance(&state(5, 8, Some("2026-08-04"), 2), day("2026-08-05")).unwrap();
        assert_eq!(t, Transition::Extended);
        assert_eq!(next.current_streak, 6);
        assert_eq!(next.freeze_count, 2);
    }

    #[test]
    fn gap_with_freeze_bridges_and_consumes_one() {
        // 3-day-old activity, one freeze: streak still advances by exactly 1.
        let (next, t) = advance(&state(5, 8, Some("2026-08-02"), 1), day("2026-08-05")).unwrap();
        assert_eq!(t, Transition::FreezeConsumed);
        assert_eq!(next.current_streak, 6);
        assert_eq!(next.freeze_count, 0);
    }

    #[test]
    fn long_gap_costs_only_one_freeze() {
        // A week-long gap is forgiven by a single charge.
        let (next, t) = advance(&state(10, 10, Some("2026-07-28"), 3), day("2026-08-05")).unwrap();
        assert_eq!(t, Transition::FreezeConsumed);
        assert_eq!(next.current_streak, 11);
        assert_eq!(next.freeze_count, 2);
    }

    #[test]
    fn gap_without_freeze_resets_to_one() {
        let (next, t) = advance(&state(5, 8, Some("2026-08-02"), 0), day("2026-08-05")).unwrap();
        assert_eq!(t, Transition::Reset);
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 8);
    }

    #[test]
    fn longest_tracks_new_high_water_mark() {
        let (next, _) = advance(&state(8, 8, Some("2026-08-04"), 0), day("2026-08-05")).unwrap();
        assert_eq!(next.current_streak, 9);
        assert_eq!(next.longest_streak, 9);
    }

    #[test]
    fn future_last_activity_is_left_alone() {
        let s = state(5, 8, Some("2026-08-09"), 1);
        assert!(advance(&s, day("2026-08-05")).is_none());
    }

    proptest! {
        #[test]
        fn invariants_hold_after_any_transition(
            current in 0i64..10_000,
            longest_extra in 0i64..10_000,
            freezes in 0i64..100,
            gap_days in 0u64..400,
        ) {
            let today = day("2026-08-05");
            let last = today.checked_sub_days(chrono::Days::new(gap_days));
            let s = StreakState {
                current_streak: current,
                longest_streak: current + longest_extra,
                last_activity_date: last,
                freeze_count: freezes,
            };
            if let Some((next, _)) = advance(&s, today) {
                prop_assert!(next.longest_streak >= next.current_streak);
                prop_assert!(next.freeze_count >= 0);
                prop_assert!(next.freeze_count <= s.freeze_count);
                prop_assert!(next.current_streak >= 1);
                prop_assert_eq!(next.last_activity_date, Some(today));
                // A single event never grows the streak by more than one day.
                prop_assert!(next.current_streak <= s.current_streak + 1);
            }
        }
    }
}
