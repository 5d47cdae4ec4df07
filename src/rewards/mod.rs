// SPDX-License-Identifier: MIT
//! Reward bookkeeping run after every accepted progress save — the streak
//! engine and the XP award.
//!
//! Everything here is best-effort: the progress upsert is the primary
//! contract, so the caller logs and swallows any error from this module
//! rather than failing the save.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use tracing::debug;

use crate::storage::{Storage, StreakRow};

pub mod streak;
pub mod xp;

use streak::{StreakState, Transition};

/// Apply streak and XP bookkeeping for one progress-save event.
///
/// `was_completed`/`now_completed` are the lesson's stored `completed` flag
/// before and after the upsert; the XP award keys off the false→true
/// transition. `today` is the event-processing UTC calendar date.
pub async fn apply_after_save(
    storage: &Storage,
    user_id: &str,
    was_completed: bool,
    now_completed: bool,
    today: NaiveDate,
) -> Result<()> {
    let row = storage.ensure_streak(user_id).await?;
    let state = state_from_row(&row)?;

    if let Some((next, transition)) = streak::advance(&state, today) {
        storage
            .update_streak(
                user_id,
                next.current_streak,
                next.longest_streak,
                &today.format("%Y-%m-%d").to_string(),
                next.freeze_count,
            )
            .await?;
        match transition {
            Transition::Started => debug!(user_id, "streak started"),
            Transition::Extended => {
                debug!(user_id, streak = next.current_streak, "streak extended")
            }
            Transition::FreezeConsumed => debug!(
                user_id,
                streak = next.current_streak,
                freezes_left = next.freeze_count,
                "streak preserved by freeze"
            ),
            Transition::Reset => debug!(user_id, "streak reset"),
        }
    }

    if let Some(points) = xp::award(was_completed, now_completed) {
        storage.add_xp(user_id, points).await?;
        debug!(user_id, points, "xp awarded");
    }

    Ok(())
}

fn state_from_row(row: &StreakRow) -> Result<StreakState> {
    let last_activity_date = row
        .last_activity_date
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("malformed last_activity_date {d:?}"))
        })
        .transpose()?;
    Ok(StreakState {
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        last_activity_date,
        freeze_count: row.freeze_count,
    })
}
