// SPDX-License-Identifier: MIT
//! Progress Recorder — persists lesson-watch events and triggers reward
//! bookkeeping.
//!
//! The upsert of the progress row is the primary contract: its failure fails
//! the request. The streak/XP pass that follows is best-effort — a lost
//! streak increment beats a failed progress save.

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use crate::rewards;
use crate::storage::{ProgressRow, Storage};

pub mod reconcile;

/// A lesson-watch event as accepted from the client.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub course_id: String,
    pub lesson_id: String,
    pub progress_seconds: i64,
    pub completed: bool,
}

/// Record a watch event for `user_id` and return the persisted row.
pub async fn record(storage: &Storage, user_id: &str, event: &WatchEvent) -> Result<ProgressRow> {
    let was_completed = storage
        .get_progress(user_id, &event.lesson_id)
        .await?
        .map(|row| row.completed)
        .unwrap_or(false);

    let row = storage
        .upsert_progress(
            user_id,
            &event.course_id,
            &event.lesson_id,
            event.progress_seconds,
            event.completed,
        )
        .await?;

    let today = Utc::now().date_naive();
    if let Err(e) =
        rewards::apply_after_save(storage, user_id, was_completed, row.completed, today).await
    {
        warn!(user_id, "streak/xp bookkeeping failed: {e:#}");
    }

    Ok(row)
}
