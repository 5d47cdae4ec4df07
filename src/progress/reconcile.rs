// SPDX-License-Identifier: MIT
//! Reconciliation of optimistic client updates with server-confirmed state.
//!
//! The client applies a tentative progress record locally before the save
//! round-trip returns, then merges the server's confirmed row back in. The
//! merge is a pure function so both sides of the contract share one testable
//! definition: completion is sticky, the larger watched position wins, and
//! the newer access timestamp is kept.

use crate::storage::ProgressRow;

/// Merge a locally tentative record with the server-confirmed one.
///
/// The confirmed row's identity fields (`id`, `user_id`, `course_id`,
/// `lesson_id`) always win — a tentative row may carry a placeholder id.
pub fn merge(tentative: &ProgressRow, confirmed: &ProgressRow) -> ProgressRow {
    ProgressRow {
        id: confirmed.id.clone(),
        user_id: confirmed.user_id.clone(),
        course_id: confirmed.course_id.clone(),
        lesson_id: confirmed.lesson_id.clone(),
        progress_seconds: tentative.progress_seconds.max(confirmed.progress_seconds),
        completed: tentative.completed || confirmed.completed,
        last_accessed: if confirmed.last_accessed >= tentative.last_accessed {
            confirmed.last_accessed.clone()
        } else {
            tentative.last_accessed.clone()
        },
    }
}
