// rest/routes/progress.rs — lesson progress REST routes.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::progress::{self, WatchEvent};
use crate::rest::auth;
use crate::AppContext;

#[derive(Deserialize)]
pub struct SaveProgressRequest {
    pub course_id: Option<String>,
    pub lesson_id: Option<String>,
    pub progress_seconds: Option<i64>,
    pub completed: Option<bool>,
}

/// `POST /api/v1/progress/save`
///
/// Request:
/// ```json
/// { "course_id": "rust-101", "lesson_id": "ownership",
///   "progress_seconds": 240, "completed": false }
/// ```
/// Response: `{ "success": true, "data": <persisted progress record> }`
///
/// The streak/XP pass runs after the upsert and never fails the request.
pub async fn save_progress(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<SaveProgressRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = auth::require_user(&ctx, &headers).await?;

    let (course_id, lesson_id) = match (body.course_id, body.lesson_id) {
        (Some(c), Some(l)) if !c.is_empty() && !l.is_empty() => (c, l),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing course_id or lesson_id" })),
            ))
        }
    };

    let event = WatchEvent {
        course_id,
        lesson_id,
        progress_seconds: body.progress_seconds.unwrap_or(0).max(0),
        completed: body.completed.unwrap_or(false),
    };

    match progress::record(&ctx.storage, &user_id, &event).await {
        Ok(row) => Ok(Json(json!({ "success": true, "data": row }))),
        Err(e) => {
            error!(%user_id, "failed to save progress: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save progress" })),
            ))
        }
    }
}

#[derive(Deserialize)]
pub struct ListProgressQuery {
    pub course_id: Option<String>,
}

/// `GET /api/v1/progress?course_id=…`
///
/// Response: `{ "success": true, "data": [<records, newest access first>] }`
pub async fn list_progress(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(query): Query<ListProgressQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = auth::require_user(&ctx, &headers).await?;

    match ctx
        .storage
        .list_progress(&user_id, query.course_id.as_deref())
        .await
    {
        Ok(rows) => Ok(Json(json!({ "success": true, "data": rows }))),
        Err(e) => {
            error!(%user_id, "failed to fetch progress: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch progress" })),
            ))
        }
    }
}
