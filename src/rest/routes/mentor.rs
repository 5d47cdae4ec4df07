// rest/routes/mentor.rs — AI mentor chat proxy.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::mentor::{ChatMessage, MentorError};
use crate::rest::auth;
use crate::AppContext;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
}

/// `POST /api/v1/mentor/chat`
///
/// Request: `{ "messages": [{ "role": "user", "content": "Salom!" }] }`
/// Response: `{ "content": "<generated text>" }`
///
/// 429 with a localized detail when the completion vendor is rate-limiting.
pub async fn chat(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    auth::require_user(&ctx, &headers).await?;

    let messages = body.messages.unwrap_or_default();
    if messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing messages" })),
        ));
    }

    match ctx.mentor.complete(&messages).await {
        Ok(content) => Ok(Json(json!({ "content": content }))),
        Err(MentorError::RateLimited(detail)) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too Many Requests", "details": detail })),
        )),
        Err(MentorError::NotConfigured) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "API Key not configured" })),
        )),
        Err(MentorError::Vendor(detail)) => {
            error!("mentor completion failed: {detail}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Model Error", "details": detail })),
            ))
        }
    }
}
