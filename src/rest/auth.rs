// rest/auth.rs — request-scoped identity for the REST API.
//
// Every authenticated endpoint resolves `Authorization: Bearer <token>` to a
// user id up front and passes it explicitly into the domain layer. There is
// no ambient current-user state.

use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::AppContext;

pub type AuthRejection = (StatusCode, Json<Value>);

fn unauthorized() -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
}

/// Resolve the calling user or reject with 401.
///
/// A storage failure during lookup is a 500, not a 401.
pub async fn require_user(ctx: &AppContext, headers: &HeaderMap) -> Result<String, AuthRejection> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    match ctx.storage.resolve_token(token).await {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(unauthorized()),
        Err(e) => {
            error!("auth token lookup failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            ))
        }
    }
}
