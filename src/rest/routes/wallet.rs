// rest/routes/wallet.rs — wallet balance and rewards summary reads.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::rest::auth;
use crate::AppContext;

fn store_failure(user_id: &str, what: &str, e: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!(user_id, "failed to fetch {what}: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error" })),
    )
}

/// `GET /api/v1/wallet` — `{ "balance": 50000 }`
pub async fn get_wallet(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = auth::require_user(&ctx, &headers).await?;

    let balance = ctx
        .storage
        .wallet_balance(&user_id)
        .await
        .map_err(|e| store_failure(&user_id, "wallet", e))?
        .unwrap_or(0);
    Ok(Json(json!({ "balance": balance })))
}

/// `GET /api/v1/rewards` — streak + XP summary for the dashboard header.
///
/// Zero-values are returned before the user's first activity:
/// ```json
/// { "current_streak": 0, "longest_streak": 0, "freeze_count": 0,
///   "total_xp": 0, "league": "bronze" }
/// ```
pub async fn get_rewards(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = auth::require_user(&ctx, &headers).await?;

    let streak = ctx
        .storage
        .get_streak(&user_id)
        .await
        .map_err(|e| store_failure(&user_id, "streak", e))?;
    let profile = ctx
        .storage
        .get_profile(&user_id)
        .await
        .map_err(|e| store_failure(&user_id, "profile", e))?;

    let (current, longest, freezes) = streak
        .map(|s| (s.current_streak, s.longest_streak, s.freeze_count))
        .unwrap_or((0, 0, 0));
    let (total_xp, league) = profile
        .map(|p| (p.total_xp, p.league))
        .unwrap_or((0, "bronze".to_string()));

    Ok(Json(json!({
        "current_streak": current,
        "longest_streak": longest,
        "freeze_count": freezes,
        "total_xp": total_xp,
        "league": league,
    })))
}
