// rest/routes/shop.rs — shop purchase REST route.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::rest::auth;
use crate::shop::{self, ShopError};
use crate::AppContext;

#[derive(Deserialize)]
pub struct BuyRequest {
    pub item_id: Option<String>,
    pub price: Option<i64>,
}

/// `POST /api/v1/shop/buy`
///
/// Request: `{ "item_id": "streak_freeze", "price": 10000 }`
/// Response: `{ "success": true, "newBalance": 40000 }`
///
/// 400 on an unknown item or insufficient funds; a failed purchase never
/// mutates the wallet.
pub async fn buy(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<BuyRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = auth::require_user(&ctx, &headers).await?;

    let item_id = body.item_id.unwrap_or_default();
    let price = body.price.unwrap_or(0);

    match shop::purchase(&ctx.storage, &user_id, &item_id, price).await {
        Ok(new_balance) => Ok(Json(json!({ "success": true, "newBalance": new_balance }))),
        Err(ShopError::UnknownItem(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "UnknownItem" })),
        )),
        Err(ShopError::InvalidPrice(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "InvalidPrice" })),
        )),
        Err(ShopError::InsufficientFunds) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "InsufficientFunds" })),
        )),
        Err(ShopError::Store(e)) => {
            error!(%user_id, "purchase failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            ))
        }
    }
}
