// rest/mod.rs — Public REST API server.
//
// Axum HTTP server exposing the reward core under /api/v1.
//
// Endpoints:
//   POST /api/v1/progress/save
//   GET  /api/v1/progress
//   POST /api/v1/shop/buy
//   GET  /api/v1/wallet
//   GET  /api/v1/rewards
//   POST /api/v1/mentor/chat
//   GET  /api/v1/health

pub mod auth;
pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(routes::health::health))
        // Lesson progress
        .route(
            "/api/v1/progress",
            get(routes::progress::list_progress),
        )
        .route(
            "/api/v1/progress/save",
            post(routes::progress::save_progress),
        )
        // Shop
        .route("/api/v1/shop/buy", post(routes::shop::buy))
        // Wallet & rewards summaries
        .route("/api/v1/wallet", get(routes::wallet::get_wallet))
        .route("/api/v1/rewards", get(routes::wallet::get_rewards))
        // AI mentor
        .route("/api/v1/mentor/chat", post(routes::mentor::chat))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
