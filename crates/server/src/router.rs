//! HTTP router construction (C15, §6).
//!
//! Assembles all read-API and trigger routes into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::identity;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.server.cors_origin == "*" {
        CorsLayer::permissive()
    } else {
        let origin: axum::http::HeaderValue = state
            .config
            .server
            .cors_origin
            .parse()
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*"));
        CorsLayer::new().allow_origin(origin).allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any)
    };

    Router::new()
        .route("/health", get(api::health))
        .route("/api/opportunities", get(api::opportunities))
        .route("/api/opportunities/{id}", get(api::opportunity_detail))
        .route("/api/opportunities/{id}/features", get(api::opportunity_features))
        .route("/api/opportunities/{id}/landing", get(api::opportunity_landing))
        .route("/api/opportunities/{id}/outreach", get(api::opportunity_outreach))
        .route("/api/opportunities/{id}/geo", get(api::opportunity_geo))
        .route("/api/painpoints", get(api::painpoints))
        .route("/api/topics", get(api::topics))
        .route("/api/stats", get(api::stats))
        .route("/api/trends", get(api::trends))
        .route("/api/trends/hot", get(api::trends_hot))
        .route("/api/trends/cooling", get(api::trends_cooling))
        .route("/api/trends/history/{topic}", get(api::trend_history))
        .route("/api/competitors", get(api::competitors))
        .route("/api/competitors/{product}", get(api::competitors_by_product))
        .route("/api/feature-gaps", get(api::feature_gaps))
        .route("/api/market", get(api::market_list))
        .route("/api/market/{id}", get(api::market_detail))
        .route("/api/features", get(api::features))
        .route("/api/alerts", get(api::alerts))
        .route("/api/alerts/count", get(api::alerts_count))
        .route("/api/alerts/{id}/read", post(api::alert_mark_read))
        .route("/api/alerts/read-all", post(api::alerts_mark_all_read))
        .route("/api/geo/stats", get(api::geo_stats))
        .route("/api/geo/{region}", get(api::geo_region))
        .route("/api/outreach/export", get(api::outreach_export))
        .route("/api/outreach/{id}/status", post(api::outreach_update_status))
        .route("/api/trigger/{action}", post(api::trigger))
        .layer(axum::middleware::from_fn_with_state(state.clone(), identity::touch_user))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
