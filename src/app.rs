use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

use crate::{
    app_state::AppState,
    middleware::observability_middleware,
    modules::{
        notifications::{handlers::permission_catalogue, notification_routes},
        reports::report_routes,
    },
    websocket::websocket_routes,
};

pub fn create_router(state: AppState) -> Router {
    let ws_app = websocket_routes().with_state(state.ws_tx.clone());
    let body_limit = state.env.uploads.body_limit_bytes();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/permissions", get(permission_catalogue))
        .nest("/reports", report_routes(body_limit))
        .nest("/notifications", notification_routes())
        .merge(ws_app)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "service": state.env.app.name,
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "notifications": {
                "unread": state.notifications.unread_count(),
                "pendingDeliveries": state.reports.pending_deliveries(),
            },
            "telemetry": crate::telemetry::telemetry_health_check()
        }
    }))
}
