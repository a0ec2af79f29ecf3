use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{list_notifications, mark_notification_read};
use crate::app_state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/{id}/read", post(mark_notification_read))
}
