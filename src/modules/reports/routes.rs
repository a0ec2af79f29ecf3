use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers::{
    allowed_transitions, create_report, get_report, list_reports, request_transition,
    update_report, upload_document, upload_photo,
};
use crate::app_state::AppState;

/// Upload routes get their own body limit, sized from the upload config.
pub fn report_routes(upload_body_limit: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route("/{id}/photos", post(upload_photo))
        .route("/{id}/attachments", post(upload_document))
        .layer(DefaultBodyLimit::max(upload_body_limit));

    Router::new()
        .route("/", post(create_report).get(list_reports))
        .route("/{id}", get(get_report).patch(update_report))
        .route(
            "/{id}/transitions",
            post(request_transition).get(allowed_transitions),
        )
        .merge(uploads)
}
