use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::{Attachment, GeotaggedPhoto, Report, ReportFields, UpdateReport, UploadedFile};
use crate::error::{AppError, AppResult};
use crate::modules::reports::service::AllowedTransitions;
use crate::workflow::{Actor, UploadRejection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub target_status: String,
    pub comment: Option<String>,
}

pub async fn create_report(
    State(state): State<AppState>,
    actor: Actor,
    Json(fields): Json<ReportFields>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let report = state.reports.create_report(&actor, fields)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Report>>> {
    Ok(Json(state.reports.list_reports(&actor)?))
}

pub async fn get_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    Ok(Json(state.reports.get_report(&actor, report_id)?))
}

pub async fn update_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
    Json(changes): Json<UpdateReport>,
) -> AppResult<Json<Report>> {
    Ok(Json(state.reports.update_report(&actor, report_id, changes)?))
}

pub async fn request_transition(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> AppResult<Json<Report>> {
    let report = state
        .reports
        .transition(&actor, report_id, &request.target_status, request.comment)?;
    Ok(Json(report))
}

pub async fn allowed_transitions(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<AllowedTransitions>> {
    Ok(Json(state.reports.allowed_transitions(&actor, report_id)?))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<GeotaggedPhoto>)> {
    let form = read_upload_form(multipart, state.env.uploads.max_photo_size_mb).await?;
    let photo = state
        .reports
        .upload_photo(&actor, report_id, form.file, form.caption)
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn upload_document(
    State(state): State<AppState>,
    actor: Actor,
    Path(report_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Attachment>)> {
    let form = read_upload_form(multipart, state.env.uploads.max_document_size_mb).await?;
    let attachment = state.reports.upload_document(&actor, report_id, form.file)?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

struct UploadForm {
    file: UploadedFile,
    caption: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart, max_size_mb: u64) -> AppResult<UploadForm> {
    let mut file = None;
    let mut caption = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, max_size_mb))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| multipart_error(err, max_size_mb))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("caption") => {
                caption = Some(field.text().await.map_err(|err| multipart_error(err, max_size_mb))?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("missing multipart field `file`".to_string()))?;
    Ok(UploadForm { file, caption })
}

fn multipart_error(err: MultipartError, max_size_mb: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadRejection::TooLarge { max_size_mb }.into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}
