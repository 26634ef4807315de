use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{Course, CourseTemplate, TemplateLayout};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const TEMPLATE_FIELD: &str = "template";

struct TemplateUpload {
    bytes: Vec<u8>,
    filename: String,
}

async fn read_template(mut multipart: Multipart) -> AppResult<TemplateUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some(TEMPLATE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("template").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("uploaded template is empty".to_string()));
        }
        if !is_image(content_type.as_deref(), &filename) {
            return Err(AppError::BadRequest("template must be an image".to_string()));
        }

        return Ok(TemplateUpload {
            bytes: bytes.to_vec(),
            filename,
        });
    }

    Err(AppError::BadRequest("no template file uploaded".to_string()))
}

fn is_image(content_type: Option<&str>, filename: &str) -> bool {
    match content_type {
        Some(ct) if ct != "application/octet-stream" => ct.starts_with("image/"),
        _ => mime_guess::from_path(filename)
            .first()
            .map_or(false, |m| m.type_() == mime_guess::mime::IMAGE),
    }
}

async fn managed_course(state: &AppState, user: &AuthUser, course_id: Uuid) -> AppResult<Course> {
    let course = state
        .repo
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::not_found("course not found"))?;
    user.require_course_manager(&course)?;
    Ok(course)
}

async fn invalidate_images(state: &AppState, course_id: Uuid) -> AppResult<()> {
    let cleared = state.repo.clear_course_images(course_id).await?;
    if cleared > 0 {
        info!(%course_id, cleared, "Cleared cached certificate images");
    }
    Ok(())
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let body = match state.repo.latest_template().await? {
        Some(settings) => serde_json::to_value(settings).map_err(AppError::internal)?,
        None => serde_json::json!({ "templateUrl": null }),
    };
    Ok(Json(body))
}

pub async fn upload_settings_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let upload = read_template(multipart).await?;

    let url = state
        .store
        .upload_template(upload.bytes, &upload.filename)
        .await?;
    let settings = state.repo.insert_template(&url, user.id).await?;
    info!(admin_id = %user.id, %url, "Global certificate template updated");

    Ok((StatusCode::CREATED, Json(settings)))
}

pub async fn upload_course_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<CourseTemplate>> {
    let course = managed_course(&state, &user, course_id).await?;
    let upload = read_template(multipart).await?;

    let url = state
        .store
        .upload_template(upload.bytes, &upload.filename)
        .await?;
    let course = state
        .repo
        .set_course_template(course_id, Some(&url), Some(course.template_layout()))
        .await?
        .ok_or_else(|| AppError::not_found("course not found"))?;
    invalidate_images(&state, course_id).await?;
    info!(%course_id, %url, "Course certificate template updated");

    Ok(Json(CourseTemplate::from(&course)))
}

pub async fn get_course_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseTemplate>> {
    let course = managed_course(&state, &user, course_id).await?;
    Ok(Json(CourseTemplate::from(&course)))
}

pub async fn update_course_template_config(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(layout): Json<TemplateLayout>,
) -> AppResult<Json<CourseTemplate>> {
    managed_course(&state, &user, course_id).await?;

    let course = state
        .repo
        .set_course_layout(course_id, layout)
        .await?
        .ok_or_else(|| AppError::not_found("course not found"))?;
    invalidate_images(&state, course_id).await?;

    Ok(Json(CourseTemplate::from(&course)))
}

pub async fn delete_course_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let course = managed_course(&state, &user, course_id).await?;
    if course.certificate_template_url.is_none() {
        return Err(AppError::not_found("certificate template not found"));
    }

    state.repo.set_course_template(course_id, None, None).await?;
    invalidate_images(&state, course_id).await?;
    info!(%course_id, "Course certificate template removed");

    Ok(StatusCode::NO_CONTENT)
}
