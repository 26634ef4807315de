use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Response> {
    let pdf = state
        .certificates
        .generate_certificate(user.id, course_id)
        .await?;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"certificate-{}.pdf\"", course_id),
            ),
        ],
        pdf,
    )
        .into_response())
}

pub async fn certificate_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<ImageResponse>> {
    let url = state
        .certificates
        .certificate_image(user.id, course_id)
        .await?;

    Ok(Json(ImageResponse { image_url: url }))
}
