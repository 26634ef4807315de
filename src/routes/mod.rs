mod certificates;
mod templates;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/certificates/:course_id", get(certificates::download_certificate))
        .route("/certificates/:course_id/image", get(certificates::certificate_image))
        .route("/certificate-settings", get(templates::get_settings))
        .route(
            "/certificate-settings/template",
            post(templates::upload_settings_template),
        )
        .route(
            "/courses/:course_id/certificate-template",
            post(templates::upload_course_template)
                .get(templates::get_course_template)
                .delete(templates::delete_course_template),
        )
        .route(
            "/courses/:course_id/certificate-template/config",
            put(templates::update_course_template_config),
        )
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
