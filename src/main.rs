mod auth;
mod certificates;
mod config;
mod db;
mod error;
mod pdf;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::certificates::{CertificateService, HttpTemplateFetcher};
use crate::db::PgRepository;
use crate::pdf::PdfRenderer;
use crate::storage::CloudinaryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certify=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let repo = Arc::new(PgRepository::new(pool));
    let store = Arc::new(CloudinaryStore::new(config.cloudinary.clone())?);
    let fetcher = Arc::new(HttpTemplateFetcher::new(config.template_fetch_timeout)?);
    let renderer = Arc::new(PdfRenderer::new(config.font_dir.as_deref())?);

    let state = Arc::new(state::AppState {
        repo: repo.clone(),
        store: store.clone(),
        certificates: CertificateService::new(repo, fetcher, renderer, store),
        config: config.clone(),
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Certify listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
