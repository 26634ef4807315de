use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{assemble, CertificateData, TemplateFetcher};
use crate::db::{CertificateRepository, Course, Learner, TemplateLayout};
use crate::error::{AppError, AppResult};
use crate::pdf::CertificateRenderer;
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct CertificateService {
    repo: Arc<dyn CertificateRepository>,
    fetcher: Arc<dyn TemplateFetcher>,
    renderer: Arc<dyn CertificateRenderer>,
    store: Arc<dyn ObjectStore>,
}

impl CertificateService {
    pub fn new(
        repo: Arc<dyn CertificateRepository>,
        fetcher: Arc<dyn TemplateFetcher>,
        renderer: Arc<dyn CertificateRenderer>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            renderer,
            store,
        }
    }

    /// Rebuilds the PDF on every call; the image URL is only recorded once.
    pub async fn generate_certificate(&self, user_id: Uuid, course_id: Uuid) -> AppResult<Vec<u8>> {
        let (learner, course) = self.load(user_id, course_id).await?;
        let data = assemble(&learner, &course)?;
        let pdf = self.render(&data, &course).await?;

        let has_image = learner
            .course(course_id)
            .and_then(|r| r.certificate_image_url.as_ref())
            .is_some();
        if !has_image {
            let url = self.store.publish_certificate(pdf.clone()).await?;
            self.attach(user_id, course_id, &url).await?;
        }

        Ok(pdf)
    }

    pub async fn certificate_image(&self, user_id: Uuid, course_id: Uuid) -> AppResult<String> {
        let (learner, course) = self.load(user_id, course_id).await?;

        let record = learner
            .course(course_id)
            .filter(|r| r.is_completed())
            .ok_or_else(|| AppError::not_found("certificate not found"))?;

        if let Some(url) = &record.certificate_image_url {
            debug!(%user_id, %course_id, "Certificate image cache hit");
            return Ok(url.clone());
        }

        let data = assemble(&learner, &course)?;
        let pdf = self.render(&data, &course).await?;
        let url = self.store.publish_certificate(pdf).await?;
        self.attach(user_id, course_id, &url).await?;

        Ok(url)
    }

    async fn load(&self, user_id: Uuid, course_id: Uuid) -> AppResult<(Learner, Course)> {
        let learner = self
            .repo
            .find_learner(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        let course = self
            .repo
            .find_course(course_id)
            .await?
            .ok_or_else(|| AppError::not_found("course not found"))?;
        Ok((learner, course))
    }

    // Course override first, then the latest global template.
    async fn resolve_template(&self, course: &Course) -> AppResult<(String, TemplateLayout)> {
        if let Some(url) = course.certificate_template_url.as_deref().filter(|u| !u.is_empty()) {
            return Ok((url.to_string(), course.template_layout()));
        }

        self.repo
            .latest_template()
            .await?
            .map(|t| (t.template_url, TemplateLayout::default()))
            .ok_or_else(|| AppError::not_found("certificate template not found"))
    }

    async fn render(&self, data: &CertificateData, course: &Course) -> AppResult<Vec<u8>> {
        let (template_url, layout) = self.resolve_template(course).await?;
        let template = self.fetcher.fetch(&template_url).await?;

        let renderer = self.renderer.clone();
        let data = data.clone();
        let pdf = tokio::task::spawn_blocking(move || renderer.render(&data, &template, layout))
            .await
            .map_err(|e| AppError::internal(format!("render task failed: {}", e)))??;

        info!(course_id = %course.id, size = pdf.len(), "Rendered certificate");
        Ok(pdf)
    }

    async fn attach(&self, user_id: Uuid, course_id: Uuid, url: &str) -> AppResult<()> {
        let attached = self
            .repo
            .attach_image_if_absent(user_id, course_id, url)
            .await?;
        if attached {
            info!(%user_id, %course_id, %url, "Recorded certificate image");
        } else {
            debug!(%user_id, %course_id, "Certificate image already recorded");
        }
        Ok(())
    }
}
