//! In-memory stand-ins for the database, image host, template fetcher and
//! renderer.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::encode_token;
use crate::certificates::{CertificateData, CertificateService, TemplateFetcher};
use crate::config::{CloudinaryConfig, Config};
use crate::db::{
    CertificateRepository, Course, CourseStatus, Learner, LearnerCourseRecord, Role,
    TemplateLayout, TemplateSettings, UserRow,
};
use crate::error::{AppError, AppResult};
use crate::pdf::CertificateRenderer;
use crate::state::AppState;
use crate::storage::ObjectStore;

pub const TEMPLATE_URL: &str = "https://img.example.com/global.png";
pub const JWT_SECRET: &str = "test-secret";

#[derive(Default)]
struct RepoInner {
    users: HashMap<Uuid, UserRow>,
    courses: HashMap<Uuid, Course>,
    records: Vec<LearnerCourseRecord>,
    templates: Vec<TemplateSettings>,
    attach_writes: usize,
}

#[derive(Default)]
pub struct FakeRepository {
    inner: Mutex<RepoInner>,
}

impl FakeRepository {
    pub fn add_user(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().users.insert(
            id,
            UserRow {
                id,
                name: name.to_string(),
                role,
            },
        );
        id
    }

    pub fn add_course(&self, title: &str, owner_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().courses.insert(
            id,
            Course {
                id,
                title: title.to_string(),
                owner_id,
                certificate_template_url: None,
                certificate_template_config: None,
            },
        );
        id
    }

    pub fn add_record(&self, record: LearnerCourseRecord) {
        self.inner.lock().unwrap().records.push(record);
    }

    pub fn add_template_at(&self, url: &str, updated_by: Uuid, age: ChronoDuration) {
        self.inner.lock().unwrap().templates.push(TemplateSettings {
            id: Uuid::new_v4(),
            template_url: url.to_string(),
            updated_at: Utc::now() - age,
            updated_by,
        });
    }

    pub fn image_url(&self, user_id: Uuid, course_id: Uuid) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.user_id == user_id && r.course_id == course_id)
            .and_then(|r| r.certificate_image_url.clone())
    }

    pub fn set_image_url(&self, user_id: Uuid, course_id: Uuid, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(r) = inner
            .records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.course_id == course_id)
        {
            r.certificate_image_url = Some(url.to_string());
        }
    }

    pub fn course(&self, course_id: Uuid) -> Option<Course> {
        self.inner.lock().unwrap().courses.get(&course_id).cloned()
    }

    pub fn template_count(&self) -> usize {
        self.inner.lock().unwrap().templates.len()
    }

    pub fn attach_writes(&self) -> usize {
        self.inner.lock().unwrap().attach_writes
    }
}

#[async_trait]
impl CertificateRepository for FakeRepository {
    async fn find_learner(&self, user_id: Uuid) -> Result<Option<Learner>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).map(|u| Learner {
            id: u.id,
            name: u.name.clone(),
            role: u.role,
            courses: inner
                .records
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
        }))
    }

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        Ok(self.course(course_id))
    }

    async fn latest_template(&self) -> Result<Option<TemplateSettings>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.templates.iter().max_by_key(|t| t.updated_at).cloned())
    }

    async fn insert_template(
        &self,
        template_url: &str,
        updated_by: Uuid,
    ) -> Result<TemplateSettings, sqlx::Error> {
        let settings = TemplateSettings {
            id: Uuid::new_v4(),
            template_url: template_url.to_string(),
            updated_at: Utc::now(),
            updated_by,
        };
        self.inner.lock().unwrap().templates.push(settings.clone());
        Ok(settings)
    }

    async fn attach_image_if_absent(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        image_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let record = inner.records.iter_mut().find(|r| {
            r.user_id == user_id && r.course_id == course_id && r.certificate_image_url.is_none()
        });
        match record {
            Some(r) => {
                r.certificate_image_url = Some(image_url.to_string());
                inner.attach_writes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_course_template(
        &self,
        course_id: Uuid,
        template_url: Option<&str>,
        layout: Option<TemplateLayout>,
    ) -> Result<Option<Course>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.courses.get_mut(&course_id).map(|c| {
            c.certificate_template_url = template_url.map(str::to_string);
            c.certificate_template_config = layout.map(sqlx::types::Json);
            c.clone()
        }))
    }

    async fn set_course_layout(
        &self,
        course_id: Uuid,
        layout: TemplateLayout,
    ) -> Result<Option<Course>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.courses.get_mut(&course_id).map(|c| {
            c.certificate_template_config = Some(sqlx::types::Json(layout));
            c.clone()
        }))
    }

    async fn clear_course_images(&self, course_id: Uuid) -> Result<u64, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let mut cleared = 0;
        for r in inner
            .records
            .iter_mut()
            .filter(|r| r.course_id == course_id && r.certificate_image_url.is_some())
        {
            r.certificate_image_url = None;
            cleared += 1;
        }
        Ok(cleared)
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    templates: Mutex<HashMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeFetcher {
    pub fn insert(&self, url: &str, bytes: &[u8]) {
        self.templates
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> AppResult<Vec<u8>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::upstream("template host unreachable"));
        }
        self.fetched.lock().unwrap().push(url.to_string());
        self.templates
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::upstream(format!("template fetch returned 404 for {}", url)))
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    calls: AtomicUsize,
    last_layout: Mutex<Option<TemplateLayout>>,
}

impl FakeRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_layout(&self) -> Option<TemplateLayout> {
        *self.last_layout.lock().unwrap()
    }
}

impl CertificateRenderer for FakeRenderer {
    fn render(
        &self,
        data: &CertificateData,
        template: &[u8],
        layout: TemplateLayout,
    ) -> AppResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_layout.lock().unwrap() = Some(layout);
        Ok(format!(
            "%PDF-fake\n{}\n{}\nCertificate ID: {}\n{}",
            data.user_name,
            data.course_name,
            data.certificate_id,
            template.len()
        )
        .into_bytes())
    }
}

#[derive(Default)]
pub struct FakeStore {
    uploads: AtomicUsize,
    published: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeStore {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn publishes(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn published_urls(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload_template(&self, _bytes: Vec<u8>, filename: &str) -> AppResult<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::upstream("image host rejected upload"));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://res.example.com/certificate-templates/{}-{}",
            n, filename
        ))
    }

    async fn publish_certificate(&self, _pdf: Vec<u8>) -> AppResult<String> {
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::upstream("image host rejected upload"));
        }
        let mut published = self.published.lock().unwrap();
        let url = format!("https://res.example.com/certificates/{}.png", published.len());
        published.push(url.clone());
        Ok(url)
    }
}

/// A learner, a trainer-owned course, an admin, and a global template.
pub struct Fixture {
    pub repo: Arc<FakeRepository>,
    pub fetcher: Arc<FakeFetcher>,
    pub renderer: Arc<FakeRenderer>,
    pub store: Arc<FakeStore>,
    pub service: CertificateService,
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub trainer_id: Uuid,
    pub course_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let fx = Self::without_template().await;
        fx.repo
            .add_template_at(TEMPLATE_URL, fx.admin_id, ChronoDuration::hours(1));
        fx
    }

    pub async fn without_template() -> Self {
        let repo = Arc::new(FakeRepository::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let renderer = Arc::new(FakeRenderer::default());
        let store = Arc::new(FakeStore::default());

        let user_id = repo.add_user("Ada Lovelace", Role::Student);
        let admin_id = repo.add_user("Grace Hopper", Role::Admin);
        let trainer_id = repo.add_user("Alan Turing", Role::Trainer);
        let course_id = repo.add_course("Analytical Engines 101", trainer_id);
        fetcher.insert(TEMPLATE_URL, b"global-template");

        let service = CertificateService::new(
            repo.clone(),
            fetcher.clone(),
            renderer.clone(),
            store.clone(),
        );

        Self {
            repo,
            fetcher,
            renderer,
            store,
            service,
            user_id,
            admin_id,
            trainer_id,
            course_id,
        }
    }

    pub async fn enroll(&self, status: CourseStatus, certificate_id: Option<&str>) {
        self.repo.add_record(LearnerCourseRecord {
            user_id: self.user_id,
            course_id: self.course_id,
            status,
            certificate_id: certificate_id.map(str::to_string),
            certificate_image_url: None,
        });
    }

    pub fn token(&self, user_id: Uuid, role: Role) -> String {
        encode_token(user_id, role, JWT_SECRET, 3600)
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            repo: self.repo.clone(),
            store: self.store.clone(),
            certificates: self.service.clone(),
            config: Arc::new(test_config()),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        cloudinary: CloudinaryConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        },
        font_dir: None::<PathBuf>,
        template_fetch_timeout: Duration::from_secs(1),
        max_upload_bytes: 1024 * 1024,
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}
