mod models;

pub use models::*;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn find_learner(&self, user_id: Uuid) -> Result<Option<Learner>, sqlx::Error>;

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error>;

    async fn latest_template(&self) -> Result<Option<TemplateSettings>, sqlx::Error>;

    async fn insert_template(
        &self,
        template_url: &str,
        updated_by: Uuid,
    ) -> Result<TemplateSettings, sqlx::Error>;

    /// Sets the record's image URL only while it is still empty. Returns
    /// `true` when this call performed the write.
    async fn attach_image_if_absent(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        image_url: &str,
    ) -> Result<bool, sqlx::Error>;

    async fn set_course_template(
        &self,
        course_id: Uuid,
        template_url: Option<&str>,
        layout: Option<TemplateLayout>,
    ) -> Result<Option<Course>, sqlx::Error>;

    async fn set_course_layout(
        &self,
        course_id: Uuid,
        layout: TemplateLayout,
    ) -> Result<Option<Course>, sqlx::Error>;

    async fn clear_course_images(&self, course_id: Uuid) -> Result<u64, sqlx::Error>;
}

pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateRepository for PgRepository {
    async fn find_learner(&self, user_id: Uuid) -> Result<Option<Learner>, sqlx::Error> {
        let user = sqlx::query_as::<_, UserRow>("SELECT id, name, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let courses = sqlx::query_as::<_, LearnerCourseRecord>(
            r#"
            SELECT user_id, course_id, status, certificate_id, certificate_image_url
            FROM learner_courses
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(Some(Learner {
            id: user.id,
            name: user.name,
            role: user.role,
            courses,
        }))
    }

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, owner_id, certificate_template_url, certificate_template_config
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(self.pool.as_ref())
        .await
    }

    async fn latest_template(&self) -> Result<Option<TemplateSettings>, sqlx::Error> {
        sqlx::query_as::<_, TemplateSettings>(
            "SELECT * FROM template_settings ORDER BY updated_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(self.pool.as_ref())
        .await
    }

    async fn insert_template(
        &self,
        template_url: &str,
        updated_by: Uuid,
    ) -> Result<TemplateSettings, sqlx::Error> {
        sqlx::query_as::<_, TemplateSettings>(
            r#"
            INSERT INTO template_settings (id, template_url, updated_by)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(template_url)
        .bind(updated_by)
        .fetch_one(self.pool.as_ref())
        .await
    }

    async fn attach_image_if_absent(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        image_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE learner_courses
            SET certificate_image_url = $3
            WHERE user_id = $1 AND course_id = $2 AND certificate_image_url IS NULL
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(image_url)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_course_template(
        &self,
        course_id: Uuid,
        template_url: Option<&str>,
        layout: Option<TemplateLayout>,
    ) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET certificate_template_url = $2, certificate_template_config = $3
            WHERE id = $1
            RETURNING id, title, owner_id, certificate_template_url, certificate_template_config
            "#,
        )
        .bind(course_id)
        .bind(template_url)
        .bind(layout.map(sqlx::types::Json))
        .fetch_optional(self.pool.as_ref())
        .await
    }

    async fn set_course_layout(
        &self,
        course_id: Uuid,
        layout: TemplateLayout,
    ) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET certificate_template_config = $2
            WHERE id = $1
            RETURNING id, title, owner_id, certificate_template_url, certificate_template_config
            "#,
        )
        .bind(course_id)
        .bind(sqlx::types::Json(layout))
        .fetch_optional(self.pool.as_ref())
        .await
    }

    async fn clear_course_images(&self, course_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE learner_courses
            SET certificate_image_url = NULL
            WHERE course_id = $1 AND certificate_image_url IS NOT NULL
            "#,
        )
        .bind(course_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
