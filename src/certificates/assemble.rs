use crate::db::{Course, Learner};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateData {
    pub user_name: String,
    pub course_name: String,
    pub certificate_id: String,
}

pub fn assemble(learner: &Learner, course: &Course) -> AppResult<CertificateData> {
    let record = learner
        .course(course.id)
        .ok_or_else(|| AppError::not_found("course not found for this user"))?;

    let certificate_id = match record.certificate_id.as_deref() {
        Some(id) if record.is_completed() && !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(AppError::PreconditionFailed(
                "course not completed yet".to_string(),
            ))
        }
    };

    Ok(CertificateData {
        user_name: learner.name.clone(),
        course_name: course.title.clone(),
        certificate_id,
    })
}
