use crate::certificates::CertificateService;
use crate::config::Config;
use crate::db::CertificateRepository;
use crate::storage::ObjectStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn CertificateRepository>,
    pub store: Arc<dyn ObjectStore>,
    pub certificates: CertificateService,
    pub config: Arc<Config>,
}
