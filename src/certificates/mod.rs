mod assemble;
mod fetch;
mod service;

pub use assemble::{assemble, CertificateData};
pub use fetch::{HttpTemplateFetcher, TemplateFetcher};
pub use service::CertificateService;
