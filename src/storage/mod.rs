mod cloudinary;

pub use cloudinary::CloudinaryStore;

use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_template(&self, bytes: Vec<u8>, filename: &str) -> AppResult<String>;

    async fn publish_certificate(&self, pdf: Vec<u8>) -> AppResult<String>;
}
