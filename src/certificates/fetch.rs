use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<Vec<u8>>;
}

pub struct HttpTemplateFetcher {
    client: Client,
}

impl HttpTemplateFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TemplateFetcher for HttpTemplateFetcher {
    async fn fetch(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("template fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "template fetch returned {} for {}",
                status, url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream(format!("template read failed: {}", e)))?;

        Ok(bytes.to_vec())
    }
}
