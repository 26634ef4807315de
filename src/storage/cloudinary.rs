use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing::{debug, info};

use super::ObjectStore;
use crate::config::CloudinaryConfig;
use crate::error::{AppError, AppResult};

const CERTIFICATE_FOLDER: &str = "certificates";
const TEMPLATE_FOLDER: &str = "certificate-templates";
const CERTIFICATE_FORMAT: &str = "png";
// First page, upscaled to 2000px wide at full quality and 300 dpi density.
const CERTIFICATE_TRANSFORMATION: &str = "pg_1,w_2000,c_scale,q_100,dn_300";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: Option<UploadErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorDetail {
    message: Option<String>,
}

pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        params: Vec<(&'static str, String)>,
    ) -> AppResult<String> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut signed: Vec<(&str, String)> = params;
        signed.push(("timestamp", timestamp));
        let signature = sign_params(&signed, &self.config.api_secret);

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in signed {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("upload request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::upstream(format!("upload response read failed: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<UploadErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(AppError::upstream(format!(
                "image host returned {}: {}",
                status, message
            )));
        }

        let parsed: UploadResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::upstream(format!("upload response parse error: {}", e)))?;

        parsed
            .secure_url
            .or(parsed.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::upstream("image host response did not include a URL"))
    }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    async fn upload_template(&self, bytes: Vec<u8>, filename: &str) -> AppResult<String> {
        debug!(size = bytes.len(), filename, "Uploading certificate template");
        let url = self
            .upload(bytes, filename, vec![("folder", TEMPLATE_FOLDER.to_string())])
            .await?;
        info!(%url, "Uploaded certificate template");
        Ok(url)
    }

    async fn publish_certificate(&self, pdf: Vec<u8>) -> AppResult<String> {
        debug!(size = pdf.len(), "Publishing certificate");
        self.upload(
            pdf,
            "certificate.pdf",
            vec![
                ("folder", CERTIFICATE_FOLDER.to_string()),
                ("format", CERTIFICATE_FORMAT.to_string()),
                ("transformation", CERTIFICATE_TRANSFORMATION.to_string()),
            ],
        )
        .await
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, suffixed with the API secret, SHA-1 hex encoded.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
