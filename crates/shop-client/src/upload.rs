//! # Image Upload
//!
//! Unsigned Cloudinary uploads for product images. The returned secure URL
//! goes into `ProductDraft::image_url`.

use crate::client::error_for_status;
use crate::config::UploadConfig;
use crate::ApiClient;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use shop_core::{ShopError, ShopResult};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ImageUploader {
    config: UploadConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl ImageUploader {
    pub fn new(config: UploadConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Uploader sharing the API client's connection pool, when uploads are configured
    pub fn from_api(api: &ApiClient) -> ShopResult<Self> {
        let config = api.config().upload.clone().ok_or_else(|| {
            ShopError::Configuration("image upload is not configured".to_string())
        })?;
        Ok(Self::new(config, api.http().clone()))
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> ShopResult<String> {
        if bytes.is_empty() {
            return Err(ShopError::Validation(vec![shop_core::FieldError::required("file")]));
        }

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ShopError::Configuration(format!("invalid content type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone());

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(match error_for_status(status, &body) {
                ShopError::Provider { message, .. } => ShopError::Provider {
                    provider: "cloudinary".to_string(),
                    message,
                },
                other => other,
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)?;
        info!("Uploaded image {}", file_name);
        Ok(parsed.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.test/demo/remera.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiConfig::new("http://api.shop.test")
            .with_upload(UploadConfig::new("demo", "unsigned").with_api_base_url(server.uri()));
        let uploader = ImageUploader::from_api(&ApiClient::new(config).unwrap()).unwrap();

        let url = uploader
            .upload("remera.png", "image/png", vec![0x89, b'P', b'N', b'G'])
            .await
            .unwrap();
        assert_eq!(url, "https://res.cloudinary.test/demo/remera.png");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"upload_preset\""));
        assert!(body.contains("unsigned"));
    }

    #[test]
    fn test_unconfigured_upload() {
        let client = ApiClient::new(ApiConfig::new("http://api.shop.test")).unwrap();
        assert!(matches!(
            ImageUploader::from_api(&client),
            Err(ShopError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let uploader = ImageUploader::new(UploadConfig::new("demo", "unsigned"), reqwest::Client::new());
        let err = uploader.upload("a.png", "image/png", Vec::new()).await.unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
    }
}
