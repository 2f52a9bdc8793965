//! # API Configuration
//!
//! Configuration for the storefront REST API and the image-upload service.
//! Values are loaded from environment variables (and `.env` when present).

use reqwest::Url;
use shop_core::{FieldError, ShopError, ShopResult};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Storefront API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the REST API (no trailing slash)
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Image upload settings, when product images can be uploaded
    pub upload: Option<UploadConfig>,
}

/// Cloudinary unsigned-upload settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    /// Upload endpoint base (for testing/mocking)
    pub api_base_url: String,
}

impl UploadConfig {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            api_base_url: "https://api.cloudinary.com".to_string(),
        }
    }

    pub fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.api_base_url, self.cloud_name)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SHOP_API_BASE_URL`
    ///
    /// Optional:
    /// - `SHOP_API_TIMEOUT_SECS` (default 30)
    /// - `CLOUDINARY_CLOUD_NAME` and `CLOUDINARY_UPLOAD_PRESET` (both or neither)
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let base_url = env::var("SHOP_API_BASE_URL")
            .map_err(|_| ShopError::Configuration("SHOP_API_BASE_URL not set".to_string()))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ShopError::Configuration(
                "SHOP_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let timeout = match env::var("SHOP_API_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ShopError::Configuration(format!("SHOP_API_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let upload = match (
            env::var("CLOUDINARY_CLOUD_NAME").ok(),
            env::var("CLOUDINARY_UPLOAD_PRESET").ok(),
        ) {
            (Some(cloud), Some(preset)) => Some(UploadConfig::new(cloud, preset)),
            (None, None) => None,
            _ => {
                return Err(ShopError::Configuration(
                    "CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET must be set together"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            upload,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            upload: None,
        }
    }

    /// Builder: set image upload settings
    pub fn with_upload(mut self, upload: UploadConfig) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for an API path given as segments. Each segment is
    /// percent-encoded on its own, so `/`, `?` or `#` inside an id stay part
    /// of that id.
    pub fn url(&self, segments: &[&str]) -> ShopResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ShopError::Validation(vec![FieldError::invalid(
                "id",
                format!("{:?} is not a valid id", bad),
            )]));
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ShopError::Configuration(format!("invalid API base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ShopError::Configuration(format!("API base URL cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ApiConfig::new("https://api.shop.test/");
        assert_eq!(
            config.url(&["products"]).unwrap().as_str(),
            "https://api.shop.test/products"
        );
        assert_eq!(
            config.url(&["role", "a@b.c"]).unwrap().as_str(),
            "https://api.shop.test/role/a@b.c"
        );

        let prefixed = ApiConfig::new("https://shop.test/api");
        assert_eq!(
            prefixed.url(&["boughtProduct", "AllboughtProducts"]).unwrap().as_str(),
            "https://shop.test/api/boughtProduct/AllboughtProducts"
        );
    }

    #[test]
    fn test_ids_stay_one_segment() {
        let config = ApiConfig::new("https://api.shop.test");

        let url = config.url(&["products", "../login?admin=1#x"]).unwrap();
        assert_eq!(url.path(), "/products/..%2Flogin%3Fadmin=1%23x");
        assert_eq!(url.query(), None);

        for bad in ["..", ".", ""] {
            let err = config.url(&["products", bad]).unwrap_err();
            assert!(matches!(err, ShopError::Validation(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_upload_url() {
        let upload = UploadConfig::new("demo", "unsigned");
        assert_eq!(
            upload.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_from_env_missing_base_url() {
        env::remove_var("SHOP_API_BASE_URL");

        let result = ApiConfig::from_env();
        assert!(result.is_err());
    }
}
