//! Cloudinary client for hosted profile and record images.
//!
//! Uploads accept anything Cloudinary's `file` parameter accepts (a base64
//! data URI or a remote URL). Every request is signed with SHA-256 over the
//! sorted request parameters followed by the API secret.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Errors that can occur when interacting with the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Public HTTPS URL of the image.
    pub url: String,
    /// Asset id used to delete the image later.
    pub public_id: String,
}

/// Hosted image storage.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload `source` (data URI or URL).
    async fn upload(&self, source: &str) -> Result<UploadedImage, ImageHostError>;

    /// Delete an asset and invalidate cached copies.
    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary-backed [`ImageHost`].
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    upload_preset: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            upload_preset: config.upload_preset.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{BASE_URL}/{}/image/{action}", self.cloud_name)
    }

    /// Add `timestamp`, `api_key` and the signature to `signed` params.
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        params.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, self.api_secret.expose_secret());
        params.push(("api_key", self.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        form: &[(&'static str, String)],
    ) -> Result<T, ImageHostError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .form(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ImageHostError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, source: &str) -> Result<UploadedImage, ImageHostError> {
        let mut form = self.signed_form(vec![("upload_preset", self.upload_preset.clone())]);
        // file is sent but never signed
        form.push(("file", source.to_string()));

        let uploaded: UploadResponse = self.post_form("upload", &form).await?;
        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("invalidate", "true".to_string()),
        ]);

        let destroyed: DestroyResponse = self.post_form("destroy", &form).await?;
        if destroyed.result == "ok" {
            tracing::info!(public_id = %public_id, "Image destroyed");
        } else {
            tracing::warn!(public_id = %public_id, result = %destroyed.result, "Image destroy did not remove an asset");
        }

        Ok(())
    }
}

/// Cloudinary request signature: hex SHA-256 of `k1=v1&k2=v2...` (keys
/// sorted) with the API secret appended.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Test image host that records calls and hands out predictable ids.
    #[derive(Default)]
    pub(crate) struct RecordingImageHost {
        pub uploads: Mutex<Vec<String>>,
        pub destroyed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageHost for RecordingImageHost {
        async fn upload(&self, source: &str) -> Result<UploadedImage, ImageHostError> {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(source.to_string());
            let n = uploads.len();
            Ok(UploadedImage {
                url: format!("https://res.cloudinary.com/demo/image/upload/asset-{n}.png"),
                public_id: format!("crimetrack/asset-{n}"),
            })
        }

        async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
            self.destroyed.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_sign_params_sorts_keys_and_appends_secret() {
        let params = vec![
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
        ];
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"public_id=sample_image&timestamp=1315060510abcd");
            hex::encode(hasher.finalize())
        };
        assert_eq!(sign_params(&params, "abcd"), expected);
    }

    #[test]
    fn test_sign_params_is_order_independent() {
        let a = vec![
            ("invalidate", "true".to_string()),
            ("public_id", "x".to_string()),
            ("timestamp", "1".to_string()),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(sign_params(&a, "s"), sign_params(&b, "s"));
        assert_ne!(sign_params(&a, "s"), sign_params(&a, "t"));
    }

    #[test]
    fn test_signed_form_fields() {
        let client = CloudinaryClient::new(&crate::config::ApiConfig::for_tests().cloudinary)
            .unwrap();
        let form = client.signed_form(vec![("upload_preset", "crimetrack".to_string())]);
        let keys: Vec<&str> = form.iter().map(|(k, _)| *k).collect();

        assert_eq!(
            keys,
            [
                "upload_preset",
                "timestamp",
                "api_key",
                "signature",
                "signature_algorithm"
            ]
        );
        assert_eq!(
            client.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
