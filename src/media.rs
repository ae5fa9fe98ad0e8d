//! Signed image uploads to Cloudinary.
//!
//! Upload parameters are signed server-side with the API secret, so the
//! secret never leaves the process. Signatures use SHA-256; the Cloudinary
//! product environment must be set to accept SHA-256 signed requests.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::error::ApiError;

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone)]
pub struct CloudinaryClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadedImage {
    pub public_id: String,
    #[serde(rename(deserialize = "secure_url"))]
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub bytes: Option<u64>,
}

/// `k=v` pairs in key order joined by `&`, followed by the secret, hashed.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&");
    hex::encode(Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

impl CloudinaryClient {
    /// `None` unless cloud name, key and secret are all configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let set = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from);
        Some(Self {
            cloud_name: set(&config.cloudinary_cloud_name)?,
            api_key: set(&config.cloudinary_api_key)?,
            api_secret: set(&config.cloudinary_api_secret)?,
            http: reqwest::Client::new(),
        })
    }

    /// `file` is a remote URL or a base64 data URI.
    #[instrument(skip(self, file))]
    pub async fn upload_image(&self, file: &str, folder: &str) -> Result<UploadedImage, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.api_secret);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("file", file.to_string()));
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));

        let response = self.http
            .post(format!("{}/{}/image/upload", CLOUDINARY_API, self.cloud_name))
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Cloudinary request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Cloudinary rejected upload");
            return Err(if status.is_client_error() {
                ApiError::BadRequest("Image upload was rejected".into())
            } else {
                ApiError::Internal(format!("Cloudinary error {}: {}", status, body))
            });
        }

        let image: UploadedImage = response.json().await.map_err(|e| ApiError::Internal(format!("Failed to parse Cloudinary response: {}", e)))?;
        info!(public_id = %image.public_id, "image uploaded");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());
        params.insert("folder", "products".to_string());
        assert_eq!(sign(&params, "abcd"), "49d1a6d83596ad5097a5666a93073bb32f65915d03117234c5aa7f6a4fc078a6");
    }

    #[test]
    fn test_client_needs_all_credentials() {
        let mut config = AppConfig::for_tests();
        assert!(CloudinaryClient::from_config(&config).is_none());
        config.cloudinary_cloud_name = Some("demo".into());
        config.cloudinary_api_key = Some("123".into());
        config.cloudinary_api_secret = Some("  ".into());
        assert!(CloudinaryClient::from_config(&config).is_none());
        config.cloudinary_api_secret = Some("secret".into());
        assert!(CloudinaryClient::from_config(&config).is_some());
    }

    #[test]
    fn test_response_maps_secure_url() {
        let image: UploadedImage = serde_json::from_str(r#"{"public_id":"products/mug","secure_url":"https://res.cloudinary.com/demo/image/upload/products/mug.jpg","url":"http://x","width":800,"height":600,"format":"jpg","bytes":52133}"#).unwrap();
        assert_eq!(image.url, "https://res.cloudinary.com/demo/image/upload/products/mug.jpg");
        assert_eq!(image.width, Some(800));
        let out = serde_json::to_value(&image).unwrap();
        assert_eq!(out["url"], "https://res.cloudinary.com/demo/image/upload/products/mug.jpg");
    }
}
