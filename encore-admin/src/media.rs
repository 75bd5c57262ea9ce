//! Media host API client
//!
//! Uploads and deletes assets on the third-party media host. Requests carry
//! the API key plus a SHA-256 signature over the sorted query parameters and
//! the account secret. Upload mechanics stay a single pass-through request;
//! transformations and streaming belong to the host.

use encore_common::config::MediaConfig;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("encore-admin/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Media host client errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Media host error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Asset record returned by the media host
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAsset {
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub bytes: i64,
}

/// Media host API client
pub struct MediaClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl MediaClient {
    pub fn new(config: MediaConfig) -> Result<Self, MediaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MediaError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            api_secret: config.api_secret,
        })
    }

    /// Upload an asset under the given public id
    pub async fn upload(&self, bytes: Vec<u8>, public_id: &str) -> Result<MediaAsset, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let response = self
            .http_client
            .post(format!("{}/assets", self.base_url))
            .query(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .body(bytes)
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Api(status.as_u16(), body));
        }

        response
            .json::<MediaAsset>()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))
    }

    /// Delete an asset from the host
    ///
    /// Callers check the reference count first; this does not.
    pub async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let response = self
            .http_client
            .delete(format!("{}/assets/{}", self.base_url, public_id))
            .query(&[
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        // Deleting an asset that is already gone counts as deleted
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Api(status.as_u16(), body));
        }

        Ok(())
    }
}

/// Sign a parameter set
///
/// Parameters are sorted by name, joined as `k=v` pairs with `&`, the
/// secret appended, and the whole string SHA-256 hashed to 64 hex chars.
/// The host recomputes the same digest to verify the caller holds the
/// secret.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let joined: Vec<String> = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let to_sign = format!("{}{}", joined.join("&"), secret);

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_hex_sha256() {
        let sig = sign_params(&[("public_id", "covers/x"), ("timestamp", "100")], "s3cret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let params = [("public_id", "covers/x"), ("timestamp", "100")];
        assert_eq!(sign_params(&params, "s3cret"), sign_params(&params, "s3cret"));
    }

    #[test]
    fn test_signature_ignores_parameter_order() {
        let a = sign_params(&[("timestamp", "100"), ("public_id", "covers/x")], "s3cret");
        let b = sign_params(&[("public_id", "covers/x"), ("timestamp", "100")], "s3cret");
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_depends_on_secret_and_values() {
        let params = [("public_id", "covers/x"), ("timestamp", "100")];
        let base = sign_params(&params, "s3cret");

        assert_ne!(base, sign_params(&params, "other"));
        assert_ne!(
            base,
            sign_params(&[("public_id", "covers/y"), ("timestamp", "100")], "s3cret")
        );
    }
}
