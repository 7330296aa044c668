use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Strip an inline `data:image/...;base64,` prefix so callers can hand over
/// either a raw base64 payload or a browser data URL.
fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:image/") {
        if let Some((_, payload)) = data.split_once(";base64,") {
            return payload;
        }
    }
    data
}

#[derive(Debug, Deserialize)]
struct ImageHostResponse {
    success: bool,
    data: Option<ImageHostData>,
}

#[derive(Debug, Deserialize)]
struct ImageHostData {
    link: String,
}

/// Imgur-style image host: POST a base64 payload, get back a public link.
#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    upload_url: String,
    client_id: String,
}

impl ImageHostClient {
    pub fn new(upload_url: &str, client_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
            client_id: client_id.to_string(),
        })
    }

    pub async fn upload(&self, base64_data: &str) -> Result<String> {
        let payload = strip_data_url_prefix(base64_data);

        let response = self
            .client
            .post(&self.upload_url)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .json(&json!({ "image": payload, "type": "base64" }))
            .send()
            .await
            .context("image host request failed")?;

        if !response.status().is_success() {
            bail!("image host returned status {}", response.status());
        }

        let body: ImageHostResponse = response
            .json()
            .await
            .context("image host response was not the expected shape")?;
        if !body.success {
            bail!("image host reported failure");
        }
        body.data
            .map(|d| d.link)
            .ok_or_else(|| anyhow!("image host response carried no link"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VaultUpload {
    pub file_url: String,
    pub file_id: String,
    pub file_key: String,
}

#[derive(Debug, Deserialize)]
struct VaultResponse {
    url: String,
}

/// Pull the id and decryption key out of a `.../file/<id>#<key>` share URL.
fn parse_share_url(url: &str) -> Option<(String, String)> {
    let (_, rest) = url.split_once("file/")?;
    let (id, key) = rest.split_once('#')?;
    if id.is_empty() || key.is_empty() {
        return None;
    }
    Some((id.to_string(), key.to_string()))
}

/// Credential-gated file vault. The payload travels as base64 plus the
/// account credentials; the response carries a keyed share URL.
#[derive(Clone)]
pub struct FileVaultClient {
    client: reqwest::Client,
    upload_url: String,
}

impl FileVaultClient {
    pub fn new(upload_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
        })
    }

    pub async fn upload(
        &self,
        filename: &str,
        base64_data: &str,
        email: &str,
        password: &str,
    ) -> Result<VaultUpload> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(strip_data_url_prefix(base64_data))
            .context("file payload is not valid base64")?;
        info!("Uploading {} ({} bytes) to vault", filename, bytes.len());

        let response = self
            .client
            .post(&self.upload_url)
            .json(&json!({
                "filename": filename,
                "data": base64_data,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .context("vault request failed")?;

        if !response.status().is_success() {
            bail!("vault returned status {}", response.status());
        }

        let body: VaultResponse = response
            .json()
            .await
            .context("vault response was not the expected shape")?;
        let (file_id, file_key) = parse_share_url(&body.url)
            .ok_or_else(|| anyhow!("failed to extract file id and key from vault URL"))?;

        Ok(VaultUpload {
            file_url: body.url,
            file_id,
            file_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_url_prefixes() {
        assert_eq!(
            strip_data_url_prefix("data:image/png;base64,AAAA"),
            "AAAA"
        );
        assert_eq!(
            strip_data_url_prefix("data:image/jpeg;base64,Zm9v"),
            "Zm9v"
        );
        assert_eq!(strip_data_url_prefix("Zm9v"), "Zm9v");
    }

    #[test]
    fn parses_share_urls() {
        let (id, key) = parse_share_url("https://vault.example/file/abc123#k3y").unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(key, "k3y");

        assert!(parse_share_url("https://vault.example/abc123").is_none());
        assert!(parse_share_url("https://vault.example/file/abc123").is_none());
        assert!(parse_share_url("https://vault.example/file/#k3y").is_none());
    }
}
