use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Read-only storage for publicly readable objects served as
/// `{base_url}/{key}`, e.g. `https://storage.googleapis.com/<bucket>`.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: Client,
    base_url: Url,
}

impl HttpStorage {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        // 確保結尾有斜線，否則 join 會取代最後一段路徑
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| EtlError::InvalidConfigValueError {
            field: "base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        self.base_url
            .join(key.trim_start_matches('/'))
            .map_err(|e| EtlError::StorageError {
                message: format!("Invalid object key '{}': {}", key, e),
            })
    }
}

impl Storage for HttpStorage {
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
        Err(EtlError::StorageError {
            message: format!(
                "Listing '{}' is not supported over plain HTTP; pass the dates explicitly",
                prefix
            ),
        })
    }

    async fn fetch_to(&self, key: &str, dest: &Path) -> Result<u64> {
        let url = self.object_url(key)?;
        tracing::debug!("Downloading {}", url);

        let mut response = self.client.get(url).send().await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(EtlError::ObjectNotFound {
                    key: key.to_string(),
                })
            }
            status => {
                return Err(EtlError::StorageError {
                    message: format!("GET {} returned {}", key, status),
                })
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn write_file(&self, key: &str, _data: &[u8]) -> Result<()> {
        Err(EtlError::StorageError {
            message: format!("Cannot upload '{}': HTTP storage is read-only", key),
        })
    }
}
