use crate::adapters::storage::{is_csv_key, normalize_prefix};
use crate::config::credentials::StorageCredentials;
use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;

const PROVIDER_NAME: &str = "pipe-analysis-key-file";

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the key file. Path-style addressing is forced so
    /// bucket names containing dots keep working against custom endpoints.
    pub async fn connect(credentials: &StorageCredentials, bucket: &str) -> Self {
        let provider = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            PROVIDER_NAME,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(provider);
        match &credentials.endpoint_url {
            Some(endpoint) => {
                tracing::debug!("Using storage endpoint {}", endpoint);
                loader = loader.endpoint_url(endpoint.clone());
            }
            None if credentials.region == "auto" => {
                tracing::warn!("⚠️ Region 'auto' without endpoint_url, requests will go to AWS S3");
            }
            None => {}
        }
        let shared_config = loader.load().await;

        let config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(true)
            .build();

        tracing::info!("Connected to bucket: {}", bucket);
        Self::new(S3Client::from_conf(config), bucket)
    }
}

fn storage_error<E: std::error::Error>(action: &str, err: E) -> EtlError {
    EtlError::StorageError {
        message: format!("{} failed: {}", action, DisplayErrorContext(err)),
    }
}

impl Storage for S3Storage {
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .delimiter("/")
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| storage_error("ListObjectsV2", e))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| is_csv_key(key))
                    .map(str::to_string),
            );
        }
        keys.sort();

        tracing::debug!("Found {} CSV objects under '{}'", keys.len(), prefix);
        Ok(keys)
    }

    async fn fetch_to(&self, key: &str, dest: &Path) -> Result<u64> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let status_404 = err
                    .raw_response()
                    .is_some_and(|response| response.status().as_u16() == 404);
                let service_error = err.into_service_error();
                if status_404 || service_error.is_no_such_key() {
                    return Err(EtlError::ObjectNotFound {
                        key: key.to_string(),
                    });
                }
                return Err(storage_error("GetObject", service_error));
            }
        };

        // 逐塊寫入磁碟，不把整個物件留在記憶體
        let mut body = output.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(bytes) = body
            .try_next()
            .await
            .map_err(|e| storage_error("Reading object body", e))?
        {
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn write_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| storage_error("PutObject", e))?;

        tracing::debug!("Uploaded {} bytes to {}/{}", data.len(), self.bucket, key);
        Ok(())
    }
}
