use crate::adapters::storage::{date_label, HttpStorage, LocalStorage};
use crate::app::pipeline::AnalysisPipeline;
use crate::config::{SourceKind, SourceSettings};
use crate::core::etl::EtlEngine;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;

/// Connects to the configured source and runs the whole analysis, returning
/// the path of the written report.
pub async fn run_analysis<C: ConfigProvider>(
    source: &SourceSettings,
    config: C,
    monitor_enabled: bool,
) -> Result<String> {
    match source.kind {
        SourceKind::Local => {
            let storage = LocalStorage::new(&source.data_dir);
            run_with(storage, config, monitor_enabled).await
        }
        SourceKind::Http => {
            let storage = connect_http(source)?;
            run_with(storage, config, monitor_enabled).await
        }
        SourceKind::S3 => {
            #[cfg(feature = "s3")]
            {
                let storage = connect_s3(source).await?;
                run_with(storage, config, monitor_enabled).await
            }
            #[cfg(not(feature = "s3"))]
            {
                let _ = (config, monitor_enabled);
                Err(s3_unavailable())
            }
        }
    }
}

/// Date labels of every CSV file under the configured prefix.
pub async fn list_dates(source: &SourceSettings) -> Result<Vec<String>> {
    let keys = match source.kind {
        SourceKind::Local => {
            LocalStorage::new(&source.data_dir)
                .list_files(&source.prefix)
                .await?
        }
        SourceKind::Http => connect_http(source)?.list_files(&source.prefix).await?,
        SourceKind::S3 => {
            #[cfg(feature = "s3")]
            {
                connect_s3(source).await?.list_files(&source.prefix).await?
            }
            #[cfg(not(feature = "s3"))]
            {
                return Err(s3_unavailable());
            }
        }
    };

    Ok(keys.iter().map(|key| date_label(key).to_string()).collect())
}

async fn run_with<S: Storage, C: ConfigProvider>(
    storage: S,
    config: C,
    monitor_enabled: bool,
) -> Result<String> {
    let pipeline = AnalysisPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    engine.run().await
}

fn connect_http(source: &SourceSettings) -> Result<HttpStorage> {
    let base_url = validate_required_field("source.base_url", &source.base_url)?;
    HttpStorage::new(base_url)
}

#[cfg(feature = "s3")]
async fn connect_s3(source: &SourceSettings) -> Result<crate::adapters::storage::S3Storage> {
    use crate::config::credentials::StorageCredentials;

    let mut credentials = StorageCredentials::from_file(&source.credentials_path)?;
    if source.endpoint_url.is_some() {
        credentials.endpoint_url = source.endpoint_url.clone();
    }
    Ok(crate::adapters::storage::S3Storage::connect(&credentials, &source.bucket).await)
}

#[cfg(not(feature = "s3"))]
fn s3_unavailable() -> crate::utils::error::EtlError {
    crate::utils::error::EtlError::ConfigError {
        message: "This build does not include the 's3' feature".to_string(),
    }
}
