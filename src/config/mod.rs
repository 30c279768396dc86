#[cfg(feature = "cli")]
pub mod cli;
pub mod credentials;
pub mod toml_config;

use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET: &str = "pipe-analysis.firebasestorage.app";
pub const DEFAULT_PREFIX: &str = "pipe_data/";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory on the local filesystem.
    Local,
    /// S3-compatible object storage.
    #[default]
    S3,
    /// Public objects over HTTP(S).
    Http,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(SourceKind::Local),
            "s3" | "gcs" => Ok(SourceKind::S3),
            "http" | "https" => Ok(SourceKind::Http),
            other => Err(format!(
                "unknown source '{}', expected local, s3 or http",
                other
            )),
        }
    }
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_data_dir() -> String {
    DEFAULT_DATA_DIR.to_string()
}

fn default_credentials_path() -> String {
    credentials::DEFAULT_CREDENTIALS_PATH.to_string()
}

/// Where the payment CSV files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Overrides the endpoint from the credential file.
    pub endpoint_url: Option<String>,
    pub base_url: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            prefix: default_prefix(),
            data_dir: default_data_dir(),
            bucket: default_bucket(),
            credentials_path: default_credentials_path(),
            endpoint_url: None,
            base_url: None,
        }
    }
}

impl Validate for SourceSettings {
    fn validate(&self) -> Result<()> {
        match self.kind {
            SourceKind::Local => validation::validate_path("source.data_dir", &self.data_dir)?,
            SourceKind::S3 => {
                validation::validate_bucket_name("source.bucket", &self.bucket)?;
                validation::validate_path("source.credentials_path", &self.credentials_path)?;
                if let Some(endpoint) = &self.endpoint_url {
                    validation::validate_url("source.endpoint_url", endpoint)?;
                }
            }
            SourceKind::Http => {
                let base_url = validation::validate_required_field("source.base_url", &self.base_url)?;
                validation::validate_url("source.base_url", base_url)?;
            }
        }
        Ok(())
    }
}

/// Checks shared by every front end once the source and the run options are
/// known.
pub(crate) fn validate_run_options(
    source: &SourceSettings,
    dates: &[String],
    output_path: &str,
    chunk_size: usize,
    upload: bool,
) -> Result<()> {
    source.validate()?;
    validation::validate_path("output_path", output_path)?;
    validation::validate_positive_number("chunk_size", chunk_size, 1)?;
    validation::validate_date_labels("dates", dates)?;

    if source.kind == SourceKind::Http {
        if dates.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "dates (HTTP sources cannot be listed)".to_string(),
            });
        }
        if upload {
            return Err(EtlError::ConfigError {
                message: "Uploading the summary needs a writable source (local or s3)".to_string(),
            });
        }
    }
    Ok(())
}
