use crate::config::{SourceSettings, DEFAULT_OUTPUT_PATH};
use crate::core::aggregator::DEFAULT_CHUNK_SIZE;
use crate::core::{ConfigProvider, RowErrorPolicy};
use crate::domain::model::SortOrder;
use crate::domain::schema::Schema;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub on_malformed_row: RowErrorPolicy,
    #[serde(default)]
    pub sort: SortOrder,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dates: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            on_malformed_row: RowErrorPolicy::default(),
            sort: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub upload: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            archive: false,
            upload: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STORAGE_BUCKET})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn prefix(&self) -> &str {
        &self.source.prefix
    }

    fn selected_dates(&self) -> &[String] {
        &self.analysis.dates
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn chunk_size(&self) -> usize {
        self.analysis.chunk_size
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn row_policy(&self) -> RowErrorPolicy {
        self.analysis.on_malformed_row
    }

    fn sort_order(&self) -> SortOrder {
        self.analysis.sort
    }

    fn archive(&self) -> bool {
        self.output.archive
    }

    fn upload_summary(&self) -> bool {
        self.output.upload
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string(
            "schema.client_column",
            &self.schema.client_column,
        )?;
        crate::utils::validation::validate_non_empty_string(
            "schema.status_column",
            &self.schema.status_column,
        )?;

        crate::config::validate_run_options(
            &self.source,
            &self.analysis.dates,
            &self.output.path,
            self.analysis.chunk_size,
            self.output.upload,
        )
    }
}
