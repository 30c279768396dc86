use crate::config::{SourceKind, SourceSettings, DEFAULT_BUCKET, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_PATH, DEFAULT_PREFIX};
use crate::config::credentials::DEFAULT_CREDENTIALS_PATH;
use crate::core::aggregator::DEFAULT_CHUNK_SIZE;
use crate::core::{ConfigProvider, RowErrorPolicy};
use crate::domain::model::SortOrder;
use crate::domain::schema::Schema;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "pipe-analysis")]
#[command(about = "Client code-wise payment gateway success analysis over CSV exports")]
pub struct CliConfig {
    /// Where the CSV files live: local, s3 or http
    #[arg(long, default_value = "s3")]
    pub source: SourceKind,

    /// Local directory holding the CSV files (source=local)
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, default_value = DEFAULT_BUCKET)]
    pub bucket: String,

    /// Service-account key file (source=s3)
    #[arg(long, default_value = DEFAULT_CREDENTIALS_PATH)]
    pub credentials: String,

    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Base URL of publicly readable objects (source=http)
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Dates to analyse, e.g. 2025-06-01,2025-06-02 (default: latest file)
    #[arg(long, value_delimiter = ',')]
    pub dates: Vec<String>,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    /// Rows held in memory per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Abort on the first malformed row instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Sort rows by success %: none, asc or desc
    #[arg(long, default_value = "none")]
    pub sort: SortOrder,

    /// Group by client only, without payment mode breakdown
    #[arg(long)]
    pub client_only: bool,

    /// Upload the summary next to the source files
    #[arg(long)]
    pub upload: bool,

    /// Also write a zip bundle of the report
    #[arg(long)]
    pub archive: bool,

    /// Only list the available dates
    #[arg(long)]
    pub list: bool,

    #[arg(long, help = "Log process CPU and memory per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            kind: self.source,
            prefix: self.prefix.clone(),
            data_dir: self.data_dir.clone(),
            bucket: self.bucket.clone(),
            credentials_path: self.credentials.clone(),
            endpoint_url: self.endpoint_url.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

impl ConfigProvider for CliConfig {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn selected_dates(&self) -> &[String] {
        &self.dates
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn schema(&self) -> Schema {
        if self.client_only {
            let default = Schema::default();
            Schema::client_only(default.client_column, default.status_column)
        } else {
            Schema::default()
        }
    }

    fn row_policy(&self) -> RowErrorPolicy {
        if self.strict {
            RowErrorPolicy::FailFast
        } else {
            RowErrorPolicy::Skip
        }
    }

    fn sort_order(&self) -> SortOrder {
        self.sort
    }

    fn archive(&self) -> bool {
        self.archive
    }

    fn upload_summary(&self) -> bool {
        self.upload
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        // --list 只需要來源設定
        if self.list {
            return self.source_settings().validate();
        }
        crate::config::validate_run_options(
            &self.source_settings(),
            &self.dates,
            &self.output_path,
            self.chunk_size,
            self.upload,
        )
    }
}
