use crate::domain::model::{AnalysisResult, FetchedSource, SortOrder};
use crate::domain::schema::Schema;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Object storage the payment files are read from (and the summary is
/// uploaded to).
pub trait Storage: Send + Sync {
    /// Keys of the `.csv` objects directly under `prefix`, sorted.
    fn list_files(&self, prefix: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Streams the object at `key` into `dest`, returning the byte count.
    fn fetch_to(
        &self,
        key: &str,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    fn write_file(
        &self,
        key: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Count the row as skipped and keep scanning.
    #[default]
    Skip,
    /// Abort the run on the first malformed row.
    FailFast,
}

pub trait ConfigProvider: Send + Sync {
    fn prefix(&self) -> &str;
    fn selected_dates(&self) -> &[String];
    fn output_path(&self) -> &str;
    fn chunk_size(&self) -> usize;
    fn schema(&self) -> Schema;
    fn row_policy(&self) -> RowErrorPolicy;
    fn sort_order(&self) -> SortOrder;
    fn archive(&self) -> bool;
    fn upload_summary(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<FetchedSource>>;
    async fn transform(&self, sources: Vec<FetchedSource>) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
