use crate::adapters::storage::{date_label, object_key, LocalStorage};
use crate::core::aggregator::ChunkedAggregator;
use crate::core::report::{self, ARCHIVE_FILE_NAME, REPORT_FILE_NAME, UPLOAD_KEY};
use crate::core::summary;
use crate::core::{Aggregate, AnalysisResult, ConfigProvider, FetchedSource, Pipeline, Storage};
use crate::domain::model::SourceStats;
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use zip::write::{FileOptions, ZipWriter};

/// Fetches the selected daily exports, tallies them in chunks and writes the
/// HTML report plus the CSV summary.
pub struct AnalysisPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    output: LocalStorage,
}

impl<S: Storage, C: ConfigProvider> AnalysisPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let output = LocalStorage::new(config.output_path());
        Self {
            storage,
            config,
            output,
        }
    }

    /// Dates to analyse; the latest available file when none were selected.
    pub async fn resolve_dates(&self) -> Result<Vec<String>> {
        let selected = self.config.selected_dates();
        if !selected.is_empty() {
            return Ok(selected.to_vec());
        }

        let keys = self.storage.list_files(self.config.prefix()).await?;
        let latest = keys.last().ok_or_else(|| EtlError::NoSourceFiles {
            prefix: self.config.prefix().to_string(),
        })?;

        let date = date_label(latest).to_string();
        tracing::info!("📅 No dates selected, using latest: {}", date);
        Ok(vec![date])
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AnalysisPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<FetchedSource>> {
        let dates = self.resolve_dates().await?;
        let mut sources = Vec::with_capacity(dates.len());

        for date in dates {
            let key = object_key(self.config.prefix(), &date);
            let local_path = tempfile::NamedTempFile::new()?.into_temp_path();

            let started = Instant::now();
            let bytes = self.storage.fetch_to(&key, &local_path).await.map_err(|e| {
                tracing::error!("❌ Error loading {}: {}", key, e);
                e
            })?;
            let fetch_duration = started.elapsed();

            tracing::info!(
                "📥 Loaded {} ({} bytes) in {:.2}s",
                key,
                bytes,
                fetch_duration.as_secs_f64()
            );
            sources.push(FetchedSource {
                label: date,
                key,
                local_path,
                bytes,
                fetch_duration,
            });
        }

        Ok(sources)
    }

    async fn transform(&self, sources: Vec<FetchedSource>) -> Result<AnalysisResult> {
        let schema = self.config.schema();
        let dimension_columns = schema.dimension_columns.clone();
        let aggregator = ChunkedAggregator::new(schema, self.config.chunk_size())?
            .with_policy(self.config.row_policy());
        let labels: Vec<String> = sources.iter().map(|s| s.label.clone()).collect();

        // CSV 掃描是同步 IO，放到 blocking 執行緒
        let (aggregate, stats) =
            tokio::task::spawn_blocking(move || aggregate_sources(&aggregator, sources))
                .await
                .map_err(|e| EtlError::ProcessingError {
                    message: format!("Aggregation worker failed: {}", e),
                })??;

        if aggregate.is_empty() {
            tracing::warn!("⚠️ No 'success' or 'failed' transactions");
        }

        Ok(AnalysisResult {
            labels,
            totals: summary::totals(&aggregate),
            rows: summary::summary_rows(&aggregate, self.config.sort_order()),
            sources: stats,
            dimension_columns,
            aggregate,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        let csv_name = report::summary_file_name(&result.labels);
        let csv_data = report::render_csv(&result)?;
        let html = report::render_html(&result, chrono::Local::now());

        self.output.write_file(&csv_name, &csv_data).await?;
        self.output
            .write_file(REPORT_FILE_NAME, html.as_bytes())
            .await?;
        tracing::debug!("Wrote {} and {}", csv_name, REPORT_FILE_NAME);

        if self.config.archive() || self.config.upload_summary() {
            let documents = report::render_documents(&result)?;

            if self.config.archive() {
                let zip_data = build_archive(&csv_name, &csv_data, &html, &documents)?;
                tracing::debug!("Writing ZIP file ({} bytes)", zip_data.len());
                self.output.write_file(ARCHIVE_FILE_NAME, &zip_data).await?;
            }

            if self.config.upload_summary() {
                // 整份覆寫，舊的摘要不會殘留
                self.storage.write_file(UPLOAD_KEY, &documents).await?;
                tracing::info!("📤 Uploaded {} summary rows to {}", result.rows.len(), UPLOAD_KEY);
            }
        }

        Ok(Path::new(self.config.output_path())
            .join(REPORT_FILE_NAME)
            .display()
            .to_string())
    }
}

/// Scans the fetched files one after another into a single aggregate. Each
/// temp file is removed as soon as it has been read.
fn aggregate_sources(
    aggregator: &ChunkedAggregator,
    sources: Vec<FetchedSource>,
) -> Result<(Aggregate, Vec<SourceStats>)> {
    let mut aggregate = Aggregate::new();
    let mut stats = Vec::with_capacity(sources.len());

    for source in sources {
        let started = Instant::now();
        let part = aggregator
            .aggregate_path(&source.local_path)
            .map_err(|e| {
                tracing::error!("❌ Error reading {}: {}", source.key, e);
                e
            })?;
        let elapsed = source.fetch_duration + started.elapsed();

        stats.push(SourceStats {
            label: source.label,
            rows: part.rows_scanned,
            load_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
        });
        aggregate.merge(part);
    }

    Ok((aggregate, stats))
}

fn build_archive(csv_name: &str, csv_data: &[u8], html: &str, documents: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>(csv_name, FileOptions::default())?;
    zip.write_all(csv_data)?;

    zip.start_file::<_, ()>(REPORT_FILE_NAME, FileOptions::default())?;
    zip.write_all(html.as_bytes())?;

    zip.start_file::<_, ()>("summary.json", FileOptions::default())?;
    zip.write_all(documents)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RowErrorPolicy;
    use crate::domain::model::{SortOrder, StatusCounts};
    use crate::domain::schema::Schema;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, key: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(key.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, key: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(key).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let mut keys: Vec<String> = files
                .keys()
                .filter(|k| k.starts_with(prefix) && k.ends_with(".csv"))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }

        async fn fetch_to(&self, key: &str, dest: &Path) -> Result<u64> {
            let data = self
                .files
                .lock()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| EtlError::ObjectNotFound {
                    key: key.to_string(),
                })?;
            std::fs::write(dest, &data)?;
            Ok(data.len() as u64)
        }

        async fn write_file(&self, key: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .await
                .insert(key.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        dates: Vec<String>,
        output_path: String,
        chunk_size: usize,
        schema: Schema,
        upload: bool,
        archive: bool,
    }

    impl MockConfig {
        fn new(output_path: &Path) -> Self {
            Self {
                dates: vec![],
                output_path: output_path.display().to_string(),
                chunk_size: 2,
                schema: Schema::client_only("client", "status"),
                upload: false,
                archive: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn prefix(&self) -> &str {
            "pipe_data/"
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
            self.schema.clone()
        }

        fn row_policy(&self) -> RowErrorPolicy {
            RowErrorPolicy::Skip
        }

        fn sort_order(&self) -> SortOrder {
            SortOrder::None
        }

        fn archive(&self) -> bool {
            self.archive
        }

        fn upload_summary(&self) -> bool {
            self.upload
        }
    }

    #[tokio::test]
    async fn test_extract_defaults_to_latest_date() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = MockStorage::default();
        storage.put("pipe_data/2025-06-01.csv", "client,status\n").await;
        storage.put("pipe_data/2025-06-02.csv", "client,status\nA,success\n").await;

        let pipeline = AnalysisPipeline::new(storage, MockConfig::new(dir.path()));
        let sources = pipeline.extract().await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].label, "2025-06-02");
        assert_eq!(sources[0].key, "pipe_data/2025-06-02.csv");
        assert_eq!(sources[0].bytes, 24);
    }

    #[tokio::test]
    async fn test_extract_without_files_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = AnalysisPipeline::new(MockStorage::default(), MockConfig::new(dir.path()));

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::NoSourceFiles { .. }));
    }

    #[tokio::test]
    async fn test_extract_missing_selected_date_aborts() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = MockStorage::default();
        storage.put("pipe_data/2025-06-01.csv", "client,status\n").await;

        let mut config = MockConfig::new(dir.path());
        config.dates = vec!["2025-06-01".to_string(), "2025-06-09".to_string()];
        let pipeline = AnalysisPipeline::new(storage, config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_transform_merges_selected_dates() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = MockStorage::default();
        storage
            .put("pipe_data/2025-06-01.csv", "client,status\nA,success\nB,failed\n")
            .await;
        storage
            .put("pipe_data/2025-06-02.csv", "client,status\nA,failed\nA,refunded\n")
            .await;

        let mut config = MockConfig::new(dir.path());
        config.dates = vec!["2025-06-01".to_string(), "2025-06-02".to_string()];
        let pipeline = AnalysisPipeline::new(storage, config);

        let sources = pipeline.extract().await.unwrap();
        let result = pipeline.transform(sources).await.unwrap();

        assert_eq!(result.labels, vec!["2025-06-01", "2025-06-02"]);
        assert_eq!(result.totals.total, 3);
        assert_eq!(result.aggregate.unrecognized, 1);
        assert_eq!(result.aggregate.client_totals()["A"], StatusCounts::new(1, 1));
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[1].rows, 2);
    }

    #[tokio::test]
    async fn test_load_writes_report_archive_and_upload() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = MockStorage::default();
        storage
            .put("pipe_data/2025-06-01.csv", "client,status\nA,success\nA,failed\n")
            .await;

        let mut config = MockConfig::new(dir.path());
        config.archive = true;
        config.upload = true;
        let pipeline = AnalysisPipeline::new(storage.clone(), config);

        let sources = pipeline.extract().await.unwrap();
        let result = pipeline.transform(sources).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert!(output_path.ends_with("report.html"));
        assert!(dir.path().join("report.html").exists());
        assert!(dir.path().join("PIPE Analysis (2025-06-01).csv").exists());

        let zip_data = std::fs::read(dir.path().join(ARCHIVE_FILE_NAME)).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 3);

        let uploaded = storage.get_file(UPLOAD_KEY).await.unwrap();
        let documents: serde_json::Value = serde_json::from_slice(&uploaded).unwrap();
        assert_eq!(documents["A"]["failed"], 1);
    }
}
