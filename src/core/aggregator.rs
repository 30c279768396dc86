use crate::domain::model::Aggregate;
use crate::domain::ports::RowErrorPolicy;
use crate::domain::schema::{ResolvedSchema, Schema};
use crate::utils::error::{EtlError, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// A buffered row, or the line and reason of a row that could not be decoded.
type PendingRow = std::result::Result<StringRecord, (u64, String)>;

/// Streams a payment CSV in fixed-size row chunks and tallies success /
/// failed counts per group. Peak memory is one chunk of rows no matter how
/// large the input is.
#[derive(Debug, Clone)]
pub struct ChunkedAggregator {
    schema: Schema,
    chunk_size: usize,
    policy: RowErrorPolicy,
}

impl ChunkedAggregator {
    pub fn new(schema: Schema, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(EtlError::ValidationError {
                message: "chunk size must be at least 1 row".to_string(),
            });
        }

        Ok(Self {
            schema,
            chunk_size,
            policy: RowErrorPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RowErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn aggregate_path(&self, path: &Path) -> Result<Aggregate> {
        let file = std::fs::File::open(path)?;
        self.aggregate(file)
    }

    pub fn aggregate<R: Read>(&self, reader: R) -> Result<Aggregate> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut aggregate = Aggregate::new();

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            tracing::debug!("Input is empty, nothing to aggregate");
            return Ok(aggregate);
        }
        let resolved = self.schema.resolve(&headers)?;

        // 解碼失敗的列也放進 chunk，維持原本的列順序
        let mut chunk: Vec<PendingRow> = Vec::with_capacity(self.chunk_size);
        for result in csv_reader.records() {
            match result {
                Ok(record) => chunk.push(Ok(record)),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    chunk.push(Err((line, e.to_string())));
                }
                Err(e) => return Err(e.into()),
            }
            if chunk.len() == self.chunk_size {
                self.apply_chunk(&resolved, &mut chunk, &mut aggregate)?;
            }
        }
        if !chunk.is_empty() {
            self.apply_chunk(&resolved, &mut chunk, &mut aggregate)?;
        }

        if aggregate.skipped > 0 {
            tracing::warn!("⚠️ Skipped {} malformed rows", aggregate.skipped);
        }
        tracing::debug!(
            "Scanned {} rows in {} chunks ({} groups, {} unrecognized statuses)",
            aggregate.rows_scanned,
            aggregate.chunks,
            aggregate.len(),
            aggregate.unrecognized
        );

        Ok(aggregate)
    }

    /// Folds a full chunk into the counters and empties it for reuse.
    fn apply_chunk(
        &self,
        resolved: &ResolvedSchema,
        chunk: &mut Vec<PendingRow>,
        aggregate: &mut Aggregate,
    ) -> Result<()> {
        for pending in chunk.drain(..) {
            let record = match pending {
                Ok(record) => record,
                Err((line, reason)) => {
                    self.reject(line, reason, aggregate)?;
                    continue;
                }
            };
            match resolved.extract(&record) {
                Ok((key, status)) => aggregate.record(key, status),
                Err(reason) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    self.reject(line, reason, aggregate)?;
                }
            }
        }
        aggregate.chunks += 1;
        Ok(())
    }

    fn reject(&self, line: u64, reason: String, aggregate: &mut Aggregate) -> Result<()> {
        match self.policy {
            RowErrorPolicy::Skip => {
                tracing::debug!("Skipping malformed row at line {}: {}", line, reason);
                aggregate.record_skipped();
                Ok(())
            }
            RowErrorPolicy::FailFast => Err(EtlError::MalformedRow { line, reason }),
        }
    }
}
