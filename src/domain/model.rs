use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Payment outcome after normalization of the raw status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Other,
}

impl PaymentStatus {
    /// 大小寫不敏感的子字串比對，"success" 優先於 "fail"
    pub fn normalize(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        if value.contains("success") {
            PaymentStatus::Success
        } else if value.contains("fail") {
            PaymentStatus::Failed
        } else {
            PaymentStatus::Other
        }
    }

    pub fn is_recognized(self) -> bool {
        !matches!(self, PaymentStatus::Other)
    }
}

/// Identity of one summary row: the client plus the breakdown dimensions
/// configured in the schema (payment gateway mode, payment mode, ...).
///
/// Field order defines the table order: client name, then code, then
/// dimensions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub client_name: String,
    pub client_code: String,
    pub dimensions: Vec<String>,
}

impl GroupKey {
    pub fn client(client_code: impl Into<String>) -> Self {
        Self {
            client_name: crate::domain::schema::UNKNOWN_CLIENT_NAME.to_string(),
            client_code: client_code.into(),
            dimensions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn new(success: u64, failed: u64) -> Self {
        Self { success, failed }
    }

    pub fn total(&self) -> u64 {
        self.success + self.failed
    }

    fn add(&mut self, other: StatusCounts) {
        self.success += other.success;
        self.failed += other.failed;
    }
}

/// Per-run tally built by the chunked scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    groups: BTreeMap<GroupKey, StatusCounts>,
    pub rows_scanned: u64,
    pub unrecognized: u64,
    pub skipped: u64,
    pub chunks: u64,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one data row. Rows with an unrecognized status never create a
    /// group.
    pub fn record(&mut self, key: GroupKey, status: PaymentStatus) {
        self.rows_scanned += 1;
        match status {
            PaymentStatus::Success => self.groups.entry(key).or_default().success += 1,
            PaymentStatus::Failed => self.groups.entry(key).or_default().failed += 1,
            PaymentStatus::Other => self.unrecognized += 1,
        }
    }

    pub fn record_skipped(&mut self) {
        self.rows_scanned += 1;
        self.skipped += 1;
    }

    pub fn merge(&mut self, other: Aggregate) {
        for (key, counts) in other.groups {
            self.groups.entry(key).or_default().add(counts);
        }
        self.rows_scanned += other.rows_scanned;
        self.unrecognized += other.unrecognized;
        self.skipped += other.skipped;
        self.chunks += other.chunks;
    }

    pub fn get(&self, key: &GroupKey) -> Option<StatusCounts> {
        self.groups.get(key).copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &StatusCounts)> {
        self.groups.iter()
    }

    /// Roll-up by client identifier alone, ignoring names and dimensions.
    pub fn client_totals(&self) -> BTreeMap<String, StatusCounts> {
        let mut totals: BTreeMap<String, StatusCounts> = BTreeMap::new();
        for (key, counts) in &self.groups {
            totals.entry(key.client_code.clone()).or_default().add(*counts);
        }
        totals
    }

    pub fn totals(&self) -> StatusCounts {
        self.groups
            .values()
            .fold(StatusCounts::default(), |mut acc, counts| {
                acc.add(*counts);
                acc
            })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One selected file after it was pulled out of storage.
#[derive(Debug)]
pub struct FetchedSource {
    pub label: String,
    pub key: String,
    pub local_path: tempfile::TempPath,
    pub bytes: u64,
    pub fetch_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStats {
    pub label: String,
    pub rows: u64,
    pub load_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_percent: f64,
    pub failed_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub client_name: String,
    pub client_code: String,
    pub dimensions: Vec<String>,
    pub success: u64,
    pub failed: u64,
    pub total: u64,
    pub success_percent: f64,
}

impl SummaryRow {
    /// Stable identifier used when the summary is uploaded as documents.
    pub fn document_id(&self) -> String {
        std::iter::once(self.client_code.as_str())
            .chain(self.dimensions.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("_")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Group-key order.
    #[default]
    #[serde(alias = "all")]
    None,
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "all" => Ok(SortOrder::None),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!(
                "unknown sort order '{}', expected none, asc or desc",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatBand {
    High,
    Medium,
    Low,
}

impl HeatBand {
    pub fn for_percent(success_percent: f64) -> Self {
        if success_percent >= 95.0 {
            HeatBand::High
        } else if success_percent >= 80.0 {
            HeatBand::Medium
        } else {
            HeatBand::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            HeatBand::High => "#2ecc71",
            HeatBand::Medium => "#f1c40f",
            HeatBand::Low => "#e74c3c",
        }
    }
}

/// Everything the presenter needs from one run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub labels: Vec<String>,
    pub aggregate: Aggregate,
    pub totals: Totals,
    pub rows: Vec<SummaryRow>,
    pub sources: Vec<SourceStats>,
    pub dimension_columns: Vec<String>,
}
