pub mod http;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use http::HttpStorage;
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// "pipe_data" -> "pipe_data/"; an empty prefix stays empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

pub fn object_key(prefix: &str, date: &str) -> String {
    format!("{}{}.csv", normalize_prefix(prefix), date)
}

/// `pipe_data/2025-06-01.csv` -> `2025-06-01`
pub fn date_label(key: &str) -> &str {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name.strip_suffix(".csv").unwrap_or(file_name)
}

pub(crate) fn is_csv_key(key: &str) -> bool {
    key.ends_with(".csv")
}
