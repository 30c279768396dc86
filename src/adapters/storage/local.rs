use crate::adapters::storage::{is_csv_key, normalize_prefix};
use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};

/// Storage rooted at a local directory, e.g. a `data/` folder of daily
/// exports.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let dir = self.base_path.join(&prefix);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_csv_key(name) {
                    keys.push(format!("{}{}", prefix, name));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn fetch_to(&self, key: &str, dest: &Path) -> Result<u64> {
        let source = self.base_path.join(key);
        tokio::fs::copy(&source, dest).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EtlError::ObjectNotFound {
                    key: key.to_string(),
                }
            } else {
                EtlError::IoError(e)
            }
        })
    }

    async fn write_file(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(key);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_files_returns_sorted_csv_keys() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("pipe_data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("2025-06-02.csv"), "x").unwrap();
        std::fs::write(data.join("2025-06-01.csv"), "x").unwrap();
        std::fs::write(data.join("notes.txt"), "x").unwrap();

        let storage = LocalStorage::new(dir.path());
        let keys = storage.list_files("pipe_data").await.unwrap();
        assert_eq!(keys, vec!["pipe_data/2025-06-01.csv", "pipe_data/2025-06-02.csv"]);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.list_files("nothing_here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let dest = dir.path().join("out.csv");

        let err = storage.fetch_to("2025-01-01.csv", &dest).await.unwrap_err();
        assert!(matches!(err, EtlError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_write_then_fetch() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        tokio_test::assert_ok!(storage.write_file("pipe_summary/summary.json", b"{}").await);

        let dest = dir.path().join("copy.json");
        let bytes = storage
            .fetch_to("pipe_summary/summary.json", &dest)
            .await
            .unwrap();
        assert_eq!(bytes, 2);
        assert_eq!(std::fs::read(dest).unwrap(), b"{}");
    }
}
