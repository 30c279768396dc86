use crate::utils::error::{EtlError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_CREDENTIALS_PATH: &str = "serviceAccountKey.json";

fn default_region() -> String {
    "auto".to_string()
}

/// Service-account key for S3-compatible object storage (AWS, MinIO, or GCS
/// interoperability HMAC keys).
#[derive(Clone, Deserialize)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

// 不在日誌裡輸出金鑰
impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl StorageCredentials {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let credential_error = |message: String| EtlError::CredentialError {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| credential_error(e.to_string()))?;
        let credentials: Self =
            serde_json::from_str(&content).map_err(|e| credential_error(e.to_string()))?;

        if credentials.access_key_id.trim().is_empty()
            || credentials.secret_access_key.trim().is_empty()
        {
            return Err(credential_error(
                "access_key_id and secret_access_key must not be empty".to_string(),
            ));
        }

        if let Some(endpoint) = &credentials.endpoint_url {
            crate::utils::validation::validate_url("endpoint_url", endpoint)?;
        }

        tracing::debug!("Loaded storage credentials: {:?}", credentials);
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_credentials_with_defaults() {
        let file = write_json(r#"{"access_key_id": "GOOG1EXAMPLE", "secret_access_key": "s3cr3t"}"#);
        let credentials = StorageCredentials::from_file(file.path()).unwrap();

        assert_eq!(credentials.access_key_id, "GOOG1EXAMPLE");
        assert_eq!(credentials.region, "auto");
        assert!(credentials.endpoint_url.is_none());
    }

    #[test]
    fn test_missing_file_is_credential_error() {
        let err = StorageCredentials::from_file("/nonexistent/serviceAccountKey.json").unwrap_err();
        assert!(matches!(err, EtlError::CredentialError { .. }));
    }

    #[test]
    fn test_invalid_json_is_credential_error() {
        let file = write_json("{ not json");
        let err = StorageCredentials::from_file(file.path()).unwrap_err();
        assert!(matches!(err, EtlError::CredentialError { .. }));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let file = write_json(r#"{"access_key_id": "id", "secret_access_key": " "}"#);
        assert!(StorageCredentials::from_file(file.path()).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let file = write_json(r#"{"access_key_id": "id", "secret_access_key": "topsecret"}"#);
        let credentials = StorageCredentials::from_file(file.path()).unwrap();
        assert!(!format!("{:?}", credentials).contains("topsecret"));
    }
}
