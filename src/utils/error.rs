use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Credential file '{path}' is unusable: {message}")]
    CredentialError { path: String, message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    #[error("No CSV files found under '{prefix}'")]
    NoSourceFiles { prefix: String },

    #[error("Missing columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::CredentialError { .. } => ErrorCategory::Configuration,
            EtlError::ApiError(_)
            | EtlError::StorageError { .. }
            | EtlError::ObjectNotFound { .. }
            | EtlError::NoSourceFiles { .. } => ErrorCategory::Storage,
            EtlError::CsvError(_)
            | EtlError::MissingColumns { .. }
            | EtlError::MalformedRow { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. }
            | EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路問題通常重跑即可
            EtlError::ApiError(_) | EtlError::StorageError { .. } => ErrorSeverity::Medium,
            EtlError::CredentialError { .. } | EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::CredentialError { .. } => {
                "Check that the credential file exists and contains access_key_id and secret_access_key"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Review the command line flags or the TOML configuration file",
            EtlError::ApiError(_) | EtlError::StorageError { .. } => {
                "Check network connectivity and bucket permissions, then run again"
            }
            EtlError::ObjectNotFound { .. } => "List the available dates with --list and pick an existing one",
            EtlError::NoSourceFiles { .. } => "Upload CSV files under the configured prefix or change --prefix",
            EtlError::MissingColumns { .. } => "Make sure the CSV header contains every column named by the schema",
            EtlError::MalformedRow { .. } => "Fix the offending row or rerun without --strict to skip malformed rows",
            EtlError::CsvError(_) => "Make sure the file is valid comma separated text",
            EtlError::IoError(_) | EtlError::ZipError(_) => "Check disk space and write permissions of the output directory",
            EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => "Run again with --verbose for more detail",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Could not load data from storage: {}", self),
            ErrorCategory::Data => format!("The data could not be analysed: {}", self),
            ErrorCategory::Io => format!("A local file operation failed: {}", self),
        }
    }

    /// 依嚴重程度決定的程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
