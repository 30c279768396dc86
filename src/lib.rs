pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::{HttpStorage, LocalStorage};
#[cfg(feature = "s3")]
pub use adapters::storage::S3Storage;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::{toml_config::TomlConfig, SourceKind, SourceSettings};

pub use app::pipeline::AnalysisPipeline;
pub use app::runner::{list_dates, run_analysis};
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
