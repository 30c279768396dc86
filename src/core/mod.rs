pub mod aggregator;
pub mod etl;
pub mod report;
pub mod summary;

pub use crate::domain::model::{Aggregate, AnalysisResult, FetchedSource};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RowErrorPolicy, Storage};
pub use crate::utils::error::Result;
