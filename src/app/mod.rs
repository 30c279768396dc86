pub mod pipeline;
pub mod runner;
