pub mod config;
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod scoring;
