//! Runtime orchestration layer for the energy dashboard.
//!
//! Sequences the ingestion, aggregation and export stages of a batch run.

pub mod pipeline;

pub use dashboard_core as core;
pub use dashboard_data as data;
pub use dashboard_report as report;
