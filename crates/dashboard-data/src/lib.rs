//! Data ingestion and aggregation layer for the energy dashboard.
//!
//! Responsible for discovering and parsing per-building meter files, merging
//! them into one dataset while isolating per-file failures, and computing
//! daily, weekly and per-source aggregates.

pub mod aggregator;
pub mod builder;
pub mod parser;
pub mod reader;

pub use dashboard_core as core;
