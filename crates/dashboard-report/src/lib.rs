//! Output layer for the energy dashboard.
//!
//! Serialises the cleaned dataset and the per-source summary table, renders
//! the plain-text report, and hands the chart set to a rendering
//! collaborator.

pub mod charts;
pub mod exporter;

pub use dashboard_core as core;
