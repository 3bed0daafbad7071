//! Shared building blocks for the energy dashboard.
//!
//! Holds the data model, the error taxonomy, timestamp normalisation and
//! calendar bucketing, CLI/config settings, and report number formatting.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{DashboardError, Result};
