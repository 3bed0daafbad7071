//! Time-bucketed and per-source aggregation of a [`Dataset`].
//!
//! Buckets exist only where data exists: a day or week with no readings is
//! absent from the result, never zero-filled. Day and week boundaries are
//! civil boundaries in the reference timezone; weeks start on Monday.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use dashboard_core::models::{Dataset, Reading, SourceSummary, TimeBucketTotal};
use dashboard_core::time_utils::{start_of_day, Granularity};
use tracing::debug;

// ── SummaryAccumulator ────────────────────────────────────────────────────────

/// Running statistics for one source.
#[derive(Debug, Clone, Copy)]
struct SummaryAccumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for SummaryAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl SummaryAccumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn finish(self, source_id: String) -> SourceSummary {
        SourceSummary {
            source_id,
            mean: self.sum / self.count as f64,
            min: self.min,
            max: self.max,
            sum: self.sum,
        }
    }
}

// ── Aggregates ────────────────────────────────────────────────────────────────

/// Everything the report stage needs from one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub daily: Vec<TimeBucketTotal>,
    pub weekly: Vec<TimeBucketTotal>,
    /// One row per source, ordered by `source_id`.
    pub summaries: Vec<SourceSummary>,
    pub total_consumption: f64,
    /// Reference calendar the buckets were cut in.
    pub timezone: Tz,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Pure grouping over a dataset; never mutates its input.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    tz: Tz,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl Aggregator {
    /// `tz` is the reference calendar for day and week boundaries.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Run every aggregation over `dataset`.
    pub fn aggregate(&self, dataset: &Dataset) -> Aggregates {
        let aggregates = Aggregates {
            daily: self.daily_totals(dataset),
            weekly: self.weekly_totals(dataset),
            summaries: Self::source_summaries(dataset),
            total_consumption: Self::total_consumption(dataset),
            timezone: self.tz,
        };
        debug!(
            "Aggregated {} readings into {} days, {} weeks, {} sources",
            dataset.len(),
            aggregates.daily.len(),
            aggregates.weekly.len(),
            aggregates.summaries.len()
        );
        aggregates
    }

    /// Sum of values per civil day, all sources combined, ascending.
    pub fn daily_totals(&self, dataset: &Dataset) -> Vec<TimeBucketTotal> {
        self.bucket_totals(dataset, Granularity::Day)
    }

    /// Sum of values per Monday-start week, all sources combined, ascending.
    pub fn weekly_totals(&self, dataset: &Dataset) -> Vec<TimeBucketTotal> {
        self.bucket_totals(dataset, Granularity::Week)
    }

    /// Generic bucketing driver. Only buckets containing at least one
    /// reading are emitted.
    pub fn bucket_totals(&self, dataset: &Dataset, granularity: Granularity) -> Vec<TimeBucketTotal> {
        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for reading in dataset {
            let key = granularity.bucket_date(reading.timestamp, self.tz);
            *buckets.entry(key).or_insert(0.0) += reading.value;
        }

        buckets
            .into_iter()
            .map(|(date, total_value)| TimeBucketTotal {
                bucket_start: start_of_day(date, self.tz),
                total_value,
            })
            .collect()
    }

    /// Mean, min, max and sum of values per source, ordered by `source_id`.
    ///
    /// Readings sharing a source and timestamp all count; nothing is
    /// deduplicated.
    pub fn source_summaries(dataset: &Dataset) -> Vec<SourceSummary> {
        let mut groups: BTreeMap<&str, SummaryAccumulator> = BTreeMap::new();
        for Reading {
            source_id, value, ..
        } in dataset
        {
            groups.entry(source_id.as_str()).or_default().add(*value);
        }

        groups
            .into_iter()
            .map(|(source_id, acc)| acc.finish(source_id.to_string()))
            .collect()
    }

    /// Sum of every reading's value.
    pub fn total_consumption(dataset: &Dataset) -> f64 {
        dataset.total_consumption()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
