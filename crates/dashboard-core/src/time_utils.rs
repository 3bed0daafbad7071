use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{DashboardError, Result};

/// Resolve an IANA timezone name used as the reference calendar.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DashboardError::InvalidTimezone(name.to_string()))
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Layouts with a numeric offset, with or without a colon.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive date-time layouts accepted in meter files, tried in order.
/// Slash dates are month-first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y%m%d%H%M%S",
    "%Y%m%dT%H%M%S",
];

/// Date-only layouts; the reading is placed at local midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Longest digit string read as Unix seconds.
const MAX_EPOCH_DIGITS: usize = 10;

/// Normalises the timestamp strings found in meter files to UTC instants.
///
/// Values carrying an explicit offset keep it; naive values are interpreted
/// in the reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimestampProcessor {
    tz: Tz,
}

impl Default for TimestampProcessor {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimestampProcessor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse one field into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * RFC 3339 / ISO 8601 with offset (including the `Z` suffix and a
    ///   space instead of `T`).
    /// * RFC 2822.
    /// * Offsets without a colon (`+0100`).
    /// * Naive date-times and dates in the layouts above, including compact
    ///   `YYYYMMDD` and `YYYYMMDDHHMMSS`.
    /// * Integer Unix seconds of at most ten digits.
    ///
    /// Returns `None` for blank or unrecognised input.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(&normalised, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.localize(naive);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return self.localize(date.and_time(NaiveTime::MIN));
            }
        }

        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.len() <= MAX_EPOCH_DIGITS {
            if let Ok(secs) = s.parse::<i64>() {
                return DateTime::from_timestamp(secs, 0);
            }
        }

        debug!("TimestampProcessor: could not parse timestamp \"{}\"", s);
        None
    }

    /// Attach the reference timezone to a naive value. Ambiguous local times
    /// resolve to the earlier instant. Local times skipped by a DST change
    /// take the offset in force before the gap, so `02:30` on a spring-forward
    /// night lands at `03:30` of the new offset.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
            return Some(dt.with_timezone(&Utc));
        }
        let before = naive - chrono::Duration::days(1);
        let offset = self.tz.offset_from_local_datetime(&before).earliest()?;
        let shift = chrono::Duration::seconds(i64::from(offset.fix().local_minus_utc()));
        Some(Utc.from_utc_datetime(&(naive - shift)))
    }
}

// ── Calendar buckets ─────────────────────────────────────────────────────────

/// Calendar bucket width used for time-based totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Civil day, midnight to midnight.
    Day,
    /// ISO week, Monday 00:00 to the following Monday 00:00.
    Week,
}

impl Granularity {
    /// The first local calendar date of the bucket containing `ts`.
    pub fn bucket_date(self, ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
        let date = ts.with_timezone(&tz).date_naive();
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                date - chrono::Duration::days(offset)
            }
        }
    }

    /// UTC instant at which the bucket containing `ts` starts.
    pub fn bucket_start(self, ts: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        start_of_day(self.bucket_date(ts, tz), tz)
    }
}

/// First instant of `date` in `tz`, expressed in UTC.
///
/// Zones that skip midnight for a DST change start the day at the first
/// valid local hour.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..3)
        .find_map(|h| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(h)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
