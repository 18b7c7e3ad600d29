use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// Length of the price-history window requested for every symbol.
pub const HISTORY_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryWindow {
    /// Trailing window of `days` days ending at `now`.
    pub fn trailing(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    pub fn period1(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn period2(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Calendar date of a bar timestamp in the exchange's local time.
///
/// Daily bars are stamped at the session open, so converting in UTC would shift Asian
/// listings back one day.
pub fn exchange_date(timestamp: i64, gmt_offset_secs: i32) -> Option<NaiveDate> {
    let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
    let offset = FixedOffset::east_opt(gmt_offset_secs)?;
    Some(utc.with_timezone(&offset).date_naive())
}
