//! IST calendar helpers and the clock seam
//!
//! All calendar math runs in India Standard Time (+05:30). Metrics functions
//! take the reference date explicitly; the chat session asks a [`Clock`].

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};

/// Offset of India Standard Time from UTC, in seconds
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// India Standard Time as a fixed offset
pub fn ist() -> FixedOffset {
    // 19800 is well inside the valid offset range
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Source of "now" for the chat session
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Today's calendar date in IST
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time, converted to IST
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&ist())
    }
}

/// A clock frozen at one instant (tests, replays)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Freeze at the given IST wall time
    pub fn at(datetime: NaiveDateTime) -> Self {
        let fixed = ist()
            .from_local_datetime(&datetime)
            .single()
            .unwrap_or_else(|| Utc.from_utc_datetime(&datetime).with_timezone(&ist()));
        Self(fixed)
    }

    /// Freeze at noon IST on the given date
    pub fn on(date: NaiveDate) -> Self {
        Self::at(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Convert a UTC instant to its IST calendar date
pub fn ist_date(instant: &DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&ist()).date_naive()
}

/// Midnight IST on `date`, as a UTC instant
pub fn ist_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    ist()
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Inclusive (start, end) of the calendar month containing `date`
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (month_start(date), month_end(date))
}

/// Inclusive (start, end) of the calendar month before the one containing `date`
pub fn previous_month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let prev = month_start(date)
        .checked_sub_months(Months::new(1))
        .unwrap_or(date);
    month_bounds(prev)
}

/// (year, month) key used for monthly grouping
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Parse a `YYYY-MM-DD` string, tolerating surrounding whitespace
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse either a `YYYY-MM-DD` date (IST midnight) or an RFC 3339 timestamp
pub fn parse_date_or_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Some(date) = parse_date(value) {
        return Some(ist_midnight(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-time without an offset is read as IST wall time
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|naive| ist().from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(date(2024, 2, 14)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            previous_month_bounds(date(2024, 1, 10)),
            (date(2023, 12, 1), date(2023, 12, 31))
        );
    }

    #[test]
    fn test_date_only_is_ist_midnight() {
        let instant = parse_date_or_timestamp("2024-03-01").unwrap();
        assert_eq!(ist_date(&instant), date(2024, 3, 1));
        // 2024-03-01 00:00 IST is the previous evening in UTC
        assert_eq!(instant.date_naive(), date(2024, 2, 29));
    }

    #[test]
    fn test_rfc3339_late_utc_rolls_into_next_ist_day() {
        let instant = parse_date_or_timestamp("2024-03-01T20:00:00Z").unwrap();
        assert_eq!(ist_date(&instant), date(2024, 3, 2));
    }

    #[test]
    fn test_fixed_clock_today() {
        let clock = FixedClock::on(date(2024, 5, 20));
        assert_eq!(clock.today(), date(2024, 5, 20));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_date_or_timestamp("next tuesday").is_none());
        assert!(parse_date("2024-13-01").is_none());
    }
}
