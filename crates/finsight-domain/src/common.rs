//! Calendar utilities and ranges for the insight primitives.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Enumerates time units used by `TimeInterval`.
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeUnit::Day => "Day",
            TimeUnit::Week => "Week",
            TimeUnit::Month => "Month",
            TimeUnit::Year => "Year",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Represents a time unit and multiplier for recurrence and contribution cadences.
pub struct TimeInterval {
    pub every: u32,
    pub unit: TimeUnit,
}

impl TimeInterval {
    pub fn new(every: u32, unit: TimeUnit) -> Self {
        Self {
            every: every.max(1),
            unit,
        }
    }

    pub fn weekly() -> Self {
        Self::new(1, TimeUnit::Week)
    }

    pub fn monthly() -> Self {
        Self::new(1, TimeUnit::Month)
    }

    /// The `n`-th occurrence counted from `anchor`. Each occurrence is derived from the
    /// anchor, so clamping to a short month never carries into later ones.
    /// `None` once the result leaves the supported calendar.
    pub fn nth_date(&self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        let steps = i64::from(self.every.max(1)).checked_mul(i64::from(n))?;
        match self.unit {
            TimeUnit::Day => anchor.checked_add_signed(Duration::try_days(steps)?),
            TimeUnit::Week => anchor.checked_add_signed(Duration::try_weeks(steps)?),
            TimeUnit::Month => shift_month(anchor, i32::try_from(steps).ok()?),
            TimeUnit::Year => shift_month(anchor, i32::try_from(steps.checked_mul(12)?).ok()?),
        }
    }

    /// Like [`TimeInterval::nth_date`], keeping the anchor's time of day.
    pub fn nth_timestamp(&self, anchor: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        self.nth_date(anchor.date_naive(), n)
            .map(|date| at_time(date, anchor.time()))
    }

    /// Nominal number of occurrences per 30-day month, used to normalise cadences.
    pub fn occurrences_per_month(&self) -> f64 {
        let every = self.every.max(1) as f64;
        match self.unit {
            TimeUnit::Day => 30.0 / every,
            TimeUnit::Week => 30.0 / (7.0 * every),
            TimeUnit::Month => 1.0 / every,
            TimeUnit::Year => 1.0 / (12.0 * every),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// A half-open time range `[from, to)`.
pub struct DateRange {
    #[serde(with = "crate::timestamp::flexible")]
    pub from: DateTime<Utc>,
    #[serde(with = "crate::timestamp::flexible")]
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, DateRangeError> {
        if to <= from {
            return Err(DateRangeError::InvalidRange);
        }
        Ok(Self { from, to })
    }

    /// Range covering every representable instant.
    pub fn all() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Includes `from`, excludes `to`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }

    /// Shrinks the upper bound to `cutoff` when it falls inside the range.
    pub fn truncate_at(&self, cutoff: DateTime<Utc>) -> Option<Self> {
        let to = self.to.min(cutoff);
        Self::new(self.from, to).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when constructing [`DateRange`] values.
pub enum DateRangeError {
    InvalidRange,
}

impl fmt::Display for DateRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRangeError::InvalidRange => f.write_str("date range end must be after start"),
        }
    }
}

impl std::error::Error for DateRangeError {}

/// Calendar month in UTC, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Truncates a timestamp to its UTC year-month.
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First instant of the month.
    pub fn start(&self) -> DateTime<Utc> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN);
        at_time(first, NaiveTime::default())
    }

    pub fn offset(&self, months: i32) -> Self {
        let index = self
            .year
            .saturating_mul(12)
            .saturating_add(self.month as i32 - 1)
            .saturating_add(months);
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    pub fn previous(&self) -> Self {
        self.offset(-1)
    }

    /// Half-open range spanning the whole month.
    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.start(),
            to: self.next().start(),
        }
    }

    /// The `count` months ending with (and including) this one, oldest first.
    pub fn trailing(&self, count: usize) -> Vec<MonthKey> {
        (0..count)
            .rev()
            .map(|back| self.offset(i32::try_from(back).map_or(i32::MIN, |back| -back)))
            .collect()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthKeyParseError(pub String);

impl fmt::Display for MonthKeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month key `{}` (expected YYYY-MM)", self.0)
    }
}

impl std::error::Error for MonthKeyParseError {}

impl FromStr for MonthKey {
    type Err = MonthKeyParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthKeyParseError(raw.to_string());
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

pub(crate) fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(date.and_time(time), Utc)
}

fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let index = (date.year() * 12 + date.month0() as i32).checked_add(months)?;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_key_renders_and_parses() {
        let key: MonthKey = "2023-02".parse().unwrap();
        assert_eq!(key.to_string(), "2023-02");
        assert_eq!(key.previous().to_string(), "2023-01");
        assert_eq!(MonthKey::new(2023, 12).unwrap().next().to_string(), "2024-01");
        assert!("2023-13".parse::<MonthKey>().is_err());
    }

    #[test]
    fn month_key_truncates_in_utc() {
        let late = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(MonthKey::of(late).to_string(), "2024-01");
        let trailing = MonthKey::of(late).trailing(3);
        let labels: Vec<String> = trailing.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01"]);
    }

    #[test]
    fn date_range_is_half_open() {
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let range = DateRange::new(from, to).unwrap();
        assert!(range.contains(from));
        assert!(!range.contains(to));
        assert_eq!(DateRange::new(to, from), Err(DateRangeError::InvalidRange));
    }

    #[test]
    fn trailing_months_end_at_the_current_one() {
        let june = MonthKey::new(2024, 6).unwrap();
        let keys: Vec<String> = june.trailing(3).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2024-04", "2024-05", "2024-06"]);
        assert_eq!(june.offset(i32::MIN).offset(i32::MAX).month(), june.offset(-1).month());
    }

    #[test]
    fn monthly_interval_clamps_to_month_end() {
        let interval = TimeInterval::monthly();
        let jan_31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let dates: Vec<String> = (1..=4)
            .map(|n| interval.nth_date(jan_31, n).unwrap().format("%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["02-29", "03-31", "04-30", "05-31"]);
    }

    #[test]
    fn interval_steps_scale_from_the_anchor() {
        let anchor = Utc.with_ymd_and_hms(2024, 2, 29, 7, 30, 0).unwrap();
        let yearly = TimeInterval::new(1, TimeUnit::Year);
        assert_eq!(
            yearly.nth_timestamp(anchor, 4),
            Some(Utc.with_ymd_and_hms(2028, 2, 29, 7, 30, 0).unwrap())
        );
        let fortnightly = TimeInterval::new(2, TimeUnit::Week);
        assert_eq!(
            fortnightly.nth_timestamp(anchor, 3),
            Some(Utc.with_ymd_and_hms(2024, 4, 11, 7, 30, 0).unwrap())
        );
        assert_eq!(TimeInterval::new(u32::MAX, TimeUnit::Year).nth_date(anchor.date_naive(), u32::MAX), None);
    }
}
