use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};

/// How far a calendar year has progressed on a given date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearProgress {
    /// 1-based ordinal of the date within its year.
    pub day_of_year: u32,
    /// 365 or 366.
    pub total_days: u32,
    /// `day_of_year / total_days * 100`, in `0.0..=100.0`.
    pub percentage: f64,
}

impl YearProgress {
    /// Compute progress for `date`. Total over every valid date.
    pub fn compute(date: NaiveDate) -> Self {
        let total_days = days_in_year(date.year());
        let day_of_year = match NaiveDate::from_ymd_opt(date.year(), 1, 1) {
            Some(start) => (date - start).num_days() as u32 + 1,
            None => date.ordinal(),
        };

        if total_days == 0 {
            return Self {
                day_of_year,
                total_days,
                percentage: 0.0,
            };
        }

        Self {
            day_of_year,
            total_days,
            percentage: day_of_year as f64 / total_days as f64 * 100.0,
        }
    }

    /// Days left after today.
    pub fn remaining_days(&self) -> u32 {
        self.total_days.saturating_sub(self.day_of_year)
    }
}

/// Number of days between January 1 and December 31 of `year`, inclusive.
///
/// Returns 0 for years chrono cannot represent.
pub fn days_in_year(year: i32) -> u32 {
    match (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) {
        (Some(start), Some(end)) => (end - start).num_days() as u32 + 1,
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    days_in_year(year) == 366
}

/// Calendar date of `now` in a fixed offset from UTC, expressed in whole hours.
///
/// Offsets chrono rejects (24 hours or more) fall back to UTC.
pub fn date_in_offset(now: DateTime<Utc>, offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(offset_hours.saturating_mul(3600)).unwrap_or(Utc.fix());
    now.with_timezone(&offset).date_naive()
}

pub fn today_in_offset(offset_hours: i32) -> NaiveDate {
    date_in_offset(Utc::now(), offset_hours)
}
