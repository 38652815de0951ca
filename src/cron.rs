//! Cron expression parsing and evaluation.
//!
//! Supports standard 5-field cron expressions:
//! ```text
//! ┌───────────── minute (0-59)
//! │ ┌───────────── hour (0-23)
//! │ │ ┌───────────── day of month (1-31)
//! │ │ │ ┌───────────── month (1-12)
//! │ │ │ │ ┌───────────── day of week (0-7, 0 and 7 = Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! The following nonstandard predefined definitions are also accepted:
//!
//! * `@yearly`, `@annually`: once a year, at midnight of 1 January
//! * `@monthly`: once a month, at midnight of the first day of the month
//! * `@weekly`: once a week, at midnight on Sunday morning
//! * `@daily`, `@midnight`: once a day, at midnight
//! * `@hourly`: once an hour, at the beginning of the hour
//!
//! Each field compiles to a fixed-width bit mask (the 60-bit minute field
//! fits a single word), so [`CronExpr::matches`] is a handful of bit
//! tests, and [`CronExpr::after`] / [`CronExpr::before`] walk the masks
//! with bit scans instead of probing minute by minute.

use crate::error::ParseError;
use crate::field::{
    self, FieldKind, FIRST_DAY, FIRST_HOUR, FIRST_MINUTE, FIRST_MONTH,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many years `after`/`before` search before concluding an expression
/// can never match. The longest gap between scheduled instants of any
/// satisfiable expression is the eight-year stretch between leap days
/// around a skipped century leap year (2096 → 2104).
const SEARCH_HORIZON_YEARS: i32 = 8;

/// Sunday is both weekday 0 and weekday 7.
const SUNDAY_BITS: u64 = 0b1000_0001;

/// A compiled cron expression.
///
/// Immutable after construction; evaluation methods are pure and take the
/// instant to test as a plain local calendar time (`NaiveDateTime`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronExpr {
    expr: String,
    minutes: u64,
    hours: u64,
    days: u64,
    months: u64,
    weekdays: u64,
    day_star: bool,
    weekday_star: bool,
}

impl CronExpr {
    /// Parses a cron expression, either five whitespace-separated fields
    /// or one of the `@` shorthands.
    ///
    /// ```
    /// use chronotab::CronExpr;
    ///
    /// let every_quarter_hour = CronExpr::parse("*/15 * * * *").unwrap();
    /// let nightly = CronExpr::parse("@daily").unwrap();
    /// # let _ = (every_quarter_hour, nightly);
    /// ```
    pub fn parse(expr: &str) -> Result<Self, ParseError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(ParseError::Empty);
        }

        if expr.starts_with('@') {
            let equivalent = match expr {
                "@yearly" | "@annually" => "0 0 1 1 *",
                "@monthly" => "0 0 1 * *",
                "@weekly" => "0 0 * * 0",
                "@daily" | "@midnight" => "0 0 * * *",
                "@hourly" => "0 * * * *",
                _ => return Err(ParseError::UnknownShorthand(expr.to_string())),
            };
            let mut cron = Self::parse_fields(equivalent)?;
            cron.expr = expr.to_string();
            return Ok(cron);
        }

        Self::parse_fields(expr)
    }

    fn parse_fields(expr: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ParseError::FieldCount(fields.len()));
        }

        let minutes = field::parse_field(FieldKind::Minute, fields[0])?;
        let hours = field::parse_field(FieldKind::Hour, fields[1])?;
        let days = field::parse_field(FieldKind::DayOfMonth, fields[2])?;
        let months = field::parse_field(FieldKind::Month, fields[3])?;
        let mut weekdays = field::parse_field(FieldKind::Weekday, fields[4])?;

        // 0 and 7 both mean Sunday; keep the two bits equal.
        if weekdays & SUNDAY_BITS != 0 {
            weekdays |= SUNDAY_BITS;
        }

        Ok(Self {
            expr: expr.to_string(),
            minutes,
            hours,
            days,
            months,
            weekdays,
            day_star: fields[2].starts_with('*'),
            weekday_star: fields[4].starts_with('*'),
        })
    }

    /// The source text this expression was parsed from.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Whether the expression is scheduled for the given instant.
    ///
    /// Only the minute and coarser components participate; seconds and
    /// below are ignored. The two day fields follow traditional cron
    /// semantics: when both are restricted, the expression fires when
    /// *either* matches; when one of them is `*`, only the other
    /// constrains the day.
    pub fn matches(&self, t: NaiveDateTime) -> bool {
        self.minutes & (1 << t.minute()) != 0
            && self.hours & (1 << t.hour()) != 0
            && self.date_matches(t.date())
    }

    /// The first scheduled instant strictly after `u`, or `None` when the
    /// expression can never match (for example `0 0 31 2 *`).
    pub fn after(&self, u: NaiveDateTime) -> Option<NaiveDateTime> {
        let sub = Duration::seconds(i64::from(u.second()))
            + Duration::nanoseconds(i64::from(u.nanosecond()));
        let mut t = if sub.is_zero() {
            u + Duration::minutes(1)
        } else {
            u - sub + Duration::minutes(1)
        };

        let (diff, overflow) = diff_after(t.minute(), FIRST_MINUTE, self.minutes);
        if overflow {
            t += Duration::hours(1);
        }
        t += Duration::minutes(diff);

        let (diff, overflow) = diff_after(t.hour(), FIRST_HOUR, self.hours);
        if diff != 0 || overflow {
            // The hour moved: the minute falls back to the first scheduled one.
            t = t.with_minute(first_set(self.minutes))?;
            if overflow {
                t += Duration::days(1);
            }
            t += Duration::hours(diff);
        }

        let start = t.date();
        let date = self.next_date(start)?;
        if date == start {
            Some(t)
        } else {
            date.and_hms_opt(first_set(self.hours), first_set(self.minutes), 0)
        }
    }

    /// The last scheduled instant strictly before `u`, or `None` when the
    /// expression can never match.
    pub fn before(&self, u: NaiveDateTime) -> Option<NaiveDateTime> {
        let sub = Duration::seconds(i64::from(u.second()))
            + Duration::nanoseconds(i64::from(u.nanosecond()));
        let mut t = if sub.is_zero() {
            u - Duration::minutes(1)
        } else {
            u - sub
        };

        let (diff, underflow) = diff_before(t.minute(), FIRST_MINUTE, self.minutes);
        if underflow {
            t -= Duration::hours(1);
        }
        t += Duration::minutes(diff);

        let (diff, underflow) = diff_before(t.hour(), FIRST_HOUR, self.hours);
        if diff != 0 || underflow {
            // The hour moved: the minute falls forward to the last scheduled one.
            t = t.with_minute(last_set(self.minutes))?;
            if underflow {
                t -= Duration::days(1);
            }
            t += Duration::hours(diff);
        }

        let start = t.date();
        let date = self.prev_date(start)?;
        if date == start {
            Some(t)
        } else {
            date.and_hms_opt(last_set(self.hours), last_set(self.minutes), 0)
        }
    }

    /// The first date on or after `from` whose month and day fields match.
    fn next_date(&self, from: NaiveDate) -> Option<NaiveDate> {
        let horizon = from.year() + SEARCH_HORIZON_YEARS;
        let mut date = from;
        while date.year() <= horizon {
            let (diff, overflow) = diff_after(date.month(), FIRST_MONTH, self.months);
            if diff != 0 || overflow {
                // Jump to the first day of the next scheduled month.
                let year = date.year() + i32::from(overflow);
                let month = (i64::from(date.month()) + diff) as u32;
                date = NaiveDate::from_ymd_opt(year, month, 1)?;
            }
            if self.day_matches(date) {
                return Some(date);
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// The last date on or before `from` whose month and day fields match.
    fn prev_date(&self, from: NaiveDate) -> Option<NaiveDate> {
        let horizon = from.year() - SEARCH_HORIZON_YEARS;
        let mut date = from;
        while date.year() >= horizon {
            let (diff, underflow) = diff_before(date.month(), FIRST_MONTH, self.months);
            if diff != 0 || underflow {
                // Jump to the last day of the previous scheduled month.
                let year = date.year() - i32::from(underflow);
                let month = (i64::from(date.month()) + diff) as u32;
                date = last_day_of_month(year, month)?;
            }
            if self.day_matches(date) {
                return Some(date);
            }
            date = date.pred_opt()?;
        }
        None
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        self.months & (1 << (date.month() - FIRST_MONTH)) != 0 && self.day_matches(date)
    }

    /// The two-day-fields rule: with both fields restricted the day
    /// matches when either bit is set; a `*` field contributes a full
    /// mask, so the conjunction leaves the other field as the sole
    /// constraint.
    fn day_matches(&self, date: NaiveDate) -> bool {
        let day = self.days & (1 << (date.day() - FIRST_DAY)) != 0;
        let weekday = self.weekdays & (1 << date.weekday().num_days_from_sunday()) != 0;
        if !self.day_star && !self.weekday_star {
            day || weekday
        } else {
            day && weekday
        }
    }
}

impl FromStr for CronExpr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

/// Distance from `current` to the next scheduled value in `mask`, and
/// whether the search wrapped past the top of the field. On a wrap the
/// returned delta points at the lowest scheduled value, so adding it
/// after carrying one unit of the next-coarser field lands on target.
fn diff_after(current: u32, low: u32, mask: u64) -> (i64, bool) {
    let pos = current - low;
    if mask & (1 << pos) != 0 {
        return (0, false);
    }
    let above = mask & !((1u64 << (pos + 1)) - 1);
    if above != 0 {
        (i64::from(above.trailing_zeros()) - i64::from(pos), false)
    } else {
        (i64::from(first_set(mask)) - i64::from(pos), true)
    }
}

/// Mirror image of [`diff_after`]: distance back to the previous
/// scheduled value, wrapping past the bottom of the field.
fn diff_before(current: u32, low: u32, mask: u64) -> (i64, bool) {
    let pos = current - low;
    if mask & (1 << pos) != 0 {
        return (0, false);
    }
    let below = mask & ((1u64 << pos) - 1);
    if below != 0 {
        (i64::from(last_set(below)) - i64::from(pos), false)
    } else {
        (i64::from(last_set(mask)) - i64::from(pos), true)
    }
}

fn first_set(mask: u64) -> u32 {
    mask.trailing_zeros()
}

fn last_set(mask: u64) -> u32 {
    63 - mask.leading_zeros()
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next?.pred_opt()
}
