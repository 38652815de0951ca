//! Field-level parsing for cron expressions.
//!
//! A cron expression has five whitespace-separated fields; each field is a
//! comma-separated list of ranges, where a range is `*`, a single value, or
//! `from-to`, optionally followed by `/step`. This module turns one field
//! token into a bit mask with bit `v - low` set for every scheduled value
//! `v`.

use crate::error::ParseError;
use std::fmt;

pub(crate) const FIRST_MINUTE: u32 = 0;
pub(crate) const LAST_MINUTE: u32 = 59;

pub(crate) const FIRST_HOUR: u32 = 0;
pub(crate) const LAST_HOUR: u32 = 23;

pub(crate) const FIRST_DAY: u32 = 1;
pub(crate) const LAST_DAY: u32 = 31;

pub(crate) const FIRST_MONTH: u32 = 1;
pub(crate) const LAST_MONTH: u32 = 12;

pub(crate) const FIRST_WEEKDAY: u32 = 0;
pub(crate) const LAST_WEEKDAY: u32 = 7;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One of the five positional fields of a cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    Weekday,
}

impl FieldKind {
    /// Inclusive bounds of the values this field accepts.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            FieldKind::Minute => (FIRST_MINUTE, LAST_MINUTE),
            FieldKind::Hour => (FIRST_HOUR, LAST_HOUR),
            FieldKind::DayOfMonth => (FIRST_DAY, LAST_DAY),
            FieldKind::Month => (FIRST_MONTH, LAST_MONTH),
            FieldKind::Weekday => (FIRST_WEEKDAY, LAST_WEEKDAY),
        }
    }

    /// Symbolic names accepted in place of numbers, where the field has any.
    fn names(self) -> Option<&'static [&'static str]> {
        match self {
            FieldKind::Month => Some(&MONTH_NAMES),
            FieldKind::Weekday => Some(&DAY_NAMES),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day of month",
            FieldKind::Month => "month",
            FieldKind::Weekday => "day of week",
        };
        f.write_str(name)
    }
}

/// Parses one whitespace-delimited field token into its bit mask.
pub(crate) fn parse_field(kind: FieldKind, token: &str) -> Result<u64, ParseError> {
    let mut mask = 0u64;
    for part in token.split(',') {
        mask |= parse_range(kind, part)?;
    }
    Ok(mask)
}

/// Parses a single `(* | n | n-m)[/s]` range into its bit contribution.
fn parse_range(kind: FieldKind, part: &str) -> Result<u64, ParseError> {
    let (low, high) = kind.bounds();
    if part.is_empty() {
        return Err(ParseError::MissingOperand { field: kind });
    }

    let (body, step) = match part.split_once('/') {
        Some((body, step_str)) => {
            // A step is a count, not an element: names never apply.
            let step = parse_number(kind, step_str, None)?;
            if step == 0 {
                return Err(ParseError::StepZero { field: kind });
            }
            if step > high {
                return Err(ParseError::StepTooLarge {
                    field: kind,
                    step,
                    high,
                });
            }
            (body, step)
        }
        None => (part, 1),
    };

    let (from, to) = if body == "*" {
        (low, high)
    } else if let Some((from_s, to_s)) = body.split_once('-') {
        let from = parse_number(kind, from_s, kind.names())?;
        let to = parse_number(kind, to_s, kind.names())?;
        if to < from {
            return Err(ParseError::RangeInverted {
                field: kind,
                from,
                to,
            });
        }
        (from, to)
    } else {
        let value = parse_number(kind, body, kind.names())?;
        (value, value)
    };

    if from < low || to > high {
        let value = if from < low { from } else { to };
        return Err(ParseError::OutOfRange {
            field: kind,
            value,
            low,
            high,
        });
    }

    let mut mask = 0u64;
    let mut value = from;
    while value <= to {
        mask |= 1 << (value - low);
        value += step;
    }
    Ok(mask)
}

/// Parses a decimal number, or a symbolic name when the field has a name
/// table.
fn parse_number(
    kind: FieldKind,
    s: &str,
    names: Option<&'static [&'static str]>,
) -> Result<u32, ParseError> {
    let Some(first) = s.chars().next() else {
        return Err(ParseError::MissingOperand { field: kind });
    };

    if first.is_ascii_digit() {
        return match s.find(|c: char| !c.is_ascii_digit()) {
            None => Ok(s.parse().unwrap_or(u32::MAX)),
            Some(idx) => Err(ParseError::InvalidTerminator {
                field: kind,
                found: s[idx..].chars().next().unwrap_or(first),
            }),
        };
    }

    if let Some(names) = names {
        if s.chars().all(|c| c.is_ascii_alphabetic()) {
            let (low, _) = kind.bounds();
            for (i, name) in names.iter().enumerate() {
                if name.eq_ignore_ascii_case(s) {
                    return Ok(low + i as u32);
                }
            }
        }
    }

    Err(ParseError::InvalidTerminator {
        field: kind,
        found: first,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_fills_domain() {
        assert_eq!(
            parse_field(FieldKind::Minute, "*").unwrap(),
            (1 << 60) - 1
        );
        assert_eq!(parse_field(FieldKind::Hour, "*").unwrap(), (1 << 24) - 1);
        assert_eq!(
            parse_field(FieldKind::DayOfMonth, "*").unwrap(),
            (1 << 31) - 1
        );
        assert_eq!(parse_field(FieldKind::Month, "*").unwrap(), (1 << 12) - 1);
        assert_eq!(parse_field(FieldKind::Weekday, "*").unwrap(), (1 << 8) - 1);
    }

    #[test]
    fn test_day_of_month_bit_positions() {
        // Day 1 maps to bit 0.
        assert_eq!(parse_field(FieldKind::DayOfMonth, "1").unwrap(), 0b1);
        assert_eq!(parse_field(FieldKind::DayOfMonth, "31").unwrap(), 1 << 30);
    }

    #[test]
    fn test_names_resolve_case_insensitively() {
        assert_eq!(parse_field(FieldKind::Month, "JAN").unwrap(), 0b1);
        assert_eq!(parse_field(FieldKind::Month, "dec").unwrap(), 1 << 11);
        assert_eq!(parse_field(FieldKind::Weekday, "Mon").unwrap(), 0b10);
        assert_eq!(
            parse_field(FieldKind::Weekday, "sun-tue").unwrap(),
            0b0000_0111
        );
    }

    #[test]
    fn test_names_rejected_outside_their_field() {
        assert_eq!(
            parse_field(FieldKind::Minute, "MON"),
            Err(ParseError::InvalidTerminator {
                field: FieldKind::Minute,
                found: 'M',
            })
        );
    }

    #[test]
    fn test_step_after_single_value() {
        // A single value is a one-element range; a step is accepted.
        assert_eq!(parse_field(FieldKind::Hour, "2/1").unwrap(), 0b100);
    }

    #[test]
    fn test_range_start_validated() {
        assert_eq!(
            parse_field(FieldKind::DayOfMonth, "0-5"),
            Err(ParseError::OutOfRange {
                field: FieldKind::DayOfMonth,
                value: 0,
                low: 1,
                high: 31,
            })
        );
    }

    #[test]
    fn test_empty_list_element() {
        assert_eq!(
            parse_field(FieldKind::Minute, "1,,2"),
            Err(ParseError::MissingOperand {
                field: FieldKind::Minute,
            })
        );
    }

    #[test]
    fn test_step_errors() {
        assert_eq!(
            parse_field(FieldKind::Minute, "*/0"),
            Err(ParseError::StepZero {
                field: FieldKind::Minute,
            })
        );
        assert_eq!(
            parse_field(FieldKind::Minute, "*/70"),
            Err(ParseError::StepTooLarge {
                field: FieldKind::Minute,
                step: 70,
                high: 59,
            })
        );
    }

    #[test]
    fn test_trailing_garbage_is_invalid_terminator() {
        assert_eq!(
            parse_field(FieldKind::Hour, "2-3-4"),
            Err(ParseError::InvalidTerminator {
                field: FieldKind::Hour,
                found: '-',
            })
        );
        assert_eq!(
            parse_field(FieldKind::Minute, "5x"),
            Err(ParseError::InvalidTerminator {
                field: FieldKind::Minute,
                found: 'x',
            })
        );
    }
}
