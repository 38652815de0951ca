//! Error types for cron parsing and the crontab runner.

use crate::field::FieldKind;
use thiserror::Error;

/// Errors produced while parsing a cron expression.
///
/// Each variant carries the field it was found in and the offending
/// values, so callers can report exactly which part of the definition
/// was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot parse empty string as schedule definition")]
    Empty,

    #[error("expected 5 fields in schedule definition, got {0}")]
    FieldCount(usize),

    #[error("value {value} is out of range [{low}, {high}] for {field}")]
    OutOfRange {
        field: FieldKind,
        value: u32,
        low: u32,
        high: u32,
    },

    #[error("end of {field} range must not be less than start ({from}-{to})")]
    RangeInverted { field: FieldKind, from: u32, to: u32 },

    #[error("step must be greater than 0 for {field}")]
    StepZero { field: FieldKind },

    #[error("step {step} is too large for {field} (max {high})")]
    StepTooLarge {
        field: FieldKind,
        step: u32,
        high: u32,
    },

    #[error("missing value in {field}")]
    MissingOperand { field: FieldKind },

    #[error("invalid terminator {found:?} in {field}")]
    InvalidTerminator { field: FieldKind, found: char },

    #[error("cannot parse {0:?} as predefined schedule definition")]
    UnknownShorthand(String),
}

/// Errors returned by the crontab [`Runner`](crate::crontab::Runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// `run` was called after `close` or `shutdown`.
    #[error("crontab closed")]
    Closed,

    /// Graceful shutdown did not finish within its deadline.
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,
}
