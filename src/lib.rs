//! Chronotab - periodic task scheduling built on compiled cron expressions.
//!
//! The core is a cron engine: an expression parses into five fixed-width
//! bit masks, so deciding whether an instant is scheduled is a handful of
//! bit tests and the nearest scheduled instant in either direction is
//! found with bit scans. Around it sit two thin collaborators: a crontab
//! runner that fires registered actions on a once-per-minute tick, and an
//! epoch-aligned periodic schedule for fixed period-plus-offset firing.
//!
//! # Features
//!
//! - **Cron expressions**: standard five-field syntax with ranges, steps,
//!   lists, month/weekday names, and the `@yearly`..`@hourly` shorthands.
//! - **Point queries**: [`CronExpr::matches`], [`CronExpr::after`] and
//!   [`CronExpr::before`] over plain local calendar time.
//! - **Crontab runner**: per-tick fan-out of matching entries onto
//!   independent tasks, immediate close, and deadline-bounded graceful
//!   shutdown.
//! - **Periodic schedules**: firings anchored to the UNIX epoch, so a
//!   two-minute period fires on even minutes.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chronotab::{ActionFn, Crontab, Runner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let crontab = Arc::new(Crontab::new());
//!     crontab.register(
//!         "*/15 * * * *",
//!         ActionFn::new(|_cancel, now| async move {
//!             println!("quarter-hour tick at {now}");
//!         }),
//!     );
//!
//!     Runner::new(crontab).run().await.unwrap();
//! }
//! ```

pub mod cron;
pub mod crontab;
pub mod error;
pub mod field;
pub mod schedule;

pub use cron::CronExpr;
pub use crontab::{Action, ActionFn, Crontab, Runner, RunnerConfig};
pub use error::{ParseError, RunnerError};
pub use field::FieldKind;
pub use schedule::Schedule;

// Cancellation flows through every action; re-exported so implementors
// do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
