//! Epoch-aligned periodic schedules.
//!
//! A [`Schedule`] fires every `period`, offset by `offset`, with firings
//! anchored to the UNIX epoch rather than to the moment of creation: a
//! two-minute period fires on even minutes no matter when the schedule
//! was built. An offset larger than the period simply skips the first
//! `offset / period` firings.

use chrono::{DateTime, Local};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A stream of firing instants at `truncate(now, period) + offset + k * period`.
///
/// Firings are delivered on a bounded channel; a consumer that falls more
/// than one period behind misses firings instead of accumulating them, so
/// lag never compounds.
pub struct Schedule {
    rx: mpsc::Receiver<DateTime<Local>>,
    period: Duration,
    offset: Duration,
}

impl Schedule {
    /// Starts a schedule. Cancel `cancel` to release the timer and stop
    /// emission; dropping the `Schedule` stops it as well.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: Duration, offset: Duration, cancel: CancellationToken) -> Self {
        assert!(!period.is_zero(), "non-positive period for Schedule");

        let (tx, rx) = mpsc::channel(1);
        let delay = delay_to_first_fire(SystemTime::now(), period, offset);
        debug!(?period, ?offset, ?delay, "schedule started");

        tokio::spawn(async move {
            let start = time::Instant::now() + delay;
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("schedule cancelled");
                        return;
                    }
                    _ = ticker.tick() => {
                        let now = Local::now();
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            sent = tx.send(now) => {
                                if sent.is_err() {
                                    // Receiver dropped.
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        Self { rx, period, offset }
    }

    /// Receives the next firing instant; `None` once the schedule has
    /// been cancelled and the channel drained.
    pub async fn recv(&mut self) -> Option<DateTime<Local>> {
        self.rx.recv().await
    }

    /// The period of this schedule.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The offset of this schedule.
    pub fn offset(&self) -> Duration {
        self.offset
    }
}

/// Time until the first firing: the period boundary at or before `now`,
/// plus the offset, advanced by one period if that is not strictly in the
/// future.
fn delay_to_first_fire(now: SystemTime, period: Duration, offset: Duration) -> Duration {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let into_period = Duration::from_nanos((since_epoch.as_nanos() % period.as_nanos()) as u64);
    let mut first = since_epoch - into_period + offset;
    if first <= since_epoch {
        first += period;
    }
    first - since_epoch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fire_on_period_boundary() {
        let period = Duration::from_secs(60);
        let now = UNIX_EPOCH + Duration::from_secs(90);
        assert_eq!(
            delay_to_first_fire(now, period, Duration::ZERO),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_first_fire_exactly_on_boundary_waits_full_period() {
        let period = Duration::from_secs(60);
        let now = UNIX_EPOCH + Duration::from_secs(120);
        assert_eq!(
            delay_to_first_fire(now, period, Duration::ZERO),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_offset_within_period() {
        let period = Duration::from_secs(60);
        let offset = Duration::from_secs(45);
        let now = UNIX_EPOCH + Duration::from_secs(130);
        // Boundary at 120, next offset firing at 165.
        assert_eq!(
            delay_to_first_fire(now, period, offset),
            Duration::from_secs(35)
        );
    }

    #[test]
    fn test_offset_larger_than_period_skips_firings() {
        let period = Duration::from_secs(10);
        let offset = Duration::from_secs(35);
        let now = UNIX_EPOCH + Duration::from_secs(100);
        // First firing at 135: the firings at 105, 115, 125 are skipped.
        assert_eq!(
            delay_to_first_fire(now, period, offset),
            Duration::from_secs(35)
        );
    }

    #[tokio::test]
    #[should_panic(expected = "non-positive period")]
    async fn test_zero_period_panics() {
        let _ = Schedule::new(
            Duration::ZERO,
            Duration::ZERO,
            CancellationToken::new(),
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_emission() {
        let cancel = CancellationToken::new();
        let mut schedule = Schedule::new(
            Duration::from_millis(20),
            Duration::ZERO,
            cancel.clone(),
        );

        assert!(schedule.recv().await.is_some());
        cancel.cancel();
        // The driving task exits; the channel drains to None.
        while schedule.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_accessors() {
        let schedule = Schedule::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert_eq!(schedule.period(), Duration::from_secs(5));
        assert_eq!(schedule.offset(), Duration::from_secs(1));
    }
}
