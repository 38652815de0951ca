//! Crontab registration and the minute-tick runner.
//!
//! A [`Crontab`] is an append-only collection of (expression, action)
//! entries. A [`Runner`] drives it: once per tick it evaluates every
//! entry against the current local time and spawns one task per matching
//! entry, so a slow action never delays the tick loop or other entries.

use crate::cron::CronExpr;
use crate::error::RunnerError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The callable contract invoked when an entry fires.
///
/// `cancel` is the runner's shutdown signal; long-running actions should
/// observe it. `now` is the tick instant the entry matched.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, cancel: CancellationToken, now: DateTime<Local>);
}

/// Adapter turning an async closure into an [`Action`].
///
/// ```
/// use chronotab::{ActionFn, Crontab};
///
/// let crontab = Crontab::new();
/// crontab.register(
///     "*/5 * * * *",
///     ActionFn::new(|_cancel, now| async move {
///         println!("fired at {now}");
///     }),
/// );
/// ```
pub struct ActionFn<F>(F);

impl<F> ActionFn<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken, DateTime<Local>) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = ()> + Send,
    {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Action for ActionFn<F>
where
    F: Fn(CancellationToken, DateTime<Local>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send,
{
    async fn run(&self, cancel: CancellationToken, now: DateTime<Local>) {
        (self.0)(cancel, now).await;
    }
}

struct Entry {
    cron: CronExpr,
    action: Arc<dyn Action>,
}

/// An ordered, append-only collection of scheduled entries.
#[derive(Default)]
pub struct Crontab {
    entries: Mutex<Vec<Entry>>,
}

impl Crontab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` to fire whenever `expr` matches a tick.
    ///
    /// # Panics
    ///
    /// Panics if `expr` is not a valid cron expression. Registration is a
    /// programmer-error boundary; use [`CronExpr::parse`] directly to
    /// validate untrusted input first.
    pub fn register(&self, expr: &str, action: impl Action + 'static) {
        let cron = match CronExpr::parse(expr) {
            Ok(cron) => cron,
            Err(err) => panic!("crontab: {err}"),
        };
        info!(%cron, "registered crontab entry");
        self.entries.lock().unwrap().push(Entry {
            cron,
            action: Arc::new(action),
        });
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns one task per entry scheduled for `now`.
    fn dispatch(&self, tasks: &mut JoinSet<()>, cancel: &CancellationToken, now: DateTime<Local>) {
        let entries = self.entries.lock().unwrap();
        for entry in entries.iter() {
            if !entry.cron.matches(now.naive_local()) {
                continue;
            }
            debug!(cron = %entry.cron, %now, "dispatching entry");
            let action = Arc::clone(&entry.action);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                action.run(cancel, now).await;
            });
        }
    }
}

/// Configuration for a [`Runner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Interval between scheduling ticks. Cron resolution is one minute;
    /// shorter intervals are mainly useful in tests.
    pub tick_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
        }
    }
}

/// Drives a [`Crontab`] with a periodic tick until shut down.
///
/// Shutdown is terminal: once [`close`](Runner::close) or
/// [`shutdown`](Runner::shutdown) has been called, [`run`](Runner::run)
/// returns [`RunnerError::Closed`].
pub struct Runner {
    crontab: Arc<Crontab>,
    config: RunnerConfig,
    cancel: CancellationToken,
    in_shutdown: AtomicBool,
    in_flight: tokio::sync::Mutex<JoinSet<()>>,
}

impl Runner {
    pub fn new(crontab: Arc<Crontab>) -> Self {
        Self::with_config(crontab, RunnerConfig::default())
    }

    pub fn with_config(crontab: Arc<Crontab>, config: RunnerConfig) -> Self {
        Self {
            crontab,
            config,
            cancel: CancellationToken::new(),
            in_shutdown: AtomicBool::new(false),
            in_flight: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    /// Runs the tick loop until cancelled. The first tick fires one full
    /// interval after the call.
    pub async fn run(&self) -> Result<(), RunnerError> {
        if self.in_shutdown.load(Ordering::SeqCst) {
            return Err(RunnerError::Closed);
        }

        info!(tick = ?self.config.tick_interval, "crontab runner started");
        let start = time::Instant::now() + self.config.tick_interval;
        let mut ticker = time::interval_at(start, self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("crontab runner stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let now = Local::now();
                    let mut tasks = self.in_flight.lock().await;
                    reap_finished(&mut tasks);
                    self.crontab.dispatch(&mut tasks, &self.cancel, now);
                }
            }
        }
    }

    /// Immediate shutdown: cancels the runner and every in-flight action
    /// context, without waiting for actions to finish.
    pub fn close(&self) {
        self.in_shutdown.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Graceful shutdown: cancels, then waits up to `deadline` for
    /// in-flight actions to complete.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), RunnerError> {
        self.in_shutdown.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        let mut tasks = self.in_flight.lock().await;
        time::timeout(deadline, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(err) = result {
                    warn!(error = %err, "crontab action failed");
                }
            }
        })
        .await
        .map_err(|_| RunnerError::DeadlineExceeded)
    }

    /// The runner's cancellation token; cloned into every dispatched
    /// action.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(err) = result {
            warn!(error = %err, "crontab action failed");
        }
    }
}
