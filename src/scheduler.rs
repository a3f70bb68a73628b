//! Outer control loop: run a cycle, wait, repeat
//!
//! A successful cycle is followed by the configured check interval, a failed
//! one by a fixed retry delay. Failures are treated the same however often
//! they repeat.

use crate::batch::BatchReport;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Delay before the next attempt after a failed cycle
pub const RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Source of waiting between cycles
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Cycle counts from a finished loop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Scheduler<S> {
    sleeper: S,
    interval: Duration,
    retry_delay: Duration,
}

impl<S: Sleeper> Scheduler<S> {
    pub fn new(sleeper: S, interval: Duration) -> Self {
        Self {
            sleeper,
            interval,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run cycles until the process is terminated
    pub async fn run_forever<F, Fut>(&self, cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<BatchReport>>,
    {
        self.run(cycle, None).await;
    }

    /// Run cycles, stopping after `max_cycles` when given.
    ///
    /// Every cycle, including the last, is followed by its wait.
    pub async fn run<F, Fut>(&self, mut cycle: F, max_cycles: Option<usize>) -> LoopStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<BatchReport>>,
    {
        let mut stats = LoopStats::default();

        loop {
            if max_cycles.is_some_and(|max| stats.succeeded + stats.failed >= max) {
                return stats;
            }

            let delay = match cycle().await {
                Ok(report) => {
                    stats.succeeded += 1;
                    if !report.failures.is_empty() {
                        log::warn!(
                            "{} of {} products failed to update this cycle",
                            report.failures.len(),
                            report.total()
                        );
                    }
                    log::info!(
                        "Waiting {} minutes until next check...",
                        self.interval.as_secs() / 60
                    );
                    self.interval
                }
                Err(e) => {
                    stats.failed += 1;
                    log::error!("Tracking cycle failed: {}", e);
                    log::info!(
                        "Retrying in {} minutes...",
                        self.retry_delay.as_secs() / 60
                    );
                    self.retry_delay
                }
            };

            self.sleeper.sleep(delay).await;
        }
    }
}
