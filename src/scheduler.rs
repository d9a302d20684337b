use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::fetcher::NewsFetcher;

const THREAD_NAME: &str = "wirefeed-scheduler";

/// Fixed-interval driver of fetch cycles.
///
/// Cycles run back to back on one thread, separated by `interval`. A panic
/// escaping a cycle is caught and followed by the shorter `backoff` sleep.
pub struct Scheduler {
    fetcher: Arc<NewsFetcher>,
    interval: Duration,
    backoff: Duration,
}

impl Scheduler {
    /// Scheduler using the fetcher's configured interval and backoff.
    pub fn new(fetcher: Arc<NewsFetcher>) -> Self {
        let interval = fetcher.config().fetch_interval;
        let backoff = fetcher.config().error_backoff;
        Self::with_intervals(fetcher, interval, backoff)
    }

    /// Scheduler with explicit cycle interval and panic backoff.
    pub fn with_intervals(
        fetcher: Arc<NewsFetcher>,
        interval: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            fetcher,
            interval,
            backoff,
        }
    }

    /// Run one cycle and return how long to sleep before the next.
    ///
    /// A cycle that reports a provider or store failure still completed
    /// normally and gets the full interval.
    pub fn tick(&self) -> Duration {
        let fetcher = &self.fetcher;
        match panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch_and_save())) {
            Ok(report) => {
                if !report.succeeded() {
                    warn!(
                        outcome = %report.outcome,
                        error = report.error.as_deref().unwrap_or_default(),
                        "fetch cycle failed, retrying at next interval"
                    );
                }
                self.interval
            }
            Err(payload) => {
                error!(
                    panic = %panic_message(payload.as_ref()),
                    backoff_secs = self.backoff.as_secs(),
                    "fetch cycle panicked, backing off"
                );
                self.backoff
            }
        }
    }

    /// Tick and sleep until the process exits.
    pub fn run_forever(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            backoff_secs = self.backoff.as_secs(),
            "scheduler started"
        );
        loop {
            let sleep = self.tick();
            thread::sleep(sleep);
        }
    }

    /// Start [`Scheduler::run_forever`] on a named background thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run_forever())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
