//! The long-running poll loop

use super::poller::{Delivery, Poller};
use super::scheduler::CycleScheduler;
use crate::adapters::recup::RecupApi;
use crate::core::store::SubscriptionStore;
use crate::domain::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Counters of one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub polled: usize,
    pub failed: usize,
    pub notified: usize,
    /// The shutdown signal cut the cycle short
    pub interrupted: bool,
}

/// Polls every subscription sequentially, cycle after cycle
pub struct Monitor {
    api: Arc<dyn RecupApi>,
    poller: Poller,
    subscriptions: Arc<SubscriptionStore>,
    scheduler: CycleScheduler,
    shutdown_signal: watch::Receiver<bool>,
}

impl Monitor {
    pub fn new(
        api: Arc<dyn RecupApi>,
        poller: Poller,
        subscriptions: Arc<SubscriptionStore>,
        scheduler: CycleScheduler,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self {
            api,
            poller,
            subscriptions,
            scheduler,
            shutdown_signal,
        }
    }

    /// Runs until the shutdown signal is set
    ///
    /// A failed cycle is logged and retried after the error backoff; the loop
    /// itself never returns an error.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            cycle_s = self.scheduler.cycle().as_secs(),
            "Monitor started"
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            let started = Instant::now();
            let pause = match self.run_cycle().await {
                Ok(summary) => {
                    let sleep = self.scheduler.remaining_sleep(started.elapsed());
                    crate::log_cycle_complete!(
                        summary.polled,
                        summary.failed,
                        started.elapsed(),
                        sleep
                    );
                    sleep
                }
                Err(e) => {
                    crate::log_error_with_context!(e, "Poll cycle aborted");
                    self.scheduler.error_backoff()
                }
            };

            if self.sleep_or_shutdown(pause).await {
                break;
            }
        }

        tracing::info!("Monitor stopped");
        Ok(())
    }

    /// One pass over all subscriptions
    ///
    /// # Errors
    ///
    /// Fails only when the access token or the subscription list cannot be
    /// obtained. Failures of single subscriptions are counted and logged.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        self.api.access_token().await?;
        let subscriptions = self.subscriptions.all().await?;
        tracing::info!(subscriptions = subscriptions.len(), "Poll cycle started");

        let mut summary = CycleSummary::default();
        for (i, subscription) in subscriptions.iter().enumerate() {
            if self.is_shutdown_requested() {
                summary.interrupted = true;
                break;
            }

            summary.polled += 1;
            match self.poller.poll(subscription).await {
                Ok(report) => {
                    if report.delivery == Delivery::Sent {
                        summary.notified += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        subscription = %subscription.key(),
                        error = %e,
                        "Poll failed"
                    );
                }
            }

            if i + 1 < subscriptions.len() {
                let pacing = self.scheduler.pacing_delay();
                if self.sleep_or_shutdown(pacing).await {
                    summary.interrupted = true;
                    break;
                }
            }
        }

        Ok(summary)
    }

    fn is_shutdown_requested(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    /// Sleeps for `duration`; true when shutdown was requested meanwhile
    async fn sleep_or_shutdown(&self, duration: Duration) -> bool {
        if self.is_shutdown_requested() {
            return true;
        }
        let deadline = tokio::time::Instant::now() + duration;
        let mut signal = self.shutdown_signal.clone();
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            changed = signal.changed() => {
                // A dropped sender can no longer signal; finish the sleep
                if changed.is_err() {
                    tokio::time::sleep_until(deadline).await;
                }
            }
        }
        self.is_shutdown_requested()
    }
}
