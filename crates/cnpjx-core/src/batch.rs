//! Sequential batch driver.
//!
//! Items are resolved one at a time, in input order, with a fixed pause
//! between consecutive lookups. Output is always 1:1 with input: a failing
//! lookup becomes a failure record and items skipped after a stop request
//! become `cancelled` records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::orchestrator::{LookupOptions, LookupOrchestrator};
use crate::{FailureKind, RegistryRecord};

/// Emitted before each lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Zero-based position of the item about to be resolved.
    pub index: usize,
    pub total: usize,
    /// The item exactly as supplied.
    pub registry_id: String,
}

/// Receives batch notifications on the batch's own task.
pub trait BatchObserver: Send {
    fn on_progress(&mut self, progress: &BatchProgress);

    /// Called once, after the last item, with every record in input order.
    fn on_complete(&mut self, records: &[RegistryRecord]);
}

impl BatchObserver for () {
    fn on_progress(&mut self, _progress: &BatchProgress) {}

    fn on_complete(&mut self, _records: &[RegistryRecord]) {}
}

/// Message form of the observer callbacks, for consumers on another task.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Progress(BatchProgress),
    Complete(Vec<RegistryRecord>),
}

impl BatchObserver for UnboundedSender<BatchEvent> {
    fn on_progress(&mut self, progress: &BatchProgress) {
        let _ = self.send(BatchEvent::Progress(progress.clone()));
    }

    fn on_complete(&mut self, records: &[RegistryRecord]) {
        let _ = self.send(BatchEvent::Complete(records.to_vec()));
    }
}

/// Cooperative stop signal, checked between items.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub records: Vec<RegistryRecord>,
    /// `true` when a stop request cut the run short.
    pub stopped: bool,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_failure()).count()
    }

    pub fn profile_count(&self) -> usize {
        self.records.len() - self.failure_count()
    }
}

pub struct BatchDriver {
    orchestrator: Arc<LookupOrchestrator>,
    delay: Duration,
    options: LookupOptions,
    stop: StopHandle,
}

impl BatchDriver {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new(orchestrator: Arc<LookupOrchestrator>) -> Self {
        Self {
            orchestrator,
            delay: Self::DEFAULT_DELAY,
            options: LookupOptions::default(),
            stop: StopHandle::new(),
        }
    }

    /// Pause between consecutive lookups.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_options(mut self, options: LookupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub async fn run<I, S>(&self, ids: I, observer: &mut dyn BatchObserver) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", %run_id, total = ids.len());

        self.run_items(run_id, ids, observer).instrument(span).await
    }

    async fn run_items(
        &self,
        run_id: Uuid,
        ids: Vec<String>,
        observer: &mut dyn BatchObserver,
    ) -> BatchReport {
        let total = ids.len();
        let mut records = Vec::with_capacity(total);
        let mut stopped = false;
        info!("batch started");

        for (index, raw) in ids.into_iter().enumerate() {
            if self.stop.is_stopped() {
                stopped = true;
            }
            if stopped {
                records.push(RegistryRecord::failure(
                    FailureKind::Cancelled,
                    "batch stopped before this item was processed",
                ));
                continue;
            }

            if index > 0 && !self.delay.is_zero() {
                self.orchestrator.clock().sleep(self.delay).await;
                if self.stop.is_stopped() {
                    stopped = true;
                    records.push(RegistryRecord::failure(
                        FailureKind::Cancelled,
                        "batch stopped before this item was processed",
                    ));
                    continue;
                }
            }

            let progress = BatchProgress {
                index,
                total,
                registry_id: raw,
            };
            debug!(index, total, registry_id = progress.registry_id.as_str(), "batch item");
            observer.on_progress(&progress);

            let record = self
                .orchestrator
                .lookup_with(&progress.registry_id, self.options)
                .await;
            records.push(record);
        }

        observer.on_complete(&records);

        let report = BatchReport {
            run_id,
            records,
            stopped,
        };
        info!(
            profiles = report.profile_count(),
            failures = report.failure_count(),
            stopped,
            "batch finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handles_share_one_flag() {
        let handle = StopHandle::new();
        let clone = handle.clone();

        clone.stop();
        assert!(handle.is_stopped());

        handle.reset();
        assert!(!clone.is_stopped());
    }

    #[test]
    fn report_counts_profiles_and_failures() {
        let report = BatchReport {
            run_id: Uuid::new_v4(),
            records: vec![
                RegistryRecord::failure(FailureKind::InvalidInput, "bad id"),
                RegistryRecord::failure(FailureKind::Cancelled, "stopped"),
            ],
            stopped: true,
        };

        assert_eq!(report.failure_count(), 2);
        assert_eq!(report.profile_count(), 0);
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut observer = tx;
        let progress = BatchProgress {
            index: 0,
            total: 1,
            registry_id: String::from("11222333000181"),
        };

        observer.on_progress(&progress);
        observer.on_complete(&[]);

        assert_eq!(rx.try_recv().ok(), Some(BatchEvent::Progress(progress)));
        assert_eq!(rx.try_recv().ok(), Some(BatchEvent::Complete(Vec::new())));
    }
}
