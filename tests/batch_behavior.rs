#[path = "support/mod.rs"]
mod support;

use std::time::Duration;

use cnpjx_core::{
    BatchDriver, BatchEvent, BatchObserver, BatchProgress, FailureKind, ProviderId,
    RegistryRecord, StopHandle,
};
use tokio::sync::mpsc;

use support::{harness, receitaws_ok};

const MIXED: [&str; 5] = [
    "11222333000181",
    "33.000.167/0001-01",
    "11222333000182",
    "00000000000191",
    "11444777000161",
];

#[derive(Default)]
struct Recorder {
    progress: Vec<BatchProgress>,
    completed: Vec<Vec<RegistryRecord>>,
    stop_after: Option<(usize, StopHandle)>,
}

impl BatchObserver for Recorder {
    fn on_progress(&mut self, progress: &BatchProgress) {
        self.progress.push(progress.clone());
        if let Some((index, stop)) = &self.stop_after {
            if progress.index == *index {
                stop.stop();
            }
        }
    }

    fn on_complete(&mut self, records: &[RegistryRecord]) {
        self.completed.push(records.to_vec());
    }
}

#[tokio::test]
async fn invalid_item_yields_a_failure_in_place() {
    let h = harness();
    h.http.script(
        ProviderId::ReceitaWs,
        (0..4).map(|_| receitaws_ok("ACME COMERCIO LTDA")).collect(),
    );
    let driver = BatchDriver::new(h.orchestrator.clone());
    let mut recorder = Recorder::default();

    let report = driver.run(MIXED, &mut recorder).await;

    assert_eq!(report.records.len(), 5);
    assert!(!report.stopped);
    assert_eq!(report.records[2].failure_kind(), Some(FailureKind::InvalidInput));
    for index in [0, 1, 3, 4] {
        assert!(report.records[index].profile().is_some(), "item {index}");
    }
    assert_eq!(report.profile_count(), 4);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(
        report.records[1].profile().expect("profile").registry_id.as_str(),
        "33000167000101"
    );

    let indices: Vec<usize> = recorder.progress.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert!(recorder.progress.iter().all(|p| p.total == 5));
    assert_eq!(recorder.progress[1].registry_id, "33.000.167/0001-01");
    assert_eq!(recorder.completed, vec![report.records.clone()]);
}

#[tokio::test]
async fn items_are_paced_and_share_the_rate_window() {
    let h = harness();
    h.http.script(
        ProviderId::ReceitaWs,
        (0..4).map(|_| receitaws_ok("ACME COMERCIO LTDA")).collect(),
    );
    let driver = BatchDriver::new(h.orchestrator.clone());

    driver.run(MIXED, &mut ()).await;

    let second = Duration::from_secs(1);
    // Four pauses between five items, then the fourth provider call waits for
    // the first one to leave the 60 s window: 60 s - 4 s elapsed + 100 ms.
    assert_eq!(
        h.clock.slept(),
        vec![second, second, second, second, Duration::from_millis(56_100)]
    );
    assert_eq!(h.http.calls_to(ProviderId::ReceitaWs), 4);
}

#[tokio::test]
async fn stop_request_cancels_the_remaining_items() {
    let h = harness();
    h.http.script(
        ProviderId::ReceitaWs,
        (0..5).map(|_| receitaws_ok("ACME COMERCIO LTDA")).collect(),
    );
    let driver = BatchDriver::new(h.orchestrator.clone());
    let mut recorder = Recorder {
        stop_after: Some((1, driver.stop_handle())),
        ..Recorder::default()
    };

    let report = driver.run(MIXED, &mut recorder).await;

    assert!(report.stopped);
    assert_eq!(report.records.len(), 5);
    assert!(report.records[0].profile().is_some());
    assert!(report.records[1].profile().is_some());
    for index in 2..5 {
        assert_eq!(
            report.records[index].failure_kind(),
            Some(FailureKind::Cancelled),
            "item {index}"
        );
    }
    assert_eq!(recorder.progress.len(), 2);
    assert_eq!(recorder.completed.len(), 1);
    assert_eq!(h.http.calls().len(), 2);
}

#[tokio::test]
async fn stop_handle_can_be_reset_for_another_run() {
    let h = harness();
    h.http.script(
        ProviderId::ReceitaWs,
        vec![receitaws_ok("ACME COMERCIO LTDA")],
    );
    let stop = StopHandle::new();
    let driver = BatchDriver::new(h.orchestrator.clone())
        .with_delay(Duration::ZERO)
        .with_stop_handle(stop.clone());

    stop.stop();
    let cancelled = driver.run(["11222333000181"], &mut ()).await;
    stop.reset();
    let resumed = driver.run(["11222333000181"], &mut ()).await;

    assert!(cancelled.stopped);
    assert_eq!(cancelled.records[0].failure_kind(), Some(FailureKind::Cancelled));
    assert!(!resumed.stopped);
    assert!(resumed.records[0].profile().is_some());
    assert_ne!(cancelled.run_id, resumed.run_id);
}

#[tokio::test]
async fn events_stream_to_another_task() {
    let h = harness();
    h.http.script(
        ProviderId::ReceitaWs,
        vec![
            receitaws_ok("ACME COMERCIO LTDA"),
            receitaws_ok("PETROLEO BRASILEIRO S A PETROBRAS"),
        ],
    );
    let driver = BatchDriver::new(h.orchestrator.clone()).with_delay(Duration::ZERO);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let batch = tokio::spawn(async move {
        let mut tx = tx;
        driver
            .run(["11222333000181", "33000167000101"], &mut tx)
            .await
    });

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let report = batch.await.expect("batch task");

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], BatchEvent::Progress(p) if p.index == 0));
    assert!(matches!(&events[1], BatchEvent::Progress(p) if p.index == 1));
    assert_eq!(events[2], BatchEvent::Complete(report.records.clone()));
}

#[tokio::test]
async fn empty_batch_still_completes() {
    let h = harness();
    let driver = BatchDriver::new(h.orchestrator.clone());
    let mut recorder = Recorder::default();

    let report = driver.run(Vec::<String>::new(), &mut recorder).await;

    assert!(report.records.is_empty());
    assert!(recorder.progress.is_empty());
    assert_eq!(recorder.completed, vec![Vec::new()]);
    assert!(h.clock.slept().is_empty());
}
