use std::sync::OnceLock;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use spec_core::{Subject, fail};
use spec_exec::Example;

fn metrics_snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::set_global_recorder(recorder)
            .unwrap_or_else(|_| panic!("metrics recorder already installed"));
        snapshotter
    })
}

#[tokio::test]
async fn emits_outcome_and_run_time_metrics() {
    let snapshotter = metrics_snapshotter();

    let mut passing = Example::new(Subject::it("passes", || Ok(())), Vec::new());
    passing.run().await;
    let mut failing = Example::new(Subject::it("fails", || fail("nope")), Vec::new());
    failing.run().await;
    let mut skipped = Example::new(Subject::it("skipped", || Ok(())), Vec::new());
    skipped.skip();
    skipped.run().await;

    let mut states = Vec::new();
    let mut run_times = 0;
    for (key, _unit, _desc, value) in snapshotter.snapshot().into_vec() {
        match (key.key().name(), value) {
            ("spec.exec.outcomes", DebugValue::Counter(count)) => {
                let state = key
                    .key()
                    .labels()
                    .find(|label| label.key() == "state")
                    .map(|label| label.value().to_string())
                    .expect("state label");
                states.push((state, count));
            }
            ("spec.exec.run_time_ms", DebugValue::Histogram(values)) => {
                run_times += values.len();
            }
            _ => {}
        }
    }

    states.sort();
    assert_eq!(
        states,
        vec![
            ("failed".to_string(), 1),
            ("passed".to_string(), 1),
            ("skipped".to_string(), 1),
        ]
    );
    // Skipped examples never start the clock.
    assert_eq!(run_times, 2);
}
