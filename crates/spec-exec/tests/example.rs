use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use spec_core::{
    CodeLocation, Container, Flag, NodeError, NodeKind, SetupNode, SpecContext, SpecState, Subject,
    fail,
};
use spec_exec::{ExecConfig, Example};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log poisoned").clone()
}

fn logging(
    log: &Log,
    name: &str,
    failing: &[&str],
) -> impl Fn() -> Result<(), NodeError> + Send + Sync + 'static {
    let log = log.clone();
    let name = name.to_string();
    let fails = failing.contains(&name.as_str());
    move || {
        log.lock().expect("log poisoned").push(name.clone());
        if fails {
            return Err(NodeError::new(format!("{name} failed")));
        }
        Ok(())
    }
}

/// Two-level chain with two nodes of every kind per container.
fn nested_chain(log: &Log, failing: &[&str]) -> Vec<Arc<Container>> {
    ["outer", "inner"]
        .iter()
        .map(|scope| {
            let mut container = Container::new(*scope);
            for n in 1..=2 {
                let before = logging(log, &format!("{scope} before {n}"), failing);
                let just_before = logging(log, &format!("{scope} just before {n}"), failing);
                let after = logging(log, &format!("{scope} after {n}"), failing);
                container.push(SetupNode::before_each(before));
                container.push(SetupNode::just_before_each(just_before));
                container.push(SetupNode::after_each(after));
            }
            Arc::new(container)
        })
        .collect()
}

fn flag_strategy() -> impl Strategy<Value = Flag> {
    prop_oneof![Just(Flag::None), Just(Flag::Focused), Just(Flag::Pending)]
}

proptest! {
    #[test]
    fn focused_and_pending_are_unions_over_the_chain(
        container_flags in proptest::collection::vec(flag_strategy(), 0..4),
        subject_flag in flag_strategy(),
    ) {
        let containers: Vec<_> = container_flags
            .iter()
            .map(|flag| Arc::new(Container::new("scope").with_flag(*flag)))
            .collect();
        let subject = Subject::it("it", || Ok(())).with_flag(subject_flag);
        let example = Example::new(subject, containers);

        let all: Vec<Flag> = container_flags
            .iter()
            .copied()
            .chain(std::iter::once(subject_flag))
            .collect();
        prop_assert_eq!(example.focused(), all.contains(&Flag::Focused));
        prop_assert_eq!(example.pending(), all.contains(&Flag::Pending));
    }
}

#[tokio::test]
async fn nodes_run_in_lifecycle_order() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &[])), chain);

    example.run().await;

    assert!(example.passed());
    assert!(example.failure().is_none());
    assert_eq!(
        entries(&log),
        vec![
            "outer before 1",
            "outer before 2",
            "inner before 1",
            "inner before 2",
            "outer just before 1",
            "outer just before 2",
            "inner just before 1",
            "inner just before 2",
            "it",
            "inner after 1",
            "inner after 2",
            "outer after 1",
            "outer after 2",
        ]
    );
}

#[tokio::test]
async fn failing_inner_before_unwinds_every_entered_container() {
    let log = new_log();
    let chain = nested_chain(&log, &["inner before 1"]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &[])), chain);

    example.run().await;

    assert_eq!(example.state(), SpecState::Failed);
    assert_eq!(
        entries(&log),
        vec![
            "outer before 1",
            "outer before 2",
            "inner before 1",
            "inner after 1",
            "inner after 2",
            "outer after 1",
            "outer after 2",
        ]
    );
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.message, "inner before 1 failed");
    assert_eq!(failure.component_type, NodeKind::BeforeEach);
    assert_eq!(failure.component_index, 1);
}

#[tokio::test]
async fn failing_just_before_skips_subject_and_later_just_befores() {
    let log = new_log();
    let chain = nested_chain(&log, &["outer just before 2"]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &[])), chain);

    example.run().await;

    assert!(example.failed());
    let log = entries(&log);
    assert!(!log.contains(&"it".to_string()));
    assert!(!log.contains(&"inner just before 1".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("outer after 2"));
    assert_eq!(
        example.failure().map(|f| f.component_type),
        Some(NodeKind::JustBeforeEach)
    );
}

#[tokio::test]
async fn every_after_runs_and_first_failure_wins() {
    let log = new_log();
    let chain = nested_chain(&log, &["it", "inner after 1", "outer after 2"]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &["it"])), chain);

    example.run().await;

    let log = entries(&log);
    for after in ["inner after 1", "inner after 2", "outer after 1", "outer after 2"] {
        assert!(log.contains(&after.to_string()), "{after} did not run");
    }
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.message, "it failed");
    assert_eq!(failure.component_type, NodeKind::Subject);
    assert_eq!(failure.component_index, 2);
}

#[tokio::test]
async fn failing_after_alone_fails_the_example() {
    let log = new_log();
    let chain = nested_chain(&log, &["outer after 1"]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &[])), chain);

    example.run().await;

    assert_eq!(example.state(), SpecState::Failed);
    assert!(entries(&log).contains(&"outer after 2".to_string()));
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.component_type, NodeKind::AfterEach);
    assert_eq!(failure.component_index, 0);
}

#[tokio::test]
async fn explicit_failure_keeps_message_and_location() {
    let line = line!() + 1;
    let mut example = Example::new(Subject::it("it", || fail("boom")), Vec::new());
    example.run().await;

    assert_eq!(example.state(), SpecState::Failed);
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.message, "boom");
    assert_eq!(failure.location.line_number, line);
    assert!(failure.forwarded_panic.is_none());
}

#[tokio::test]
async fn failure_without_location_defaults_to_node() {
    let location = CodeLocation::new("suite.rs", 7);
    let subject = Subject::it("it", || Err(anyhow::anyhow!("context lost").into()))
        .with_location(location.clone());
    let mut example = Example::new(subject, Vec::new());
    example.run().await;

    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.location, location);
    assert_eq!(failure.component_location, location);
}

#[tokio::test]
async fn panics_are_recorded_with_payload() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let subject = Subject::it("it", || panic!("kaboom"));
    let mut example = Example::new(subject, chain);

    example.run().await;

    assert_eq!(example.state(), SpecState::Panicked);
    assert!(example.failed());
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.message, "Test Panicked");
    assert_eq!(failure.forwarded_panic.as_deref(), Some("kaboom"));
    assert!(entries(&log).contains(&"outer after 2".to_string()));
}

#[tokio::test]
async fn panicking_setup_node_is_recorded() {
    let container =
        Container::new("outer").with_node(SetupNode::before_each(|| panic!("setup exploded")));
    let mut example = Example::new(Subject::it("it", || Ok(())), vec![Arc::new(container)]);
    example.run().await;

    assert_eq!(example.state(), SpecState::Panicked);
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.forwarded_panic.as_deref(), Some("setup exploded"));
    assert_eq!(failure.component_type, NodeKind::BeforeEach);
}

#[tokio::test]
async fn async_subject_passes_when_done_is_signalled() {
    let subject = Subject::it_async("async", |ctx: SpecContext| async move {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            ctx.done();
        });
        Ok(())
    });
    let mut example = Example::new(subject, Vec::new());
    example.run().await;
    assert!(example.passed(), "state was {}", example.state());
}

#[tokio::test]
async fn async_subject_times_out_and_after_nodes_still_run() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let subject = Subject::it_async("async", |_ctx: SpecContext| async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    })
    .with_timeout(Duration::from_millis(20));
    let mut example = Example::new(subject, chain);

    example.run().await;

    assert_eq!(example.state(), SpecState::TimedOut);
    let failure = example.failure().expect("failure recorded");
    assert_eq!(failure.message, "Timed out");
    assert_eq!(&failure.location, example.subject().location());
    assert!(entries(&log).contains(&"outer after 2".to_string()));
}

#[tokio::test]
async fn async_subject_returning_without_done_times_out() {
    let subject = Subject::it_async("async", |_ctx: SpecContext| async move { Ok(()) });
    let config = ExecConfig::default().with_default_async_timeout(Duration::from_millis(20));
    let mut example = Example::new(subject, Vec::new()).with_config(config);
    example.run().await;
    assert_eq!(example.state(), SpecState::TimedOut);
}

#[tokio::test]
async fn async_subject_failure_is_reported_before_timeout() {
    let subject = Subject::it_async("async", |_ctx: SpecContext| async move { fail("async nope") })
        .with_timeout(Duration::from_secs(10));
    let mut example = Example::new(subject, Vec::new());
    example.run().await;

    assert_eq!(example.state(), SpecState::Failed);
    assert!(example.run_time() < Duration::from_secs(10));
    assert_eq!(example.failure().map(|f| f.message.as_str()), Some("async nope"));
}

fn explode() -> Result<(), NodeError> {
    panic!("async kaboom")
}

#[tokio::test]
async fn async_subject_panic_is_forwarded() {
    let subject = Subject::it_async("async", |_ctx: SpecContext| async move { explode() });
    let mut example = Example::new(subject, Vec::new());
    example.run().await;

    assert_eq!(example.state(), SpecState::Panicked);
    assert_eq!(
        example.failure().and_then(|f| f.forwarded_panic.as_deref()),
        Some("async kaboom")
    );
}

#[tokio::test]
async fn skipped_examples_run_nothing() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let mut example = Example::new(Subject::it("it", logging(&log, "it", &[])), chain);
    example.skip();
    assert!(example.skipped());

    example.run().await;

    assert!(entries(&log).is_empty());
    assert_eq!(example.state(), SpecState::Skipped);
    assert_eq!(example.summary("suite").state, SpecState::Skipped);
}

#[tokio::test]
async fn pending_short_circuits_even_when_focused() {
    let log = new_log();
    let mut chain = nested_chain(&log, &[]);
    chain.insert(0, Arc::new(Container::new("focus").with_flag(Flag::Focused)));
    let subject = Subject::it("it", logging(&log, "it", &[])).pending();
    let mut example = Example::new(subject, chain);
    assert!(example.focused());

    example.run().await;

    assert!(entries(&log).is_empty());
    assert_eq!(example.state(), SpecState::Pending);
    assert!(!example.failed());
}

#[test]
fn summary_reports_pending_before_running() {
    let example = Example::new(Subject::it("it", || Ok(())).pending(), Vec::new());
    assert_eq!(example.summary("suite").state, SpecState::Pending);
}

#[test]
fn is_measurement_tracks_subject_shape() {
    let plain = Example::new(Subject::it("it", || Ok(())), Vec::new());
    let measured = Example::new(Subject::measure("bench", 3, |_b| Ok(())), Vec::new());
    assert!(!plain.is_measurement());
    assert!(measured.is_measurement());
}

#[tokio::test]
async fn measured_subject_repeats_full_cycle_per_sample() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subject = Subject::measure("bench", 4, move |bench| {
        counter.fetch_add(1, Ordering::SeqCst);
        bench.record_value("size", 7.0, Some("bytes"));
        Ok(())
    });
    let mut example = Example::new(subject, chain);

    example.run().await;

    assert!(example.passed());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "outer before 1").count(), 4);
    assert_eq!(log.iter().filter(|e| *e == "outer after 2").count(), 4);

    let summary = example.summary("suite");
    assert!(summary.is_measurement);
    assert_eq!(summary.number_of_samples, 4);
    let report = &summary.measurements["size"];
    assert_eq!(report.results, vec![7.0, 7.0, 7.0, 7.0]);
    assert_eq!(report.info.as_deref(), Some("bytes"));
}

#[tokio::test]
async fn measured_subject_halts_after_failing_sample() {
    let log = new_log();
    let chain = nested_chain(&log, &[]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subject = Subject::measure("bench", 10, move |bench| {
        let sample = counter.fetch_add(1, Ordering::SeqCst);
        bench.record_value("sample", sample as f64, None);
        if sample == 2 {
            return fail("third sample failed");
        }
        Ok(())
    });
    let mut example = Example::new(subject, chain);

    example.run().await;

    assert_eq!(example.state(), SpecState::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(entries(&log).iter().filter(|e| *e == "outer after 2").count(), 3);
    assert_eq!(example.measurements()["sample"].results, vec![0.0, 1.0, 2.0]);
    assert_eq!(
        example.failure().map(|f| f.component_type),
        Some(NodeKind::MeasuredSubject)
    );
}

#[tokio::test]
async fn measured_timings_record_one_value_per_sample() {
    let subject = Subject::measure("bench", 3, |bench| {
        bench.time("sleep", || std::thread::sleep(Duration::from_millis(1)), None);
        Ok(())
    });
    let mut example = Example::new(subject, Vec::new());
    example.run().await;

    let report = &example.measurements()["sleep"];
    assert_eq!(report.results.len(), 3);
    assert!(report.smallest() >= 0.001);
}

#[tokio::test]
async fn summary_carries_texts_locations_and_run_time() {
    let outer = Arc::new(Container::with_location("outer", CodeLocation::new("suite.rs", 1)));
    let inner = Arc::new(Container::with_location("inner", CodeLocation::new("suite.rs", 2)));
    let subject = Subject::it("it", || {
        std::thread::sleep(Duration::from_millis(10));
        fail("slow failure")
    })
    .with_location(CodeLocation::new("suite.rs", 3));
    let mut example = Example::new(subject, vec![outer, inner]);

    example.run().await;
    let summary = example.summary("suite-id");

    assert_eq!(summary.suite_id, "suite-id");
    assert_eq!(summary.component_texts, vec!["outer", "inner", "it"]);
    assert_eq!(
        summary.component_code_locations,
        vec![
            CodeLocation::new("suite.rs", 1),
            CodeLocation::new("suite.rs", 2),
            CodeLocation::new("suite.rs", 3),
        ]
    );
    assert_eq!(summary.state, SpecState::Failed);
    assert!(summary.run_time >= Duration::from_millis(10));
    assert!(!summary.is_measurement);
    assert_eq!(summary.number_of_samples, 1);
    assert_eq!(summary.failure.map(|f| f.message), Some("slow failure".to_string()));
    assert_eq!(example.concatenated_string(), "outer inner it");
}

#[test]
fn run_blocking_drives_async_bodies_and_abandons_timed_out_ones() {
    let subject = Subject::it_async("async", |_ctx: SpecContext| async move {
        tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)))
            .await
            .ok();
        Ok(())
    })
    .with_timeout(Duration::from_millis(20));
    let mut example = Example::new(subject, Vec::new());

    example.run_blocking().expect("runtime builds");

    assert_eq!(example.state(), SpecState::TimedOut);
}

#[test]
fn body_blocking_past_its_timeout_is_timed_out() {
    let subject = Subject::it_async("blocking", |ctx: SpecContext| async move {
        std::thread::sleep(Duration::from_millis(300));
        ctx.done();
        Ok(())
    })
    .with_timeout(Duration::from_millis(20));
    let mut example = Example::new(subject, Vec::new());

    example.run_blocking().expect("runtime builds");

    assert_eq!(example.state(), SpecState::TimedOut);
    assert_eq!(example.failure().map(|f| f.message.as_str()), Some("Timed out"));
}

#[tokio::test]
async fn failure_after_blocking_past_timeout_is_timed_out() {
    let subject = Subject::it_async("blocking", |_ctx: SpecContext| async move {
        std::thread::sleep(Duration::from_millis(200));
        fail("too late")
    })
    .with_timeout(Duration::from_millis(20));
    let mut example = Example::new(subject, Vec::new());

    example.run().await;

    assert_eq!(example.state(), SpecState::TimedOut);
}

#[tokio::test]
async fn rerunning_resets_previous_outcome() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subject = Subject::it("flaky", move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return fail("first run fails");
        }
        Ok(())
    });
    let mut example = Example::new(subject, Vec::new());

    example.run().await;
    assert!(example.failed());
    example.run().await;
    assert!(example.passed());
    assert!(example.failure().is_none());
}
