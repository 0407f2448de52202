// tests/supervisor_lifecycle.rs

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use buildwatch::config::RunSettings;
use buildwatch::engine::{BuildOutcome, BuildSignal};
use buildwatch::errors::DaemonError;
use buildwatch::process::signals::forward_shutdown;
use buildwatch::process::{
    select_terminator, spawn_output_logger, LifecycleEvent, Supervisor, SupervisorHandle,
};
use buildwatch_test_utils::builders::RunSettingsBuilder;
use buildwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Write a shell script into `dir`; run it with `sh <name>`.
fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<()> {
    fs::write(dir.join(name), body)
}

async fn wait_for_file(path: &Path) {
    with_timeout(async {
        while !path.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
}

struct Harness {
    signals: mpsc::Sender<BuildSignal>,
    events: mpsc::UnboundedReceiver<LifecycleEvent>,
    handle: SupervisorHandle,
    task: JoinHandle<buildwatch::errors::Result<()>>,
}

impl Harness {
    fn start(run: RunSettings) -> Self {
        let terminator = select_terminator(run.termination).expect("terminator");
        let (signals, signal_rx) = mpsc::channel(1);
        let output = spawn_output_logger(run.label_output);
        let (supervisor, handle) =
            Supervisor::new(run, terminator, signal_rx, output).expect("supervisor");
        let (obs_tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(supervisor.with_observer(obs_tx).run());
        Self {
            signals,
            events,
            handle,
            task,
        }
    }

    async fn build_started(&self, trigger: &str) -> TestResult {
        self.signals
            .send(BuildSignal::Started {
                trigger: trigger.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn build_finished(&self, success: bool, trigger: &str) -> TestResult {
        self.signals
            .send(BuildSignal::Finished(BuildOutcome {
                success,
                trigger: trigger.to_string(),
            }))
            .await?;
        Ok(())
    }

    async fn cycle(&self, success: bool, trigger: &str) -> TestResult {
        self.build_started(trigger).await?;
        self.build_finished(success, trigger).await
    }

    async fn next_event(&mut self) -> LifecycleEvent {
        with_timeout(self.events.recv())
            .await
            .expect("observer channel closed")
    }

    async fn expect_started(&mut self) -> Option<u32> {
        match self.next_event().await {
            LifecycleEvent::Started { pid } => pid,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    async fn assert_no_event_for(&mut self, dur: Duration) {
        let next = timeout(dur, self.events.recv()).await;
        assert!(next.is_err(), "unexpected lifecycle event: {next:?}");
    }
}

#[tokio::test]
async fn first_successful_build_starts_the_command() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").build());

    h.cycle(true, "").await?;
    let pid = h.expect_started().await;
    assert!(pid.is_some());

    h.handle.shutdown().await?;
    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid });
    h.task.await??;
    Ok(())
}

#[tokio::test]
async fn failed_build_keeps_old_process_when_stopping_after_build() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").build());

    h.cycle(true, "").await?;
    let first = h.expect_started().await;

    h.cycle(false, "src/broken.rs").await?;
    assert_eq!(h.next_event().await, LifecycleEvent::RestartSkipped);
    h.assert_no_event_for(Duration::from_millis(300)).await;

    // The next good build replaces exactly the process that survived.
    h.cycle(true, "src/fixed.rs").await?;
    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid: first });
    let second = h.expect_started().await;
    assert_ne!(first, second);

    h.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn stop_before_build_terminates_before_outcome_is_known() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").stop_before_build().build());

    h.cycle(true, "").await?;
    let first = h.expect_started().await;

    // Only the start of the build is announced; the stop must already happen.
    h.build_started("src/lib.rs").await?;
    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid: first });

    h.build_finished(true, "src/lib.rs").await?;
    let second = h.expect_started().await;
    assert_ne!(first, second);

    h.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn stop_before_build_with_failed_build_leaves_nothing_running() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").stop_before_build().build());

    h.cycle(true, "").await?;
    let first = h.expect_started().await;

    h.cycle(false, "src/broken.rs").await?;
    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid: first });
    assert_eq!(h.next_event().await, LifecycleEvent::RestartSkipped);

    // Next success starts fresh: nothing left to terminate.
    h.cycle(true, "src/fixed.rs").await?;
    h.expect_started().await;

    h.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn never_two_processes_at_once() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").build());

    for i in 0..5 {
        h.cycle(true, &format!("file{i}.rs")).await?;
    }
    h.handle.shutdown().await?;
    h.task.await??;

    let mut running = 0;
    let mut starts = 0;
    while let Ok(event) = h.events.try_recv() {
        match event {
            LifecycleEvent::Started { .. } => {
                running += 1;
                starts += 1;
                assert_eq!(running, 1, "two processes were running at once");
            }
            LifecycleEvent::Terminated { .. } => running -= 1,
            LifecycleEvent::RestartSkipped => {}
        }
    }
    assert_eq!(starts, 5);
    assert_eq!(running, 0);
    Ok(())
}

#[tokio::test]
async fn trigger_path_is_substituted_into_command() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut h = Harness::start(
        RunSettingsBuilder::new("touch %s")
            .directory(dir.path())
            .build(),
    );

    h.cycle(true, "changed.marker").await?;
    h.expect_started().await;

    wait_for_file(&dir.path().join("changed.marker")).await;

    h.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn first_launch_drops_the_bare_placeholder() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut h = Harness::start(
        RunSettingsBuilder::new("touch first.marker %s")
            .directory(dir.path())
            .build(),
    );

    h.cycle(true, "").await?;
    h.expect_started().await;

    wait_for_file(&dir.path().join("first.marker")).await;
    assert!(!dir.path().join("%s").exists());

    h.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn child_output_is_drained_past_invalid_utf8() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // More than a pipe buffer of output after a non-UTF-8 line. The marker is
    // only written if every write succeeded.
    write_script(
        dir.path(),
        "noisy.sh",
        "printf 'bad \\377 byte\\n'\n\
         i=0\n\
         while [ $i -lt 2000 ]; do echo \"line $i of noisy output padding\"; echo \"err $i\" >&2; i=$((i+1)); done\n\
         touch done.marker\n\
         exec sleep 30\n",
    )?;

    let mut h = Harness::start(
        RunSettingsBuilder::new("sh noisy.sh")
            .directory(dir.path())
            .label_output(true)
            .build(),
    );

    h.cycle(true, "").await?;
    let pid = h.expect_started().await;

    wait_for_file(&dir.path().join("done.marker")).await;

    h.handle.shutdown().await?;
    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid });
    Ok(())
}

#[tokio::test]
async fn unstartable_command_is_fatal() -> TestResult {
    init_tracing();
    let h = Harness::start(RunSettingsBuilder::new("./no-such-program --serve").build());

    h.cycle(true, "").await?;
    let res = with_timeout(h.task).await?;
    assert!(matches!(res, Err(DaemonError::ProcessStart { .. })));
    Ok(())
}

#[tokio::test]
async fn shutdown_forwarding_stops_child_before_returning() -> TestResult {
    init_tracing();
    let mut h = Harness::start(
        RunSettingsBuilder::new("sleep 30")
            .graceful(Duration::from_secs(2))
            .build(),
    );

    h.cycle(true, "").await?;
    let pid = h.expect_started().await;

    with_timeout(forward_shutdown(Some(&h.handle))).await?;
    // Terminated is published before the acknowledgement.
    assert_eq!(h.events.try_recv()?, LifecycleEvent::Terminated { pid });

    // A second request after the supervisor is gone is a no-op.
    with_timeout(h.handle.shutdown()).await?;
    h.task.await??;
    Ok(())
}

#[tokio::test]
async fn shutdown_during_a_graceful_stop_waits_for_it() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "stubborn.sh", "trap '' TERM\nexec sleep 30\n")?;

    let grace = Duration::from_secs(1);
    let mut h = Harness::start(
        RunSettingsBuilder::new("sh stubborn.sh")
            .directory(dir.path())
            .stop_before_build()
            .graceful(grace)
            .build(),
    );

    h.cycle(true, "").await?;
    let pid = h.expect_started().await;
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    h.build_started("src/lib.rs").await?;
    // A successful outcome is queued behind the stop, then shutdown arrives.
    h.build_finished(true, "src/lib.rs").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    with_timeout(h.handle.shutdown()).await?;
    assert!(started.elapsed() >= grace, "shutdown returned before the stop finished");

    assert_eq!(h.next_event().await, LifecycleEvent::Terminated { pid });
    with_timeout(h.task).await??;
    // No second Terminated and no restart after shutdown.
    assert!(h.events.recv().await.is_none());
    Ok(())
}

#[tokio::test]
async fn shutdown_without_a_child_is_a_no_op() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").build());

    with_timeout(h.handle.shutdown()).await?;
    h.assert_no_event_for(Duration::from_millis(100)).await;
    Ok(())
}

#[tokio::test]
async fn closing_signal_stream_stops_the_child() -> TestResult {
    init_tracing();
    let mut h = Harness::start(RunSettingsBuilder::new("sleep 30").build());

    h.cycle(true, "").await?;
    let pid = h.expect_started().await;

    drop(h.signals);
    with_timeout(h.task).await??;
    assert_eq!(h.events.try_recv()?, LifecycleEvent::Terminated { pid });
    Ok(())
}
