// src/process/supervisor.rs

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{RunSettings, StopTiming};
use crate::engine::{BuildOutcome, BuildSignal};
use crate::errors::Result;
use crate::exec::CommandTemplate;
use crate::process::child::SupervisedProcess;
use crate::process::output::OutputPipe;
use crate::process::terminate::Terminator;

/// Where the supervisor is in its stop/start cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NoProcess,
    Starting,
    Running,
    Stopping,
}

/// Lifecycle notifications for an optional observer.
///
/// Two `Started` events are always separated by a `Terminated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started { pid: Option<u32> },
    Terminated { pid: Option<u32> },
    /// A build failed, so nothing was (re)started.
    RestartSkipped,
}

enum ControlRequest {
    Shutdown { ack: oneshot::Sender<Result<()>> },
}

/// Cloneable handle used to ask the supervisor to stop its child.
#[derive(Clone)]
pub struct SupervisorHandle {
    control: mpsc::Sender<ControlRequest>,
}

impl SupervisorHandle {
    /// Terminate the current child (if any) and stop supervising.
    ///
    /// Resolves once exit is confirmed. Calling it again, or after the
    /// supervisor has already stopped, is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        if self
            .control
            .send(ControlRequest::Shutdown { ack })
            .await
            .is_err()
        {
            debug!("supervisor already stopped; nothing to shut down");
            return Ok(());
        }
        done.await.unwrap_or(Ok(()))
    }
}

/// Owns the single supervised child and reacts to build signals.
///
/// All stop/start decisions happen on this one task, and every stop is
/// awaited to a confirmed exit before the next start, so at most one child
/// exists at a time.
pub struct Supervisor {
    settings: RunSettings,
    template: CommandTemplate,
    terminator: Box<dyn Terminator>,
    signals: mpsc::Receiver<BuildSignal>,
    control: mpsc::Receiver<ControlRequest>,
    output: mpsc::Sender<OutputPipe>,
    current: Option<SupervisedProcess>,
    state: SupervisorState,
    observer: Option<mpsc::UnboundedSender<LifecycleEvent>>,
}

impl Supervisor {
    pub fn new(
        settings: RunSettings,
        terminator: Box<dyn Terminator>,
        signals: mpsc::Receiver<BuildSignal>,
        output: mpsc::Sender<OutputPipe>,
    ) -> Result<(Self, SupervisorHandle)> {
        let template = CommandTemplate::parse(&settings.command)?;
        let (control_tx, control) = mpsc::channel(1);

        let supervisor = Self {
            settings,
            template,
            terminator,
            signals,
            control,
            output,
            current: None,
            state: SupervisorState::NoProcess,
            observer: None,
        };
        Ok((supervisor, SupervisorHandle { control: control_tx }))
    }

    /// Publish lifecycle events to `observer`.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<LifecycleEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Main loop.
    ///
    /// Returns `Ok` after a shutdown request or once the build signal stream
    /// ends (the child is stopped in both cases). Returns `Err` when a child
    /// cannot be started or its exit cannot be confirmed.
    pub async fn run(mut self) -> Result<()> {
        info!(
            cmd = %self.settings.command,
            stop = ?self.settings.stop,
            strategy = self.terminator.name(),
            "process supervisor started"
        );

        let mut control_open = true;

        loop {
            tokio::select! {
                biased;

                request = self.control.recv(), if control_open => match request {
                    Some(ControlRequest::Shutdown { ack }) => {
                        info!("shutdown requested; stopping supervised process");
                        let res = self.stop_current().await;
                        let _ = ack.send(res);
                        return Ok(());
                    }
                    None => control_open = false,
                },

                signal = self.signals.recv() => match signal {
                    Some(signal) => self.handle_signal(signal).await?,
                    None => {
                        info!("build signal stream closed; supervisor stopping");
                        return self.stop_current().await;
                    }
                },
            }
        }
    }

    async fn handle_signal(&mut self, signal: BuildSignal) -> Result<()> {
        match signal {
            BuildSignal::Started { trigger } => {
                debug!(trigger = %trigger, state = ?self.state, "build started");
                if self.settings.stop == StopTiming::BeforeBuild {
                    self.stop_current().await?;
                }
                Ok(())
            }
            BuildSignal::Finished(outcome) => self.handle_outcome(outcome).await,
        }
    }

    async fn handle_outcome(&mut self, outcome: BuildOutcome) -> Result<()> {
        if !outcome.success {
            if self.current.is_some() {
                info!("build failed; keeping the current process running");
            } else {
                info!("build failed; waiting for the next successful build");
            }
            self.emit(LifecycleEvent::RestartSkipped);
            return Ok(());
        }

        self.stop_current().await?;
        self.start(&outcome.trigger).await
    }

    /// Stop the current child and wait for its exit. No-op without a child.
    async fn stop_current(&mut self) -> Result<()> {
        let Some(mut process) = self.current.take() else {
            return Ok(());
        };

        self.state = SupervisorState::Stopping;
        let pid = process.pid();
        info!(
            pid,
            cmd = process.command(),
            strategy = self.terminator.name(),
            "stopping current process"
        );

        self.terminator.terminate(&mut process).await?;

        self.state = SupervisorState::NoProcess;
        self.emit(LifecycleEvent::Terminated { pid });
        Ok(())
    }

    async fn start(&mut self, trigger: &str) -> Result<()> {
        debug_assert!(self.current.is_none(), "started a second child process");

        self.state = SupervisorState::Starting;
        let line = self.template.render(trigger);
        info!(cmd = %line, "restarting the given command");

        let mut process = match SupervisedProcess::spawn(&line, &self.settings.directory) {
            Ok(process) => process,
            Err(err) => {
                self.state = SupervisorState::NoProcess;
                return Err(err);
            }
        };
        let pid = process.pid();

        let (stdout, stderr) = process.take_output();
        if let Some(stdout) = stdout {
            self.forward_output(OutputPipe::Stdout(stdout)).await;
        }
        if let Some(stderr) = stderr {
            self.forward_output(OutputPipe::Stderr(stderr)).await;
        }

        self.current = Some(process);
        self.state = SupervisorState::Running;
        self.emit(LifecycleEvent::Started { pid });
        info!(pid, "process started");
        Ok(())
    }

    async fn forward_output(&self, pipe: OutputPipe) {
        if self.output.send(pipe).await.is_err() {
            warn!("output logger stopped; child output will not be logged");
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::DaemonError;
    use crate::process::terminate::HardKill;

    fn supervisor(command: &str) -> (Supervisor, mpsc::Sender<BuildSignal>) {
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let (output_tx, mut output_rx) = mpsc::channel(2);
        tokio::spawn(async move { while output_rx.recv().await.is_some() {} });
        let (supervisor, _handle) = Supervisor::new(
            RunSettings::new(command),
            Box::new(HardKill),
            signal_rx,
            output_tx,
        )
        .expect("supervisor");
        (supervisor, signal_tx)
    }

    #[tokio::test]
    async fn state_follows_start_and_stop() {
        let (mut sup, _signals) = supervisor("sleep 30");
        assert_eq!(sup.state(), SupervisorState::NoProcess);

        sup.start("").await.expect("start");
        assert_eq!(sup.state(), SupervisorState::Running);
        assert!(sup.current.is_some());

        sup.stop_current().await.expect("stop");
        assert_eq!(sup.state(), SupervisorState::NoProcess);
        assert!(sup.current.is_none());
    }

    #[tokio::test]
    async fn failed_start_leaves_no_process() {
        let (mut sup, _signals) = supervisor("./no-such-program");

        let err = sup.start("").await.expect_err("spawn fails");
        assert!(matches!(err, DaemonError::ProcessStart { .. }));
        assert_eq!(sup.state(), SupervisorState::NoProcess);
        assert!(sup.current.is_none());
    }

    #[tokio::test]
    async fn stop_before_build_stops_on_build_start() {
        let (signal_tx, signal_rx) = mpsc::channel(1);
        drop(signal_tx);
        let (output_tx, mut output_rx) = mpsc::channel(2);
        tokio::spawn(async move { while output_rx.recv().await.is_some() {} });
        let mut run = RunSettings::new("sleep 30");
        run.stop = StopTiming::BeforeBuild;
        let (mut sup, _handle) =
            Supervisor::new(run, Box::new(HardKill), signal_rx, output_tx).expect("supervisor");

        sup.start("").await.expect("start");
        sup.handle_signal(BuildSignal::Started {
            trigger: "src/lib.rs".to_string(),
        })
        .await
        .expect("stop");
        assert_eq!(sup.state(), SupervisorState::NoProcess);
    }
}
