use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use tracing::info;

use super::types::{OpEvent, Operation, Outcome};
use crate::config::Config;
use crate::engine::{
    AggregateStatus, ContainerStatus, DesktopStatus, ImageStatus, LogTail, Sequencer,
    StatusProber, TailHandle, TailSink, commands,
};
use crate::error::Result;
use crate::process::{CancelToken, ChannelSink, CommandRunner, OutputSink, ProcessRunner};

/// Public surface over the prober, sequencer and log tail for one service.
///
/// Holds no presentation state: output goes to caller-supplied sinks, and
/// status comes back as plain enums.
pub struct Orchestrator {
    config: Arc<Config>,
    prober: StatusProber,
    sequencer: Sequencer,
    tails: LogTail,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let config = Arc::new(config);
        Self {
            prober: StatusProber::new(Arc::clone(&runner), Arc::clone(&config)),
            sequencer: Sequencer::new(Arc::clone(&runner), Arc::clone(&config)),
            tails: LogTail::new(runner),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Status ────────────────────────────────────────────────────────

    pub fn status(&self) -> AggregateStatus {
        self.prober.probe_all()
    }

    pub fn probe_desktop(&self) -> DesktopStatus {
        self.prober.probe_desktop()
    }

    pub fn probe_image(&self) -> ImageStatus {
        self.prober.probe_image()
    }

    pub fn probe_container(&self) -> ContainerStatus {
        self.prober.probe_container()
    }

    /// Probe everything and describe it in one line. `Err` carries the
    /// message when the engine is not usable.
    pub fn check_engine(&self) -> std::result::Result<String, String> {
        let status = self.status();
        match status.desktop {
            DesktopStatus::Open => Ok(status.to_string()),
            DesktopStatus::Closed => Err(format!("{} is not running", self.config.engine)),
            DesktopStatus::NotInstalled => {
                Err(format!("{} is not installed", self.config.engine))
            }
            DesktopStatus::Unknown => Err(format!("{} state is unknown", self.config.engine)),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────

    pub fn start(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.sequencer.start(sink, cancel)
    }

    /// Start detached, then (re)attach the log tail if the start succeeded.
    pub fn start_and_follow(
        &self,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
        tail_sink: TailSink,
    ) -> Result<(i32, Option<TailHandle>)> {
        let code = self.start(sink, cancel)?;
        if code != 0 {
            return Ok((code, None));
        }
        Ok((code, Some(self.follow_logs(tail_sink))))
    }

    /// Stop the service, tearing down its log tail first.
    pub fn stop(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.tails.cancel_service(&self.config.service);
        self.sequencer.stop(sink, cancel)
    }

    pub fn build_no_cache(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.sequencer.build_no_cache(sink, cancel)
    }

    pub fn remove(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.sequencer.remove(sink, cancel)
    }

    pub fn wipe_all(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.sequencer.wipe_all(sink, cancel)
    }

    pub fn full_rebuild(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.sequencer.full_rebuild(sink, cancel)
    }

    pub fn exec_in(
        &self,
        command: &str,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<i32> {
        self.sequencer.exec_in(command, sink, cancel)
    }

    /// Run `op` to completion on the calling thread. Operations without an
    /// exit code of their own report `0` on success.
    pub fn run(
        &self,
        op: &Operation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<i32> {
        match op {
            Operation::Start => self.start(sink, cancel),
            Operation::Stop => self.stop(sink, cancel),
            Operation::Build => self.build_no_cache(sink, cancel).map(|()| 0),
            Operation::Rebuild => self.full_rebuild(sink, cancel).map(|()| 0),
            Operation::Remove => self.remove(sink, cancel),
            Operation::Wipe => self.wipe_all(sink, cancel).map(|()| 0),
            Operation::Exec(command) => self.exec_in(command, sink, cancel),
        }
    }

    /// Run `op` on a background thread.
    ///
    /// Returns a receiver that streams output lines followed by exactly one
    /// [`OpEvent::Finished`]. Failures, including non-zero exits, are also
    /// rendered as an error line.
    pub fn spawn(self: &Arc<Self>, op: Operation, cancel: CancelToken) -> Receiver<OpEvent> {
        let (tx, rx) = mpsc::channel();
        let this = Arc::clone(self);
        std::thread::spawn(move || {
            info!(operation = %op, "started");
            let mut sink = ChannelSink::new(tx.clone(), OpEvent::from_line);
            let outcome = match this.run(&op, &mut sink, &cancel) {
                Ok(0) => Outcome::Exited(0),
                Ok(code) => {
                    let _ = tx.send(OpEvent::Stderr(format!("{op} exited with code {code}")));
                    Outcome::Exited(code)
                }
                Err(e) if e.is_cancelled() => Outcome::Cancelled,
                Err(e) => {
                    let _ = tx.send(OpEvent::Stderr(format!("{op} failed: {e}")));
                    Outcome::Failed(e.to_string())
                }
            };
            info!(operation = %op, outcome = %outcome, "finished");
            // Receiver may be dropped; ignore send errors.
            let _ = tx.send(OpEvent::Finished(outcome));
        });
        rx
    }

    // ── Logs ──────────────────────────────────────────────────────────

    /// Follow the service's logs, superseding any tail already running.
    pub fn follow_logs(&self, sink: TailSink) -> TailHandle {
        self.tails.start(
            &self.config.service,
            commands::logs_command(&self.config),
            sink,
        )
    }

    pub fn cancel_logs(&self, handle: &TailHandle) {
        self.tails.cancel(handle);
    }

    pub fn is_following(&self) -> bool {
        self.tails.is_active(&self.config.service)
    }
}
