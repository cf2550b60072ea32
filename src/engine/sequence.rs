use std::sync::Arc;

use tracing::{info, warn};

use super::commands;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{CancelToken, CommandRunner, Invocation, OutputSink, RunOutcome};

/// Lifecycle operations against the configured compose service.
///
/// Steps within one operation run strictly in order, each awaited before
/// the next starts. Output of every step streams into the caller's sink.
/// Nothing is retried.
#[derive(Clone)]
pub struct Sequencer {
    runner: Arc<dyn CommandRunner>,
    config: Arc<Config>,
}

impl Sequencer {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<Config>) -> Self {
        Self { runner, config }
    }

    /// `up -d`; returns the exit code.
    pub fn start(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.step("compose up", &commands::start_command(&self.config), sink, cancel)
    }

    /// Stop without removing; stopping a stopped service is not an error.
    pub fn stop(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.step("compose stop", &commands::stop_command(&self.config), sink, cancel)
    }

    /// Remove the service container only.
    pub fn remove(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<i32> {
        self.step("compose rm", &commands::remove_command(&self.config), sink, cancel)
    }

    /// Rebuild the image without cache. A non-zero exit is an error.
    pub fn build_no_cache(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.required("compose build", &commands::build_command(&self.config), sink, cancel)
    }

    /// Tear everything down: `down` with images/volumes/orphans (fatal),
    /// each configured network (best effort), then a full prune (fatal).
    pub fn wipe_all(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.required("compose down", &commands::down_command(&self.config), sink, cancel)?;

        for network in &self.config.networks {
            let cmd = commands::network_remove_command(&self.config, network);
            match self.step("network rm", &cmd, sink, cancel) {
                Ok(0) => {}
                Ok(code) => warn!(network = %network, code, "network removal failed, continuing"),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(network = %network, error = %e, "network removal failed, continuing"),
            }
        }

        self.required("system prune", &commands::prune_command(&self.config), sink, cancel)
    }

    /// Wipe, then build. Does not start the service.
    pub fn full_rebuild(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Result<()> {
        self.wipe_all(sink, cancel)?;
        self.build_no_cache(sink, cancel)
    }

    /// Run `command` through the container's shell; returns the exit code.
    pub fn exec_in(
        &self,
        command: &str,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<i32> {
        let cmd = commands::exec_command(&self.config, command)?;
        self.step("exec", &cmd, sink, cancel)
    }

    fn step(
        &self,
        step: &'static str,
        cmd: &Invocation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<i32> {
        info!(step, command = %cmd.command_line(), "running");
        match self.runner.run(cmd, sink, cancel)? {
            RunOutcome::Exited(code) => Ok(code),
            RunOutcome::Cancelled => Err(Error::Cancelled),
        }
    }

    fn required(
        &self,
        step: &'static str,
        cmd: &Invocation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        match self.step(step, cmd, sink, cancel)? {
            0 => Ok(()),
            code => Err(Error::NonZeroExit { step, code }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Reply, ScriptedRunner};
    use crate::process::{Captured, NullSink};

    fn sequencer(runner: &Arc<ScriptedRunner>) -> Sequencer {
        Sequencer::new(runner.clone(), Arc::new(Config::default()))
    }

    fn verbs(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .arg_lists()
            .into_iter()
            .map(|args| match args.first().map(String::as_str) {
                Some("compose") => args[3].clone(),
                _ => args[..2].join(" "),
            })
            .collect()
    }

    #[test]
    fn start_passes_exit_code_through() {
        let runner = ScriptedRunner::new([Reply::exit(3)]);
        let code = sequencer(&runner)
            .start(&mut NullSink, &CancelToken::new())
            .unwrap();
        assert_eq!(code, 3);
        assert_eq!(verbs(&runner), vec!["up"]);
    }

    #[test]
    fn output_streams_into_sink() {
        let runner = ScriptedRunner::new([Reply::stdout(0, "Creating gateway\nStarted")]);
        let mut sink = Captured::default();
        sequencer(&runner)
            .start(&mut sink, &CancelToken::new())
            .unwrap();
        assert_eq!(sink.stdout, "Creating gateway\nStarted\n");
    }

    #[test]
    fn wipe_runs_steps_in_order() {
        let runner = ScriptedRunner::new([]);
        sequencer(&runner)
            .wipe_all(&mut NullSink, &CancelToken::new())
            .unwrap();
        assert_eq!(
            verbs(&runner),
            vec!["down", "network rm", "network rm", "system prune"]
        );
    }

    #[test]
    fn failing_network_removal_does_not_block_prune() {
        let runner = ScriptedRunner::new([
            Reply::exit(0),
            Reply::stderr(1, "Error: No such network: gateway_default"),
            Reply::launch_error(),
            Reply::exit(0),
        ]);
        sequencer(&runner)
            .wipe_all(&mut NullSink, &CancelToken::new())
            .unwrap();
        assert_eq!(verbs(&runner).last().unwrap(), "system prune");
    }

    #[test]
    fn failing_down_aborts_wipe() {
        let runner = ScriptedRunner::new([Reply::exit(1)]);
        let err = sequencer(&runner)
            .wipe_all(&mut NullSink, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NonZeroExit {
                step: "compose down",
                code: 1
            }
        ));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn failing_prune_fails_wipe() {
        let runner = ScriptedRunner::new([
            Reply::exit(0),
            Reply::exit(0),
            Reply::exit(0),
            Reply::exit(125),
        ]);
        let err = sequencer(&runner)
            .wipe_all(&mut NullSink, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::NonZeroExit { step: "system prune", .. }));
    }

    #[test]
    fn rebuild_never_builds_after_failed_wipe() {
        let runner = ScriptedRunner::new([Reply::exit(1)]);
        let result = sequencer(&runner).full_rebuild(&mut NullSink, &CancelToken::new());
        assert!(result.is_err());
        assert!(!verbs(&runner).contains(&"build".to_string()));
    }

    #[test]
    fn rebuild_builds_but_does_not_start() {
        let runner = ScriptedRunner::new([]);
        sequencer(&runner)
            .full_rebuild(&mut NullSink, &CancelToken::new())
            .unwrap();
        let verbs = verbs(&runner);
        assert_eq!(verbs.last().unwrap(), "build");
        assert!(!verbs.contains(&"up".to_string()));
    }

    #[test]
    fn failing_build_is_an_error() {
        let runner = ScriptedRunner::new([Reply::exit(17)]);
        let err = sequencer(&runner)
            .build_no_cache(&mut NullSink, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::NonZeroExit { code: 17, .. }));
    }

    #[test]
    fn cancelled_step_reports_cancellation() {
        let runner = ScriptedRunner::new([Reply::until_cancelled("")]);
        let token = CancelToken::new();
        token.cancel();
        let err = sequencer(&runner)
            .build_no_cache(&mut NullSink, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn cancellation_during_network_cleanup_stops_wipe() {
        let runner = ScriptedRunner::new([Reply::exit(0), Reply::until_cancelled("")]);
        let token = CancelToken::new();
        token.cancel();
        let err = sequencer(&runner)
            .wipe_all(&mut NullSink, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn exec_composes_quoted_shell_command() {
        let runner = ScriptedRunner::new([Reply::stdout(0, "\"hi\"")]);
        let mut sink = Captured::default();
        let code = sequencer(&runner)
            .exec_in("echo \"hi\"", &mut sink, &CancelToken::new())
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(sink.stdout, "\"hi\"\n");
        let args = &runner.arg_lists()[0];
        assert_eq!(args.last().unwrap(), "echo \"hi\"");
        assert_eq!(args[0], "exec");
    }
}
