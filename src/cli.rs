//! Non-interactive subcommands. Each runs one operation, streams its
//! output to stdout/stderr and exits with a code reflecting the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use gatewayctl::Orchestrator;
use gatewayctl::config::Config;
use gatewayctl::engine::{DesktopStatus, TailHandle};
use gatewayctl::orchestrator::{OpEvent, Operation, Outcome};
use gatewayctl::process::{CancelToken, ChannelSink, FnSink, Stream};

/// Exit code for an operation interrupted by Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "gatewayctl", version, about)]
pub struct Cli {
    /// Configuration file (default: `.gatewayctl.yml` in the current directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the engine commands run in; overrides the config file.
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Write diagnostics to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Without a subcommand the interactive dashboard starts.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe engine, image and container.
    Status {
        /// Print the aggregate status as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Start the service detached.
    Start {
        /// Follow the service's logs after a successful start.
        #[arg(long)]
        follow: bool,
    },
    /// Stop the service without removing it.
    Stop,
    /// Build the image without cache.
    Build,
    /// Wipe everything, then build.
    Rebuild,
    /// Remove the service container.
    Remove,
    /// Tear down containers, images, volumes and networks, then prune.
    Wipe,
    /// Run a command through the container's shell.
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Follow the service's logs until interrupted.
    Logs,
}

impl Command {
    /// The orchestrator operation this subcommand runs directly, if any.
    fn operation(&self) -> Option<Operation> {
        Some(match self {
            Command::Start { follow: false } => Operation::Start,
            Command::Stop => Operation::Stop,
            Command::Build => Operation::Build,
            Command::Rebuild => Operation::Rebuild,
            Command::Remove => Operation::Remove,
            Command::Wipe => Operation::Wipe,
            Command::Exec { command } => Operation::Exec(shell_words::join(command)),
            Command::Status { .. } | Command::Start { follow: true } | Command::Logs => {
                return None;
            }
        })
    }
}

/// Run `command` to completion and return the process exit code.
pub fn run(command: Command, config: Config) -> Result<i32> {
    let orch = Arc::new(Orchestrator::new(config));
    let cancel = CancelToken::new();
    forward_signals(&cancel)?;

    if let Some(op) = command.operation() {
        return Ok(run_operation(&orch, op, cancel));
    }
    match command {
        Command::Status { json } => status(&orch, json),
        Command::Start { .. } => Ok(start_and_follow(&orch, &cancel)),
        Command::Logs => {
            let (tx, rx) = mpsc::channel();
            let handle = orch.follow_logs(Box::new(ChannelSink::new(tx, tail_line)));
            Ok(follow(&orch, handle, rx, &cancel))
        }
        _ => unreachable!("handled by Command::operation"),
    }
}

fn status(orch: &Orchestrator, json: bool) -> Result<i32> {
    if json {
        let status = orch.status();
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(i32::from(status.desktop != DesktopStatus::Open));
    }
    match orch.check_engine() {
        Ok(msg) => {
            println!("[DOCKER] {msg}");
            Ok(0)
        }
        Err(msg) => {
            eprintln!("[DOCKER-ERR] {msg}");
            Ok(1)
        }
    }
}

fn run_operation(orch: &Arc<Orchestrator>, op: Operation, cancel: CancelToken) -> i32 {
    for event in orch.spawn(op, cancel) {
        match event {
            OpEvent::Stdout(line) => println!("{line}"),
            OpEvent::Stderr(line) => eprintln!("{line}"),
            OpEvent::Finished(outcome) => return exit_code(&outcome),
        }
    }
    1
}

fn start_and_follow(orch: &Arc<Orchestrator>, cancel: &CancelToken) -> i32 {
    let (tx, rx) = mpsc::channel();
    let mut sink = FnSink::new(|line: &str| println!("{line}"), |line: &str| eprintln!("{line}"));
    let tail_sink = Box::new(ChannelSink::new(tx, tail_line));

    match orch.start_and_follow(&mut sink, cancel, tail_sink) {
        Ok((_, Some(handle))) => follow(orch, handle, rx, cancel),
        Ok((code, None)) => {
            eprintln!("start exited with code {code}");
            code
        }
        Err(e) if e.is_cancelled() => EXIT_CANCELLED,
        Err(e) => {
            eprintln!("start failed: {e}");
            1
        }
    }
}

/// Print tail lines until the tail ends or the token fires.
fn follow(
    orch: &Arc<Orchestrator>,
    handle: TailHandle,
    rx: Receiver<(Stream, String)>,
    cancel: &CancelToken,
) -> i32 {
    let _stop = {
        let orch = Arc::clone(orch);
        let handle = handle.clone();
        cancel.on_cancel(move || orch.cancel_logs(&handle))
    };

    let tag = handle.service().to_string();
    // Ends once the tail worker drops its sink.
    for (stream, line) in rx {
        match stream {
            Stream::Stdout => println!("[{tag}] {line}"),
            Stream::Stderr => eprintln!("[{tag}] ERR: {line}"),
        }
    }

    if cancel.is_cancelled() {
        EXIT_CANCELLED
    } else {
        0
    }
}

fn tail_line(stream: Stream, line: String) -> (Stream, String) {
    (stream, line)
}

fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Exited(code) => *code,
        Outcome::Failed(_) => 1,
        Outcome::Cancelled => EXIT_CANCELLED,
    }
}

/// Cancel `token` on SIGINT/SIGTERM so running children are killed with
/// their process group. A second signal exits immediately.
#[cfg(unix)]
fn forward_signals(token: &CancelToken) -> Result<()> {
    use anyhow::Context;
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("register signal handlers")?;
    let token = token.clone();
    std::thread::spawn(move || {
        for signal in signals.forever() {
            if token.is_cancelled() {
                std::process::exit(EXIT_CANCELLED);
            }
            debug!(signal, "interrupted, cancelling");
            token.cancel();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_signals(_token: &CancelToken) -> Result<()> {
    debug!("signal forwarding unavailable on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_map_to_operations() {
        let cli = Cli::parse_from(["gatewayctl", "wipe"]);
        assert_eq!(cli.command.unwrap().operation(), Some(Operation::Wipe));

        let cli = Cli::parse_from(["gatewayctl", "start", "--follow"]);
        assert_eq!(cli.command.unwrap().operation(), None);
    }

    #[test]
    fn exec_joins_trailing_words() {
        let cli = Cli::parse_from(["gatewayctl", "exec", "ls", "-la", "/app"]);
        assert_eq!(
            cli.command.unwrap().operation(),
            Some(Operation::Exec("ls -la /app".into()))
        );

        // Word boundaries survive into the container shell.
        let cli = Cli::parse_from(["gatewayctl", "exec", "ls", "my dir"]);
        let Some(Operation::Exec(line)) = cli.command.unwrap().operation() else {
            panic!("expected exec");
        };
        assert_eq!(line, "ls 'my dir'");
        assert_eq!(shell_words::split(&line).unwrap(), ["ls", "my dir"]);
    }

    #[test]
    fn no_subcommand_means_dashboard() {
        let cli = Cli::parse_from(["gatewayctl", "--work-dir", "/srv/gateway"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.work_dir, Some(PathBuf::from("/srv/gateway")));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&Outcome::Exited(3)), 3);
        assert_eq!(exit_code(&Outcome::Failed("x".into())), 1);
        assert_eq!(exit_code(&Outcome::Cancelled), EXIT_CANCELLED);
    }
}
