use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use tracing::debug;

use super::tree;
use super::types::{CancelToken, Captured, Invocation, OutputSink, RunOutcome, Stream};
use crate::error::{Error, Result};

/// Launches external programs and streams their output.
///
/// Implementations block the calling thread until the program exits or the
/// cancel token fires. Lines are delivered to `sink` on the calling thread,
/// in production order per stream. Output written by a descendant after the
/// program itself has exited is not waited for.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<RunOutcome>;

    /// Like [`run`](Self::run) but buffers both streams instead of streaming.
    fn run_capture(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<(RunOutcome, Captured)> {
        let mut captured = Captured::default();
        let outcome = self.run(invocation, &mut captured, cancel)?;
        Ok((outcome, captured))
    }
}

/// How long output keeps being collected once the direct child has exited.
/// Descendants that inherited the pipes could otherwise hold them open
/// indefinitely.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

enum Event {
    Line(Stream, String),
    Exited(std::io::Result<ExitStatus>),
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        invocation: &Invocation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let command_line = invocation.command_line();
        debug!(command = %command_line, dir = %invocation.work_dir.display(), "spawning");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tree::isolate(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| Error::Launch {
            program: invocation.program.clone(),
            source,
        })?;

        let pid = child.id();
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let (tx, rx) = mpsc::channel();
        pump(stdout, Stream::Stdout, tx.clone());
        pump(stderr, Stream::Stderr, tx.clone());
        std::thread::spawn(move || {
            let status = child.wait();
            let _ = tx.send(Event::Exited(status));
        });

        // Fires at most once; wakes the loop below by closing the pipes.
        let kill_hook = cancel.on_cancel(move || tree::kill_tree(pid));

        // Ends once both pipes hit EOF, or once the child has exited and
        // the pipes stay quiet for the grace period.
        let mut status = None;
        loop {
            let event = match status {
                None => rx.recv().ok(),
                Some(_) => rx.recv_timeout(EXIT_DRAIN_GRACE).ok(),
            };
            match event {
                Some(Event::Line(stream, line)) => sink.line(stream, &line),
                Some(Event::Exited(s)) => status = Some(s),
                None => break,
            }
        }
        drop(kill_hook);

        if cancel.is_cancelled() {
            debug!(command = %command_line, "cancelled");
            return Ok(RunOutcome::Cancelled);
        }

        let status = status
            .unwrap_or_else(|| Err(std::io::Error::other("exit status was not reported")))?;
        let code = status.code().unwrap_or(-1);
        debug!(command = %command_line, code, "exited");
        Ok(RunOutcome::Exited(code))
    }
}

/// Forward `reader` line by line into `tx` from a dedicated thread.
///
/// Invalid UTF-8 is replaced rather than ending the stream, and a trailing
/// `\r` is stripped along with the newline.
fn pump<R>(reader: R, stream: Stream, tx: Sender<Event>)
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                    }
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    // Receiver may be gone.
                    if tx.send(Event::Line(stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
