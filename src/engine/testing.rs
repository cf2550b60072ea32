//! Scripted [`CommandRunner`] for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use crate::error::{Error, Result};
use crate::process::{CancelToken, CommandRunner, Invocation, OutputSink, RunOutcome, Stream};

enum End {
    Exit(i32),
    LaunchError,
    UntilCancelled,
}

pub struct Reply {
    lines: Vec<(Stream, String)>,
    end: End,
}

impl Reply {
    pub fn exit(code: i32) -> Self {
        Self {
            lines: Vec::new(),
            end: End::Exit(code),
        }
    }

    pub fn stdout(code: i32, text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| (Stream::Stdout, l.to_string())).collect(),
            end: End::Exit(code),
        }
    }

    pub fn stderr(code: i32, text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| (Stream::Stderr, l.to_string())).collect(),
            end: End::Exit(code),
        }
    }

    pub fn launch_error() -> Self {
        Self {
            lines: Vec::new(),
            end: End::LaunchError,
        }
    }

    /// Emits its lines, then blocks until the cancel token fires.
    pub fn until_cancelled(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| (Stream::Stdout, l.to_string())).collect(),
            end: End::UntilCancelled,
        }
    }
}

/// Replays queued replies in order and records every invocation.
/// Unscripted calls exit 0.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Invocation>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
    cancelled: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument lists of every call, for order assertions.
    pub fn arg_lists(&self) -> Vec<Vec<String>> {
        self.calls().into_iter().map(|c| c.args).collect()
    }

    /// Blocking runs currently waiting for cancellation.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Blocking runs that ended through cancellation.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        invocation: &Invocation,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        self.calls.lock().unwrap().push(invocation.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::exit(0));

        if matches!(reply.end, End::LaunchError) {
            return Err(Error::Launch {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
            });
        }

        for (stream, line) in &reply.lines {
            sink.line(*stream, line);
        }

        match reply.end {
            End::Exit(code) => Ok(RunOutcome::Exited(code)),
            End::LaunchError => unreachable!(),
            End::UntilCancelled => {
                let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_live.fetch_max(now, Ordering::SeqCst);
                let (tx, rx) = mpsc::channel();
                let hook = cancel.on_cancel(move || {
                    let _ = tx.send(());
                });
                let _ = rx.recv();
                drop(hook);
                self.live.fetch_sub(1, Ordering::SeqCst);
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                Ok(RunOutcome::Cancelled)
            }
        }
    }
}
