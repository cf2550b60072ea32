use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Hooks {
    next_id: u64,
    pending: Vec<(u64, Hook)>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    hooks: Mutex<Hooks>,
}

/// Cooperative cancellation token.
///
/// Besides the flag, a token carries hooks registered with [`on_cancel`]
/// that fire once, on the thread that calls [`cancel`]. The runner uses a
/// hook to kill its process tree, so a blocked wait wakes up without polling.
///
/// [`on_cancel`]: CancelToken::on_cancel
/// [`cancel`]: CancelToken::cancel
#[derive(Clone, Default)]
pub struct CancelToken(Arc<Inner>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent and safe from any thread.
    pub fn cancel(&self) {
        if self.0.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = {
            let mut guard = self.0.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut guard.pending)
        };
        for (_, hook) in hooks {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    /// Run `hook` when the token is cancelled, or right away if it already is.
    ///
    /// The hook is unregistered when the returned guard drops.
    pub fn on_cancel<F>(&self, hook: F) -> CancelHook
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.0.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            drop(guard);
            hook();
            return CancelHook { token: None, id: 0 };
        }
        let id = guard.next_id;
        guard.next_id += 1;
        guard.pending.push((id, Box::new(hook)));
        CancelHook {
            token: Some(self.clone()),
            id,
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Registration guard returned by [`CancelToken::on_cancel`].
#[must_use = "dropping the guard unregisters the hook"]
pub struct CancelHook {
    token: Option<CancelToken>,
    id: u64,
}

impl Drop for CancelHook {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            let mut guard = token.0.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            guard.pending.retain(|(id, _)| *id != self.id);
        }
    }
}

/// One external program invocation: executable, argv and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: work_dir.into(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-quoted command line, for logs and error messages.
    pub fn command_line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own. Signal deaths are reported as `-1`.
    Exited(i32),
    /// The cancel token fired and the process tree was killed.
    Cancelled,
}

impl RunOutcome {
    pub fn success(self) -> bool {
        self == RunOutcome::Exited(0)
    }
}

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Receives completed lines (terminator stripped) as they are produced.
pub trait OutputSink {
    fn stdout_line(&mut self, line: &str);
    fn stderr_line(&mut self, line: &str);

    fn line(&mut self, stream: Stream, line: &str) {
        match stream {
            Stream::Stdout => self.stdout_line(line),
            Stream::Stderr => self.stderr_line(line),
        }
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn stdout_line(&mut self, line: &str) {
        (**self).stdout_line(line)
    }

    fn stderr_line(&mut self, line: &str) {
        (**self).stderr_line(line)
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn stdout_line(&mut self, line: &str) {
        (**self).stdout_line(line)
    }

    fn stderr_line(&mut self, line: &str) {
        (**self).stderr_line(line)
    }
}

/// Sink built from two closures.
pub struct FnSink<O, E> {
    on_stdout: O,
    on_stderr: E,
}

impl<O, E> FnSink<O, E>
where
    O: FnMut(&str),
    E: FnMut(&str),
{
    pub fn new(on_stdout: O, on_stderr: E) -> Self {
        Self {
            on_stdout,
            on_stderr,
        }
    }
}

impl<O, E> OutputSink for FnSink<O, E>
where
    O: FnMut(&str),
    E: FnMut(&str),
{
    fn stdout_line(&mut self, line: &str) {
        (self.on_stdout)(line)
    }

    fn stderr_line(&mut self, line: &str) {
        (self.on_stderr)(line)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn stdout_line(&mut self, _line: &str) {}
    fn stderr_line(&mut self, _line: &str) {}
}

/// Accumulates both streams in memory, for status probes.
#[derive(Debug, Default, Clone)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

impl OutputSink for Captured {
    fn stdout_line(&mut self, line: &str) {
        self.stdout.push_str(line);
        self.stdout.push('\n');
    }

    fn stderr_line(&mut self, line: &str) {
        self.stderr.push_str(line);
        self.stderr.push('\n');
    }
}

/// Forwards lines into a channel; dropped receivers are ignored.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: Sender<T>,
    wrap: fn(Stream, String) -> T,
}

impl<T> ChannelSink<T> {
    pub fn new(tx: Sender<T>, wrap: fn(Stream, String) -> T) -> Self {
        Self { tx, wrap }
    }
}

impl<T> Clone for ChannelSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wrap: self.wrap,
        }
    }
}

impl<T> OutputSink for ChannelSink<T> {
    fn stdout_line(&mut self, line: &str) {
        let _ = self.tx.send((self.wrap)(Stream::Stdout, line.to_string()));
    }

    fn stderr_line(&mut self, line: &str) {
        let _ = self.tx.send((self.wrap)(Stream::Stderr, line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_token_transitions_once() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        // Idempotent.
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_token_is_visible_across_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn hook_fires_exactly_once() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _guard = token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        token.cancel();
        token.cancel();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_on_cancelled_token_runs_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _guard = token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_hook_does_not_fire() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        drop(token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        token.cancel();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_from_another_thread() {
        let token = CancelToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn command_line_quotes_arguments() {
        let inv = Invocation::new("docker", "/tmp").args(["compose", "-f", "my compose.yml"]);
        assert_eq!(inv.command_line(), "docker compose -f 'my compose.yml'");
    }

    #[test]
    fn captured_keeps_streams_apart() {
        let mut cap = Captured::default();
        cap.stdout_line("out");
        cap.stderr_line("err");
        cap.line(Stream::Stdout, "out2");
        assert_eq!(cap.stdout, "out\nout2\n");
        assert_eq!(cap.stderr, "err\n");
    }

    #[test]
    fn run_outcome_success_only_for_zero() {
        assert!(RunOutcome::Exited(0).success());
        assert!(!RunOutcome::Exited(1).success());
        assert!(!RunOutcome::Cancelled.success());
    }
}
