use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use gatewayctl::config::Config;
use gatewayctl::engine::{AggregateStatus, TailHandle};
use gatewayctl::orchestrator::{OpEvent, Operation};
use gatewayctl::process::{CancelToken, Stream};

/// Oldest lines are dropped beyond this.
pub const MAX_LOG_LINES: usize = 5000;

/// Where a log line came from; drives its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    Error,
    Stdout,
    Stderr,
    Tail,
    TailErr,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LineKind,
    pub text: String,
}

/// What keystrokes currently mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a command for `exec`.
    Exec,
    /// Waiting for `y` before a destructive operation.
    Confirm(Operation),
}

/// Top-level application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub mode: InputMode,
    /// Text typed in exec mode.
    pub input: String,

    pub service: String,
    pub status: Option<AggregateStatus>,
    pub status_rx: Option<Receiver<AggregateStatus>>,
    pub last_probe: Option<Instant>,
    pub status_interval: Duration,

    pub log: VecDeque<LogLine>,
    /// Lines scrolled up from the bottom; 0 follows new output.
    pub scroll: usize,

    /// Operation currently running in the background, if any.
    pub busy: Option<Operation>,
    pub op_rx: Option<Receiver<OpEvent>>,
    pub cancel_token: Option<CancelToken>,
    /// Attach the log tail once the running start succeeds.
    pub follow_after_start: bool,

    pub tail: Option<TailHandle>,
    /// Whether the tail's follow process is still alive.
    pub following: bool,
    pub tail_tx: Sender<(Stream, String)>,
    pub tail_rx: Receiver<(Stream, String)>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let (tail_tx, tail_rx) = mpsc::channel();
        Self {
            running: true,
            show_help: false,
            mode: InputMode::Normal,
            input: String::new(),
            service: config.service.clone(),
            status: None,
            status_rx: None,
            last_probe: None,
            status_interval: Duration::from_secs(config.status_interval),
            log: VecDeque::new(),
            scroll: 0,
            busy: None,
            op_rx: None,
            cancel_token: None,
            follow_after_start: false,
            tail: None,
            following: false,
            tail_tx,
            tail_rx,
        }
    }

    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            kind,
            text: text.into(),
        });
        // Keep a scrolled view anchored on the same lines.
        if self.scroll > 0 {
            self.scroll = (self.scroll + 1).min(self.log.len().saturating_sub(1));
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LineKind::Info, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(LineKind::Error, text);
    }

    /// Tail lines carry the service tag, as the terminal view always did.
    pub fn push_tail(&mut self, stream: Stream, line: &str) {
        let tag = &self.service;
        let (kind, text) = match stream {
            Stream::Stdout => (LineKind::Tail, format!("[{tag}] {line}")),
            Stream::Stderr => (LineKind::TailErr, format!("[{tag}] ERR: {line}")),
        };
        self.push(kind, text);
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.scroll = 0;
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.log.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    pub fn status_due(&self) -> bool {
        self.status_rx.is_none()
            && self
                .last_probe
                .is_none_or(|at| at.elapsed() >= self.status_interval)
    }

    /// Record whether the follow process is alive. A tail that ended on
    /// its own is forgotten so the next toggle starts a fresh one.
    pub fn sync_following(&mut self, live: bool) {
        if !live && self.tail.take().is_some() {
            self.info(format!("stopped following {} logs", self.service));
        }
        self.following = live && self.tail.is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(&Config::default())
    }

    #[test]
    fn log_is_bounded() {
        let mut app = app();
        for i in 0..MAX_LOG_LINES + 10 {
            app.info(format!("line {i}"));
        }
        assert_eq!(app.log.len(), MAX_LOG_LINES);
        assert_eq!(app.log.front().unwrap().text, "line 10");
    }

    #[test]
    fn tail_lines_are_tagged() {
        let mut app = app();
        app.push_tail(Stream::Stdout, "listening on :8080");
        app.push_tail(Stream::Stderr, "warning");
        assert_eq!(app.log[0].text, "[gateway] listening on :8080");
        assert_eq!(app.log[0].kind, LineKind::Tail);
        assert_eq!(app.log[1].text, "[gateway] ERR: warning");
        assert_eq!(app.log[1].kind, LineKind::TailErr);
    }

    #[test]
    fn scrolled_view_stays_anchored() {
        let mut app = app();
        for i in 0..10 {
            app.info(format!("{i}"));
        }
        app.scroll_up(3);
        app.info("new");
        assert_eq!(app.scroll, 4);
        app.scroll_down(10);
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn following_needs_a_tail() {
        let mut app = app();
        app.sync_following(true);
        assert!(!app.following);
        app.sync_following(false);
        assert!(!app.following);
        assert!(app.log.is_empty());
    }

    #[test]
    fn status_is_due_initially_and_not_while_probing() {
        let mut app = app();
        assert!(app.status_due());
        let (_tx, rx) = mpsc::channel();
        app.status_rx = Some(rx);
        assert!(!app.status_due());
    }
}
