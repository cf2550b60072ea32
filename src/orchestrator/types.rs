use std::fmt;

use crate::process::Stream;

/// A lifecycle operation the facade can run in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    Build,
    Rebuild,
    Remove,
    Wipe,
    Exec(String),
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Build => "build",
            Operation::Rebuild => "rebuild",
            Operation::Remove => "remove",
            Operation::Wipe => "wipe",
            Operation::Exec(_) => "exec",
        }
    }

    /// Operations that destroy images, containers or build output.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::Rebuild | Operation::Remove | Operation::Wipe
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Exec(command) => write!(f, "exec `{command}`"),
            other => f.write_str(other.label()),
        }
    }
}

/// How a background operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion with this exit code.
    Exited(i32),
    /// Aborted by an error, including fatal non-zero steps.
    Failed(String),
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        *self == Outcome::Exited(0)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Exited(0) => f.write_str("done"),
            Outcome::Exited(code) => write!(f, "exited with code {code}"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
            Outcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Events streamed from a background operation. The last event is always
/// `Finished`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpEvent {
    Stdout(String),
    Stderr(String),
    Finished(Outcome),
}

impl OpEvent {
    pub fn from_line(stream: Stream, line: String) -> Self {
        match stream {
            Stream::Stdout => OpEvent::Stdout(line),
            Stream::Stderr => OpEvent::Stderr(line),
        }
    }
}
