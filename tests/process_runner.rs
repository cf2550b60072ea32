//! Integration tests for the process runner against a real shell.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gatewayctl::Error;
use gatewayctl::process::{
    CancelToken, CommandRunner, FnSink, Invocation, ProcessRunner, RunOutcome, Stream,
};

fn sh(script: &str) -> Invocation {
    Invocation::new("sh", std::env::temp_dir()).args(["-c", script])
}

/// Run `script`, recording every line with its stream in arrival order.
fn run_recording(script: &str, cancel: &CancelToken) -> (RunOutcome, Vec<(Stream, String)>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let (out, err) = (Arc::clone(&lines), Arc::clone(&lines));
    let mut sink = FnSink::new(
        move |l: &str| out.lock().unwrap().push((Stream::Stdout, l.to_string())),
        move |l: &str| err.lock().unwrap().push((Stream::Stderr, l.to_string())),
    );
    let outcome = ProcessRunner.run(&sh(script), &mut sink, cancel).unwrap();
    drop(sink);
    let lines = Arc::try_unwrap(lines).unwrap().into_inner().unwrap();
    (outcome, lines)
}

#[test]
fn stdout_lines_arrive_in_order() {
    let (outcome, lines) = run_recording("for i in 1 2 3 4 5; do echo line$i; done", &CancelToken::new());
    assert_eq!(outcome, RunOutcome::Exited(0));
    let texts: Vec<&str> = lines.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(texts, ["line1", "line2", "line3", "line4", "line5"]);
}

#[test]
fn streams_are_kept_apart() {
    let (_, lines) = run_recording("echo out; echo err >&2", &CancelToken::new());
    assert!(lines.contains(&(Stream::Stdout, "out".to_string())));
    assert!(lines.contains(&(Stream::Stderr, "err".to_string())));
    assert_eq!(lines.len(), 2);
}

#[test]
fn exit_code_is_reported() {
    let (outcome, _) = run_recording("exit 7", &CancelToken::new());
    assert_eq!(outcome, RunOutcome::Exited(7));
}

#[test]
fn trailing_partial_line_is_delivered() {
    let (_, lines) = run_recording("printf 'no newline'", &CancelToken::new());
    assert_eq!(lines, vec![(Stream::Stdout, "no newline".to_string())]);
}

#[test]
fn missing_program_is_a_launch_error() {
    let inv = Invocation::new("gatewayctl-definitely-not-installed", ".");
    let err = ProcessRunner
        .run(&inv, &mut gatewayctl::process::NullSink, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::Launch { .. }));
}

#[test]
fn cancel_kills_the_whole_tree() {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let started = Instant::now();
    // The background sleep holds the pipes open; only a group kill ends it.
    let (outcome, _) = run_recording("sleep 30 & sleep 30", &cancel);
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn lingering_descendant_does_not_block_exit() {
    let started = Instant::now();
    // The subshell's sleep inherits stdout and outlives `sh`.
    let (outcome, lines) = run_recording("echo before; (sleep 5 &); true", &CancelToken::new());
    assert_eq!(outcome, RunOutcome::Exited(0));
    assert_eq!(lines, vec![(Stream::Stdout, "before".to_string())]);
    assert!(started.elapsed() < Duration::from_secs(4));
}
