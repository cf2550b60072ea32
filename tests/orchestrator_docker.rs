//! Integration tests against a real container engine.
//!
//! These require a running Docker daemon and are marked `#[ignore]`.
//! Run with: `cargo test -- --ignored`

use std::path::Path;
use std::sync::Arc;

use gatewayctl::Orchestrator;
use gatewayctl::config::Config;
use gatewayctl::engine::{ContainerStatus, DesktopStatus, ImageStatus};
use gatewayctl::orchestrator::{OpEvent, Operation, Outcome};
use gatewayctl::process::CancelToken;

const COMPOSE: &str = "\
services:
  gateway:
    image: busybox:latest
    container_name: gatewayctl-test-container
    command: [\"sh\", \"-c\", \"echo ready; sleep 3600\"]
";

fn orchestrator(dir: &Path) -> Arc<Orchestrator> {
    std::fs::write(dir.join("gateway-compose.yml"), COMPOSE).expect("failed to write compose file");
    let config = Config {
        work_dir: dir.to_path_buf(),
        container: "gatewayctl-test-container".into(),
        image: "busybox:latest".into(),
        networks: Vec::new(),
        ..Config::default()
    };
    Arc::new(Orchestrator::new(config))
}

fn finish(orch: &Arc<Orchestrator>, op: Operation) -> (Outcome, Vec<String>) {
    let mut lines = Vec::new();
    for event in orch.spawn(op, CancelToken::new()) {
        match event {
            OpEvent::Stdout(l) | OpEvent::Stderr(l) => lines.push(l),
            OpEvent::Finished(outcome) => return (outcome, lines),
        }
    }
    panic!("operation ended without a Finished event");
}

#[test]
#[ignore]
fn engine_is_open() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let orch = orchestrator(dir.path());
    assert_eq!(orch.probe_desktop(), DesktopStatus::Open);
}

#[test]
#[ignore]
fn start_exec_stop_remove() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let orch = orchestrator(dir.path());

    let (outcome, _) = finish(&orch, Operation::Start);
    assert_eq!(outcome, Outcome::Exited(0));
    assert_eq!(orch.probe_container(), ContainerStatus::Running);
    assert_eq!(orch.probe_image(), ImageStatus::Available);

    let (outcome, lines) = finish(&orch, Operation::Exec("echo \"hi there\"".into()));
    assert_eq!(outcome, Outcome::Exited(0));
    assert!(lines.iter().any(|l| l == "hi there"), "exec output: {lines:?}");

    let (outcome, _) = finish(&orch, Operation::Stop);
    assert_eq!(outcome, Outcome::Exited(0));
    assert_eq!(orch.probe_container(), ContainerStatus::Exited);

    let (outcome, _) = finish(&orch, Operation::Remove);
    assert_eq!(outcome, Outcome::Exited(0));
    assert_eq!(orch.probe_container(), ContainerStatus::NotFound);
}
