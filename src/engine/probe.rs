use std::sync::Arc;

use tracing::{debug, warn};

use super::commands;
use super::status::{AggregateStatus, ContainerStatus, DesktopStatus, ImageStatus};
use crate::config::Config;
use crate::error::Result;
use crate::process::{CancelToken, Captured, CommandRunner, Invocation, RunOutcome};

/// Side-effect-free status queries against the engine.
///
/// Every probe is a short captured invocation; nothing is streamed.
#[derive(Clone)]
pub struct StatusProber {
    runner: Arc<dyn CommandRunner>,
    config: Arc<Config>,
}

impl StatusProber {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<Config>) -> Self {
        Self { runner, config }
    }

    /// Is the engine's daemon reachable?
    pub fn probe_desktop(&self) -> DesktopStatus {
        match self.capture(&commands::info_command(&self.config)) {
            Ok((RunOutcome::Exited(0), _)) => return DesktopStatus::Open,
            Ok(_) => {}
            // No engine binary at all.
            Err(e) if e.is_launch() => {
                debug!(error = %e, "engine binary unavailable");
                return DesktopStatus::NotInstalled;
            }
            Err(e) => {
                warn!(error = %e, "engine info query failed");
                return DesktopStatus::Unknown;
            }
        }

        let Some(query) = commands::desktop_query_command(&self.config) else {
            return DesktopStatus::Unknown;
        };
        match self.capture(&query) {
            Ok((_, captured)) => desktop_from_service_state(&captured.stdout),
            Err(e) => {
                debug!(error = %e, "service state query could not run");
                DesktopStatus::NotInstalled
            }
        }
    }

    /// Does the image exist locally?
    pub fn probe_image(&self) -> ImageStatus {
        self.try_image().unwrap_or_else(|e| {
            warn!(error = %e, "image probe failed");
            ImageStatus::Unknown
        })
    }

    /// Run-state of the monitored container.
    pub fn probe_container(&self) -> ContainerStatus {
        self.try_container().unwrap_or_else(|e| {
            warn!(error = %e, "container probe failed");
            ContainerStatus::Unknown
        })
    }

    /// Probe all three in order, skipping image and container when the
    /// engine is not open. Never fails.
    pub fn probe_all(&self) -> AggregateStatus {
        let desktop = self.probe_desktop();
        if desktop != DesktopStatus::Open {
            return AggregateStatus::offline(desktop);
        }
        match self.try_image().and_then(|image| Ok((image, self.try_container()?))) {
            Ok((image, container)) => AggregateStatus {
                desktop,
                image,
                container,
            },
            Err(e) => {
                warn!(error = %e, "status probe degraded");
                AggregateStatus::degraded()
            }
        }
    }

    fn try_image(&self) -> Result<ImageStatus> {
        let (outcome, _) = self.capture(&commands::image_inspect_command(&self.config))?;
        Ok(if outcome.success() {
            ImageStatus::Available
        } else {
            ImageStatus::None
        })
    }

    fn try_container(&self) -> Result<ContainerStatus> {
        let (outcome, captured) =
            self.capture(&commands::container_state_command(&self.config))?;
        Ok(match outcome {
            RunOutcome::Exited(0) => ContainerStatus::from_state(&captured.stdout),
            RunOutcome::Exited(_) => ContainerStatus::NotFound,
            RunOutcome::Cancelled => ContainerStatus::Unknown,
        })
    }

    fn capture(&self, invocation: &Invocation) -> Result<(RunOutcome, Captured)> {
        self.runner.run_capture(invocation, &CancelToken::new())
    }
}

/// Classify the engine service's state text. Anything that is neither
/// running nor stopped counts as closed.
pub fn desktop_from_service_state(text: &str) -> DesktopStatus {
    let upper = text.to_ascii_uppercase();
    if upper.contains("RUNNING") {
        DesktopStatus::Open
    } else {
        // STOPPED, or a state we do not recognise.
        DesktopStatus::Closed
    }
}
