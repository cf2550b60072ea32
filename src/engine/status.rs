use std::fmt;

use serde::Serialize;

/// Whether the engine's background service is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesktopStatus {
    Open,
    Closed,
    NotInstalled,
    Unknown,
}

/// Whether the target image exists locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Available,
    None,
    Unknown,
}

/// Run-state of the monitored container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Running,
    Exited,
    NotFound,
    Unknown,
    /// The engine is unreachable, so the container was not asked about.
    Offline,
}

impl ContainerStatus {
    /// Map the engine's `.State.Status` text.
    pub fn from_state(state: &str) -> Self {
        match state.trim() {
            "running" => ContainerStatus::Running,
            "exited" | "created" | "dead" => ContainerStatus::Exited,
            _ => ContainerStatus::Unknown,
        }
    }
}

/// One probe cycle's view of engine, image and container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateStatus {
    pub desktop: DesktopStatus,
    pub image: ImageStatus,
    pub container: ContainerStatus,
}

impl AggregateStatus {
    /// Snapshot for an engine that is not open; nothing else was probed.
    pub fn offline(desktop: DesktopStatus) -> Self {
        Self {
            desktop,
            image: ImageStatus::None,
            container: ContainerStatus::Offline,
        }
    }

    /// Snapshot used when probing itself failed.
    pub fn degraded() -> Self {
        Self {
            desktop: DesktopStatus::Unknown,
            image: ImageStatus::Unknown,
            container: ContainerStatus::Offline,
        }
    }

    pub fn is_running(&self) -> bool {
        self.container == ContainerStatus::Running
    }
}

impl fmt::Display for DesktopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DesktopStatus::Open => "open",
            DesktopStatus::Closed => "closed",
            DesktopStatus::NotInstalled => "not installed",
            DesktopStatus::Unknown => "unknown",
        })
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageStatus::Available => "available",
            ImageStatus::None => "none",
            ImageStatus::Unknown => "unknown",
        })
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Exited => "exited",
            ContainerStatus::NotFound => "not found",
            ContainerStatus::Unknown => "unknown",
            ContainerStatus::Offline => "offline",
        })
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "engine {} · image {} · container {}",
            self.desktop, self.image, self.container
        )
    }
}
