use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of the monitored service plus how to reach the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine CLI executable.
    pub engine: String,
    /// Directory holding the compose file. Relative paths are resolved
    /// against the config file's directory by the loader.
    pub work_dir: PathBuf,
    pub compose_file: String,
    pub service: String,
    pub container: String,
    pub image: String,
    /// Networks removed (best effort) while wiping.
    pub networks: Vec<String>,
    /// Shell used by `exec` inside the container.
    pub exec_shell: String,
    /// Command printing the engine's background service state. `None` picks
    /// the platform default; an empty list disables the check.
    pub desktop_query: Option<Vec<String>>,
    /// Seconds between status refreshes in the dashboard.
    pub status_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            work_dir: PathBuf::from("."),
            compose_file: "gateway-compose.yml".to_string(),
            service: "gateway".to_string(),
            container: "gateway-container".to_string(),
            image: "deploy-gateway:latest".to_string(),
            networks: vec!["gateway_default".to_string(), "gateway-net".to_string()],
            exec_shell: "sh".to_string(),
            desktop_query: None,
            status_interval: 5,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("engine", &self.engine),
            ("compose_file", &self.compose_file),
            ("service", &self.service),
            ("container", &self.container),
            ("image", &self.image),
            ("exec_shell", &self.exec_shell),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("`{field}` must not be empty")));
            }
        }
        if self.status_interval == 0 {
            return Err(Error::Config("`status_interval` must be positive".into()));
        }
        Ok(())
    }

    /// The service-state query to run, after applying the platform default.
    pub fn resolved_desktop_query(&self) -> Option<Vec<String>> {
        match &self.desktop_query {
            Some(cmd) if cmd.is_empty() => None,
            Some(cmd) => Some(cmd.clone()),
            None => default_desktop_query(),
        }
    }
}

/// Platform command that reports the engine service's state, if any.
pub fn default_desktop_query() -> Option<Vec<String>> {
    let words: &[&str] = if cfg!(windows) {
        &["sc", "query", "com.docker.service"]
    } else if cfg!(target_os = "linux") {
        &["systemctl", "status", "docker"]
    } else {
        return None;
    };
    Some(words.iter().map(|w| w.to_string()).collect())
}
