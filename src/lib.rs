//! Lifecycle control for a single docker compose service.
//!
//! The library drives an external container engine through its CLI: it
//! probes engine/image/container status, sequences lifecycle operations
//! (start, stop, build, wipe, rebuild, remove, exec) and follows the
//! service's logs, streaming every line to caller-supplied sinks.

pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod process;

pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
