// Container engine driver: CLI argument builders, status probes,
// lifecycle sequencing and log following.

pub mod commands;
mod probe;
mod sequence;
mod status;
mod tail;

#[cfg(test)]
pub(crate) mod testing;

pub use probe::{StatusProber, desktop_from_service_state};
pub use sequence::Sequencer;
pub use status::{AggregateStatus, ContainerStatus, DesktopStatus, ImageStatus};
pub use tail::{LogTail, TailHandle, TailSink};
