mod facade;
mod types;

pub use facade::Orchestrator;
pub use types::{OpEvent, Operation, Outcome};
