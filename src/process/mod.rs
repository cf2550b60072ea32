// Process runner: launching, line streaming, cancellation of whole trees.

mod run;
pub mod tree;
mod types;

pub use run::{CommandRunner, ProcessRunner};
pub use types::{
    CancelHook, CancelToken, Captured, ChannelSink, FnSink, Invocation, NullSink, OutputSink,
    RunOutcome, Stream,
};
