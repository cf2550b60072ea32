use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The executable could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} exited with code {code}")]
    NonZeroExit { step: &'static str, code: i32 },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Cancellation is an outcome, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, Error::Launch { .. })
    }
}
