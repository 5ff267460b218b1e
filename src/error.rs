// src/error.rs
//
// Failure taxonomy for a task attempt. Decode problems never show up here:
// the reader logs them and moves on to the next marker line.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required job configuration key is absent
    #[error("missing required job configuration key '{0}'")]
    MissingConfig(String),

    /// A configuration value could not be interpreted
    #[error("invalid value '{value}' for configuration key '{key}'")]
    InvalidConfig { key: String, value: String },

    /// Serialized input split could not be decoded
    #[error("malformed input split: {0}")]
    InvalidSplit(String),

    /// Split location names a filesystem this build cannot open
    #[error("unsupported filesystem location '{0}'")]
    UnsupportedFilesystem(String),

    /// External tool could not be started
    #[error("failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// External tool ran but exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Tool output is missing or cannot be parsed
    #[error("unusable alignment report {}: {reason}", path.display())]
    Report { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Configuration errors cannot be fixed by running the split again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::MissingConfig(_)
                | Error::InvalidConfig { .. }
                | Error::InvalidSplit(_)
                | Error::UnsupportedFilesystem(_)
        )
    }
}
