//! Error types shared by the services.

use std::path::PathBuf;

/// Error type returned by port implementations. SDK, HTTP and I/O errors are
/// boxed as-is so their source chain survives up to the binary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to load env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{what} not found: {path}")]
    MissingPath { what: &'static str, path: PathBuf },
    #[error("required tool `{0}` is not on PATH")]
    MissingTool(String),
    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("object store error: {0}")]
    Storage(#[source] BoxError),
    #[error("CDN invalidation failed: {0}")]
    Cdn(#[source] BoxError),
    #[error("download failed for {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("{0}")]
    Check(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Builds a `CommandFailed` from a finished process.
    pub fn command_failed(program: &str, output: &std::process::Output) -> Self {
        PipelineError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
