use thiserror::Error;

use iocontrol_validator::ValidationIssue;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config path set")]
    NoConfigPath,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("I/O point '{0}' already exists")]
    PointExists(String),

    #[error("I/O point '{0}' not found")]
    PointNotFound(String),

    #[error("config version {0} not found in history")]
    VersionNotFound(u64),

    #[error("configuration failed validation")]
    Invalid(Vec<ValidationIssue>),
}
