use thiserror::Error;

use iocontrol_types::IoError;
use iocontrol_validator::ValidationIssue;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("configuration failed validation")]
    Invalid(Vec<ValidationIssue>),
}
