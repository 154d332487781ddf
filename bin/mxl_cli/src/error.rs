use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Save(#[from] mxl_save::Error),
    #[error("item index {0} out of range")]
    ItemIndexOutOfRange(usize),
    #[error("malformed property list '{0}', expected comma-separated code=value pairs")]
    MalformedValues(String),
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),
    #[error("table directory not found: {}", .0.display())]
    MissingTableDir(PathBuf),
}

pub type Result<T> = std::result::Result<T, CliError>;
