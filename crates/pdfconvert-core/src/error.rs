use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("{0}")]
    ValidationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Operation failed: {0}")]
    OperationError(String),
}

impl ConvertError {
    /// Wrap a load/parse failure with the path it came from
    pub(crate) fn parse(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        ConvertError::ParseError(format!("{}: {}", path.display(), err))
    }
}

impl From<tempfile::PersistError> for ConvertError {
    fn from(err: tempfile::PersistError) -> Self {
        ConvertError::IoError(err.error)
    }
}
