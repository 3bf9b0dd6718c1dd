use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("remote request failed: {0}")]
    RemoteUnavailable(String),

    #[error("log {0} does not exist or has expired")]
    RemoteNotFound(String),

    #[error("downloaded file is empty")]
    EmptyDownload,

    #[error("downloaded file is not a valid zip archive: {0}")]
    CorruptArchive(String),

    #[error("record store error: {0}")]
    Store(#[from] libsql::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by callers that translate errors into
/// protocol responses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    RemoteUnavailable,
    RemoteNotFound,
    CorruptArchive,
    Internal,
}

impl LogboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LogboxError::NotFound(_) => ErrorKind::NotFound,
            LogboxError::Forbidden(_) => ErrorKind::Forbidden,
            LogboxError::InvalidInput(_) => ErrorKind::InvalidInput,
            LogboxError::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            LogboxError::RemoteNotFound(_) => ErrorKind::RemoteNotFound,
            LogboxError::EmptyDownload | LogboxError::CorruptArchive(_) => {
                ErrorKind::CorruptArchive
            }
            LogboxError::Io(_) | LogboxError::Store(_) | LogboxError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<reqwest::Error> for LogboxError {
    fn from(e: reqwest::Error) -> Self {
        LogboxError::RemoteUnavailable(e.to_string())
    }
}

impl From<zip::result::ZipError> for LogboxError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => LogboxError::Io(io),
            other => LogboxError::CorruptArchive(other.to_string()),
        }
    }
}

impl From<walkdir::Error> for LogboxError {
    fn from(e: walkdir::Error) -> Self {
        LogboxError::Io(e.into())
    }
}

impl From<tokio::task::JoinError> for LogboxError {
    fn from(e: tokio::task::JoinError) -> Self {
        LogboxError::Internal(format!("background task failed: {e}"))
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, LogboxError>;
