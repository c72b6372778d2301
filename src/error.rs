use std::path::PathBuf;

use thiserror::Error;

/// Errors reported synchronously by the scanner or at the handle boundary.
///
/// Per-entry I/O failures never surface here; they only shrink the result set.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("scan root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("scan worker did not terminate cleanly: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("event stream closed before the scan reported an outcome")]
    Disconnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
