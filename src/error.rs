use std::{io, path::PathBuf};

/// Errors surfaced while building or installing a logger
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open log file {}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}
