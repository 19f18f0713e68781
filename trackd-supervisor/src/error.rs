use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the supervisor runtime and its configuration.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Core(#[from] trackd_core::CoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn worker {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} pipe was not captured")]
    Pipe(&'static str),

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SupervisorError {
    SupervisorError::Io {
        path: path.into(),
        source,
    }
}
