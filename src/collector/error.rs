//! Errors raised while collecting a sample.

use std::io;
use std::path::PathBuf;

/// Why a collector could not produce its points for one tick.
///
/// Every variant is scoped to a single tick: the loop logs it and carries on.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The kernel source could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The source was readable but held nothing usable.
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CollectError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
