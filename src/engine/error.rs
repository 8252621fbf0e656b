//! The archive-level error returned from [`crate::validate`].

use std::io;
use std::path::PathBuf;

/// Returned when nothing in the archive can be validated at all.
///
/// Every other defect — however severe — is represented as a [`crate::Finding`]
/// inside the returned [`crate::Report`] instead of an `Err`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// `path` could not be opened or read from disk.
    #[error("could not read {path}: {source}")]
    Io {
        /// The path that was requested.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
