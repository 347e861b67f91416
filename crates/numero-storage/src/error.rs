//! Storage error types

use std::path::PathBuf;

/// Failures of the on-disk store
///
/// These never escape the [`KeyValueStore`](crate::KeyValueStore) surface;
/// they are logged and the operation degrades to "absent".
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a JSON object of strings
    #[error("corrupt store at {path}: {source}")]
    Corrupt {
        /// File involved
        path: PathBuf,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// File the error refers to
    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Corrupt { path, .. } => path,
        }
    }
}
