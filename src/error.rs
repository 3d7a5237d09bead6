// ABOUTME: Fatal error categories for dump and restore runs
// ABOUTME: Wrapped in anyhow at call sites; downcast when a caller needs to classify

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole dump or restore run
///
/// Individual statement failures during replay are not errors in this sense;
/// they are tallied in the restore report instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Backup file not found: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("Failed to read backup file {}: {source}", path.display())]
    BackupUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog query failed while listing {what}: {source}")]
    Catalog {
        what: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Failed to write backup artifacts for '{name}': {source}")]
    Artifact {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn catalog(what: &'static str) -> impl FnOnce(tokio_postgres::Error) -> Self {
        move |source| EngineError::Catalog { what, source }
    }
}
