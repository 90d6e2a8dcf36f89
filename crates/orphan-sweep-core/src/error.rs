use crate::roles::DirectoryRole;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No database is configured")]
    DatabaseNotConfigured,

    #[error("Unknown scan scope '{0}', expected one of: all, download, emulation, image")]
    UnknownScope(String),

    #[error("No directory configured for the {0} role")]
    MissingRolePath(DirectoryRole),

    #[error("Backup to '{}' failed: {source}", archive.display())]
    Backup {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,
}
