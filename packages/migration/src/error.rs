use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("database is dirty at version {version}; fix the database and force the version")]
    Dirty { version: i64 },

    #[error("no migration found for version {version}")]
    NotFound { version: i64 },

    #[error("migration {version} has no down script")]
    MissingDownScript { version: i64 },

    #[error("invalid migration source: {message}")]
    InvalidSource { message: String },

    #[error("invalid version {version}")]
    InvalidVersion { version: i64 },

    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrateError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
