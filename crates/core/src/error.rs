use crate::models::EntityKind;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MmsError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create storage directory {path}: {source}", path = path.display())]
    StorageDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to move {path} into place: {source}", path = path.display())]
    FileRename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record in {file} at line {line}: {reason}")]
    MalformedRecord {
        file: &'static str,
        line: usize,
        reason: String,
    },
    #[error(
        "commit failed and rollback also failed (path: {path}): commit={commit_error}; rollback={rollback_error}",
        path = path.display()
    )]
    RollbackFailed {
        path: PathBuf,
        #[source]
        commit_error: Box<MmsError>,
        rollback_error: std::io::Error,
    },
}

impl MmsError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for failures raised by the durable store rather than by validation.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageDirCreation { .. }
                | Self::FileRead { .. }
                | Self::FileWrite { .. }
                | Self::FileRename { .. }
                | Self::MalformedRecord { .. }
                | Self::RollbackFailed { .. }
        )
    }
}

impl From<mms_types::TextError> for MmsError {
    fn from(err: mms_types::TextError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type MmsResult<T> = std::result::Result<T, MmsError>;
