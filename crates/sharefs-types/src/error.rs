//! Failure taxonomy for vfs operations and share assembly.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced to the protocol engine.
///
/// Every variant is detected locally and surfaced once; none triggers a
/// retry. Payloads are plain data so operation results stay comparable in
/// tests. `message_key` ties each variant to the catalog entry used for
/// the localized reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// Traversal attempt, unknown share, or malformed segment.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No resolvable permission against the share.
    #[error("access denied to share {share}")]
    AccessDenied { share: String },

    /// Permission present but lacking write capability.
    #[error("share {share} is read-only for this session")]
    ReadOnly { share: String },

    /// Missing directory or file, or a stat failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Share aggregate cap already reached when the upload opened.
    #[error("share {share} quota of {max_size_bytes} bytes exhausted")]
    QuotaExceeded { share: String, max_size_bytes: u64 },

    /// Per-transfer byte cap crossed mid-stream.
    #[error("upload exceeds the {limit} byte transfer limit")]
    UploadLimitExceeded { limit: u64 },

    /// Rename endpoints live in different shares.
    #[error("rename endpoints are in different shares")]
    CrossShareRename,

    /// Directory creation attempted at the virtual root.
    #[error("cannot create a directory at the virtual root")]
    RootDirectoryCreate,

    /// I/O failure during removal.
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// Operation the virtual filesystem never supports (change-mode).
    #[error("operation not supported")]
    Unsupported,
}

impl VfsError {
    /// The message-catalog key for this failure.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "ERR_INVALID_PATH",
            Self::AccessDenied { .. } => "ERR_ACCESS_DENIED",
            Self::ReadOnly { .. } => "ERR_PERMISSION_DENIED_RO",
            Self::NotFound(_) => "ERR_NOT_FOUND",
            Self::QuotaExceeded { .. } => "ERR_SHARE_QUOTA_EXCEEDED",
            Self::UploadLimitExceeded { .. } => "ERR_UPLOAD_LIMIT_EXCEEDED",
            Self::CrossShareRename => "ERR_RENAME_CROSS_SHARE",
            Self::RootDirectoryCreate => "ERR_CREATE_DIR_ROOT",
            Self::DeleteFailed(_) => "ERR_DELETE_FAILED",
            Self::Unsupported => "ERR_CHMOD_UNSUPPORTED",
        }
    }
}

/// Failures while assembling a share collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("share name must not be empty")]
    EmptyShareName,

    #[error("share name {0:?} contains a path separator")]
    InvalidShareName(String),

    #[error("share name {0:?} is reserved")]
    ReservedShareName(String),

    #[error("duplicate share name {0:?}")]
    DuplicateShareName(String),

    #[error("share {name:?} root {path:?} could not be made absolute")]
    UnresolvableRoot { name: String, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_key() {
        let errors = [
            VfsError::InvalidPath("/x".into()),
            VfsError::AccessDenied { share: "s".into() },
            VfsError::ReadOnly { share: "s".into() },
            VfsError::NotFound("/s/f".into()),
            VfsError::QuotaExceeded { share: "s".into(), max_size_bytes: 1 },
            VfsError::UploadLimitExceeded { limit: 1 },
            VfsError::CrossShareRename,
            VfsError::RootDirectoryCreate,
            VfsError::DeleteFailed("/s/f".into()),
            VfsError::Unsupported,
        ];
        let mut keys: Vec<_> = errors.iter().map(|e| e.message_key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), errors.len());
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(
            VfsError::NotFound("/a".into()),
            VfsError::NotFound("/a".into())
        );
        assert_ne!(
            VfsError::NotFound("/a".into()),
            VfsError::NotFound("/b".into())
        );
    }
}
