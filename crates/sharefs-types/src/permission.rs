//! Access levels for a user against a share.

use serde::{Deserialize, Serialize};

/// Permission level for a share.
///
/// `ReadWrite` implies `Read`. The wire names (`"r"`, `"rw"`, `"none"`)
/// match the configuration documents the engine hands over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Permission {
    /// No access; the share is invisible to the session.
    #[default]
    #[serde(rename = "none")]
    None,
    /// List, stat, and download only.
    #[serde(rename = "r")]
    Read,
    /// Read plus upload, rename, delete, and directory creation.
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Permission {
    /// Whether the session can see the share at all.
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether the session can mutate the share.
    pub fn can_write(self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    /// The wire/status spelling of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "r",
            Self::ReadWrite => "rw",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
