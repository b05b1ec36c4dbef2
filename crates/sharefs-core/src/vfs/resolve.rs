//! Virtual path resolution and sandbox verification.
//!
//! A virtual path is rooted at `/`; its first segment names a share, the
//! rest address a file inside that share's physical root. Resolution
//! refuses `..` segments outright and canonicalizes the physical result so
//! that symlinks cannot lead outside the share root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sharefs_types::{STATUS_NAME, VfsError};

use crate::config::{Share, ShareSet};

/// A normalized virtual path: absolute, posix-style, `.` and empty
/// segments collapsed. `..` segments are kept verbatim so classification
/// can reject them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    /// Normalize `input` against the session's working directory: empty
    /// input means the cwd itself, absolute input stands alone, relative
    /// input joins onto the cwd.
    pub fn resolve(input: &str, cwd: &str) -> Self {
        let joined = if input.is_empty() {
            cwd.to_string()
        } else if input.starts_with('/') {
            input.to_string()
        } else {
            format!("{}/{}", cwd.trim_end_matches('/'), input)
        };
        let segments = joined
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// What a virtual path points at.
#[derive(Debug)]
pub enum Resolved {
    /// The virtual root itself.
    Root,
    /// The synthetic `.status` entry at the virtual root.
    RootStatus,
    /// The synthetic `.status` entry at a share root.
    ShareStatus(Arc<Share>),
    /// A real location inside a share.
    Entry(ShareEntry),
}

/// A sandbox-verified location inside a share.
#[derive(Debug, Clone)]
pub struct ShareEntry {
    /// The share addressed by the path's first segment.
    pub share: Arc<Share>,
    /// Path relative to the share root; empty for the share root itself.
    pub rel: String,
    /// Canonicalized physical path, a descendant of the share's
    /// canonicalized root.
    pub physical: PathBuf,
}

impl ShareEntry {
    /// Whether the entry addresses the share's own mount point.
    pub fn is_share_root(&self) -> bool {
        self.rel.is_empty()
    }
}

/// Classify a virtual path against the share collection.
///
/// Any `..` segment fails `InvalidPath`, before the filesystem is even
/// consulted; so does an unknown share name or a physical path that
/// canonicalizes outside the share root.
pub fn resolve(shares: &ShareSet, input: &str, cwd: &str) -> Result<Resolved, VfsError> {
    let virt = VirtualPath::resolve(input, cwd);
    if virt.segments().iter().any(|s| s == "..") {
        return Err(VfsError::InvalidPath(virt.to_string()));
    }
    let Some((first, rest)) = virt.segments().split_first() else {
        return Ok(Resolved::Root);
    };
    if first == STATUS_NAME && rest.is_empty() {
        return Ok(Resolved::RootStatus);
    }
    let share = shares
        .get(first)
        .ok_or_else(|| VfsError::InvalidPath(virt.to_string()))?;
    if rest.len() == 1 && rest[0] == STATUS_NAME {
        return Ok(Resolved::ShareStatus(Arc::clone(share)));
    }

    let rel = rest.join("/");
    let root = canonicalize_lenient(share.root());
    let physical = if rel.is_empty() {
        root.clone()
    } else {
        canonicalize_lenient(&share.root().join(&rel))
    };
    if !physical.starts_with(&root) {
        return Err(VfsError::InvalidPath(virt.to_string()));
    }
    Ok(Resolved::Entry(ShareEntry {
        share: Arc::clone(share),
        rel,
        physical,
    }))
}

/// Canonicalize through the deepest existing ancestor and reattach the
/// non-existing remainder, so paths about to be created still resolve
/// symlinks in the directories that do exist.
pub(crate) fn canonicalize_lenient(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    loop {
        match current.canonicalize() {
            Ok(canonical) => {
                let mut out = canonical;
                for seg in tail.iter().rev() {
                    out.push(seg);
                }
                return out;
            }
            Err(_) => match (current.file_name(), current.parent()) {
                (Some(name), Some(parent)) => {
                    tail.push(name.to_os_string());
                    current = parent.to_path_buf();
                }
                _ => {
                    let mut out = current;
                    for seg in tail.iter().rev() {
                        out.push(seg);
                    }
                    return out;
                }
            },
        }
    }
}
