//! The per-session virtual filesystem facade.
//!
//! The protocol engine creates one [`VirtualFs`] at login and drops it
//! when the session ends. The facade owns the session's working directory
//! exclusively; the share collection and the permission/size caches behind
//! it are shared read-mostly across all sessions. Every operation resolves
//! its path fresh, checks permissions through the shared resolver, and
//! surfaces exactly one failure from the taxonomy.

use std::io::SeekFrom;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use sharefs_types::{FileInfo, FileKind, Limits, Permission, STATUS_NAME, VfsError};
use tokio::io::AsyncSeekExt;

use crate::config::{Share, ShareSet};
use crate::messages::MessageCatalog;

use super::perm::{ANONYMOUS_USER, PermissionResolver};
use super::quota::QuotaTracker;
use super::resolve::{self, Resolved, VirtualPath};
use super::status;
use super::stream::{FileReader, UploadSink};

/// Options for [`VirtualFs::open_for_write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Append to the destination instead of truncating it.
    pub append: bool,
    /// Resume offset: seek here before writing.
    pub start: Option<u64>,
}

/// One session's view of the virtual root.
pub struct VirtualFs {
    username: String,
    locale: String,
    cwd: String,
    shares: Arc<ShareSet>,
    perms: Arc<PermissionResolver>,
    quota: Arc<QuotaTracker>,
    messages: Arc<MessageCatalog>,
    max_upload_bytes: Option<u64>,
}

impl VirtualFs {
    /// Facade for an authenticated session. The locale starts at the
    /// catalog's fallback; the `LANG` command may move it later.
    pub fn new(
        username: impl Into<String>,
        shares: Arc<ShareSet>,
        perms: Arc<PermissionResolver>,
        quota: Arc<QuotaTracker>,
        messages: Arc<MessageCatalog>,
        limits: Limits,
    ) -> Self {
        Self {
            username: username.into(),
            locale: messages.fallback().to_string(),
            cwd: "/".to_string(),
            shares,
            perms,
            quota,
            messages,
            max_upload_bytes: limits.max_upload_bytes.filter(|limit| *limit > 0),
        }
    }

    /// Facade for an unauthenticated session.
    pub fn anonymous(
        shares: Arc<ShareSet>,
        perms: Arc<PermissionResolver>,
        quota: Arc<QuotaTracker>,
        messages: Arc<MessageCatalog>,
        limits: Limits,
    ) -> Self {
        Self::new(ANONYMOUS_USER, shares, perms, quota, messages, limits)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    /// The failure's single localized message at the session locale.
    pub fn localize(&self, err: &VfsError) -> String {
        self.messages.message(&self.locale, err.message_key()).to_string()
    }

    /// The tracked virtual working directory.
    pub fn current_directory(&self) -> &str {
        &self.cwd
    }

    /// Change the working directory. Share roots need no stat (they are
    /// created lazily); deeper paths must exist and be directories.
    pub async fn change_directory(&mut self, path: &str) -> Result<&str, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root => self.cwd = "/".to_string(),
            Resolved::Entry(entry) => {
                if entry.is_share_root() {
                    self.cwd = format!("/{}", entry.share.name());
                } else {
                    let meta = tokio::fs::metadata(&entry.physical)
                        .await
                        .map_err(|_| VfsError::NotFound(virt.clone()))?;
                    if !meta.is_dir() {
                        return Err(VfsError::NotFound(virt));
                    }
                    self.cwd = virt;
                }
            }
            Resolved::RootStatus | Resolved::ShareStatus(_) => {
                return Err(VfsError::NotFound(virt));
            }
        }
        Ok(&self.cwd)
    }

    /// List a directory.
    ///
    /// The virtual root lists `.status` plus one directory per share the
    /// session can see, creating missing share roots on the way. A share
    /// listing prepends the per-share `.status` at the share root and
    /// skips entries whose inspection fails.
    pub async fn list(&self, path: &str) -> Result<Vec<FileInfo>, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root => {
                let body = status::root_status_text(
                    &self.shares,
                    &self.perms,
                    &self.quota,
                    &self.username,
                )
                .await;
                let mut out = vec![status::status_entry(&body)];
                for share in self.shares.iter() {
                    if !self.permission(share).can_read() {
                        continue;
                    }
                    ensure_share_root(share).await;
                    out.push(synthetic_dir(share.name()));
                }
                Ok(out)
            }
            Resolved::Entry(entry) => {
                self.require_read(&entry.share)?;
                ensure_share_root(&entry.share).await;
                let mut dir = tokio::fs::read_dir(&entry.physical)
                    .await
                    .map_err(|_| VfsError::NotFound(virt))?;

                let mut out = Vec::new();
                if entry.is_share_root() {
                    let body = self.share_status_body(&entry.share).await;
                    out.push(status::status_entry(&body));
                }
                while let Ok(Some(dirent)) = dir.next_entry().await {
                    let name = dirent.file_name().to_string_lossy().into_owned();
                    if entry.is_share_root() && name == STATUS_NAME {
                        // shadowed by the synthetic entry
                        continue;
                    }
                    let Ok(meta) = dirent.metadata().await else {
                        continue;
                    };
                    out.push(file_info(name, &meta));
                }
                Ok(out)
            }
            Resolved::RootStatus | Resolved::ShareStatus(_) => Err(VfsError::NotFound(virt)),
        }
    }

    /// Stat a path. Status paths are exempt from the permission check;
    /// their records always materialize.
    pub async fn stat(&self, path: &str) -> Result<FileInfo, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root => Ok(synthetic_dir("/")),
            Resolved::RootStatus => {
                let body = status::root_status_text(
                    &self.shares,
                    &self.perms,
                    &self.quota,
                    &self.username,
                )
                .await;
                Ok(status::status_entry(&body))
            }
            Resolved::ShareStatus(share) => {
                let body = self.share_status_body(&share).await;
                Ok(status::status_entry(&body))
            }
            Resolved::Entry(entry) => {
                self.require_read(&entry.share)?;
                let meta = tokio::fs::metadata(&entry.physical)
                    .await
                    .map_err(|_| VfsError::NotFound(virt))?;
                let name = match entry.rel.rsplit('/').next() {
                    Some(last) if !last.is_empty() => last.to_string(),
                    _ => entry.share.name().to_string(),
                };
                Ok(file_info(name, &meta))
            }
        }
    }

    /// Open a download stream, optionally resuming from `start`.
    pub async fn open_for_read(
        &self,
        path: &str,
        start: Option<u64>,
    ) -> Result<FileReader, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root => Err(VfsError::InvalidPath(virt)),
            Resolved::RootStatus => {
                let body = status::root_status_text(
                    &self.shares,
                    &self.perms,
                    &self.quota,
                    &self.username,
                )
                .await;
                Ok(FileReader::synthetic(body, start))
            }
            Resolved::ShareStatus(share) => {
                let body = self.share_status_body(&share).await;
                Ok(FileReader::synthetic(body, start))
            }
            Resolved::Entry(entry) => {
                self.require_read(&entry.share)?;
                if entry.is_share_root() {
                    return Err(VfsError::InvalidPath(virt));
                }
                FileReader::physical(&entry.physical, start)
                    .await
                    .map_err(|_| VfsError::NotFound(virt))
            }
        }
    }

    /// Open an upload sink.
    ///
    /// Requires write capability; the share quota is checked once, here,
    /// against the cached size. Missing parent directories are created.
    /// The sink is wrapped by the per-transfer byte cap when the session
    /// carries one, and invalidates the share's size cache on release.
    pub async fn open_for_write(
        &self,
        path: &str,
        options: WriteOptions,
    ) -> Result<UploadSink, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root | Resolved::RootStatus => Err(VfsError::InvalidPath(virt)),
            Resolved::ShareStatus(share) => Err(VfsError::ReadOnly {
                share: share.name().to_string(),
            }),
            Resolved::Entry(entry) => {
                if entry.is_share_root() {
                    return Err(VfsError::InvalidPath(virt));
                }
                self.require_write(&entry.share)?;

                if let Some(max_size_bytes) = entry.share.max_size_bytes() {
                    let used = self.quota.cached_size(&self.shares, &entry.share).await;
                    if used >= max_size_bytes {
                        return Err(VfsError::QuotaExceeded {
                            share: entry.share.name().to_string(),
                            max_size_bytes,
                        });
                    }
                }

                if let Some(parent) = entry.physical.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|_| VfsError::NotFound(virt.clone()))?;
                }

                let mut open = tokio::fs::OpenOptions::new();
                open.write(true).create(true);
                if options.append {
                    open.append(true);
                } else if options.start.is_none() {
                    open.truncate(true);
                }
                let mut file = open
                    .open(&entry.physical)
                    .await
                    .map_err(|_| VfsError::NotFound(virt.clone()))?;
                if let Some(start) = options.start {
                    if !options.append {
                        file.seek(SeekFrom::Start(start))
                            .await
                            .map_err(|_| VfsError::NotFound(virt))?;
                    }
                }

                let quota_hook = entry
                    .share
                    .max_size_bytes()
                    .map(|_| (Arc::clone(&self.quota), Arc::clone(&entry.share)));
                Ok(UploadSink::new(file, self.max_upload_bytes, quota_hook))
            }
        }
    }

    /// Delete a file, or a directory recursively.
    pub async fn remove(&self, path: &str) -> Result<(), VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root | Resolved::RootStatus => Err(VfsError::InvalidPath(virt)),
            Resolved::ShareStatus(_) => Err(VfsError::DeleteFailed(virt)),
            Resolved::Entry(entry) => {
                self.require_write(&entry.share)?;
                let meta = tokio::fs::metadata(&entry.physical)
                    .await
                    .map_err(|_| VfsError::DeleteFailed(virt.clone()))?;
                let removal = if meta.is_dir() {
                    tokio::fs::remove_dir_all(&entry.physical).await
                } else {
                    tokio::fs::remove_file(&entry.physical).await
                };
                removal.map_err(|_| VfsError::DeleteFailed(virt))
            }
        }
    }

    /// Create a directory, with missing intermediates. Creating the
    /// virtual root itself is refused; a top-level name can only come
    /// from configuration.
    pub async fn make_directory(&self, path: &str) -> Result<String, VfsError> {
        let (virt, resolved) = self.resolve(path)?;
        match resolved {
            Resolved::Root | Resolved::RootStatus => Err(VfsError::RootDirectoryCreate),
            Resolved::ShareStatus(_) => Err(VfsError::InvalidPath(virt)),
            Resolved::Entry(entry) => {
                self.require_write(&entry.share)?;
                tokio::fs::create_dir_all(&entry.physical)
                    .await
                    .map_err(|_| VfsError::NotFound(virt))?;
                let created = match entry.rel.rsplit('/').next() {
                    Some(last) if !last.is_empty() => last.to_string(),
                    _ => entry.share.name().to_string(),
                };
                Ok(created)
            }
        }
    }

    /// Move an entry within one share. The destination's parent
    /// directories are created first.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), VfsError> {
        let (from_virt, from_resolved) = self.resolve(from)?;
        let (to_virt, to_resolved) = self.resolve(to)?;
        let src = match from_resolved {
            Resolved::Entry(entry) if !entry.is_share_root() => entry,
            _ => return Err(VfsError::InvalidPath(from_virt)),
        };
        let dst = match to_resolved {
            Resolved::Entry(entry) if !entry.is_share_root() => entry,
            _ => return Err(VfsError::InvalidPath(to_virt)),
        };
        if !Arc::ptr_eq(&src.share, &dst.share) {
            return Err(VfsError::CrossShareRename);
        }
        self.require_write(&src.share)?;

        if let Some(parent) = dst.physical.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| VfsError::NotFound(to_virt.clone()))?;
        }
        tokio::fs::rename(&src.physical, &dst.physical)
            .await
            .map_err(|_| VfsError::NotFound(from_virt))
    }

    /// Mode changes never apply to the virtual tree.
    pub fn change_mode(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::Unsupported)
    }

    /// Derive a collision-free upload name: a strictly monotonic
    /// millisecond timestamp slotted in front of the extension.
    pub fn unique_name(&self, name: &str) -> String {
        let stamp = next_stamp();
        let base_start = name.rfind('/').map_or(0, |slash| slash + 1);
        match name.rfind('.').filter(|&dot| dot > base_start) {
            Some(dot) => format!("{}_{}{}", &name[..dot], stamp, &name[dot..]),
            None => format!("{name}_{stamp}"),
        }
    }

    // Helpers ---------------------------------------------------------------

    fn resolve(&self, input: &str) -> Result<(String, Resolved), VfsError> {
        let virt = VirtualPath::resolve(input, &self.cwd).to_string();
        let resolved = resolve::resolve(&self.shares, input, &self.cwd)?;
        Ok((virt, resolved))
    }

    fn permission(&self, share: &Share) -> Permission {
        self.perms.resolve(&self.shares, share, &self.username)
    }

    fn require_read(&self, share: &Share) -> Result<Permission, VfsError> {
        let permission = self.permission(share);
        if !permission.can_read() {
            return Err(VfsError::AccessDenied {
                share: share.name().to_string(),
            });
        }
        Ok(permission)
    }

    fn require_write(&self, share: &Share) -> Result<(), VfsError> {
        let permission = self.require_read(share)?;
        if !permission.can_write() {
            return Err(VfsError::ReadOnly {
                share: share.name().to_string(),
            });
        }
        Ok(())
    }

    async fn share_status_body(&self, share: &Share) -> String {
        status::share_status_text(&self.shares, &self.perms, &self.quota, share, &self.username)
            .await
    }
}

impl std::fmt::Debug for VirtualFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFs")
            .field("username", &self.username)
            .field("locale", &self.locale)
            .field("cwd", &self.cwd)
            .field("generation", &self.shares.generation())
            .finish()
    }
}

/// Create a share's physical root if it is missing; never fails the
/// containing operation.
async fn ensure_share_root(share: &Share) {
    if let Err(err) = tokio::fs::create_dir_all(share.root()).await {
        tracing::warn!(share = share.name(), error = %err, "share root creation failed");
    }
}

fn synthetic_dir(name: &str) -> FileInfo {
    let mut info = FileInfo::directory(name);
    info.modified = Some(SystemTime::now());
    info
}

fn file_info(name: String, meta: &std::fs::Metadata) -> FileInfo {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        FileKind::Symlink
    } else if meta.is_dir() {
        FileKind::Directory
    } else {
        FileKind::File
    };
    FileInfo {
        name,
        kind,
        size: meta.len(),
        mode: mode_bits(meta, kind),
        modified: meta.modified().ok(),
    }
}

#[cfg(unix)]
fn mode_bits(meta: &std::fs::Metadata, _kind: FileKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(_meta: &std::fs::Metadata, kind: FileKind) -> u32 {
    match kind {
        FileKind::Directory => 0o755,
        _ => 0o644,
    }
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp, bumped past the previous value so concurrent
/// callers never collide.
fn next_stamp() -> u64 {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut stamp = now;
    let _ = LAST_STAMP.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        stamp = now.max(last + 1);
        Some(stamp)
    });
    stamp
}
