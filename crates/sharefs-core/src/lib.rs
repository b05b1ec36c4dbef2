//! sharefs-core: mount independent directories as one virtual root.
//!
//! This crate is the filesystem half of a file-transfer server. The
//! protocol engine owns sockets, TLS, and command parsing; it hands every
//! session a [`VirtualFs`] and calls the operation set in
//! [`vfs::session`]. The crate provides:
//!
//! - **Share assembly**: [`ShareSet`] — an immutable, generation-tagged
//!   collection of [`Share`]s built from validated configuration
//! - **Path resolution**: virtual → physical mapping with sandbox
//!   verification against traversal and symlink escape
//! - **Permissions**: per-user / anonymous access resolution with a lazy
//!   cache that dies with the configuration generation
//! - **Quotas**: cached aggregate share sizes with a soft check at upload
//!   open
//! - **Upload limiting**: a composable byte-cap writer decorator
//! - **Status reporting**: the synthetic read-only `.status` entries
//! - **Localization**: a fixed message catalog plus the `LANG` session
//!   command, wired through a pre-dispatch [`commands::CommandTable`]

pub mod commands;
pub mod config;
pub mod messages;
pub mod vfs;

pub use commands::{CommandReply, CommandTable, LangCommand, SessionCommand};
pub use config::{Share, ShareSet};
pub use messages::MessageCatalog;
pub use vfs::limit::LimitedWriter;
pub use vfs::perm::{ANONYMOUS_USER, PermissionResolver};
pub use vfs::quota::QuotaTracker;
pub use vfs::session::{VirtualFs, WriteOptions};
pub use vfs::stream::{FileReader, UploadSink};

// Re-export the shared data types so engine code can depend on one crate.
pub use sharefs_types::{
    ConfigError, FileInfo, FileKind, Limits, Permission, ShareConfig, VfsError, STATUS_NAME,
};
