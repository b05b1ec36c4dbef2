//! Pure data types for sharefs.
//!
//! This crate carries everything the protocol engine and the vfs core need
//! to agree on, with no I/O of its own:
//!
//! - **Permission**: the None / Read / ReadWrite access lattice
//! - **ShareConfig / Limits**: validated configuration as it arrives from
//!   the engine's config layer
//! - **FileInfo / FileKind**: the stat-like records returned by listings
//! - **VfsError / ConfigError**: the failure taxonomy and its message keys

pub mod entry;
pub mod error;
pub mod permission;
pub mod share;

pub use entry::{FileInfo, FileKind};
pub use error::{ConfigError, VfsError};
pub use permission::Permission;
pub use share::{Limits, ShareConfig, STATUS_NAME};
