//! Virtual filesystem core.
//!
//! Every session sees a virtual root whose top-level directories are the
//! configured shares:
//!
//! ```text
//! /                  # virtual root (synthetic)
//! ├── .status        # status report over all visible shares (synthetic)
//! ├── docs/          # share → /srv/docs
//! │   ├── .status    # per-share status report (synthetic)
//! │   └── ...        # physical entries
//! └── drop/          # share → /var/spool/drop
//! ```
//!
//! Modules, leaf-first:
//!
//! - [`resolve`]: virtual path normalization and sandbox-checked
//!   virtual → physical mapping
//! - [`perm`]: per-(share, user) access resolution with a lazy cache
//! - [`quota`]: aggregate share sizes with a TTL cache
//! - [`limit`]: per-transfer byte-cap writer decorator
//! - [`status`]: synthetic `.status` bodies and human-size formatting
//! - [`stream`]: read/write byte streams handed to the engine
//! - [`session`]: the per-session [`session::VirtualFs`] facade

pub mod limit;
pub mod perm;
pub mod quota;
pub mod resolve;
pub mod session;
pub mod status;
pub mod stream;

pub use resolve::{Resolved, ShareEntry, VirtualPath};
pub use session::{VirtualFs, WriteOptions};
