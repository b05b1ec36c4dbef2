//! Runtime share collection.
//!
//! [`ShareSet::build`] turns the engine's validated [`ShareConfig`] list
//! into an immutable collection of [`Share`]s. Each build takes the next
//! configuration generation; a reload builds a fresh set and simply drops
//! the old one. Caches keyed by generation (permissions, sizes) go stale-free
//! without explicit invalidation, and operations still holding `Arc<Share>`
//! handles from the old set finish against that consistent view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sharefs_types::{ConfigError, Permission, ShareConfig};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// One mounted share: a virtual top-level directory backed by a physical
/// root, with its own permission policy and optional quota.
///
/// Shares are immutable once assembled and handed out as `Arc<Share>`;
/// pointer identity is what "same share" means for rename checks.
#[derive(Debug)]
pub struct Share {
    name: String,
    root: PathBuf,
    public: bool,
    anonymous_permission: Permission,
    max_size_bytes: Option<u64>,
    users: HashMap<String, Permission>,
}

impl Share {
    /// Virtual directory name under the session root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute physical root backing the share. The directory may not
    /// exist yet; it is created lazily when first listed.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn anonymous_permission(&self) -> Permission {
        self.anonymous_permission
    }

    /// Optional cap on the share's aggregate size in bytes.
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_bytes
    }

    /// Explicit per-user grant, if one is configured.
    pub fn user_permission(&self, username: &str) -> Option<Permission> {
        self.users.get(username).copied()
    }
}

/// Immutable, generation-tagged collection of shares.
///
/// The engine builds one per configuration generation and shares it across
/// sessions behind an `Arc`; a reload swaps the `Arc` atomically from the
/// perspective of new sessions.
#[derive(Debug)]
pub struct ShareSet {
    generation: u64,
    order: Vec<Arc<Share>>,
    by_name: HashMap<String, Arc<Share>>,
}

impl ShareSet {
    /// Assemble a share collection, validating names and making roots
    /// absolute. Fails on the first invalid or duplicate share.
    pub fn build(configs: impl IntoIterator<Item = ShareConfig>) -> Result<Self, ConfigError> {
        let mut order = Vec::new();
        let mut by_name = HashMap::new();

        for config in configs {
            config.validate_name()?;
            let root = std::path::absolute(&config.path).map_err(|_| {
                ConfigError::UnresolvableRoot {
                    name: config.name.clone(),
                    path: config.path.clone(),
                }
            })?;
            let share = Arc::new(Share {
                name: config.name,
                root,
                public: config.public,
                anonymous_permission: config.anonymous_permission,
                max_size_bytes: config.max_size_bytes,
                users: config.users,
            });
            if by_name
                .insert(share.name.clone(), Arc::clone(&share))
                .is_some()
            {
                return Err(ConfigError::DuplicateShareName(share.name.clone()));
            }
            order.push(share);
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(generation, shares = order.len(), "share collection assembled");
        Ok(Self {
            generation,
            order,
            by_name,
        })
    }

    /// The configuration generation this collection belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up a share by its virtual name.
    pub fn get(&self, name: &str) -> Option<&Arc<Share>> {
        self.by_name.get(name)
    }

    /// Shares in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Share>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharefs_types::ConfigError;

    fn config(name: &str) -> ShareConfig {
        ShareConfig::new(name, format!("/srv/{name}"))
    }

    #[test]
    fn build_preserves_configuration_order() {
        let set = ShareSet::build([config("zeta"), config("alpha")]).unwrap();
        let names: Vec<_> = set.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert!(set.get("alpha").is_some());
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ShareSet::build([config("docs"), config("docs")]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateShareName("docs".into()));
    }

    #[test]
    fn invalid_names_rejected() {
        let err = ShareSet::build([config("a/b")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidShareName("a/b".into()));
    }

    #[test]
    fn generations_are_strictly_increasing() {
        let first = ShareSet::build([config("docs")]).unwrap();
        let second = ShareSet::build([config("docs")]).unwrap();
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn roots_are_made_absolute() {
        let set = ShareSet::build([ShareConfig::new("rel", "relative/dir")]).unwrap();
        assert!(set.get("rel").unwrap().root().is_absolute());
    }
}
