//! Permission resolution with a lazy, generation-keyed cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sharefs_types::Permission;

use crate::config::{Share, ShareSet};

/// Username under which unauthenticated sessions operate.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Resolves and caches a user's access level against a share.
///
/// One resolver is shared by all sessions. Entries are keyed by
/// `(share, username)` under the configuration generation they were
/// computed for; seeing a different generation drops the whole map, so a
/// reload invalidates everything without bookkeeping. Population is
/// last-writer-wins, which is harmless because the answer is a pure
/// function of the share and the username.
#[derive(Debug, Default)]
pub struct PermissionResolver {
    cache: RwLock<Cache>,
}

#[derive(Debug, Default)]
struct Cache {
    generation: u64,
    entries: HashMap<(String, String), Permission>,
}

impl PermissionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access level of `username` against `share`.
    ///
    /// Anonymous sessions get the share's anonymous permission only on
    /// public shares. Named users get their explicit grant when one is
    /// configured, the public fallback otherwise, and `None` on private
    /// shares.
    pub fn resolve(&self, shares: &ShareSet, share: &Share, username: &str) -> Permission {
        let generation = shares.generation();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if cache.generation == generation {
                if let Some(permission) = cache
                    .entries
                    .get(&(share.name().to_string(), username.to_string()))
                {
                    return *permission;
                }
            }
        }

        let computed = compute(share, username);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.generation != generation {
            // A session on another generation repopulates for its own tag;
            // entries never outlive the tag they were computed under.
            cache.generation = generation;
            cache.entries.clear();
        }
        cache
            .entries
            .insert((share.name().to_string(), username.to_string()), computed);
        computed
    }
}

fn compute(share: &Share, username: &str) -> Permission {
    if username == ANONYMOUS_USER {
        return if share.is_public() {
            share.anonymous_permission()
        } else {
            Permission::None
        };
    }
    if let Some(explicit) = share.user_permission(username) {
        return explicit;
    }
    if share.is_public() {
        share.anonymous_permission()
    } else {
        Permission::None
    }
}
