//! Aggregate share sizes with a TTL cache.
//!
//! Quota enforcement is deliberately soft: the size is sampled at most
//! once per TTL window, checked only when an upload opens, and never
//! re-checked against the upload's own growth. Two uploads racing the same
//! window can both pass; the overshoot is accepted and corrected by the
//! next sample.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::config::{Share, ShareSet};

/// How long a sampled share size stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Computes and caches aggregate directory sizes per share.
///
/// Shared by all sessions; entries are tagged with the configuration
/// generation like the permission cache and dropped wholesale when it
/// moves on. Population is last-writer-wins.
#[derive(Debug)]
pub struct QuotaTracker {
    ttl: Duration,
    cache: RwLock<Cache>,
}

#[derive(Debug, Default)]
struct Cache {
    generation: u64,
    entries: HashMap<String, Sample>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    size: u64,
    stamp: Instant,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Tracker with a custom freshness window (tests use short ones).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// The share's aggregate size, resampled when the cached value is
    /// older than the TTL.
    pub async fn cached_size(&self, shares: &ShareSet, share: &Share) -> u64 {
        let generation = shares.generation();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if cache.generation == generation {
                if let Some(sample) = cache.entries.get(share.name()) {
                    if sample.stamp.elapsed() < self.ttl {
                        return sample.size;
                    }
                }
            }
        }

        let size = directory_size(share.root()).await;
        tracing::debug!(share = share.name(), size, "share size sampled");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.generation != generation {
            cache.generation = generation;
            cache.entries.clear();
        }
        cache.entries.insert(
            share.name().to_string(),
            Sample {
                size,
                stamp: Instant::now(),
            },
        );
        size
    }

    /// Drop the cached size after a write that may have changed it.
    pub fn invalidate(&self, share: &Share) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.entries.remove(share.name()).is_some() {
            tracing::debug!(share = share.name(), "share size cache invalidated");
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of regular-file sizes under `root`, walked iteratively.
///
/// Unreadable directories, vanished entries, symlinks, and special files
/// contribute zero; nothing aborts the aggregate.
pub async fn directory_size(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(meta) = entry.metadata().await {
                    total += meta.len();
                }
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharefs_types::ShareConfig;
    use tempfile::TempDir;

    fn one_share(dir: &TempDir) -> ShareSet {
        ShareSet::build([ShareConfig::new("data", dir.path())]).unwrap()
    }

    #[tokio::test]
    async fn sums_nested_regular_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 100]).unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        std::fs::write(dir.path().join("sub/b.bin"), vec![0u8; 25]).unwrap();
        std::fs::write(dir.path().join("sub/deep/c.bin"), vec![0u8; 5]).unwrap();

        assert_eq!(directory_size(dir.path()).await, 130);
    }

    #[tokio::test]
    async fn missing_root_counts_as_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(directory_size(&dir.path().join("nope")).await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_symlink_contributes_zero() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("real.bin"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        assert_eq!(directory_size(dir.path()).await, 10);
    }

    #[tokio::test]
    async fn fresh_sample_is_reused() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 10]).unwrap();
        let shares = one_share(&dir);
        let share = shares.get("data").unwrap();
        let tracker = QuotaTracker::new();

        assert_eq!(tracker.cached_size(&shares, share).await, 10);
        std::fs::write(dir.path().join("b.bin"), vec![0u8; 90]).unwrap();
        // still within the TTL window: stale on purpose
        assert_eq!(tracker.cached_size(&shares, share).await, 10);
    }

    #[tokio::test]
    async fn invalidation_forces_resample() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 10]).unwrap();
        let shares = one_share(&dir);
        let share = shares.get("data").unwrap();
        let tracker = QuotaTracker::new();

        assert_eq!(tracker.cached_size(&shares, share).await, 10);
        std::fs::write(dir.path().join("b.bin"), vec![0u8; 90]).unwrap();
        tracker.invalidate(share);
        assert_eq!(tracker.cached_size(&shares, share).await, 100);
    }

    #[tokio::test]
    async fn expired_sample_is_recomputed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 10]).unwrap();
        let shares = one_share(&dir);
        let share = shares.get("data").unwrap();
        let tracker = QuotaTracker::with_ttl(Duration::from_millis(10));

        assert_eq!(tracker.cached_size(&shares, share).await, 10);
        std::fs::write(dir.path().join("b.bin"), vec![0u8; 90]).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.cached_size(&shares, share).await, 100);
    }

    #[tokio::test]
    async fn reload_drops_samples() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 10]).unwrap();
        let tracker = QuotaTracker::new();

        let shares = one_share(&dir);
        let share = shares.get("data").unwrap();
        assert_eq!(tracker.cached_size(&shares, share).await, 10);

        std::fs::write(dir.path().join("b.bin"), vec![0u8; 5]).unwrap();
        let reloaded = one_share(&dir);
        let share = reloaded.get("data").unwrap();
        assert_eq!(tracker.cached_size(&reloaded, share).await, 15);
    }
}
