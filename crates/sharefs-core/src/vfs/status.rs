//! Synthetic `.status` reporting.
//!
//! `.status` is a read-only entity materialized in listings with no
//! physical backing: one at the virtual root summarizing every share the
//! session can see, one at each share root summarizing that share. Its
//! size is the size of its rendered body.

use std::time::SystemTime;

use sharefs_types::{FileInfo, STATUS_NAME};

use crate::config::{Share, ShareSet};

use super::perm::PermissionResolver;
use super::quota::QuotaTracker;

/// Root status body: `name permissions=<perm>` per visible share, with
/// `quota=<human> used=<human>` appended when a quota is configured.
pub async fn root_status_text(
    shares: &ShareSet,
    perms: &PermissionResolver,
    quota: &QuotaTracker,
    username: &str,
) -> String {
    let mut lines = Vec::new();
    for share in shares.iter() {
        let permission = perms.resolve(shares, share, username);
        if !permission.can_read() {
            continue;
        }
        match share.max_size_bytes() {
            Some(max) => {
                let used = quota.cached_size(shares, share).await;
                lines.push(format!(
                    "{} permissions={} quota={} used={}",
                    share.name(),
                    permission,
                    format_size(max),
                    format_size(used),
                ));
            }
            None => lines.push(format!("{} permissions={}", share.name(), permission)),
        }
    }
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

/// Per-share status body: `permissions=<perm>`, then `quota=` and `used=`
/// lines when a quota is configured. Renders `permissions=none` for
/// sessions without access.
pub async fn share_status_text(
    shares: &ShareSet,
    perms: &PermissionResolver,
    quota: &QuotaTracker,
    share: &Share,
    username: &str,
) -> String {
    let permission = perms.resolve(shares, share, username);
    match share.max_size_bytes() {
        Some(max) => {
            let used = quota.cached_size(shares, share).await;
            format!(
                "permissions={}\nquota={}\nused={}\n",
                permission,
                format_size(max),
                format_size(used),
            )
        }
        None => format!("permissions={permission}\n"),
    }
}

/// Listing/stat record for a rendered status body.
pub fn status_entry(body: &str) -> FileInfo {
    let mut info = FileInfo::read_only_file(STATUS_NAME, body.len() as u64);
    info.modified = Some(SystemTime::now());
    info
}

/// Binary human size: ÷1024 per step through B/KB/MB/GB/TB, one decimal,
/// half-up, trailing `.0` dropped.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == rounded.trunc() {
        format!("{}{}", rounded as u64, UNITS[unit])
    } else {
        format!("{:.1}{}", rounded, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sharefs_types::{Permission, ShareConfig};
    use tempfile::TempDir;

    use crate::vfs::perm::ANONYMOUS_USER;

    #[rstest]
    #[case(0, "0B")]
    #[case(512, "512B")]
    #[case(1023, "1023B")]
    #[case(1024, "1KB")]
    #[case(1536, "1.5KB")]
    #[case(10 * 1024, "10KB")]
    #[case(1_048_576, "1MB")]
    #[case(1_500_000, "1.4MB")]
    #[case(1_073_741_824, "1GB")]
    #[case(1_099_511_627_776, "1TB")]
    #[case(2_199_023_255_552, "2TB")]
    fn human_sizes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }

    fn public_share(dir: &TempDir, name: &str, max: Option<u64>) -> ShareConfig {
        let mut config = ShareConfig::new(name, dir.path().join(name));
        config.public = true;
        config.anonymous_permission = Permission::Read;
        config.max_size_bytes = max;
        config
    }

    #[tokio::test]
    async fn root_body_lists_only_visible_shares() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("open")).unwrap();
        let mut private = ShareConfig::new("vault", dir.path().join("vault"));
        private.public = false;
        let shares =
            ShareSet::build([public_share(&dir, "open", None), private]).unwrap();
        let perms = PermissionResolver::new();
        let quota = QuotaTracker::new();

        let body = root_status_text(&shares, &perms, &quota, ANONYMOUS_USER).await;
        assert_eq!(body, "open permissions=r\n");
    }

    #[tokio::test]
    async fn root_body_includes_quota_usage() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("drop")).unwrap();
        std::fs::write(dir.path().join("drop/f.bin"), vec![0u8; 1_048_576]).unwrap();
        let shares =
            ShareSet::build([public_share(&dir, "drop", Some(1_500_000))]).unwrap();
        let perms = PermissionResolver::new();
        let quota = QuotaTracker::new();

        let body = root_status_text(&shares, &perms, &quota, ANONYMOUS_USER).await;
        assert_eq!(body, "drop permissions=r quota=1.4MB used=1MB\n");
    }

    #[tokio::test]
    async fn share_body_reports_none_without_access() {
        let dir = TempDir::new().unwrap();
        let mut private = ShareConfig::new("vault", dir.path().join("vault"));
        private.public = false;
        let shares = ShareSet::build([private]).unwrap();
        let perms = PermissionResolver::new();
        let quota = QuotaTracker::new();
        let share = shares.get("vault").unwrap();

        let body = share_status_text(&shares, &perms, &quota, share, ANONYMOUS_USER).await;
        assert_eq!(body, "permissions=none\n");
    }

    #[tokio::test]
    async fn share_body_with_quota_has_three_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("drop")).unwrap();
        std::fs::write(dir.path().join("drop/f.bin"), vec![0u8; 512]).unwrap();
        let shares =
            ShareSet::build([public_share(&dir, "drop", Some(2048))]).unwrap();
        let perms = PermissionResolver::new();
        let quota = QuotaTracker::new();
        let share = shares.get("drop").unwrap();

        let body = share_status_text(&shares, &perms, &quota, share, ANONYMOUS_USER).await;
        assert_eq!(body, "permissions=r\nquota=2KB\nused=512B\n");
    }

    #[test]
    fn status_entry_size_tracks_body() {
        let entry = status_entry("permissions=r\n");
        assert_eq!(entry.name, STATUS_NAME);
        assert_eq!(entry.size, 14);
        assert_eq!(entry.mode, 0o444);
    }
}
