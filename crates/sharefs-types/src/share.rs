//! Share and session-limit configuration as handed over by the engine.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::permission::Permission;

/// Name reserved for the synthetic status entry; shares may not claim it.
pub const STATUS_NAME: &str = ".status";

/// One share as configured: a named mapping from a virtual top-level
/// directory to a physical directory, with its own permission policy and
/// optional quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Virtual directory name under the session root. Unique, no path
    /// separators.
    pub name: String,
    /// Physical root directory backing the share.
    pub path: PathBuf,
    /// Whether anonymous sessions (and users without an explicit entry)
    /// may fall back to `anonymous_permission`.
    #[serde(default)]
    pub public: bool,
    /// Access granted through the public fallback.
    #[serde(default = "default_anonymous_permission")]
    pub anonymous_permission: Permission,
    /// Optional cap on the share's aggregate size in bytes.
    #[serde(default)]
    pub max_size_bytes: Option<u64>,
    /// Explicit per-user grants; these win over the public fallback.
    #[serde(default)]
    pub users: HashMap<String, Permission>,
}

fn default_anonymous_permission() -> Permission {
    Permission::Read
}

impl ShareConfig {
    /// A minimal share rooted at `path`, private, read-only fallback.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            public: false,
            anonymous_permission: Permission::Read,
            max_size_bytes: None,
            users: HashMap::new(),
        }
    }

    /// Check the share name: non-empty, no path separators, not a
    /// reserved dot name and not the synthetic status entry.
    pub fn validate_name(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyShareName);
        }
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(ConfigError::InvalidShareName(self.name.clone()));
        }
        if self.name == "." || self.name == ".." || self.name == STATUS_NAME {
            return Err(ConfigError::ReservedShareName(self.name.clone()));
        }
        Ok(())
    }
}

/// Per-session transfer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum bytes a single upload may carry; `None` means unlimited.
    #[serde(default)]
    pub max_upload_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let share: ShareConfig =
            serde_json::from_str(r#"{"name": "docs", "path": "/srv/docs"}"#).unwrap();
        assert_eq!(share.name, "docs");
        assert!(!share.public);
        assert_eq!(share.anonymous_permission, Permission::Read);
        assert_eq!(share.max_size_bytes, None);
        assert!(share.users.is_empty());
    }

    #[test]
    fn deserializes_user_grants() {
        let share: ShareConfig = serde_json::from_str(
            r#"{"name": "drop", "path": "/srv/drop", "public": true,
                "anonymous_permission": "r", "max_size_bytes": 1000,
                "users": {"alice": "rw"}}"#,
        )
        .unwrap();
        assert_eq!(share.users["alice"], Permission::ReadWrite);
        assert_eq!(share.max_size_bytes, Some(1000));
    }

    #[test]
    fn rejects_separator_names() {
        for bad in ["a/b", "a\\b"] {
            let share = ShareConfig::new(bad, "/srv/x");
            assert!(matches!(
                share.validate_name(),
                Err(ConfigError::InvalidShareName(_))
            ));
        }
    }

    #[test]
    fn rejects_reserved_names() {
        for bad in [".", "..", STATUS_NAME] {
            let share = ShareConfig::new(bad, "/srv/x");
            assert!(matches!(
                share.validate_name(),
                Err(ConfigError::ReservedShareName(_))
            ));
        }
    }

    #[test]
    fn limits_default_to_unlimited() {
        let limits: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits.max_upload_bytes, None);
    }
}
