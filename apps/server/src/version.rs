//! Build identification for the startup banner.

use std::fmt;

const UNKNOWN: &str = "unknown";

/// Git commit and branch injected by the deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub commit: String,
    pub branch: String,
}

impl VersionInfo {
    /// Read `GIT_COMMIT` / `GIT_BRANCH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: get("GIT_COMMIT"),
            branch: get("GIT_BRANCH"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} (commit={}, branch={})",
            self.version, self.commit, self.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup() {
        let info = VersionInfo::from_lookup(|key| match key {
            "GIT_COMMIT" => Some("abc1234".to_string()),
            "GIT_BRANCH" => Some("main".to_string()),
            _ => None,
        });
        assert_eq!(info.commit, "abc1234");
        assert_eq!(info.branch, "main");
        assert!(info.to_string().ends_with("(commit=abc1234, branch=main)"));
    }

    #[test]
    fn test_missing_is_unknown() {
        let info = VersionInfo::from_lookup(|key| match key {
            "GIT_BRANCH" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(info.commit, "unknown");
        assert_eq!(info.branch, "unknown");
    }
}
