//! Cache generation naming.
//!
//! Each deployment of the agent owns exactly one cache generation, named
//! `{prefix}-{version}`. Bumping [`CACHE_VERSION`] on deploy makes every
//! older generation stale; the lifecycle manager sweeps them on activation.

/// Prefix shared by every cache generation this agent creates.
pub const CACHE_PREFIX: &str = "sw";

/// Generation of the currently deployed agent.
pub const CACHE_VERSION: u32 = 1;

/// Identifies the active cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRegistry {
    prefix: String,
    version: u32,
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::new(CACHE_PREFIX, CACHE_VERSION)
    }
}

impl VersionRegistry {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self { prefix: prefix.into(), version }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Name of the generation owned by this deployment, e.g. `sw-5`.
    pub fn active_cache_name(&self) -> String {
        format!("{}-{}", self.prefix, self.version)
    }

    /// Extract the version number from a cache name.
    ///
    /// Only names of the exact form `{prefix}-<integer>` match, where the
    /// integer is an optional `-` followed by ASCII digits. Returns `None`
    /// for anything else, including foreign caches that share the store.
    /// Values outside `i64` match the form but return `None`; use
    /// [`VersionRegistry::is_stale`] to classify those.
    pub fn parse_version(&self, name: &str) -> Option<i64> {
        let (negative, digits) = self.version_digits(name)?;
        let value: i64 = digits.parse().ok()?;
        Some(if negative { -value } else { value })
    }

    /// Whether `name` is an older (or newer) generation of this agent that
    /// should be swept.
    ///
    /// Decided on the digit string, so generations numbered beyond any
    /// integer type are still swept.
    pub fn is_stale(&self, name: &str) -> bool {
        match self.version_digits(name) {
            Some((false, digits)) => {
                let significant = digits.trim_start_matches('0');
                !significant.is_empty() && significant != self.version.to_string()
            }
            _ => false,
        }
    }

    /// Split `{prefix}-[-]<digits>` into its sign and digit string.
    fn version_digits<'a>(&self, name: &'a str) -> Option<(bool, &'a str)> {
        let rest = name.strip_prefix(self.prefix.as_str())?.strip_prefix('-')?;
        let (negative, digits) = match rest.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((negative, digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_cache_name() {
        let registry = VersionRegistry::new("sw", 5);
        assert_eq!(registry.active_cache_name(), "sw-5");
    }

    #[test]
    fn test_default_registry() {
        let registry = VersionRegistry::default();
        assert_eq!(registry.prefix(), CACHE_PREFIX);
        assert_eq!(registry.version(), CACHE_VERSION);
    }

    #[test]
    fn test_parse_version_matches() {
        let registry = VersionRegistry::new("sw", 5);
        assert_eq!(registry.parse_version("sw-4"), Some(4));
        assert_eq!(registry.parse_version("sw-123"), Some(123));
        assert_eq!(registry.parse_version("sw-0"), Some(0));
        assert_eq!(registry.parse_version("sw--2"), Some(-2));
    }

    #[test]
    fn test_parse_version_rejects() {
        let registry = VersionRegistry::new("sw", 5);
        assert_eq!(registry.parse_version("sw"), None);
        assert_eq!(registry.parse_version("sw-"), None);
        assert_eq!(registry.parse_version("sw-4-old"), None);
        assert_eq!(registry.parse_version("sw-+4"), None);
        assert_eq!(registry.parse_version("sw-abc"), None);
        assert_eq!(registry.parse_version("other-4"), None);
        assert_eq!(registry.parse_version("sw4"), None);
        assert_eq!(registry.parse_version("xsw-4"), None);
    }

    #[test]
    fn test_parse_version_out_of_range() {
        let registry = VersionRegistry::new("sw", 5);
        assert_eq!(registry.parse_version("sw-99999999999999999999"), None);
        assert!(registry.is_stale("sw-99999999999999999999"));
        assert!(!registry.is_stale("sw--99999999999999999999"));
    }

    #[test]
    fn test_is_stale() {
        let registry = VersionRegistry::new("sw", 5);
        assert!(registry.is_stale("sw-4"));
        assert!(registry.is_stale("sw-6"));
        assert!(!registry.is_stale("sw-5"));
        assert!(!registry.is_stale("sw-0"));
        assert!(!registry.is_stale("sw--1"));
        assert!(!registry.is_stale("sw-000"));
        assert!(!registry.is_stale("sw-005"));
        assert!(registry.is_stale("sw-004"));
        assert!(!registry.is_stale("sw-5-old"));
        assert!(!registry.is_stale("images"));
    }

    #[test]
    fn test_prefix_with_hyphen() {
        let registry = VersionRegistry::new("my-app", 2);
        assert_eq!(registry.active_cache_name(), "my-app-2");
        assert_eq!(registry.parse_version("my-app-1"), Some(1));
        assert_eq!(registry.parse_version("my-1"), None);
    }
}
