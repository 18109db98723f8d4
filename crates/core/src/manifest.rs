//! The fixed list of paths kept warm in the active generation.

use serde::{Deserialize, Serialize};

/// Paths every deployment caches on activation.
pub const DEFAULT_MANIFEST: &[&str] = &["/", "/images/homer.png"];

/// Ordered, immutable list of always-cached paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<String>);

impl Default for Manifest {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST.iter().copied())
    }
}

impl Manifest {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = Manifest::default();
        assert_eq!(manifest.iter().collect::<Vec<_>>(), vec!["/", "/images/homer.png"]);
    }

    #[test]
    fn test_manifest_keeps_order() {
        let manifest = Manifest::new(["/b", "/a", "/c"]);
        assert_eq!(manifest.iter().collect::<Vec<_>>(), vec!["/b", "/a", "/c"]);
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn test_manifest_serde_transparent() {
        let manifest: Manifest = serde_json::from_str(r#"["/", "/app.js"]"#).unwrap();
        assert_eq!(manifest, Manifest::new(["/", "/app.js"]));
    }
}
