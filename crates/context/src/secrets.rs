//! File-backed secret store.
//!
//! Secrets are mounted into the gateway's filesystem, one file per key:
//! `{dir}/{namespace}/secret/{key}`. Lookups are read-on-demand and never
//! cached, so rotated secrets take effect on the next request.

use std::path::PathBuf;

use tracing::debug;

/// Namespace consulted for the request-debug secret.
pub const DEBUG_SECRET_NAMESPACE: &str = "fn-debug";
/// Key consulted for the request-debug secret.
pub const DEBUG_SECRET_KEY: &str = "DEBUG";

/// Read-only view over a directory of mounted secrets.
#[derive(Debug, Clone)]
pub struct SecretStore {
    dir: PathBuf,
}

impl SecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Looks up a secret value, trimmed of surrounding whitespace.
    ///
    /// Absent files and unreadable files both read as `None`; a missing
    /// secret is an ordinary condition, not an error.
    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        let path = self.dir.join(namespace).join("secret").join(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(err) => {
                debug!(namespace, key, error = %err, "secret_lookup_miss");
                None
            }
        }
    }

    /// True when the fixed debug secret is set non-empty.
    pub fn debug_enabled(&self) -> bool {
        self.get(DEBUG_SECRET_NAMESPACE, DEBUG_SECRET_KEY).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(namespace: &str, key: &str, value: &str) -> (tempfile::TempDir, SecretStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let secret_dir = dir.path().join(namespace).join("secret");
        std::fs::create_dir_all(&secret_dir).expect("mkdir");
        std::fs::write(secret_dir.join(key), value).expect("write");
        let store = SecretStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn reads_and_trims_mounted_secrets() {
        let (_dir, store) = store_with("fn-debug", "DEBUG", "  true\n");
        assert_eq!(store.get("fn-debug", "DEBUG").as_deref(), Some("true"));
        assert!(store.debug_enabled());
    }

    #[test]
    fn absent_and_empty_secrets_read_as_none() {
        let (_dir, store) = store_with("fn-debug", "DEBUG", "   \n");
        assert_eq!(store.get("fn-debug", "DEBUG"), None);
        assert!(!store.debug_enabled());
        assert_eq!(store.get("other", "KEY"), None);
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let store = SecretStore::new("/nonexistent/fngate-secrets");
        assert_eq!(store.get("fn-debug", "DEBUG"), None);
    }
}
