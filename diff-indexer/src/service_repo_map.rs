//! Service → repository resolution.

use crate::errors::{IndexerError, IndexerResult};
use crate::models::RepoEntry;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Resolves a service name to its repository entry.
///
/// Inject a concrete implementation at construction time. The in-memory
/// map is the default for tests and local runs; deployments substitute a
/// config-file or API-backed implementation.
pub trait ServiceRepoMap: Send + Sync {
    /// Returns the entry for `service`, or
    /// [`IndexerError::ServiceNotRegistered`].
    fn get(&self, service: &str) -> IndexerResult<RepoEntry>;

    /// Registers or overwrites the mapping for `service`.
    fn register(&self, service: &str, entry: RepoEntry);

    /// True when `service` is registered.
    fn has(&self, service: &str) -> bool {
        self.get(service).is_ok()
    }
}

/// Mutable in-memory implementation.
#[derive(Default)]
pub struct InMemoryServiceRepoMap {
    entries: RwLock<BTreeMap<String, RepoEntry>>,
}

impl InMemoryServiceRepoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ServiceRepoMap for InMemoryServiceRepoMap {
    fn get(&self, service: &str) -> IndexerResult<RepoEntry> {
        self.entries
            .read()
            .ok()
            .and_then(|e| e.get(service).cloned())
            .ok_or_else(|| IndexerError::ServiceNotRegistered(service.to_string()))
    }

    fn register(&self, service: &str, entry: RepoEntry) {
        if let Ok(mut e) = self.entries.write() {
            e.insert(service.to_string(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve() {
        let map = InMemoryServiceRepoMap::new();
        assert!(map.get("checkout-api").is_err());
        assert!(!map.has("checkout-api"));

        map.register(
            "checkout-api",
            RepoEntry::new("git@example.com:shop/checkout.git", "python"),
        );
        let entry = map.get("checkout-api").unwrap();
        assert_eq!(entry.language, "python");
        assert_eq!(entry.default_branch, "main");
        assert!(map.has("checkout-api"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn register_overwrites() {
        let map = InMemoryServiceRepoMap::new();
        map.register("svc", RepoEntry::new("url-a", "python"));
        map.register("svc", RepoEntry::new("url-b", "rust").with_branch("develop"));
        let entry = map.get("svc").unwrap();
        assert_eq!(entry.repo_url, "url-b");
        assert_eq!(entry.default_branch, "develop");
        assert_eq!(map.len(), 1);
    }
}
