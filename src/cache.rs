//! Run-scoped caches for loaded documents and resolved references
//!
//! Both caches live for exactly one bundle invocation. The walk is
//! sequential, so neither cache needs locking: every lookup is immediately
//! followed by its insert before any other reference is visited.

use std::collections::HashMap;
use std::rc::Rc;

use serde_yaml::Value as YamlValue;

use crate::error::Result;

/// Cache key combining a location key and a fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey {
    pub location: String,
    pub fragment: String,
}

impl RefKey {
    pub fn new(location: &str, fragment: Option<&str>) -> Self {
        Self {
            location: location.to_string(),
            fragment: fragment.unwrap_or_default().to_string(),
        }
    }
}

impl std::fmt::Display for RefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fragment.is_empty() {
            write!(f, "{}", self.location)
        } else {
            write!(f, "{}#{}", self.location, self.fragment)
        }
    }
}

/// Parsed documents keyed by location key
///
/// Each distinct resource is loaded and parsed at most once per run.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<String, Rc<YamlValue>>,
}

impl DocumentCache {
    /// Create a new empty document cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached document, or load and cache it if not present
    ///
    /// The loader is not called on a hit. A failing loader leaves the cache
    /// unchanged.
    pub fn get_or_load<F>(&mut self, key: &str, loader: F) -> Result<Rc<YamlValue>>
    where
        F: FnOnce() -> Result<YamlValue>,
    {
        if let Some(cached) = self.documents.get(key) {
            return Ok(Rc::clone(cached));
        }

        let document = Rc::new(loader()?);
        self.documents.insert(key.to_string(), Rc::clone(&document));
        Ok(document)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Progress of one (location, fragment) resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// The target is being walked; a reference reaching it again is a cycle
    InProgress,
    /// The walked target has been copied into the merged tree
    Merged,
}

/// Where a resolved target lives in the bundle, and whether it is there yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Internal pointer that replaces every reference to the target
    pub pointer: String,
    pub state: ResolutionState,
}

/// Record of every (location, fragment) pair seen during a run
///
/// The first reference to reach a target fixes its pointer. Later references,
/// including cyclic ones that arrive while the target is still being walked,
/// only read the recorded pointer.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<RefKey, Resolution>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously seen target
    pub fn get(&self, key: &RefKey) -> Option<&Resolution> {
        self.entries.get(key)
    }

    /// Start resolving `key`, recording the pointer it will be merged under.
    ///
    /// A key that was already seen keeps its first pointer.
    pub fn begin(&mut self, key: RefKey, pointer: String) {
        self.entries.entry(key).or_insert(Resolution {
            pointer,
            state: ResolutionState::InProgress,
        });
    }

    /// Mark `key` as merged
    pub fn complete(&mut self, key: &RefKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.state = ResolutionState::Merged;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;

    #[test]
    fn test_ref_key() {
        let key1 = RefKey::new("schemas/user.yaml", Some("/User"));
        let key2 = RefKey::new("schemas/user.yaml", Some("/User"));
        let key3 = RefKey::new("schemas/user.yaml", Some("/Team"));

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_eq!(key1.to_string(), "schemas/user.yaml#/User");
        assert_eq!(RefKey::new("pet.yaml", None).to_string(), "pet.yaml");
    }

    #[test]
    fn test_document_cache_get_or_load() {
        let mut cache = DocumentCache::new();
        let calls = Cell::new(0);

        let first = cache
            .get_or_load("api.yaml", || {
                calls.set(calls.get() + 1);
                Ok(serde_yaml::from_str("openapi: 3.1.0").unwrap())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);

        let second = cache
            .get_or_load("api.yaml", || {
                calls.set(calls.get() + 1);
                Ok(YamlValue::Null)
            })
            .unwrap();

        assert_eq!(calls.get(), 1); // Loader not called on a hit
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_document_cache_failed_load_not_cached() {
        let mut cache = DocumentCache::new();
        let result = cache.get_or_load("missing.yaml", || {
            Err(Error::ResourceNotFound {
                location: "missing.yaml".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        });

        assert!(result.is_err());
        assert!(!cache.contains("missing.yaml"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resolution_cache_begin_once() {
        let mut cache = ResolutionCache::new();
        let key = RefKey::new("api.yaml", Some("/components/schemas/A"));

        cache.begin(key.clone(), "#/components/schemas/A".to_string());
        cache.begin(key.clone(), "#/components/other/A".to_string());

        let entry = cache.get(&key).unwrap();
        assert_eq!(entry.pointer, "#/components/schemas/A");
        assert_eq!(entry.state, ResolutionState::InProgress);
    }

    #[test]
    fn test_resolution_cache_complete() {
        let mut cache = ResolutionCache::new();
        let key = RefKey::new("api.yaml", Some("/components/schemas/A"));
        cache.begin(key.clone(), "#/components/schemas/A".to_string());
        assert_eq!(cache.get(&key).unwrap().state, ResolutionState::InProgress);

        cache.complete(&key);
        assert_eq!(cache.get(&key).unwrap().state, ResolutionState::Merged);
        assert_eq!(cache.len(), 1);

        // A completed target is not restarted
        cache.begin(key.clone(), "#/components/schemas/B".to_string());
        assert_eq!(cache.get(&key).unwrap().state, ResolutionState::Merged);
    }

    #[test]
    fn test_resolution_cache_complete_unknown_key_is_ignored() {
        let mut cache = ResolutionCache::new();
        cache.complete(&RefKey::new("api.yaml", None));
        assert!(cache.is_empty());
    }
}
