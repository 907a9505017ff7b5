//! Object cache keyed by what an object is, not by which node asked for it.

use super::builder::{BuilderKind, MarketHandle};
use super::ledger::NodeFailure;
use std::collections::HashMap;
use std::fmt;

/// Identity of a built object. Spec-based objects carry no configuration
/// and are shared across configurations; swap indices are scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: BuilderKind,
    pub name: String,
    pub configuration: Option<String>,
}

impl ObjectKey {
    pub fn shared(kind: BuilderKind, name: String) -> Self {
        Self { kind, name, configuration: None }
    }

    pub fn scoped(kind: BuilderKind, name: &str, configuration: &str) -> Self {
        Self { kind, name: name.to_string(), configuration: Some(configuration.to_string()) }
    }

    /// The object name, suffixed with `@configuration` for scoped keys.
    pub fn qualified_name(&self) -> String {
        match &self.configuration {
            Some(c) => format!("{}@{}", self.name, c),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.configuration {
            Some(c) => write!(f, "{}:{}@{}", self.kind, self.name, c),
            None => write!(f, "{}:{}", self.kind, self.name),
        }
    }
}

/// Successes and builder failures, each recorded at most once per key.
#[derive(Debug, Clone, Default)]
pub struct ObjectCache {
    objects: HashMap<ObjectKey, MarketHandle>,
    failures: HashMap<ObjectKey, NodeFailure>,
}

impl ObjectCache {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &ObjectKey) -> Option<&MarketHandle> {
        self.objects.get(key)
    }

    /// Stores `handle` unless the key already holds an object, and returns
    /// whichever handle is now cached.
    pub fn insert(&mut self, key: ObjectKey, handle: MarketHandle) -> MarketHandle {
        self.objects.entry(key).or_insert(handle).clone()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn record_failure(&mut self, key: ObjectKey, failure: NodeFailure) {
        self.failures.entry(key).or_insert(failure);
    }

    pub fn failure(&self, key: &ObjectKey) -> Option<&NodeFailure> {
        self.failures.get(key)
    }

    /// Number of cached objects (failures excluded).
    pub fn len(&self) -> usize { self.objects.len() }

    pub fn is_empty(&self) -> bool { self.objects.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::CurveSpecType;

    #[test]
    fn test_first_insert_wins() {
        let mut cache = ObjectCache::new();
        let key = ObjectKey::shared(BuilderKind::Curve(CurveSpecType::Yield), "Yield/EUR/EUR1D".into());
        let first = cache.insert(key.clone(), MarketHandle::new(1u8));
        let second = cache.insert(key.clone(), MarketHandle::new(2u8));
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.get(&key).and_then(|h| h.downcast_ref::<u8>()), Some(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_not_objects() {
        let mut cache = ObjectCache::new();
        let key = ObjectKey::scoped(BuilderKind::SwapIndex, "EUR-CMS-30Y", "default");
        cache.record_failure(key.clone(), NodeFailure::Build { reason: "no conventions".into() });
        assert!(cache.is_empty());
        assert!(!cache.contains(&key));
        assert!(cache.failure(&key).is_some());
        assert_eq!(key.to_string(), "SwapIndex:EUR-CMS-30Y@default");
        assert_eq!(key.qualified_name(), "EUR-CMS-30Y@default");
    }
}
