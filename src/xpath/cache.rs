//! Memoization of expression results.
//!
//! Results are keyed by the exact expression text: `//a` and `/descendant-or-self::node()/child::a`
//! are different entries. The cache knows nothing about the document; its
//! owner clears it whenever the document or the prefix bindings change,
//! since either can change what an expression selects.

use std::collections::HashMap;
use std::rc::Rc;

use super::types::XPathValue;

/// Hit and miss counters plus the current number of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Expression text to evaluation result.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: HashMap<String, Rc<XPathValue>>,
    hits: u64,
    misses: u64,
}

impl ExpressionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `expression`, counting a hit or a miss.
    pub fn get(&mut self, expression: &str) -> Option<Rc<XPathValue>> {
        match self.entries.get(expression) {
            Some(value) => {
                self.hits += 1;
                Some(Rc::clone(value))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores the result of `expression`, replacing any previous entry.
    pub fn insert(&mut self, expression: &str, value: Rc<XPathValue>) {
        self.entries.insert(expression.to_owned(), value);
    }

    /// Drops every entry. The counters are kept.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::trace!(entries = self.entries.len(), "expression cache cleared");
        }
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let mut cache = ExpressionCache::new();
        assert!(cache.get("//a").is_none());
        cache.insert("//a", Rc::new(XPathValue::Number(2.0)));
        assert_eq!(*cache.get("//a").unwrap(), XPathValue::Number(2.0));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_keys_are_exact_text() {
        let mut cache = ExpressionCache::new();
        cache.insert("//a", Rc::new(XPathValue::Boolean(true)));
        assert!(cache.get("//a ").is_none());
        assert!(cache.get("//A").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut cache = ExpressionCache::new();
        cache.insert("x", Rc::new(XPathValue::Number(1.0)));
        cache.insert("x", Rc::new(XPathValue::Number(2.0)));
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get("x").unwrap(), XPathValue::Number(2.0));
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut cache = ExpressionCache::new();
        cache.insert("x", Rc::new(XPathValue::Number(1.0)));
        cache.get("x");
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("x").is_none());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }
}
