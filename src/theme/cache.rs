// ABOUTME: Per-theme caches for variables, computed values, layouts and expressions
// ABOUTME: Expressions live in a bounded LRU keyed by a hash of their text

use indexmap::IndexMap;
use lru::LruCache;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use crate::theme::styles::LayoutStyle;

pub const DEFAULT_EXPRESSION_CAPACITY: usize = 1000;

/// Entry counts reported by [`ThemeCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub variables: usize,
    pub computed: usize,
    pub layouts: usize,
    pub expressions: usize,
}

pub struct ThemeCache {
    variables: IndexMap<String, Value>,
    computed: IndexMap<String, Value>,
    layouts: IndexMap<String, LayoutStyle>,
    expressions: LruCache<u64, Value>,
}

impl Default for ThemeCache {
    fn default() -> Self {
        Self::new(DEFAULT_EXPRESSION_CAPACITY)
    }
}

fn expression_key(expression: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    expression.hash(&mut hasher);
    hasher.finish()
}

impl ThemeCache {
    pub fn new(expression_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(expression_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            variables: IndexMap::new(),
            computed: IndexMap::new(),
            layouts: IndexMap::new(),
            expressions: LruCache::new(capacity),
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn get_computed(&self, name: &str) -> Option<&Value> {
        self.computed.get(name)
    }

    pub fn set_computed(&mut self, name: &str, value: Value) {
        self.computed.insert(name.to_string(), value);
    }

    pub fn has_computed(&self, name: &str) -> bool {
        self.computed.contains_key(name)
    }

    /// Layout entries are keyed by `name` or `name.element`
    pub fn get_layout(&self, key: &str) -> Option<&LayoutStyle> {
        self.layouts.get(key)
    }

    pub fn set_layout(&mut self, key: &str, layout: LayoutStyle) {
        self.layouts.insert(key.to_string(), layout);
    }

    /// Look up an evaluated expression, marking it most recently used
    pub fn get_expression(&mut self, expression: &str) -> Option<Value> {
        self.expressions.get(&expression_key(expression)).cloned()
    }

    pub fn set_expression(&mut self, expression: &str, value: Value) {
        self.expressions.put(expression_key(expression), value);
    }

    /// Drop computed values and evaluated expressions; required after any variable change
    pub fn clear_computed(&mut self) {
        self.computed.clear();
        self.expressions.clear();
    }

    pub fn clear_layouts(&mut self) {
        self.layouts.clear();
    }

    pub fn clear(&mut self) {
        self.variables.clear();
        self.computed.clear();
        self.layouts.clear();
        self.expressions.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            variables: self.variables.len(),
            computed: self.computed.len(),
            layouts: self.layouts.len(),
            expressions: self.expressions.len(),
        }
    }
}
