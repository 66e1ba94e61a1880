// ABOUTME: Theme model with variables, computed expressions and layouts
// ABOUTME: Resolves dotted keys and ${name} expressions with per-theme caching

pub mod cache;
pub mod context;
pub mod evaluator;
pub mod loader;
pub mod styles;

use crate::errors::{DeckError, Result};
use cache::{CacheStats, ThemeCache};
use evaluator::{value_to_text, SafeExpressionEvaluator};
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use loader::ThemeLoader;
use log::debug;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use styles::{Element, ElementStyle, LayoutStyle};

lazy_static! {
    static ref REFERENCE_PATTERN: Regex = Regex::new(r"\$\{(\w+)\}").unwrap();
}

/// Layout that the `slide` section of a theme defines
pub const CONTENT_LAYOUT: &str = "content";

/// Theme sections folded into the content layout as `section.element`
const SECTIONS: [&str; 7] = ["text", "list", "table", "code", "container", "badge", "stat"];

/// Result of a dotted key lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Layout(Box<LayoutStyle>),
    Element(ElementStyle),
}

impl Resolved {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Flatten into JSON; layouts and elements become objects
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Layout(layout) => layout.to_value(),
            Resolved::Element(style) => serde_json::to_value(style).unwrap_or(Value::Null),
        }
    }
}

/// A loaded theme.
///
/// `get` and `resolve` take `&self` so one theme can be shared behind an `Arc`; the caches sit
/// behind a mutex. Mutation goes through `set_variable` / `set_computed`.
pub struct Theme {
    pub name: String,
    pub version: String,
    variables: IndexMap<String, Value>,
    computed: IndexMap<String, String>,
    layouts: IndexMap<String, LayoutStyle>,
    cache: Mutex<ThemeCache>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            version: "1.0".to_string(),
            variables: IndexMap::new(),
            computed: IndexMap::new(),
            layouts: IndexMap::new(),
            cache: Mutex::new(ThemeCache::default()),
        }
    }
}

impl std::fmt::Debug for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Theme")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("variables", &self.variables.len())
            .field("computed", &self.computed.len())
            .field("layouts", &self.layouts.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn object<'a>(data: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    data.get(key).and_then(Value::as_object)
}

impl Theme {
    /// Build a theme from JSON in either the `variables`/`computed`/`layouts` shape or the
    /// `constants`/`palette`/`slide` shape. Later groups win on key collision.
    pub fn from_value(data: &Value) -> Result<Self> {
        if !data.is_object() {
            return Err(DeckError::ThemeLoadError(
                "Theme data must be a JSON object".to_string(),
            ));
        }

        let mut theme = Theme {
            name: data
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("default")
                .to_string(),
            version: data
                .get("version")
                .map(value_to_text)
                .unwrap_or_else(|| "1.0".to_string()),
            ..Theme::default()
        };

        for group in ["constants", "palette", "variables"] {
            if let Some(map) = object(data, group) {
                for (key, value) in map {
                    theme.variables.insert(key.clone(), value.clone());
                }
            }
        }

        if let Some(map) = object(data, "computed") {
            for (key, value) in map {
                theme.computed.insert(key.clone(), value_to_text(value));
            }
        }

        if let Some(map) = object(data, "layouts") {
            for (name, layout) in map {
                theme
                    .layouts
                    .insert(name.clone(), LayoutStyle::from_value(name, layout)?);
            }
        }

        if let Some(slide) = data.get("slide") {
            theme.layouts.insert(
                CONTENT_LAYOUT.to_string(),
                LayoutStyle::from_value(CONTENT_LAYOUT, slide)?,
            );
        }

        for section in SECTIONS {
            let Some(map) = object(data, section) else {
                continue;
            };
            let content = theme
                .layouts
                .entry(CONTENT_LAYOUT.to_string())
                .or_insert_with(|| LayoutStyle::new(CONTENT_LAYOUT));
            for (key, value) in map {
                if value.is_object() {
                    content.set(
                        Element::Custom(format!("{}.{}", section, key)),
                        ElementStyle::from_value(value)?,
                    );
                }
            }
        }

        debug!(
            "Built theme '{}' with {} variables, {} computed, {} layouts",
            theme.name,
            theme.variables.len(),
            theme.computed.len(),
            theme.layouts.len()
        );
        Ok(theme)
    }

    /// Load a theme by reference, e.g. `default:midnight.json`
    pub fn from_reference(loader: &ThemeLoader, reference: &str) -> Result<Self> {
        let data = loader.load_theme_data(reference, None)?;
        Self::from_value(&data)
    }

    /// Load a theme file from disk; `extends` references resolve next to it
    pub fn from_file(loader: &ThemeLoader, path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DeckError::ValidationError(format!("Invalid theme path: {:?}", path)))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        let data = loader.load_theme_data(name, Some(&dir))?;
        Self::from_value(&data)
    }

    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        Self {
            cache: Mutex::new(ThemeCache::new(capacity)),
            ..self
        }
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    pub fn computed(&self) -> &IndexMap<String, String> {
        &self.computed
    }

    /// The raw layout as written in the theme
    pub fn layout(&self, name: &str) -> Option<&LayoutStyle> {
        self.layouts.get(name)
    }

    pub fn layout_names(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    /// Look up a dotted key.
    ///
    /// `layouts.<name>[.<element>[.<prop>]]` reaches into resolved layouts; any other key is a
    /// computed value (evaluated) or a raw variable. Unknown keys are `Ok(None)`.
    pub fn get(&self, key: &str) -> Result<Option<Resolved>> {
        if let Some(path) = key.strip_prefix("layouts.") {
            return self.layout_value(path);
        }

        let mut cache = self.cache.lock();
        if let Some(value) = cache.get_computed(key) {
            return Ok(Some(Resolved::Value(value.clone())));
        }
        if self.computed.contains_key(key) {
            let mut resolving = Vec::new();
            let value = self.resolve_computed(key, &mut cache, &mut resolving)?;
            return Ok(Some(Resolved::Value(value)));
        }
        Ok(Self::cached_variable(&self.variables, key, &mut cache).map(Resolved::Value))
    }

    /// Raw variable lookup through the cache's variable store
    fn cached_variable(
        variables: &IndexMap<String, Value>,
        name: &str,
        cache: &mut ThemeCache,
    ) -> Option<Value> {
        if let Some(value) = cache.get_variable(name) {
            return Some(value.clone());
        }
        let value = variables.get(name)?.clone();
        cache.set_variable(name, value.clone());
        Some(value)
    }

    /// Like `get`, flattened to JSON, with `default` for unknown keys
    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.map(Resolved::into_value).unwrap_or(default))
    }

    fn layout_value(&self, path: &str) -> Result<Option<Resolved>> {
        let (name, rest) = match path.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (path, None),
        };
        let Some(layout) = self.resolved_layout(name)? else {
            return Ok(None);
        };
        let Some(rest) = rest else {
            return Ok(Some(Resolved::Layout(Box::new(layout))));
        };

        // Element names may themselves be dotted (`table.header`).
        let element = Element::from(rest);
        if layout.element(&element).is_some() {
            return Ok(Some(Resolved::Element(layout.get(&element))));
        }
        match rest.rsplit_once('.') {
            Some((element, prop)) => Ok(layout
                .get(&Element::from(element))
                .property(prop)
                .map(Resolved::Value)),
            None => Ok(Some(Resolved::Element(layout.get(&element)))),
        }
    }

    /// Resolve a value: strings are evaluated as expressions, anything else passes through
    pub fn resolve(&self, value: &Value) -> Result<Value> {
        let mut cache = self.cache.lock();
        self.resolve_with(value, &mut cache)
    }

    fn resolve_with(&self, value: &Value, cache: &mut ThemeCache) -> Result<Value> {
        let Value::String(expression) = value else {
            return Ok(value.clone());
        };
        if let Some(hit) = cache.get_expression(expression) {
            return Ok(hit);
        }

        let mut resolving = Vec::new();
        let context = self.context_for(expression, cache, &mut resolving)?;
        let result = SafeExpressionEvaluator::new(&context).evaluate(expression)?;
        cache.set_expression(expression, result.clone());
        Ok(result)
    }

    /// Computed names `text` depends on, following references through string variables
    fn dependencies(&self, text: &str) -> IndexSet<String> {
        let mut deps = IndexSet::new();
        let mut seen = IndexSet::new();
        let mut pending = vec![text.to_string()];

        while let Some(current) = pending.pop() {
            for caps in REFERENCE_PATTERN.captures_iter(&current) {
                let name = caps[1].to_string();
                if !seen.insert(name.clone()) {
                    continue;
                }
                match self.variables.get(&name) {
                    Some(Value::String(s)) => pending.push(s.clone()),
                    Some(_) => {}
                    None if self.computed.contains_key(&name) => {
                        deps.insert(name);
                    }
                    None => {}
                }
            }
        }
        deps
    }

    /// Variables plus the resolved computed values that `text` needs
    fn context_for(
        &self,
        text: &str,
        cache: &mut ThemeCache,
        resolving: &mut Vec<String>,
    ) -> Result<IndexMap<String, Value>> {
        let mut context = self.variables.clone();
        for dep in self.dependencies(text) {
            let value = self.resolve_computed(&dep, cache, resolving)?;
            context.insert(dep, value);
        }
        Ok(context)
    }

    /// Depth-first evaluation of a computed value; `resolving` holds the names in flight
    fn resolve_computed(
        &self,
        name: &str,
        cache: &mut ThemeCache,
        resolving: &mut Vec<String>,
    ) -> Result<Value> {
        if let Some(value) = cache.get_computed(name) {
            return Ok(value.clone());
        }
        if resolving.iter().any(|n| n == name) {
            let mut chain = resolving.clone();
            chain.push(name.to_string());
            return Err(DeckError::ExpressionError(format!(
                "Circular reference detected: {}",
                chain.join(" -> ")
            )));
        }
        let Some(expression) = self.computed.get(name) else {
            return Ok(Self::cached_variable(&self.variables, name, cache).unwrap_or(Value::Null));
        };

        resolving.push(name.to_string());
        let result = self
            .context_for(expression, cache, resolving)
            .and_then(|context| SafeExpressionEvaluator::new(&context).evaluate(expression));
        resolving.pop();

        let value = result?;
        cache.set_computed(name, value.clone());
        Ok(value)
    }

    fn resolve_text(&self, text: &str, cache: &mut ThemeCache) -> Result<Value> {
        if !text.contains("${") {
            return Ok(Value::String(text.to_string()));
        }
        self.resolve_with(&Value::String(text.to_string()), cache)
    }

    /// A layout with every `${}` reference in its background and element fields resolved
    pub fn resolved_layout(&self, name: &str) -> Result<Option<LayoutStyle>> {
        let cache_key = format!("resolved_{}", name);
        let mut cache = self.cache.lock();
        if let Some(layout) = cache.get_layout(&cache_key) {
            return Ok(Some(layout.clone()));
        }
        let Some(layout) = self.layouts.get(name) else {
            return Ok(None);
        };

        let mut resolved = LayoutStyle::new(&layout.name);
        resolved.background = value_to_text(&self.resolve_text(&layout.background, &mut cache)?);
        for (element, style) in layout.elements() {
            let style = style.try_map(|text| self.resolve_text(text, &mut cache))?;
            resolved.set(element.clone(), style);
        }

        cache.set_layout(&cache_key, resolved.clone());
        Ok(Some(resolved))
    }

    /// Set a variable, invalidating everything derived from variables
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value.clone());
        let cache = self.cache.get_mut();
        cache.set_variable(name, value);
        cache.clear_computed();
        cache.clear_layouts();
    }

    pub fn set_computed(&mut self, name: &str, expression: &str) {
        self.computed.insert(name.to_string(), expression.to_string());
        let cache = self.cache.get_mut();
        cache.clear_computed();
        cache.clear_layouts();
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Export in the `variables`/`computed`/`layouts` shape accepted by `from_value`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("version".to_string(), Value::String(self.version.clone()));
        map.insert(
            "variables".to_string(),
            Value::Object(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
        map.insert(
            "computed".to_string(),
            Value::Object(
                self.computed
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        map.insert(
            "layouts".to_string(),
            Value::Object(
                self.layouts
                    .iter()
                    .map(|(k, layout)| (k.clone(), layout.to_value()))
                    .collect(),
            ),
        );
        Value::Object(map)
    }
}
