// ABOUTME: Cascading theme resolution across a theme list and deck/slide overrides
// ABOUTME: Resolution order is slide overrides, deck overrides, then each theme in order

use crate::errors::Result;
use crate::theme::evaluator::value_to_text;
use crate::theme::loader::ThemeLoader;
use crate::theme::styles::LayoutStyle;
use crate::theme::{Resolved, Theme, CONTENT_LAYOUT};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::{debug, warn};
use parking_lot::Mutex;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Theme whose content layout supplies default element styles
pub const DEFAULT_STYLE_REFERENCE: &str = "default:midnight.json";

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

lazy_static! {
    static ref VARIABLE_PATTERN: Regex = Regex::new(r"\$\{(\w+)\}").unwrap();
}

/// Palette and component overrides layered on top of themes.
///
/// Keys containing a `.` (`pie_chart.colors`) are component overrides, the rest are palette
/// entries. Every mutation stamps a new revision, which keys the context's resolution cache.
#[derive(Debug)]
pub struct ThemeOverrides {
    palette: IndexMap<String, Value>,
    components: IndexMap<String, Value>,
    revision: u64,
}

impl Default for ThemeOverrides {
    fn default() -> Self {
        Self {
            palette: IndexMap::new(),
            components: IndexMap::new(),
            revision: next_revision(),
        }
    }
}

impl Clone for ThemeOverrides {
    fn clone(&self) -> Self {
        Self {
            palette: self.palette.clone(),
            components: self.components.clone(),
            revision: next_revision(),
        }
    }
}

impl PartialEq for ThemeOverrides {
    fn eq(&self, other: &Self) -> bool {
        self.palette == other.palette && self.components == other.components
    }
}

impl ThemeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        if key.contains('.') {
            self.components.insert(key.to_string(), value);
        } else {
            self.palette.insert(key.to_string(), value);
        }
        self.revision = next_revision();
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let value = if key.contains('.') {
            self.components.get(key)
        } else {
            self.palette.get(key)
        };
        value.filter(|v| !v.is_null())
    }

    /// A new override set with `other` layered on top
    pub fn merge(&self, other: &ThemeOverrides) -> ThemeOverrides {
        let mut merged = self.clone();
        merged
            .palette
            .extend(other.palette.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
            .components
            .extend(other.components.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn clear(&mut self) -> &mut Self {
        self.palette.clear();
        self.components.clear();
        self.revision = next_revision();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.palette.is_empty() && self.components.is_empty()
    }

    pub fn palette(&self) -> &IndexMap<String, Value> {
        &self.palette
    }

    pub fn components(&self) -> &IndexMap<String, Value> {
        &self.components
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn to_value(&self) -> Value {
        let to_object = |map: &IndexMap<String, Value>| {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        };
        let mut out = Map::new();
        out.insert("palette".to_string(), to_object(&self.palette));
        out.insert("components".to_string(), to_object(&self.components));
        Value::Object(out)
    }

    pub fn from_value(value: &Value) -> Self {
        let mut overrides = ThemeOverrides::new();
        for group in ["palette", "components"] {
            if let Some(map) = value.get(group).and_then(Value::as_object) {
                let target = if group == "palette" {
                    &mut overrides.palette
                } else {
                    &mut overrides.components
                };
                for (k, v) in map {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        overrides
    }
}

/// Build an override set from `(key, value)` pairs
pub fn overrides<I, K>(pairs: I) -> ThemeOverrides
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut result = ThemeOverrides::new();
    for (key, value) in pairs {
        result.set(key.as_ref(), value);
    }
    result
}

/// Load the default element styles once; falls back to built-in styles when unavailable
pub fn load_default_style(loader: &ThemeLoader) -> Arc<LayoutStyle> {
    let loaded = Theme::from_reference(loader, DEFAULT_STYLE_REFERENCE)
        .and_then(|theme| theme.resolved_layout(CONTENT_LAYOUT));
    match loaded {
        Ok(Some(layout)) => Arc::new(layout),
        Ok(None) => {
            warn!("{} has no content layout, using built-in styles", DEFAULT_STYLE_REFERENCE);
            Arc::new(LayoutStyle::fallback())
        }
        Err(e) => {
            warn!("Failed to load default styles ({}), using built-in styles", e);
            Arc::new(LayoutStyle::fallback())
        }
    }
}

type CacheKey = (String, u64, u64);

/// Resolution context for one deck.
///
/// Slide overrides are meant to be pushed before a slide renders and cleared afterwards;
/// concurrent renders should each own a context.
pub struct ThemeContext {
    themes: Vec<Arc<Theme>>,
    deck_overrides: ThemeOverrides,
    slide_overrides: ThemeOverrides,
    resolved: Mutex<HashMap<CacheKey, Value>>,
    default_style: Arc<LayoutStyle>,
}

impl ThemeContext {
    pub fn new(themes: Vec<Arc<Theme>>, default_style: Arc<LayoutStyle>) -> Self {
        Self {
            themes,
            deck_overrides: ThemeOverrides::new(),
            slide_overrides: ThemeOverrides::new(),
            resolved: Mutex::new(HashMap::new()),
            default_style,
        }
    }

    /// Context over a single theme; default styles come from the bundled themes
    pub fn from_theme(theme: Theme) -> Self {
        Self::from_themes(vec![theme])
    }

    pub fn from_themes(themes: Vec<Theme>) -> Self {
        let default_style = load_default_style(&ThemeLoader::new());
        Self::new(themes.into_iter().map(Arc::new).collect(), default_style)
    }

    /// Load each reference in order; the first becomes the primary theme
    pub fn from_references(loader: &ThemeLoader, references: &[&str]) -> Result<Self> {
        let mut themes = Vec::with_capacity(references.len());
        for reference in references {
            themes.push(Arc::new(Theme::from_reference(loader, reference)?));
        }
        Ok(Self::new(themes, load_default_style(loader)))
    }

    pub fn themes(&self) -> &[Arc<Theme>] {
        &self.themes
    }

    pub fn primary_theme(&self) -> Option<&Arc<Theme>> {
        self.themes.first()
    }

    /// Append a fallback theme
    pub fn add_theme(&mut self, theme: Arc<Theme>) -> &mut Self {
        self.themes.push(theme);
        self.resolved.get_mut().clear();
        self
    }

    /// Make `theme` the primary theme; the previous ones become fallbacks
    pub fn prepend_theme(&mut self, theme: Arc<Theme>) -> &mut Self {
        self.themes.insert(0, theme);
        self.resolved.get_mut().clear();
        self
    }

    pub fn default_style(&self) -> &Arc<LayoutStyle> {
        &self.default_style
    }

    pub fn deck_overrides(&self) -> &ThemeOverrides {
        &self.deck_overrides
    }

    pub fn slide_overrides(&self) -> &ThemeOverrides {
        &self.slide_overrides
    }

    /// Set a deck-level override
    pub fn override_value(&mut self, key: &str, value: Value) -> &mut Self {
        self.deck_overrides.set(key, value);
        self.resolved.get_mut().clear();
        self
    }

    pub fn override_palette<I, K>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (key, value) in pairs {
            self.deck_overrides
                .palette
                .insert(key.as_ref().to_string(), value);
        }
        self.deck_overrides.revision = next_revision();
        self.resolved.get_mut().clear();
        self
    }

    pub fn clear_deck_overrides(&mut self) -> &mut Self {
        self.deck_overrides.clear();
        self.resolved.get_mut().clear();
        self
    }

    pub fn push_slide_override(&mut self, key: &str, value: Value) -> &mut Self {
        self.slide_overrides.set(key, value);
        self.resolved.get_mut().clear();
        self
    }

    /// Merge a whole override set into the slide overrides
    pub fn push_slide_overrides(&mut self, overrides: &ThemeOverrides) -> &mut Self {
        self.slide_overrides = self.slide_overrides.merge(overrides);
        self.resolved.get_mut().clear();
        self
    }

    pub fn clear_slide_overrides(&mut self) -> &mut Self {
        self.slide_overrides.clear();
        self.resolved.get_mut().clear();
        self
    }

    /// Resolve `key`: slide overrides, then deck overrides, then each theme in order
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let cache_key = (
            key.to_string(),
            self.slide_overrides.revision,
            self.deck_overrides.revision,
        );
        if let Some(value) = self.resolved.lock().get(&cache_key) {
            return Ok(Some(value.clone()));
        }

        let mut found = self
            .slide_overrides
            .get(key)
            .or_else(|| self.deck_overrides.get(key))
            .cloned();

        if found.is_none() {
            for theme in &self.themes {
                if let Some(resolved) = theme.get(key)? {
                    found = Some(Resolved::into_value(resolved));
                    break;
                }
            }
        }

        if let Some(value) = &found {
            self.resolved.lock().insert(cache_key, value.clone());
        }
        Ok(found)
    }

    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Flat palette: themes applied last to first, then deck and slide palette overrides
    pub fn get_palette(&self) -> IndexMap<String, Value> {
        let mut palette = IndexMap::new();
        for theme in self.themes.iter().rev() {
            for (k, v) in theme.variables() {
                palette.insert(k.clone(), v.clone());
            }
        }
        for (k, v) in self.deck_overrides.palette.iter().chain(self.slide_overrides.palette.iter()) {
            palette.insert(k.clone(), v.clone());
        }
        palette
    }

    /// Replace `${name}` with resolved values; unknown names are left as written
    pub fn resolve_variables(&self, text: &str) -> Result<String> {
        let mut failure = None;
        let replaced = VARIABLE_PATTERN.replace_all(text, |caps: &Captures| {
            match self.get(&caps[1]) {
                Ok(Some(value)) => value_to_text(&value),
                Ok(None) => caps[0].to_string(),
                Err(e) => {
                    failure.get_or_insert(e);
                    caps[0].to_string()
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(replaced.into_owned()),
        }
    }

    /// The named layout from the first theme that defines it, backed by the default styles
    pub fn layout_style(&self, name: &str) -> Result<LayoutStyle> {
        for theme in &self.themes {
            if let Some(layout) = theme.resolved_layout(name)? {
                debug!("Layout '{}' resolved from theme '{}'", name, theme.name);
                return Ok(layout.with_defaults(self.default_style.clone()));
            }
        }
        Ok(LayoutStyle::new(name).with_defaults(self.default_style.clone()))
    }
}
