// ABOUTME: Theme file loader with symbol search paths and "extends" inheritance
// ABOUTME: Validates every theme reference before reading and detects inheritance cycles per call

use crate::errors::{DeckError, Result};
use crate::paths::{is_safe_filename, resolve_safe_path};
use indexmap::IndexMap;
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYMBOL: &str = "default";
pub const DEFAULT_MAX_INHERITANCE_DEPTH: usize = 5;

/// Directory holding the themes bundled with the crate
pub fn bundled_themes_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/themes"))
}

/// Loads theme JSON by reference.
///
/// A reference is either `symbol:filename.json`, where the symbol names a registered search
/// directory, or a bare `filename.json` resolved next to the theme that refers to it.
#[derive(Debug, Clone)]
pub struct ThemeLoader {
    search_paths: IndexMap<String, PathBuf>,
    max_inheritance_depth: usize,
}

impl Default for ThemeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeLoader {
    pub fn new() -> Self {
        Self::with_default_dir(bundled_themes_dir())
    }

    /// Create a loader whose `default` symbol points at `dir` instead of the bundled themes
    pub fn with_default_dir(dir: PathBuf) -> Self {
        let dir = fs::canonicalize(&dir).unwrap_or(dir);
        let mut search_paths = IndexMap::new();
        search_paths.insert(DEFAULT_SYMBOL.to_string(), dir);
        Self {
            search_paths,
            max_inheritance_depth: DEFAULT_MAX_INHERITANCE_DEPTH,
        }
    }

    pub fn with_max_inheritance_depth(mut self, depth: usize) -> Self {
        self.max_inheritance_depth = depth;
        self
    }

    pub fn max_inheritance_depth(&self) -> usize {
        self.max_inheritance_depth
    }

    /// Register `symbol` so that `symbol:file.json` resolves inside `dir`
    pub fn add_search_path(&mut self, symbol: &str, dir: &Path) -> Result<()> {
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(DeckError::ValidationError(format!(
                "Invalid symbol name: '{}'",
                symbol
            )));
        }
        if !dir.is_dir() {
            return Err(DeckError::ValidationError(format!(
                "Search path must be a directory: {:?}",
                dir
            )));
        }
        let resolved = fs::canonicalize(dir)?;
        debug!("Registered theme symbol '{}' -> {:?}", symbol, resolved);
        self.search_paths.insert(symbol.to_string(), resolved);
        Ok(())
    }

    /// Remove a registered symbol. The `default` symbol cannot be removed.
    pub fn remove_search_path(&mut self, symbol: &str) {
        if symbol != DEFAULT_SYMBOL {
            self.search_paths.shift_remove(symbol);
        }
    }

    pub fn search_paths(&self) -> &IndexMap<String, PathBuf> {
        &self.search_paths
    }

    /// List the theme files available under a symbol, sorted by name
    pub fn available_themes(&self, symbol: &str) -> Result<Vec<String>> {
        let dir = self.symbol_dir(symbol)?;
        let pattern = dir.join("*.json");
        let pattern = pattern.to_str().ok_or_else(|| {
            DeckError::ValidationError(format!("Non UTF-8 theme directory: {:?}", dir))
        })?;
        let entries = glob::glob(pattern)
            .map_err(|e| DeckError::ValidationError(format!("Invalid glob pattern: {}", e)))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    fn symbol_dir(&self, symbol: &str) -> Result<&PathBuf> {
        self.search_paths.get(symbol).ok_or_else(|| {
            let available: Vec<&str> = self.search_paths.keys().map(String::as_str).collect();
            DeckError::ThemeLoadError(format!(
                "Unknown theme symbol '{}'. Available: {:?}",
                symbol, available
            ))
        })
    }

    /// Resolve a theme reference to an absolute path inside its allowed directory
    pub fn resolve_theme_path(&self, reference: &str, current_dir: Option<&Path>) -> Result<PathBuf> {
        let (base_dir, filename) = match reference.split_once(':') {
            Some((symbol, filename)) => (self.symbol_dir(symbol)?.clone(), filename),
            None => match current_dir {
                Some(dir) => (fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()), reference),
                None => {
                    return Err(DeckError::ThemeLoadError(format!(
                        "Cannot resolve relative reference '{}' without current directory",
                        reference
                    )))
                }
            },
        };

        if !is_safe_filename(filename) {
            return Err(DeckError::PathSecurityError(format!(
                "Invalid theme filename: '{}'. Must be a simple filename without path separators or shell characters.",
                filename
            )));
        }
        if !filename.ends_with(".json") {
            return Err(DeckError::PathSecurityError(format!(
                "Theme files must have .json extension: '{}'",
                filename
            )));
        }

        let candidate = resolve_safe_path(filename, Some(&base_dir), false, Some(0))?;
        if !candidate.exists() {
            return Err(DeckError::ThemeLoadError(format!(
                "Theme file not found: '{}'",
                candidate.display()
            )));
        }

        // Symlinks are followed before the containment check.
        let resolved = fs::canonicalize(&candidate)?;
        if !resolved.starts_with(&base_dir) {
            return Err(DeckError::PathSecurityError(format!(
                "Theme path escapes allowed directory: '{}'",
                reference
            )));
        }

        Ok(resolved)
    }

    /// Load a theme and everything it extends, merged into one JSON object
    pub fn load_theme_data(&self, reference: &str, current_dir: Option<&Path>) -> Result<Value> {
        let path = self.resolve_theme_path(reference, current_dir)?;
        info!("Loading theme {} from {:?}", reference, path);
        let mut stack = Vec::new();
        self.load_with_inheritance(&path, 0, &mut stack)
            .map(Value::Object)
    }

    fn load_with_inheritance(
        &self,
        path: &Path,
        depth: usize,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Map<String, Value>> {
        if stack.iter().any(|p| p == path) {
            let chain: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            return Err(DeckError::ThemeLoadError(format!(
                "Circular theme inheritance detected: {}",
                chain.join(" -> ")
            )));
        }
        if depth > self.max_inheritance_depth {
            return Err(DeckError::ThemeLoadError(format!(
                "Theme inheritance depth exceeds maximum ({}) at {}",
                self.max_inheritance_depth,
                path.display()
            )));
        }

        stack.push(path.to_path_buf());
        let result = self.read_and_merge(path, depth, stack);
        stack.pop();
        result
    }

    fn read_and_merge(
        &self,
        path: &Path,
        depth: usize,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Map<String, Value>> {
        let content = fs::read_to_string(path)?;
        let mut data = match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => map,
            _ => {
                return Err(DeckError::ThemeLoadError(format!(
                    "Theme file must contain a JSON object: '{}'",
                    path.display()
                )))
            }
        };

        match data.shift_remove("extends") {
            None | Some(Value::Null) => Ok(data),
            Some(Value::String(parent_ref)) if parent_ref.is_empty() => Ok(data),
            Some(Value::String(parent_ref)) => {
                debug!("Theme {:?} extends {}", path, parent_ref);
                let parent_path = self.resolve_theme_path(&parent_ref, path.parent())?;
                let parent = self.load_with_inheritance(&parent_path, depth + 1, stack)?;
                Ok(deep_merge(parent, data))
            }
            Some(other) => Err(DeckError::ThemeLoadError(format!(
                "\"extends\" must be a theme reference string, found {} in '{}'",
                other,
                path.display()
            ))),
        }
    }
}

/// Merge `overlay` into `base`; nested objects merge key-wise, any other value replaces.
pub fn deep_merge(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in overlay {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = base.get_mut(&key) {
                let merged = deep_merge(std::mem::take(existing), incoming);
                *existing = merged;
                continue;
            }
            base.insert(key, Value::Object(incoming));
        } else {
            base.insert(key, value);
        }
    }
    base
}
