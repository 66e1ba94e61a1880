// ABOUTME: Configuration module for stagdeck
// ABOUTME: Provides defaults and environment variable overrides for themes, parsing and layout

use crate::deck::DEFAULT_THEME_REFERENCE;
use crate::errors::{DeckError, Result};
use crate::layout::LayoutConfig;
use crate::markdown::MarkdownParser;
use crate::theme::cache::DEFAULT_EXPRESSION_CAPACITY;
use crate::theme::loader::{bundled_themes_dir, ThemeLoader, DEFAULT_MAX_INHERITANCE_DEPTH};
use log::warn;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory behind the `default` theme symbol
    pub theme_dir: PathBuf,
    pub default_theme: String,
    pub separator: String,
    pub max_inheritance_depth: usize,
    pub expr_cache_size: usize,
    pub layout: LayoutConfig,
    /// Extra `symbol -> directory` theme search paths
    pub theme_paths: Vec<(String, PathBuf)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme_dir: bundled_themes_dir(),
            default_theme: DEFAULT_THEME_REFERENCE.to_string(),
            separator: MarkdownParser::DEFAULT_SEPARATOR.to_string(),
            max_inheritance_depth: DEFAULT_MAX_INHERITANCE_DEPTH,
            expr_cache_size: DEFAULT_EXPRESSION_CAPACITY,
            layout: LayoutConfig::default(),
            theme_paths: Vec::new(),
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let theme_dir = env::var("STAGDECK_THEME_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or(defaults.theme_dir);
        let default_theme = env::var("STAGDECK_THEME").unwrap_or(defaults.default_theme);
        let separator = env::var("STAGDECK_SEPARATOR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.separator);
        let max_inheritance_depth =
            env_parse("STAGDECK_MAX_THEME_DEPTH", defaults.max_inheritance_depth);
        let expr_cache_size = env_parse("STAGDECK_EXPR_CACHE_SIZE", defaults.expr_cache_size);

        let mut layout = defaults.layout;
        layout.min_scale = env_parse("STAGDECK_MIN_SCALE", layout.min_scale);

        Self {
            theme_dir,
            default_theme,
            separator,
            max_inheritance_depth,
            expr_cache_size,
            layout,
            theme_paths: Vec::new(),
        }
    }

    /// Register an extra theme symbol from a `SYMBOL=DIR` argument
    pub fn add_theme_path(&mut self, spec: &str) -> Result<()> {
        let (symbol, dir) = spec.split_once('=').ok_or_else(|| {
            DeckError::ConfigError(format!("Expected SYMBOL=DIR, got '{}'", spec))
        })?;
        self.theme_paths
            .push((symbol.trim().to_string(), PathBuf::from(dir.trim())));
        Ok(())
    }

    /// A theme loader with the configured default directory, depth limit and search paths
    pub fn theme_loader(&self) -> Result<ThemeLoader> {
        let mut loader = ThemeLoader::with_default_dir(self.theme_dir.clone())
            .with_max_inheritance_depth(self.max_inheritance_depth);
        for (symbol, dir) in &self.theme_paths {
            loader.add_search_path(symbol, Path::new(dir))?;
        }
        Ok(loader)
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout.clone()
    }
}
