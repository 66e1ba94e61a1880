// ABOUTME: Deck assembly from markdown strings and files, with named slide editing
// ABOUTME: Owns the deck's theme context and tracks the source files it was built from

use crate::errors::{DeckError, Result};
use crate::markdown::{
    parse_multi_region_markdown, parse_slide_markdown, BackgroundPosition, DeckInfo, Direction,
    FilterSetting, ImageRef, MarkdownParser, Region, TextStyle,
};
use crate::paths::validate_file_exists;
use crate::theme::cache::DEFAULT_EXPRESSION_CAPACITY;
use crate::theme::context::{load_default_style, ThemeContext};
use crate::theme::loader::{ThemeLoader, DEFAULT_SYMBOL};
use crate::theme::styles::LayoutStyle;
use crate::theme::{Theme, CONTENT_LAYOUT};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Theme used when overrides are set before any theme was chosen
pub const DEFAULT_THEME_REFERENCE: &str = "default:aurora.json";

/// Frontmatter themes name a bundled theme unless they carry a `symbol:` prefix
fn qualify_reference(reference: &str) -> String {
    if reference.contains(':') {
        reference.to_string()
    } else {
        format!("{}:{}", DEFAULT_SYMBOL, reference)
    }
}

/// One slide, parsed from markdown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    pub name: String,
    /// The markdown the slide was parsed from
    pub source: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub background: String,
    pub background_modifiers: String,
    pub background_position: BackgroundPosition,
    pub overlay: FilterSetting,
    pub blur: FilterSetting,
    pub images: Vec<ImageRef>,
    pub notes: String,
    pub text_style: TextStyle,
    pub classes: Vec<String>,
    pub transition: String,
    pub build_lists: Option<bool>,
    /// Present only when the slide has more than one region
    pub regions: Vec<Region>,
    pub direction: Direction,
}

impl Slide {
    /// Parse a slide; the name comes from a `[name: ...]` directive when there is one
    pub fn from_markdown(markdown: &str) -> Self {
        let parsed = parse_slide_markdown(markdown);
        let multi = parse_multi_region_markdown(markdown);
        let regions = if multi.regions.len() > 1 {
            multi.regions
        } else {
            Vec::new()
        };

        Slide {
            name: parsed.name.unwrap_or_default(),
            source: markdown.to_string(),
            title: parsed.title,
            subtitle: parsed.subtitle,
            content: parsed.content,
            background: parsed.background,
            background_modifiers: parsed.background_modifiers,
            background_position: parsed.background_position,
            overlay: parsed.overlay_opacity,
            blur: parsed.blur_radius,
            images: parsed.images,
            notes: parsed.notes,
            text_style: parsed.text_style,
            classes: parsed.classes,
            transition: parsed.transition,
            build_lists: parsed.build_lists,
            regions,
            direction: multi.direction,
        }
    }

    pub fn is_multi_region(&self) -> bool {
        self.regions.len() > 1
    }
}

/// An ordered collection of slides plus the themes they render with
pub struct Deck {
    pub info: DeckInfo,
    slides: Vec<Slide>,
    source_files: Vec<PathBuf>,
    loader: ThemeLoader,
    theme_context: Option<ThemeContext>,
    default_theme: String,
    cache_capacity: usize,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    pub fn new() -> Self {
        Self::with_loader(ThemeLoader::new())
    }

    pub fn with_loader(loader: ThemeLoader) -> Self {
        Self {
            info: DeckInfo::default(),
            slides: Vec::new(),
            source_files: Vec::new(),
            loader,
            theme_context: None,
            default_theme: DEFAULT_THEME_REFERENCE.to_string(),
            cache_capacity: DEFAULT_EXPRESSION_CAPACITY,
        }
    }

    /// Theme loaded on demand when no theme has been chosen
    pub fn with_default_theme(mut self, reference: &str) -> Self {
        self.default_theme = reference.to_string();
        self
    }

    /// Expression cache size for every theme this deck loads
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn title(&self) -> &str {
        if self.info.title.is_empty() {
            "Presentation"
        } else {
            &self.info.title
        }
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn loader(&self) -> &ThemeLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut ThemeLoader {
        &mut self.loader
    }

    fn next_name(&self) -> String {
        format!("slide_{}", self.slides.len())
    }

    /// Append a slide, naming it `slide_<n>` if it has no name
    pub fn add(&mut self, mut slide: Slide) -> &mut Self {
        if slide.name.is_empty() {
            slide.name = self.next_name();
        }
        debug!("Adding slide '{}'", slide.name);
        self.slides.push(slide);
        self
    }

    /// Parse and append one slide; an explicit `name` wins over a `[name:]` directive
    pub fn add_markdown(&mut self, markdown: &str, name: Option<&str>) -> &mut Self {
        let mut slide = Slide::from_markdown(markdown);
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            slide.name = name.to_string();
        }
        self.add(slide)
    }

    /// Load every slide from a markdown file split on `separator` (default `---`)
    pub fn add_from_file(&mut self, path: &Path, separator: Option<&str>) -> Result<&mut Self> {
        validate_file_exists(path)?;
        let source = fs::read_to_string(path)?;

        let parser = match separator {
            Some(sep) => MarkdownParser::new().with_separator(sep),
            None => MarkdownParser::new(),
        };
        let (info, slides) = parser.split(&source);
        info!("Loaded {} slides from {:?}", slides.len(), path);

        self.merge_info(info);
        for markdown in &slides {
            self.add_markdown(markdown, None);
        }
        if self.info.title.is_empty() {
            if let Some(first) = self.slides.first() {
                self.info.title = first.title.clone();
            }
        }

        let resolved = fs::canonicalize(path)?;
        if !self.source_files.contains(&resolved) {
            self.source_files.push(resolved);
        }
        Ok(self)
    }

    fn merge_info(&mut self, info: DeckInfo) {
        if self.info.title.is_empty() {
            self.info.title = info.title;
        }
        if self.info.theme.is_empty() {
            self.info.theme = info.theme;
        }
        if !info.author.is_empty() {
            self.info.author = info.author;
        }
        if !info.date.is_empty() {
            self.info.date = info.date;
        }
        if !info.footer.is_empty() {
            self.info.footer = info.footer;
        }
        self.info.slide_numbers |= info.slide_numbers;
        self.info.build_lists |= info.build_lists;
        self.info.aspect_ratio = info.aspect_ratio;
        self.info.metadata.extend(info.metadata);
    }

    /// Insert a slide next to the named one. Exactly one of `before` and `after` must be given.
    pub fn insert(
        &mut self,
        markdown: &str,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<&mut Self> {
        let (anchor, offset) = match (before, after) {
            (Some(name), None) => (name, 0),
            (None, Some(name)) => (name, 1),
            _ => {
                return Err(DeckError::ValidationError(
                    "Exactly one of before/after must be given".to_string(),
                ))
            }
        };
        let index = self.require_index(anchor)?;

        let mut slide = Slide::from_markdown(markdown);
        if slide.name.is_empty() {
            slide.name = self.next_name();
        }
        debug!("Inserting slide '{}' at {}", slide.name, index + offset);
        self.slides.insert(index + offset, slide);
        Ok(self)
    }

    /// Replace the named slide in place, keeping its name
    pub fn replace(&mut self, name: &str, markdown: &str) -> Result<&mut Self> {
        let index = self.require_index(name)?;
        let mut slide = Slide::from_markdown(markdown);
        slide.name = name.to_string();
        self.slides[index] = slide;
        Ok(self)
    }

    fn require_index(&self, name: &str) -> Result<usize> {
        self.get_slide_index(name)
            .ok_or_else(|| DeckError::SlideNotFoundError(name.to_string()))
    }

    pub fn get_slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn get_slide_by_name(&self, name: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.name == name)
    }

    pub fn get_slide_index(&self, name: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.name == name)
    }

    /// Files this deck was loaded from, canonicalized, in load order
    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    fn load_theme(&self, reference: &str) -> Result<Arc<Theme>> {
        let theme = Theme::from_reference(&self.loader, reference)?
            .with_cache_capacity(self.cache_capacity);
        Ok(Arc::new(theme))
    }

    fn new_context(&self, references: &[&str]) -> Result<ThemeContext> {
        let themes = references
            .iter()
            .map(|reference| self.load_theme(reference))
            .collect::<Result<Vec<_>>>()?;
        Ok(ThemeContext::new(themes, load_default_style(&self.loader)))
    }

    /// Make `reference` the primary theme. Earlier themes stay as fallbacks.
    pub fn use_theme(&mut self, reference: &str) -> Result<&mut Self> {
        let theme = self.load_theme(reference)?;
        info!("Using theme '{}' ({})", theme.name, reference);
        match self.theme_context.as_mut() {
            Some(context) => {
                context.prepend_theme(theme);
            }
            None => {
                let mut context = self.new_context(&[])?;
                context.prepend_theme(theme);
                self.theme_context = Some(context);
            }
        }
        Ok(self)
    }

    /// Replace the theme list; the first reference is primary
    pub fn use_themes(&mut self, references: &[&str]) -> Result<&mut Self> {
        self.theme_context = Some(self.new_context(references)?);
        Ok(self)
    }

    /// Use an already-built theme as the primary theme
    pub fn use_theme_value(&mut self, theme: Theme) -> Result<&mut Self> {
        self.theme_context()?.prepend_theme(Arc::new(theme));
        Ok(self)
    }

    /// Deck-level override, e.g. `primary` or `pie_chart.colors`
    pub fn override_value(&mut self, key: &str, value: Value) -> Result<&mut Self> {
        self.theme_context()?.override_value(key, value);
        Ok(self)
    }

    pub fn override_palette<I, K>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.theme_context()?.override_palette(pairs);
        Ok(self)
    }

    /// A resolved theme value, or `None` when no theme is in use
    pub fn get_theme_value(&self, key: &str) -> Result<Option<Value>> {
        match &self.theme_context {
            Some(context) => context.get(key),
            None => Ok(None),
        }
    }

    /// The deck's theme context, loading the frontmatter theme or the default theme first if needed
    pub fn theme_context(&mut self) -> Result<&mut ThemeContext> {
        let context = match self.theme_context.take() {
            Some(context) => context,
            None => {
                let reference = if self.info.theme.is_empty() {
                    self.default_theme.clone()
                } else {
                    qualify_reference(&self.info.theme)
                };
                debug!("Creating theme context from {}", reference);
                self.new_context(&[&reference])?
            }
        };
        Ok(self.theme_context.insert(context))
    }

    /// The theme context if one has been created
    pub fn context(&self) -> Option<&ThemeContext> {
        self.theme_context.as_ref()
    }

    /// Style for rendering slides: the content layout of the theme stack
    pub fn layout_style(&mut self) -> Result<LayoutStyle> {
        self.theme_context()?.layout_style(CONTENT_LAYOUT)
    }
}
