// ABOUTME: Markdown parsing for decks and individual slides
// ABOUTME: Extracts titles, backgrounds, image modifiers, directives, notes and multi-region layouts

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref NAME_DIRECTIVE: Regex = Regex::new(r"(?i)^\[name:\s*(.*?)\s*\]$").unwrap();
    static ref STYLE_DIRECTIVE: Regex =
        Regex::new(r"^\[\.([\w.-]+):([\w-]+):\s*(.*?)\s*\]$").unwrap();
    static ref SLIDE_DIRECTIVE: Regex = Regex::new(r"^\[\.(\w[\w-]*):\s*(.*?)\s*\]$").unwrap();
    static ref IMAGE_TAG: Regex = Regex::new(r"^!\[([^\]]*)\]\((.+)\)$").unwrap();
    static ref DECK_DIRECTIVE: Regex = Regex::new(r"^(\w[\w-]*):\s*(.+)$").unwrap();
}

/// Overlay opacity or blur radius requested by an image modifier
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterSetting {
    /// No modifier given; the effect is off.
    #[default]
    Unset,
    /// Bare `overlay` / `blur`: use the theme's default strength.
    ThemeDefault,
    Explicit(f64),
}

impl FilterSetting {
    pub fn is_set(&self) -> bool {
        !matches!(self, FilterSetting::Unset)
    }

    /// Strength to apply given the theme default; zero when unset
    pub fn effective(&self, theme_default: f64) -> f64 {
        match self {
            FilterSetting::Unset => 0.0,
            FilterSetting::ThemeDefault => theme_default,
            FilterSetting::Explicit(value) => *value,
        }
    }

    fn from_modifier(value: Option<&str>) -> Self {
        match value.and_then(|v| v.trim().parse::<f64>().ok()) {
            Some(n) => FilterSetting::Explicit(n),
            None => FilterSetting::ThemeDefault,
        }
    }
}

/// Where a background image sits; anything but `Center` splits the slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundPosition {
    #[default]
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

impl BackgroundPosition {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(BackgroundPosition::Left),
            "right" => Some(BackgroundPosition::Right),
            "top" => Some(BackgroundPosition::Top),
            "bottom" => Some(BackgroundPosition::Bottom),
            "center" => Some(BackgroundPosition::Center),
            _ => None,
        }
    }

    /// Empty for `Center`, otherwise the keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundPosition::Center => "",
            BackgroundPosition::Left => "left",
            BackgroundPosition::Right => "right",
            BackgroundPosition::Top => "top",
            BackgroundPosition::Bottom => "bottom",
        }
    }

    pub fn is_split(&self) -> bool {
        !matches!(self, BackgroundPosition::Center)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, BackgroundPosition::Top | BackgroundPosition::Bottom)
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, BackgroundPosition::Left | BackgroundPosition::Right)
    }

    /// CSS `background-position` keywords for a single image
    pub fn css_position(&self) -> &'static str {
        match self {
            BackgroundPosition::Center => "center",
            BackgroundPosition::Left => "left center",
            BackgroundPosition::Right => "right center",
            BackgroundPosition::Top => "center top",
            BackgroundPosition::Bottom => "center bottom",
        }
    }
}

impl fmt::Display for BackgroundPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens from an image tag's alt text, e.g. `![left overlay:0.6 blur](photo.jpg)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaModifiers {
    pub background: bool,
    pub inline: bool,
    pub position: BackgroundPosition,
    pub overlay: FilterSetting,
    pub blur: FilterSetting,
    pub radius: Option<String>,
    pub fit: Option<String>,
    pub extra: IndexMap<String, String>,
}

impl MediaModifiers {
    pub fn parse(alt: &str) -> Self {
        let mut modifiers = MediaModifiers::default();
        for token in alt.split_whitespace() {
            let token = token.to_lowercase();
            let (key, value) = match token.split_once(':') {
                Some((k, v)) => (k, Some(v)),
                None => (token.as_str(), None),
            };
            match (key, value) {
                ("background", None) => modifiers.background = true,
                ("inline", None) => modifiers.inline = true,
                ("overlay", v) => modifiers.overlay = FilterSetting::from_modifier(v),
                ("blur", v) => modifiers.blur = FilterSetting::from_modifier(v),
                ("radius", Some(v)) => modifiers.radius = Some(v.to_string()),
                ("fit", Some(v)) => modifiers.fit = Some(v.to_string()),
                (k, None) => {
                    if let Some(position) = BackgroundPosition::from_token(k) {
                        modifiers.position = position;
                    }
                }
                (k, Some(v)) => {
                    modifiers.extra.insert(k.to_string(), v.to_string());
                }
            }
        }
        modifiers
    }
}

/// Colors and gradients are kept as written; anything else is an image URL
pub fn normalize_background(value: &str) -> String {
    let value = value.trim();
    if value.starts_with('#') || value.contains("gradient") || value.starts_with("url(") {
        value.to_string()
    } else {
        format!("url({})", value)
    }
}

/// An image left in the slide content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    pub src: String,
}

/// Element style overrides from `[.element:property: value]` directives
pub type TextStyle = IndexMap<String, IndexMap<String, String>>;

/// Structured data parsed from one slide's markdown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideMarkdown {
    pub title: String,
    pub subtitle: String,
    /// Color, gradient or `url(...)`
    pub background: String,
    /// Raw alt text of the background tag
    pub background_modifiers: String,
    pub background_position: BackgroundPosition,
    pub overlay_opacity: FilterSetting,
    pub blur_radius: FilterSetting,
    pub content: String,
    pub images: Vec<ImageRef>,
    pub notes: String,
    pub text_style: TextStyle,
    pub name: Option<String>,
    pub classes: Vec<String>,
    pub transition: String,
    pub build_lists: Option<bool>,
}

enum Line<'a> {
    Name(String),
    Note(&'a str),
    Style(String, String, String),
    Directive(String, String),
    Image(&'a str, &'a str),
    Text,
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if let Some(caps) = NAME_DIRECTIVE.captures(trimmed) {
        return Line::Name(caps[1].to_string());
    }
    if let Some(note) = trimmed.strip_prefix('^') {
        return Line::Note(note.trim());
    }
    if let Some(caps) = STYLE_DIRECTIVE.captures(trimmed) {
        return Line::Style(caps[1].to_string(), caps[2].to_string(), caps[3].to_string());
    }
    if let Some(caps) = SLIDE_DIRECTIVE.captures(trimmed) {
        return Line::Directive(caps[1].to_lowercase().replace('-', "_"), caps[2].to_string());
    }
    if let Some(caps) = IMAGE_TAG.captures(trimmed) {
        let alt = caps.get(1).map_or("", |m| m.as_str());
        let src = caps.get(2).map_or("", |m| m.as_str());
        return Line::Image(alt, src);
    }
    Line::Text
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

/// Join lines, dropping leading and trailing blank lines
fn join_content(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e]
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn heading(line: &str, level: usize) -> Option<&str> {
    let trimmed = line.trim();
    let marker = "#".repeat(level);
    let rest = trimmed.strip_prefix(&marker)?;
    if rest.starts_with('#') {
        return None;
    }
    let text = rest.strip_prefix(' ')?;
    Some(text.trim())
}

/// Slide-wide state shared by the single- and multi-region parsers
#[derive(Default)]
struct Directives {
    name: Option<String>,
    notes: Vec<String>,
    text_style: TextStyle,
    classes: Vec<String>,
    transition: String,
    build_lists: Option<bool>,
    background: Option<String>,
}

impl Directives {
    /// Consume a directive or note line; false when the line is something else
    fn absorb(&mut self, line: &Line<'_>) -> bool {
        match line {
            Line::Name(name) => self.name = Some(name.clone()),
            Line::Note(note) => self.notes.push(note.to_string()),
            Line::Style(element, prop, value) => {
                self.text_style
                    .entry(element.clone())
                    .or_default()
                    .insert(prop.clone(), value.clone());
            }
            Line::Directive(key, value) => match key.as_str() {
                "background" => self.background = Some(value.clone()),
                "class" => self
                    .classes
                    .extend(value.split_whitespace().map(str::to_string)),
                "transition" => self.transition = value.clone(),
                "build_lists" => self.build_lists = Some(parse_bool(value)),
                other => debug!("Ignoring unknown slide directive '{}'", other),
            },
            _ => return false,
        }
        true
    }
}

/// Title and subtitle detection: one `#` heading, optionally followed by a `##` heading
struct HeadingTracker<'a> {
    title: Option<&'a str>,
    subtitle: Option<&'a str>,
    awaiting_subtitle: bool,
    done: bool,
}

impl<'a> HeadingTracker<'a> {
    fn new() -> Self {
        Self {
            title: None,
            subtitle: None,
            awaiting_subtitle: false,
            done: false,
        }
    }

    /// Returns true when the line was consumed as a title or subtitle
    fn feed(&mut self, line: &'a str, body_started: bool) -> bool {
        if body_started {
            self.awaiting_subtitle = false;
        }
        if self.awaiting_subtitle {
            if line.trim().is_empty() {
                return true;
            }
            self.awaiting_subtitle = false;
            if let Some(sub) = heading(line, 2) {
                self.subtitle = Some(sub);
                return true;
            }
        }
        if self.done || body_started {
            return false;
        }
        if let Some(title) = heading(line, 1) {
            self.title = Some(title);
            self.awaiting_subtitle = true;
            self.done = true;
            return true;
        }
        false
    }
}

/// Parse one slide.
///
/// An image tag becomes the background when its alt text says `background`, names a
/// position, or when it is the first thing after the title and not marked `inline`.
pub fn parse_slide_markdown(markdown: &str) -> SlideMarkdown {
    let mut slide = SlideMarkdown::default();
    let mut directives = Directives::default();
    let mut headings = HeadingTracker::new();
    let mut content: Vec<&str> = Vec::new();
    let mut body_started = false;
    let mut in_fence = false;

    for line in markdown.lines() {
        if in_fence || is_fence(line) {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            content.push(line);
            body_started = true;
            continue;
        }

        let kind = classify(line);
        if directives.absorb(&kind) {
            continue;
        }

        if let Line::Image(alt, src) = kind {
            let modifiers = MediaModifiers::parse(alt);
            let implicit = !body_started && slide.background.is_empty();
            let is_background = !modifiers.inline
                && (modifiers.background || modifiers.position.is_split() || implicit);
            if is_background {
                slide.background = normalize_background(src);
                slide.background_modifiers = alt.to_string();
                slide.background_position = modifiers.position;
                slide.overlay_opacity = modifiers.overlay;
                slide.blur_radius = modifiers.blur;
            } else {
                slide.images.push(ImageRef {
                    alt: alt.to_string(),
                    src: src.to_string(),
                });
                content.push(line);
                body_started = true;
            }
            continue;
        }

        if headings.feed(line, body_started) {
            continue;
        }

        if !line.trim().is_empty() {
            body_started = true;
        }
        content.push(line);
    }

    slide.title = headings.title.unwrap_or_default().to_string();
    slide.subtitle = headings.subtitle.unwrap_or_default().to_string();
    slide.content = join_content(&content);
    if slide.background.is_empty() {
        if let Some(bg) = directives.background {
            slide.background = bg;
        }
    }
    slide.notes = directives.notes.join("\n");
    slide.name = directives.name;
    slide.text_style = directives.text_style;
    slide.classes = directives.classes;
    slide.transition = directives.transition;
    slide.build_lists = directives.build_lists;
    slide
}

/// Split direction of a multi-region slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
        }
    }
}

/// One pane of a multi-region slide
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    /// Image source as written in the tag (path, URL, color or gradient)
    pub image: String,
    pub modifiers: String,
    pub content: String,
    pub title: String,
    pub subtitle: String,
    pub position: BackgroundPosition,
    pub overlay: FilterSetting,
    pub blur: FilterSetting,
}

impl Region {
    /// Background value in the same form `SlideMarkdown::background` uses
    pub fn background(&self) -> String {
        if self.image.is_empty() {
            String::new()
        } else {
            normalize_background(&self.image)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiRegionSlide {
    pub regions: Vec<Region>,
    pub direction: Direction,
    pub name: Option<String>,
    pub notes: String,
    pub text_style: TextStyle,
}

fn direction_of(regions: &[Region]) -> Direction {
    let any_vertical = regions.iter().any(|r| r.position.is_vertical());
    let any_horizontal = regions.iter().any(|r| r.position.is_horizontal());
    if any_vertical && !any_horizontal {
        Direction::Vertical
    } else {
        Direction::Horizontal
    }
}

fn parse_region(image: &str, alt: &str, lines: &[&str]) -> Region {
    let modifiers = MediaModifiers::parse(alt);
    let mut headings = HeadingTracker::new();
    let mut content = Vec::new();
    let mut body_started = false;
    let mut in_fence = false;

    for &line in lines {
        if in_fence || is_fence(line) {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            content.push(line);
            body_started = true;
            continue;
        }
        // A leading `##` without a title still counts as the subtitle.
        if !body_started && headings.title.is_none() && headings.subtitle.is_none() {
            if let Some(sub) = heading(line, 2) {
                headings.subtitle = Some(sub);
                continue;
            }
        }
        if headings.feed(line, body_started) {
            continue;
        }
        if !line.trim().is_empty() {
            body_started = true;
        }
        content.push(line);
    }

    Region {
        image: image.trim().to_string(),
        modifiers: alt.to_string(),
        content: join_content(&content),
        title: headings.title.unwrap_or_default().to_string(),
        subtitle: headings.subtitle.unwrap_or_default().to_string(),
        position: modifiers.position,
        overlay: modifiers.overlay,
        blur: modifiers.blur,
    }
}

/// Parse a slide whose image tags each open a region.
///
/// Fewer than two non-inline image tags yields a single region built from
/// `parse_slide_markdown`.
pub fn parse_multi_region_markdown(markdown: &str) -> MultiRegionSlide {
    let mut directives = Directives::default();
    let mut prelude: Vec<&str> = Vec::new();
    let mut spans: Vec<(&str, &str, Vec<&str>)> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if in_fence || is_fence(line) {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            match spans.last_mut() {
                Some((_, _, lines)) => lines.push(line),
                None => prelude.push(line),
            }
            continue;
        }

        let kind = classify(line);
        if directives.absorb(&kind) {
            continue;
        }
        match kind {
            Line::Image(alt, src) if !MediaModifiers::parse(alt).inline => {
                spans.push((src, alt, Vec::new()));
            }
            _ => match spans.last_mut() {
                Some((_, _, lines)) => lines.push(line),
                None => prelude.push(line),
            },
        }
    }

    if spans.len() < 2 {
        let single = parse_slide_markdown(markdown);
        let region = Region {
            image: strip_url(&single.background),
            modifiers: single.background_modifiers.clone(),
            content: single.content.clone(),
            title: single.title.clone(),
            subtitle: single.subtitle.clone(),
            position: single.background_position,
            overlay: single.overlay_opacity,
            blur: single.blur_radius,
        };
        return MultiRegionSlide {
            direction: direction_of(std::slice::from_ref(&region)),
            regions: vec![region],
            name: single.name,
            notes: single.notes,
            text_style: single.text_style,
        };
    }

    let mut regions: Vec<Region> = spans
        .iter()
        .map(|(src, alt, lines)| parse_region(src, alt, lines))
        .collect();

    let prelude = join_content(&prelude);
    if !prelude.is_empty() {
        let first = &mut regions[0];
        first.content = if first.content.is_empty() {
            prelude
        } else {
            format!("{}\n\n{}", prelude, first.content)
        };
    }

    MultiRegionSlide {
        direction: direction_of(&regions),
        regions,
        name: directives.name,
        notes: directives.notes.join("\n"),
        text_style: directives.text_style,
    }
}

/// Bare image path from a background value: `url("a.jpg")` becomes `a.jpg`
pub fn strip_url(value: &str) -> String {
    let value = value.trim();
    let inner = value
        .strip_prefix("url(")
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);
    inner.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Deck-wide settings from frontmatter and leading directives
#[derive(Debug, Clone, PartialEq)]
pub struct DeckInfo {
    pub title: String,
    pub author: String,
    pub date: String,
    pub theme: String,
    pub footer: String,
    pub slide_numbers: bool,
    pub build_lists: bool,
    pub aspect_ratio: String,
    pub metadata: IndexMap<String, String>,
}

impl Default for DeckInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            date: String::new(),
            theme: String::new(),
            footer: String::new(),
            slide_numbers: false,
            build_lists: false,
            aspect_ratio: "16:9".to_string(),
            metadata: IndexMap::new(),
        }
    }
}

impl DeckInfo {
    fn apply(&mut self, key: &str, value: &str) -> bool {
        match key {
            "title" => self.title = value.to_string(),
            "author" => self.author = value.to_string(),
            "date" => self.date = value.to_string(),
            "theme" => self.theme = value.to_string(),
            "footer" => self.footer = value.to_string(),
            "slidenumbers" | "slide_numbers" => self.slide_numbers = parse_bool(value),
            "build_lists" | "buildlists" => self.build_lists = parse_bool(value),
            "aspect_ratio" | "aspectratio" => self.aspect_ratio = value.to_string(),
            _ => return false,
        }
        true
    }
}

/// Splits deck source into slides.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    separator: String,
    headers_as_slides: bool,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    pub const DEFAULT_SEPARATOR: &'static str = "---";

    pub fn new() -> Self {
        Self {
            separator: Self::DEFAULT_SEPARATOR.to_string(),
            headers_as_slides: false,
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.trim().to_string();
        self
    }

    /// Start a new slide at every `#` heading instead of at separator lines
    pub fn headers_as_slides(mut self, enabled: bool) -> Self {
        self.headers_as_slides = enabled;
        self
    }

    /// Deck settings plus the raw markdown of each non-empty slide
    pub fn split(&self, source: &str) -> (DeckInfo, Vec<String>) {
        let mut info = DeckInfo::default();
        let body = self.strip_frontmatter(source, &mut info);
        let body = strip_deck_directives(body, &mut info);

        let mut slides = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut in_fence = false;

        for line in body.lines() {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            let boundary = !in_fence
                && if self.headers_as_slides {
                    heading(line, 1).is_some()
                } else {
                    line.trim() == self.separator
                };

            if boundary {
                slides.push(current.join("\n"));
                current.clear();
                if !self.headers_as_slides {
                    continue;
                }
            }
            current.push(line);
        }
        slides.push(current.join("\n"));

        let slides: Vec<String> = slides
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_matches('\n').to_string())
            .collect();
        debug!("Split deck into {} slides", slides.len());
        (info, slides)
    }

    /// Parse every slide; the deck title falls back to the first slide's title
    pub fn parse(&self, source: &str) -> (DeckInfo, Vec<SlideMarkdown>) {
        let (mut info, raw) = self.split(source);
        let slides: Vec<SlideMarkdown> = raw.iter().map(|s| parse_slide_markdown(s)).collect();
        if info.title.is_empty() {
            if let Some(first) = slides.first() {
                info.title = first.title.clone();
            }
        }
        (info, slides)
    }

    fn strip_frontmatter<'a>(&self, source: &'a str, info: &mut DeckInfo) -> &'a str {
        let mut lines = source.split_inclusive('\n');
        let Some(first) = lines.next() else {
            return source;
        };
        if first.trim() != "---" {
            return source;
        }

        let mut consumed = first.len();
        let mut entries: Vec<(String, &str)> = Vec::new();
        for line in lines {
            consumed += line.len();
            let trimmed = line.trim();
            if trimmed == "---" {
                for (key, value) in entries {
                    if !info.apply(&key, value) {
                        info.metadata.insert(key, value.to_string());
                    }
                }
                return &source[consumed..];
            }
            if trimmed.is_empty() {
                continue;
            }
            // Frontmatter is only `key: value` lines; anything else means this is a slide.
            let Some((key, value)) = trimmed.split_once(':') else {
                return source;
            };
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                return source;
            }
            entries.push((
                key.to_lowercase().replace('-', "_"),
                value.trim().trim_matches(|c| c == '"' || c == '\''),
            ));
        }
        source
    }
}

/// Consume `footer: ...` style lines that precede the first slide content
fn strip_deck_directives(source: &str, info: &mut DeckInfo) -> String {
    let mut lines = source.lines().peekable();
    let mut kept = Vec::new();

    while let Some(&line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }
        let Some(caps) = DECK_DIRECTIVE.captures(trimmed) else {
            break;
        };
        let key = caps[1].to_lowercase().replace('-', "_");
        let applied = matches!(
            key.as_str(),
            "footer" | "slidenumbers" | "slide_numbers" | "build_lists" | "buildlists" | "theme"
        ) && info.apply(&key, caps[2].trim());
        if !applied {
            break;
        }
        lines.next();
    }

    kept.extend(lines);
    kept.join("\n")
}
