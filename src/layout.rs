// ABOUTME: Content analysis, automatic font scaling and layout mode selection for slides
// ABOUTME: Composes per-slide render plans including split backgrounds and panorama regions

use crate::deck::Slide;
use crate::markdown::{strip_url, BackgroundPosition, Direction, FilterSetting, Region, TextStyle};
use crate::theme::styles::{Element, ElementStyle, LayoutStyle};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixels per rem on the 1920x1080 reference canvas
pub const REM_TO_PX: f64 = 20.0;
/// Content-only slides render their content slightly larger
pub const FULL_PAGE_BOOST: f64 = 1.2;
pub const DEFAULT_OVERLAY_OPACITY: f64 = 0.5;
pub const DEFAULT_OVERLAY_COLOR: &str = "#000000";
pub const DEFAULT_BLUR_RADIUS: f64 = 4.0;
pub const DEFAULT_SPLIT_BACKGROUND: &str = "#1a1a2e";

lazy_static! {
    static ref BULLET_LINE: Regex = Regex::new(r"^\s*[-*+]\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Table,
    Bullets,
    Code,
    #[default]
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Table => "table",
            ContentType::Bullets => "bullets",
            ContentType::Code => "code",
            ContentType::Text => "text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements of a slide's markdown content used for scaling
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentMetrics {
    pub content_type: ContentType,
    pub table_rows: usize,
    pub table_cols: usize,
    pub avg_cell_length: f64,
    pub max_cell_length: usize,
    pub bullet_count: usize,
    pub max_line_length: usize,
    pub code_lines: usize,
    pub max_code_line_length: usize,
    pub total_chars: usize,
    pub line_count: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn max_line_length<'a>(lines: impl Iterator<Item = &'a str>) -> usize {
    lines.map(char_len).max().unwrap_or(0)
}

fn table_cells(line: &str) -> impl Iterator<Item = &str> {
    line.split('|').map(str::trim).filter(|c| !c.is_empty())
}

/// `|---|:--:|` style rows
fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
}

/// Lines of the first fenced block; an unclosed fence runs to the end
fn first_code_block(content: &str) -> Option<Vec<&str>> {
    let mut lines = content.lines();
    lines.by_ref().find(|l| l.trim_start().starts_with("```"))?;
    let mut block = Vec::new();
    for line in lines {
        if line.trim_start().starts_with("```") {
            break;
        }
        block.push(line);
    }
    Some(block)
}

/// Classify content as table, code, bullets or text and measure it.
///
/// Classification is checked in that order and only one applies.
pub fn analyze_content(content: &str) -> ContentMetrics {
    let mut metrics = ContentMetrics::default();
    let content = content.trim();
    if content.is_empty() {
        return metrics;
    }

    metrics.total_chars = char_len(content);
    metrics.line_count = content.matches('\n').count() + 1;

    if content.starts_with('|') {
        metrics.content_type = ContentType::Table;
        let rows: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('|'))
            .collect();
        let data: Vec<&str> = rows.iter().copied().filter(|l| !is_separator_row(l)).collect();

        metrics.table_rows = data.len();
        metrics.table_cols = rows.first().map_or(0, |l| table_cells(l).count());

        let cells: Vec<usize> = data
            .iter()
            .flat_map(|l| table_cells(l))
            .map(char_len)
            .collect();
        if !cells.is_empty() {
            metrics.avg_cell_length = cells.iter().sum::<usize>() as f64 / cells.len() as f64;
            metrics.max_cell_length = cells.iter().copied().max().unwrap_or(0);
        }
        return metrics;
    }

    if content.contains("```") {
        metrics.content_type = ContentType::Code;
        if let Some(block) = first_code_block(content) {
            metrics.code_lines = block.len();
            metrics.max_code_line_length = max_line_length(block.into_iter());
        }
        return metrics;
    }

    let bullets = content.lines().filter(|l| BULLET_LINE.is_match(l)).count();
    if bullets > 0 {
        metrics.content_type = ContentType::Bullets;
        metrics.bullet_count = bullets;
        metrics.max_line_length = max_line_length(content.lines());
        return metrics;
    }

    metrics.content_type = ContentType::Text;
    metrics.max_line_length = max_line_length(content.lines());
    metrics
}

/// Margins and sizes for slide layout; margins are percentages, sizes are rem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub title_height: f64,
    pub title_gap: f64,
    pub title_only_size: f64,
    pub subtitle_size: f64,
    pub content_only_padding: f64,
    pub title_size: f64,
    pub content_title_gap: f64,
    pub base_text_size: f64,
    pub base_table_size: f64,
    pub base_code_size: f64,
    /// Scale never drops below this
    pub min_scale: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_top: 3.0,
            margin_bottom: 6.0,
            margin_left: 5.0,
            margin_right: 5.0,
            title_height: 10.0,
            title_gap: 2.5,
            title_only_size: 8.0,
            subtitle_size: 3.5,
            content_only_padding: 8.0,
            title_size: 4.5,
            content_title_gap: 3.0,
            base_text_size: 2.0,
            base_table_size: 1.8,
            base_code_size: 1.6,
            min_scale: 0.4,
        }
    }
}

fn table_scale(metrics: &ContentMetrics) -> f64 {
    let mut scale = match metrics.table_rows {
        0..=5 => 1.6,
        6..=7 => 1.4,
        8 => 1.2,
        9..=10 => 1.0,
        11..=12 => 0.8,
        _ => 0.65,
    };
    if metrics.table_cols > 6 {
        scale *= 0.9;
    } else if metrics.table_cols > 5 {
        scale *= 0.95;
    }
    if metrics.avg_cell_length > 30.0 {
        scale *= 0.9;
    } else if metrics.avg_cell_length > 20.0 {
        scale *= 0.95;
    }
    scale
}

/// Cap for `value` from `(threshold, cap)` pairs ordered from the largest threshold down
fn cap_for(value: usize, steps: &[(usize, f64)]) -> f64 {
    steps
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map_or(1.0, |(_, cap)| *cap)
}

/// Font size in rem and the scale factor applied to the base size.
///
/// Only tables scale above 1.0. The result never falls below `config.min_scale`.
pub fn calculate_content_scale(metrics: &ContentMetrics, config: &LayoutConfig) -> (f64, f64) {
    let (base_size, scale) = match metrics.content_type {
        ContentType::Table => (config.base_table_size, table_scale(metrics)),
        ContentType::Bullets => {
            let count = cap_for(metrics.bullet_count, &[(10, 0.7), (8, 0.8), (6, 0.9)]);
            let width = cap_for(metrics.max_line_length, &[(100, 0.8), (80, 0.9)]);
            (config.base_text_size, count.min(width))
        }
        ContentType::Code => {
            let lines = cap_for(metrics.code_lines, &[(20, 0.7), (15, 0.8), (10, 0.9)]);
            let width = cap_for(metrics.max_code_line_length, &[(80, 0.8), (60, 0.9)]);
            (config.base_code_size, lines.min(width))
        }
        ContentType::Text => (
            config.base_text_size,
            cap_for(metrics.total_chars, &[(800, 0.7), (500, 0.85)]),
        ),
    };

    let scale = scale.max(config.min_scale);
    (base_size * scale, scale)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Large centered title, optional subtitle
    TitleOnly,
    /// Title, subtitle and a little content, all centered
    TitleCentered,
    /// Title in a header band with content below
    TitleContent,
    ContentOnly,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::TitleOnly => "title_only",
            LayoutMode::TitleCentered => "title_centered",
            LayoutMode::TitleContent => "title_content",
            LayoutMode::ContentOnly => "content_only",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_small_content(content: &str) -> bool {
    let content = content.trim();
    char_len(content) < 300
        && !content.contains('|')
        && !content.contains("```")
        && content.matches('\n').count() < 8
}

/// Pick the layout for a slide from what it contains
pub fn detect_layout_mode(
    has_title: bool,
    has_subtitle: bool,
    content: &str,
    has_custom_content: bool,
) -> LayoutMode {
    let has_content = !content.is_empty() || has_custom_content;

    match (has_title, has_subtitle, has_content) {
        (true, _, false) => LayoutMode::TitleOnly,
        (false, _, true) => LayoutMode::ContentOnly,
        (true, true, true) if is_small_content(content) => LayoutMode::TitleCentered,
        _ => LayoutMode::TitleContent,
    }
}

/// Classes and inline CSS for one rendered element
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementPlan {
    pub classes: String,
    pub css: String,
}

/// CSS and classes from a slide's `[.element:property: value]` directives
pub fn element_override(text_style: &TextStyle, element: &str) -> ElementPlan {
    let Some(props) = text_style.get(element) else {
        return ElementPlan::default();
    };

    let mut css = Vec::new();
    let mut classes = Vec::new();
    for (prop, value) in props {
        if prop == "class" {
            classes.push(value.clone());
            continue;
        }
        let prop = prop.replace('_', "-");
        let prop = match prop.as_str() {
            "shadow" => "text-shadow",
            "bg" => "background",
            "size" => "font-size",
            "weight" => "font-weight",
            other => other,
        };
        css.push(format!("{}: {};", prop, value));
    }

    ElementPlan {
        classes: classes.join(" "),
        css: css.join(" "),
    }
}

fn join_css(base: &str, extra: &str) -> String {
    match (base.is_empty(), extra.is_empty()) {
        (true, _) => extra.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}; {}", base.trim_end_matches(';'), extra),
    }
}

fn element_plan(style: &LayoutStyle, element: Element, text_style: &TextStyle, key: &str) -> ElementPlan {
    let theme = style.get(&element);
    let overrides = element_override(text_style, key);
    ElementPlan {
        classes: format!("{} {}", theme.to_classes(), overrides.classes)
            .trim()
            .to_string(),
        css: join_css(&theme.to_css(), &overrides.css),
    }
}

/// Format a number for CSS without trailing zeros
fn css_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

fn is_color_or_gradient(bg: &str) -> bool {
    !bg.starts_with("url(")
}

/// Background declaration for a slide background at the given position
pub fn background_css(bg: &str, position: BackgroundPosition) -> String {
    if bg.is_empty() {
        String::new()
    } else if bg.starts_with("url(") {
        let anchor = match position {
            BackgroundPosition::Center => "center",
            other => other.css_position(),
        };
        format!("background: {} {}/cover no-repeat;", bg, anchor)
    } else if bg.contains("gradient") || bg.starts_with("radial") || bg.starts_with("linear") {
        format!("background: {};", bg)
    } else {
        format!("background-color: {};", bg)
    }
}

/// Theme defaults for the overlay, blur radius and the split panel color
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDefaults {
    pub overlay_opacity: f64,
    pub overlay_color: String,
    pub blur_radius: f64,
    pub split_background: String,
}

impl FilterDefaults {
    pub fn from_style(style: &LayoutStyle) -> Self {
        let overlay = style.get(&Element::Overlay);
        let overlay_opacity = if overlay == ElementStyle::default() {
            DEFAULT_OVERLAY_OPACITY
        } else {
            overlay.opacity
        };
        let overlay_color = if overlay.color.is_empty() {
            DEFAULT_OVERLAY_COLOR.to_string()
        } else {
            overlay.color
        };
        let split = style.get(&Element::from("split_background"));
        let split_background = if split.color.is_empty() {
            DEFAULT_SPLIT_BACKGROUND.to_string()
        } else {
            split.color
        };

        Self {
            overlay_opacity,
            overlay_color,
            blur_radius: DEFAULT_BLUR_RADIUS,
            split_background,
        }
    }

    fn overlay(&self, setting: FilterSetting) -> Option<f64> {
        setting
            .is_set()
            .then(|| setting.effective(self.overlay_opacity))
    }

    fn blur(&self, setting: FilterSetting) -> Option<f64> {
        setting.is_set().then(|| setting.effective(self.blur_radius))
    }
}

/// Everything needed to render one single-region slide
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlidePlan {
    pub mode: LayoutMode,
    pub metrics: ContentMetrics,
    pub scale: f64,
    pub font_size_rem: f64,
    pub font_size_px: f64,
    /// Background declaration for the image layer or the whole slide
    pub background_css: String,
    pub has_background_image: bool,
    #[serde(skip)]
    pub position: BackgroundPosition,
    /// Color behind the content half of a split slide
    pub split_background: String,
    /// Overlay opacity when an overlay was requested
    pub overlay: Option<f64>,
    pub overlay_color: String,
    /// Blur radius in px when blur was requested
    pub blur: Option<f64>,
    pub title: ElementPlan,
    pub subtitle: ElementPlan,
    pub text: ElementPlan,
    pub regions: Vec<RegionPlan>,
    #[serde(skip)]
    pub direction: Direction,
}

impl SlidePlan {
    /// Split slides put the image in its own half
    pub fn is_split(&self) -> bool {
        self.position.is_split() && self.has_background_image
    }

    pub fn is_multi_region(&self) -> bool {
        self.regions.len() > 1
    }
}

/// Compose the layout of a slide.
///
/// The slide's own background wins over the layout's background. Split slides always use
/// the title/content arrangement with the theme's split element styles.
pub fn plan_slide(slide: &Slide, style: &LayoutStyle, config: &LayoutConfig) -> SlidePlan {
    let defaults = FilterDefaults::from_style(style);
    let background = if slide.background.is_empty() {
        style.background.clone()
    } else {
        slide.background.clone()
    };
    let has_background_image = background.starts_with("url(");
    let position = slide.background_position;
    let split = position.is_split() && has_background_image;

    let mut mode = detect_layout_mode(
        !slide.title.is_empty(),
        !slide.subtitle.is_empty(),
        &slide.content,
        false,
    );
    if split {
        mode = LayoutMode::TitleContent;
    }

    let metrics = analyze_content(&slide.content);
    let (mut font_size_rem, scale) = calculate_content_scale(&metrics, config);
    if mode == LayoutMode::ContentOnly {
        font_size_rem *= FULL_PAGE_BOOST;
    }

    let (title, subtitle, text) = if split {
        (Element::SplitTitle, Element::SplitSubtitle, Element::SplitText)
    } else {
        (Element::Title, Element::Subtitle, Element::Text)
    };

    let regions = if slide.regions.len() > 1 {
        plan_regions(&slide.regions, slide.direction, &slide.text_style, style, config)
    } else {
        Vec::new()
    };

    let plan = SlidePlan {
        mode,
        scale,
        font_size_rem,
        font_size_px: font_size_rem * REM_TO_PX,
        background_css: background_css(&background, position),
        has_background_image,
        position,
        split_background: defaults.split_background.clone(),
        overlay: if has_background_image {
            defaults.overlay(slide.overlay)
        } else {
            None
        },
        overlay_color: defaults.overlay_color.clone(),
        blur: if has_background_image {
            defaults.blur(slide.blur)
        } else {
            None
        },
        title: element_plan(style, title, &slide.text_style, "title"),
        subtitle: element_plan(style, subtitle, &slide.text_style, "subtitle"),
        text: element_plan(style, text, &slide.text_style, "text"),
        metrics,
        regions,
        direction: slide.direction,
    };
    debug!(
        "Planned slide '{}': mode={} type={} scale={}",
        slide.name, plan.mode, plan.metrics.content_type, plan.scale
    );
    plan
}

/// One pane of a multi-region slide
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPlan {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    /// Pane size along both axes, e.g. `50%` / `100%`
    pub width: String,
    pub height: String,
    pub background_css: String,
    pub overlay: Option<f64>,
    pub overlay_color: String,
    pub blur: Option<f64>,
    pub font_size_px: f64,
    pub title_style: ElementPlan,
    pub subtitle_style: ElementPlan,
    pub text_style: ElementPlan,
}

/// True when every region shows the same image, which then spans all panes
pub fn is_panorama(regions: &[Region]) -> bool {
    if regions.len() < 2 {
        return false;
    }
    let first = strip_url(&regions[0].image);
    !first.is_empty()
        && !is_color_or_gradient(&regions[0].background())
        && regions.iter().all(|r| strip_url(&r.image) == first)
}

/// Background for region `index` of `count`; panorama slices share one image
fn region_background_css(
    region: &Region,
    index: usize,
    count: usize,
    direction: Direction,
    panorama: bool,
    split_background: &str,
) -> String {
    let bg = region.background();
    if bg.is_empty() {
        return format!("background: {};", split_background);
    }
    if is_color_or_gradient(&bg) {
        return format!("background: {};", bg);
    }

    let src = strip_url(&bg);
    if !panorama {
        return format!(
            "background: url({}) {}/cover no-repeat;",
            src,
            region.position.css_position()
        );
    }

    let step = if count > 1 {
        index as f64 * 100.0 / (count - 1) as f64
    } else {
        0.0
    };
    let span = count * 100;
    match direction {
        Direction::Horizontal => format!(
            "background: url({}) {}% center/{}% auto no-repeat;",
            src,
            css_number(step),
            span
        ),
        Direction::Vertical => format!(
            "background: url({}) center {}%/auto {}% no-repeat;",
            src,
            css_number(step),
            span
        ),
    }
}

/// Plan each region of a multi-region slide as an equal slice along `direction`
pub fn plan_regions(
    regions: &[Region],
    direction: Direction,
    text_style: &TextStyle,
    style: &LayoutStyle,
    config: &LayoutConfig,
) -> Vec<RegionPlan> {
    let defaults = FilterDefaults::from_style(style);
    let count = regions.len();
    let panorama = is_panorama(regions);
    if panorama {
        debug!("Rendering {} regions as one panorama", count);
    }

    let share = format!("{}%", css_number(100.0 / count.max(1) as f64));
    let (width, height) = match direction {
        Direction::Horizontal => (share, "100%".to_string()),
        Direction::Vertical => ("100%".to_string(), share),
    };

    regions
        .iter()
        .enumerate()
        .map(|(index, region)| {
            let metrics = analyze_content(&region.content);
            let (font_size_rem, _) = calculate_content_scale(&metrics, config);
            let has_image = !region.image.is_empty();
            RegionPlan {
                title: region.title.clone(),
                subtitle: region.subtitle.clone(),
                content: region.content.clone(),
                width: width.clone(),
                height: height.clone(),
                background_css: region_background_css(
                    region,
                    index,
                    count,
                    direction,
                    panorama,
                    &defaults.split_background,
                ),
                overlay: if has_image { defaults.overlay(region.overlay) } else { None },
                overlay_color: defaults.overlay_color.clone(),
                blur: if has_image { defaults.blur(region.blur) } else { None },
                font_size_px: font_size_rem * REM_TO_PX,
                title_style: element_plan(style, Element::SplitTitle, text_style, "title"),
                subtitle_style: element_plan(style, Element::SplitSubtitle, text_style, "subtitle"),
                text_style: element_plan(style, Element::SplitText, text_style, "text"),
            }
        })
        .collect()
}
