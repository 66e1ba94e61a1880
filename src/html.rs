// ABOUTME: Static HTML export for a deck
// ABOUTME: Renders each slide plan as a fixed-size section with theme styles and comrak markdown

use crate::deck::{Deck, Slide};
use crate::errors::{DeckError, Result};
use crate::layout::{plan_slide, ElementPlan, LayoutConfig, LayoutMode, RegionPlan, SlidePlan};
use crate::markdown::Direction;
use crate::paths::ensure_parent_directory_exists;
use crate::theme::context::ThemeContext;
use crate::theme::CONTENT_LAYOUT;
use comrak::{markdown_to_html, ComrakOptions};
use log::{debug, info};
use std::fs;
use std::path::Path;

const STYLESHEET: &str = r#"
body { margin: 0; background: #000; font-family: system-ui, -apple-system, sans-serif; }
.slide { position: relative; width: 1920px; height: 1080px; overflow: hidden; margin: 0 auto 40px; box-sizing: border-box; }
.slide-layer { position: absolute; inset: 0; }
.slide-overlay { position: absolute; inset: 0; pointer-events: none; }
.slide-content { position: relative; z-index: 10; width: 100%; height: 100%; box-sizing: border-box; display: flex; flex-direction: column; }
.split-left > .slide-image { right: 50%; } .split-left > .slide-content { margin-left: 50%; width: 50%; }
.split-right > .slide-image { left: 50%; } .split-right > .slide-content { width: 50%; }
.split-top > .slide-image { bottom: 50%; } .split-top > .slide-content { margin-top: 540px; height: 50%; }
.split-bottom > .slide-image { top: 50%; } .split-bottom > .slide-content { height: 50%; }
.title-only .slide-content, .title-centered .slide-content { align-items: center; justify-content: center; text-align: center; }
.slide-body { flex: 1; display: flex; flex-direction: column; justify-content: center; min-height: 0; }
.slide-body table { border-collapse: collapse; margin: 0 auto; }
.slide-body th, .slide-body td { padding: 0.3em 0.8em; border-bottom: 1px solid rgba(255, 255, 255, 0.2); }
.slide-regions { display: flex; width: 100%; height: 100%; }
.slide-region { position: relative; overflow: hidden; }
.slide-footer { position: absolute; bottom: 1%; left: 5%; z-index: 20; opacity: 0.6; }
.slide-number { position: absolute; bottom: 1%; right: 5%; z-index: 20; opacity: 0.6; }
.notes { display: none; }
"#;

fn markdown_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.render.unsafe_ = true; // Allow raw HTML
    options.extension.table = true;
    options.extension.strikethrough = true;
    options
}

/// Escape text for use inside HTML elements and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn attributes(plan: &ElementPlan, extra_class: &str, extra_css: &str) -> String {
    let classes = format!("{} {}", extra_class, plan.classes).trim().to_string();
    let css = [extra_css, plan.css.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches(';'))
        .collect::<Vec<_>>()
        .join("; ");

    let mut attrs = String::new();
    if !classes.is_empty() {
        attrs.push_str(&format!(" class=\"{}\"", escape_html(&classes)));
    }
    if !css.is_empty() {
        attrs.push_str(&format!(" style=\"{};\"", escape_html(&css)));
    }
    attrs
}

fn mode_class(mode: LayoutMode) -> String {
    mode.as_str().replace('_', "-")
}

fn padding(config: &LayoutConfig, mode: LayoutMode) -> String {
    match mode {
        LayoutMode::TitleOnly | LayoutMode::TitleCentered => {
            let vertical = (config.margin_top + config.margin_bottom) / 2.0;
            format!(
                "padding: {}% {}% {}% {}%;",
                vertical, config.margin_right, vertical, config.margin_left
            )
        }
        LayoutMode::ContentOnly => format!(
            "padding: {}% {}%;",
            config.content_only_padding, config.content_only_padding
        ),
        LayoutMode::TitleContent => format!(
            "padding: {}% {}% {}% {}%;",
            config.margin_top, config.margin_right, config.margin_bottom, config.margin_left
        ),
    }
}

fn push_filters(html: &mut String, overlay: Option<f64>, color: &str) {
    if let Some(opacity) = overlay {
        html.push_str(&format!(
            "<div class=\"slide-overlay\" style=\"background-color: {}; opacity: {};\"></div>\n",
            escape_html(color),
            opacity
        ));
    }
}

fn image_layer(background_css: &str, blur: Option<f64>, class: &str) -> String {
    let filter = match blur {
        Some(radius) if radius > 0.0 => format!(" filter: blur({}px);", radius),
        _ => String::new(),
    };
    format!(
        "<div class=\"slide-layer {}\" style=\"{}{}\"></div>\n",
        class,
        escape_html(background_css),
        filter
    )
}

fn push_body(html: &mut String, content: &str, font_size_px: f64, text: &ElementPlan, content_type: &str) {
    if content.is_empty() {
        return;
    }
    let body = markdown_to_html(content, &markdown_options());
    // The scaled size sits on an inner element so theme text sizes cannot override it.
    html.push_str(&format!(
        "<div{}>\n<div style=\"font-size: {}px; line-height: 1.5;\">\n{}</div>\n</div>\n",
        attributes(text, &format!("slide-body content-{}", content_type), ""),
        font_size_px,
        body
    ));
}

fn render_single(html: &mut String, slide: &Slide, plan: &SlidePlan, config: &LayoutConfig) {
    if plan.has_background_image {
        let class = if plan.is_split() { "slide-image" } else { "slide-background" };
        html.push_str(&image_layer(&plan.background_css, plan.blur, class));
        push_filters(html, plan.overlay, &plan.overlay_color);
    }

    let mut content_css = padding(config, plan.mode);
    if plan.is_split() {
        content_css.push_str(&format!(" background: {};", plan.split_background));
    }
    html.push_str(&format!(
        "<div class=\"slide-content\" style=\"{}\">\n",
        escape_html(&content_css)
    ));

    let (title_size, title_gap) = match plan.mode {
        LayoutMode::TitleContent => (config.title_size, config.content_title_gap),
        _ => (config.title_only_size, 2.0),
    };
    if !slide.title.is_empty() {
        html.push_str(&format!(
            "<h1{}>{}</h1>\n",
            attributes(
                &plan.title,
                "slide-title",
                &format!("font-size: {}rem; margin: 0 0 {}rem 0", title_size, title_gap)
            ),
            escape_html(&slide.title)
        ));
    }
    if !slide.subtitle.is_empty() {
        html.push_str(&format!(
            "<h2{}>{}</h2>\n",
            attributes(
                &plan.subtitle,
                "slide-subtitle",
                &format!("font-size: {}rem; margin: 0 0 1rem 0", config.subtitle_size)
            ),
            escape_html(&slide.subtitle)
        ));
    }
    push_body(
        html,
        &slide.content,
        plan.font_size_px,
        &plan.text,
        plan.metrics.content_type.as_str(),
    );
    html.push_str("</div>\n");
}

fn render_region(html: &mut String, region: &RegionPlan, config: &LayoutConfig) {
    html.push_str(&format!(
        "<div class=\"slide-region\" style=\"width: {}; height: {};\">\n",
        region.width, region.height
    ));
    html.push_str(&image_layer(&region.background_css, region.blur, "region-background"));
    push_filters(html, region.overlay, &region.overlay_color);

    html.push_str(&format!(
        "<div class=\"slide-content\" style=\"padding: {}% {}% {}% {}%;\">\n",
        config.margin_top, config.margin_right, config.margin_bottom, config.margin_left
    ));
    if !region.title.is_empty() {
        html.push_str(&format!(
            "<h1{}>{}</h1>\n",
            attributes(
                &region.title_style,
                "slide-title",
                &format!("margin: 0 0 {}% 0", config.title_gap)
            ),
            escape_html(&region.title)
        ));
    }
    if !region.subtitle.is_empty() {
        html.push_str(&format!(
            "<h2{}>{}</h2>\n",
            attributes(&region.subtitle_style, "slide-subtitle", "margin: 0 0 1rem 0"),
            escape_html(&region.subtitle)
        ));
    }
    push_body(html, &region.content, region.font_size_px, &region.text_style, "region");
    html.push_str("</div>\n</div>\n");
}

fn render_slide(
    html: &mut String,
    deck: &Deck,
    index: usize,
    slide: &Slide,
    plan: &SlidePlan,
    config: &LayoutConfig,
) {
    let mut classes = vec!["slide".to_string(), mode_class(plan.mode)];
    if plan.is_split() {
        classes.push(format!("split-{}", plan.position));
    }
    if plan.is_multi_region() {
        classes.push("multi-region".to_string());
    }
    classes.extend(slide.classes.iter().cloned());

    let main_css = if plan.has_background_image { "" } else { plan.background_css.as_str() };
    html.push_str(&format!(
        "<section id=\"{}\" class=\"{}\"",
        escape_html(&slide.name),
        escape_html(&classes.join(" "))
    ));
    if !slide.transition.is_empty() {
        html.push_str(&format!(" data-transition=\"{}\"", escape_html(&slide.transition)));
    }
    if slide.build_lists.unwrap_or(deck.info.build_lists) {
        html.push_str(" data-build-lists=\"true\"");
    }
    if !main_css.is_empty() {
        html.push_str(&format!(" style=\"{}\"", escape_html(main_css)));
    }
    html.push_str(">\n");

    if plan.is_multi_region() {
        let direction = match plan.direction {
            Direction::Horizontal => "row",
            Direction::Vertical => "column",
        };
        html.push_str(&format!(
            "<div class=\"slide-regions\" style=\"flex-direction: {};\">\n",
            direction
        ));
        for region in &plan.regions {
            render_region(html, region, config);
        }
        html.push_str("</div>\n");
    } else {
        render_single(html, slide, plan, config);
    }

    if !deck.info.footer.is_empty() {
        html.push_str(&format!(
            "<div class=\"slide-footer\">{}</div>\n",
            escape_html(&deck.info.footer)
        ));
    }
    if deck.info.slide_numbers {
        html.push_str(&format!("<div class=\"slide-number\">{}</div>\n", index + 1));
    }
    if !slide.notes.is_empty() {
        html.push_str(&format!(
            "<aside class=\"notes\">{}</aside>\n",
            escape_html(&slide.notes)
        ));
    }
    html.push_str("</section>\n");
}

/// Render the whole deck as one standalone HTML document
pub fn generate_html(deck: &Deck, context: &ThemeContext, config: &LayoutConfig) -> Result<String> {
    info!("Generating HTML for {} slides", deck.len());
    let style = context.layout_style(CONTENT_LAYOUT)?;

    let mut html_doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html_doc.push_str("<meta charset=\"UTF-8\">\n");
    html_doc.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html_doc.push_str(&format!("<title>{}</title>\n", escape_html(deck.title())));
    if !deck.info.author.is_empty() {
        html_doc.push_str(&format!(
            "<meta name=\"author\" content=\"{}\">\n",
            escape_html(&deck.info.author)
        ));
    }
    html_doc.push_str("<style>");
    html_doc.push_str(STYLESHEET);
    html_doc.push_str("</style>\n</head>\n<body>\n");

    for (index, slide) in deck.slides().iter().enumerate() {
        let plan = plan_slide(slide, &style, config);
        debug!("Rendering slide {} '{}' as {}", index, slide.name, plan.mode);
        render_slide(&mut html_doc, deck, index, slide, &plan, config);
    }

    html_doc.push_str("</body>\n</html>\n");
    Ok(html_doc)
}

/// Render with the deck's own theme context, creating it if needed
pub fn render_deck(deck: &mut Deck, config: &LayoutConfig) -> Result<String> {
    deck.theme_context()?;
    let context = deck
        .context()
        .ok_or_else(|| DeckError::UnknownError("Theme context unavailable".to_string()))?;
    generate_html(deck, context, config)
}

/// Utility function to write HTML content to a file
pub fn write_html_to_file(html_content: &str, output_path: &Path) -> Result<()> {
    info!("Writing HTML to file: {:?}", output_path);

    // Ensure parent directory exists
    ensure_parent_directory_exists(output_path)?;

    fs::write(output_path, html_content).map_err(DeckError::FileReadError)?;

    Ok(())
}
