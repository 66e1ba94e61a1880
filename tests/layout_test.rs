use proptest::prelude::*;
use serde_json::json;
use stagdeck::layout::{is_panorama, plan_regions, FULL_PAGE_BOOST, REM_TO_PX};
use stagdeck::markdown::BackgroundPosition;
use stagdeck::theme::styles::{Element, ElementStyle, LayoutStyle};
use stagdeck::{
    analyze_content, calculate_content_scale, detect_layout_mode, plan_slide, render_deck,
    ContentMetrics, ContentType, Deck, LayoutConfig, LayoutMode, Slide, Theme, ThemeContext,
    ThemeLoader,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn aurora_style() -> LayoutStyle {
    ThemeContext::from_references(&ThemeLoader::new(), &["default:aurora.json"])
        .expect("Failed to build theme context")
        .layout_style("content")
        .expect("Failed to resolve layout")
}

#[test]
fn test_content_classification_order() {
    assert_eq!(analyze_content("").content_type, ContentType::Text);
    assert_eq!(
        analyze_content("| a |\n|---|\n| - b |").content_type,
        ContentType::Table
    );
    assert_eq!(
        analyze_content("- item\n```\ncode\n```").content_type,
        ContentType::Code
    );
    assert_eq!(analyze_content("* one\n+ two").content_type, ContentType::Bullets);
    assert_eq!(
        analyze_content("Plain words - with a dash").content_type,
        ContentType::Text
    );
}

#[test]
fn test_text_measurements() {
    let metrics = analyze_content("  short\nthe longest line here\n  ");
    assert_eq!(metrics.content_type, ContentType::Text);
    assert_eq!(metrics.line_count, 2);
    assert_eq!(metrics.max_line_length, 21);
    assert_eq!(metrics.total_chars, "short\nthe longest line here".len());
}

#[test]
fn test_unclosed_code_fence_runs_to_end() {
    let metrics = analyze_content("```\nline one\nline two is longer\n");
    assert_eq!(metrics.content_type, ContentType::Code);
    assert_eq!(metrics.code_lines, 2);
    assert_eq!(metrics.max_code_line_length, 18);
}

#[test]
fn test_text_scale_thresholds() {
    let config = LayoutConfig::default();
    let scale_for = |chars: usize| {
        let metrics = ContentMetrics {
            content_type: ContentType::Text,
            total_chars: chars,
            ..ContentMetrics::default()
        };
        calculate_content_scale(&metrics, &config).1
    };
    assert_close(scale_for(100), 1.0);
    assert_close(scale_for(500), 1.0);
    assert_close(scale_for(501), 0.85);
    assert_close(scale_for(801), 0.7);
}

#[test]
fn test_long_bullet_lines_shrink() {
    let line = format!("- {}", "x".repeat(110));
    let metrics = analyze_content(&line);
    assert_eq!(metrics.bullet_count, 1);
    let (font, scale) = calculate_content_scale(&metrics, &LayoutConfig::default());
    assert_close(scale, 0.8);
    assert_close(font, 1.6);
}

#[test]
fn test_wide_code_shrinks() {
    let metrics = ContentMetrics {
        content_type: ContentType::Code,
        code_lines: 12,
        max_code_line_length: 70,
        ..ContentMetrics::default()
    };
    let (_, scale) = calculate_content_scale(&metrics, &LayoutConfig::default());
    assert_close(scale, 0.9);
}

#[test]
fn test_layout_modes() {
    assert_eq!(detect_layout_mode(true, false, "", false), LayoutMode::TitleOnly);
    assert_eq!(detect_layout_mode(true, true, "", false), LayoutMode::TitleOnly);
    assert_eq!(detect_layout_mode(false, false, "Body", false), LayoutMode::ContentOnly);
    assert_eq!(detect_layout_mode(true, true, "Short body", false), LayoutMode::TitleCentered);
    assert_eq!(detect_layout_mode(true, false, "Short body", false), LayoutMode::TitleContent);
    assert_eq!(
        detect_layout_mode(true, true, "| a | b |\n|---|---|", false),
        LayoutMode::TitleContent
    );
    assert_eq!(
        detect_layout_mode(true, true, &"word ".repeat(80), false),
        LayoutMode::TitleContent
    );
    assert_eq!(detect_layout_mode(true, false, "", true), LayoutMode::TitleContent);
}

#[test]
fn test_plan_content_only_boost() {
    let slide = Slide::from_markdown("Just a sentence on its own.");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert_eq!(plan.mode, LayoutMode::ContentOnly);
    assert_close(plan.scale, 1.0);
    assert_close(plan.font_size_rem, 2.0 * FULL_PAGE_BOOST);
    assert_close(plan.font_size_px, 2.0 * FULL_PAGE_BOOST * REM_TO_PX);
    assert_eq!(plan.background_css, "background-color: #ffffff;");
    assert!(!plan.has_background_image);
    assert_eq!(plan.overlay, None);
}

#[test]
fn test_plan_title_slide() {
    let slide = Slide::from_markdown("# Big Idea\n\n## Small print");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert_eq!(plan.mode, LayoutMode::TitleOnly);
    assert!(plan.title.css.contains("color: #0f172a"));
    assert!(plan.subtitle.css.contains("color: #64748b"));
}

#[test]
fn test_plan_split_slide() {
    let slide = Slide::from_markdown("# Split\n\n![left overlay](photo.jpg)\n\nText beside the image");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert!(plan.is_split());
    assert_eq!(plan.position, BackgroundPosition::Left);
    assert_eq!(plan.mode, LayoutMode::TitleContent);
    assert_eq!(
        plan.background_css,
        "background: url(photo.jpg) left center/cover no-repeat;"
    );
    assert_eq!(plan.split_background, "#f8fafc");
    assert_eq!(plan.overlay, Some(0.5));
    assert_eq!(plan.blur, None);
}

#[test]
fn test_plan_background_filters() {
    let slide = Slide::from_markdown("# Full bleed\n\n![overlay:0.7 blur:8](photo.jpg)");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert!(!plan.is_split());
    assert_eq!(plan.background_css, "background: url(photo.jpg) center/cover no-repeat;");
    assert_eq!(plan.overlay, Some(0.7));
    assert_eq!(plan.blur, Some(8.0));
}

#[test]
fn test_overlay_color_comes_from_theme() {
    let slide = Slide::from_markdown("# Tinted\n\n![overlay](photo.jpg)");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());
    assert_eq!(plan.overlay_color, "#000000");

    let mut style = aurora_style();
    style.set(
        Element::Overlay,
        ElementStyle {
            color: "#1e3a8a".to_string(),
            opacity: 0.3,
            ..Default::default()
        },
    );
    let plan = plan_slide(&slide, &style, &LayoutConfig::default());
    assert_eq!(plan.overlay, Some(0.3));
    assert_eq!(plan.overlay_color, "#1e3a8a");
}

#[test]
fn test_rendered_overlay_uses_theme_color() {
    let tint = Theme::from_value(&json!({
        "name": "tint",
        "slide": {"overlay": {"color": "#1e3a8a", "opacity": 0.4}}
    }))
    .expect("Failed to build theme");

    let mut deck = Deck::new();
    deck.add_markdown("# Tinted\n\n![overlay](photo.jpg)", None);
    deck.use_theme_value(tint).expect("Failed to use theme");

    let html = render_deck(&mut deck, &LayoutConfig::default()).expect("Failed to render deck");
    assert!(html.contains("background-color: #1e3a8a; opacity: 0.4;"));
    assert!(!html.contains("rgba(0, 0, 0"));
}

#[test]
fn test_plan_applies_element_directives() {
    let slide = Slide::from_markdown("[.title:shadow: 0 0 4px black]\n[.title:class: glow]\n# Styled\n\nBody");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert!(plan.title.css.contains("text-shadow: 0 0 4px black;"));
    assert!(plan.title.classes.split_whitespace().any(|c| c == "glow"));
}

#[test]
fn test_horizontal_panorama() {
    let slide = Slide::from_markdown(
        "![left](wide.jpg)\n# One\n\n![left](wide.jpg)\n# Two\n\n![left](wide.jpg)\n# Three",
    );
    assert!(slide.is_multi_region());
    assert!(is_panorama(&slide.regions));

    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());
    assert!(plan.is_multi_region());
    let css: Vec<&str> = plan.regions.iter().map(|r| r.background_css.as_str()).collect();
    assert_eq!(
        css,
        vec![
            "background: url(wide.jpg) 0% center/300% auto no-repeat;",
            "background: url(wide.jpg) 50% center/300% auto no-repeat;",
            "background: url(wide.jpg) 100% center/300% auto no-repeat;",
        ]
    );
    assert_eq!(plan.regions[0].width, "33.333%");
    assert_eq!(plan.regions[0].height, "100%");
    assert_eq!(plan.regions[2].title, "Three");
}

#[test]
fn test_vertical_panorama() {
    let slide = Slide::from_markdown("![top](tall.jpg)\nUpper\n\n![bottom](tall.jpg)\nLower");
    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());

    assert_eq!(plan.regions.len(), 2);
    assert_eq!(
        plan.regions[0].background_css,
        "background: url(tall.jpg) center 0%/auto 200% no-repeat;"
    );
    assert_eq!(
        plan.regions[1].background_css,
        "background: url(tall.jpg) center 100%/auto 200% no-repeat;"
    );
    assert_eq!(plan.regions[0].width, "100%");
    assert_eq!(plan.regions[0].height, "50%");
}

#[test]
fn test_distinct_region_images_cover_each_pane() {
    let slide = Slide::from_markdown("![left](a.jpg)\nA\n\n![right](b.jpg)\nB");
    assert!(!is_panorama(&slide.regions));

    let plans = plan_regions(
        &slide.regions,
        slide.direction,
        &slide.text_style,
        &aurora_style(),
        &LayoutConfig::default(),
    );
    assert_eq!(plans[0].background_css, "background: url(a.jpg) left center/cover no-repeat;");
    assert_eq!(plans[1].background_css, "background: url(b.jpg) right center/cover no-repeat;");
}

#[test]
fn test_color_regions_are_never_panorama() {
    let slide = Slide::from_markdown("![left](#ff0000)\nA\n\n![left](#ff0000)\nB");
    assert!(!is_panorama(&slide.regions));

    let plan = plan_slide(&slide, &aurora_style(), &LayoutConfig::default());
    assert_eq!(plan.regions[0].background_css, "background: #ff0000;");
    assert_eq!(plan.regions[0].overlay, None);
}

#[test]
fn test_deck_layout_style_follows_theme() {
    let mut deck = Deck::new();
    deck.use_theme("default:midnight.json").expect("Failed to use theme");
    let style = deck.layout_style().expect("Failed to resolve layout");

    let slide = Slide::from_markdown("# Split\n\n![right](photo.jpg)\n\nText");
    let plan = plan_slide(&slide, &style, &LayoutConfig::default());
    assert_eq!(plan.split_background, "#1a1a2e");
    assert!(plan.title.css.contains("color: #f8fafc"));
}

fn content_type() -> impl Strategy<Value = ContentType> {
    prop_oneof![
        Just(ContentType::Table),
        Just(ContentType::Bullets),
        Just(ContentType::Code),
        Just(ContentType::Text),
    ]
}

proptest! {
    #[test]
    fn scale_never_drops_below_floor(
        content_type in content_type(),
        rows in 0usize..80,
        cols in 0usize..16,
        avg in 0.0f64..120.0,
        count in 0usize..80,
        width in 0usize..400,
        chars in 0usize..5000,
        min_scale in 0.1f64..0.9,
    ) {
        let metrics = ContentMetrics {
            content_type,
            table_rows: rows,
            table_cols: cols,
            avg_cell_length: avg,
            bullet_count: count,
            max_line_length: width,
            code_lines: count,
            max_code_line_length: width,
            total_chars: chars,
            ..ContentMetrics::default()
        };
        let config = LayoutConfig { min_scale, ..LayoutConfig::default() };
        let (font, scale) = calculate_content_scale(&metrics, &config);
        prop_assert!(scale >= min_scale);
        prop_assert!(font > 0.0);
        if content_type != ContentType::Table {
            prop_assert!(scale <= 1.0f64.max(min_scale));
        }
    }

    #[test]
    fn more_table_rows_never_scale_up(rows in 0usize..60, extra in 1usize..20, cols in 0usize..12) {
        let config = LayoutConfig::default();
        let table = |rows: usize| ContentMetrics {
            content_type: ContentType::Table,
            table_rows: rows,
            table_cols: cols,
            ..ContentMetrics::default()
        };
        let (_, smaller) = calculate_content_scale(&table(rows), &config);
        let (_, larger) = calculate_content_scale(&table(rows + extra), &config);
        prop_assert!(larger <= smaller);
    }

    #[test]
    fn analyze_content_never_panics(content in "[ a-z|`*#\\-\\n]{0,200}") {
        let metrics = analyze_content(&content);
        prop_assert!(metrics.line_count <= content.lines().count().max(1));
    }
}
