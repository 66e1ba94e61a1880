use stagdeck::markdown::{BackgroundPosition, Direction, FilterSetting};
use stagdeck::{parse_multi_region_markdown, parse_slide_markdown, MarkdownParser};

#[test]
fn test_title_subtitle_and_content() {
    let slide = parse_slide_markdown("# Welcome\n\n## To the show\n\nFirst paragraph.\n\n- one\n- two\n");
    assert_eq!(slide.title, "Welcome");
    assert_eq!(slide.subtitle, "To the show");
    assert_eq!(slide.content, "First paragraph.\n\n- one\n- two");
    assert!(slide.background.is_empty());
}

#[test]
fn test_later_headings_stay_in_content() {
    let slide = parse_slide_markdown("# Title\n\nIntro\n\n## Section\n\n# Another");
    assert_eq!(slide.title, "Title");
    assert_eq!(slide.subtitle, "");
    assert!(slide.content.contains("## Section"));
    assert!(slide.content.contains("# Another"));
}

#[test]
fn test_image_after_title_becomes_background() {
    let slide = parse_slide_markdown("# Title\n\n![](photo.jpg)\n\nCaption text");
    assert_eq!(slide.background, "url(photo.jpg)");
    assert!(slide.images.is_empty());
    assert_eq!(slide.content, "Caption text");
}

#[test]
fn test_image_after_body_stays_inline() {
    let slide = parse_slide_markdown("# Title\n\nIntro text\n\n![Chart](chart.png)");
    assert!(slide.background.is_empty());
    assert_eq!(slide.images.len(), 1);
    assert_eq!(slide.images[0].src, "chart.png");
    assert!(slide.content.contains("![Chart](chart.png)"));
}

#[test]
fn test_descriptive_alt_right_after_title_is_still_background() {
    // A diagram placed directly under the title is taken as the background unless marked inline.
    let slide = parse_slide_markdown("# Architecture\n\n![System diagram](arch.png)\n\nDetails");
    assert_eq!(slide.background, "url(arch.png)");
    assert!(slide.images.is_empty());

    let slide = parse_slide_markdown("# Architecture\n\n![inline System diagram](arch.png)\n\nDetails");
    assert!(slide.background.is_empty());
    assert_eq!(slide.images.len(), 1);
}

#[test]
fn test_background_modifiers() {
    let slide = parse_slide_markdown("Body first\n\n![right overlay:0.7 blur:6](photo.jpg)");
    assert_eq!(slide.background, "url(photo.jpg)");
    assert_eq!(slide.background_position, BackgroundPosition::Right);
    assert_eq!(slide.overlay_opacity, FilterSetting::Explicit(0.7));
    assert_eq!(slide.blur_radius, FilterSetting::Explicit(6.0));
    assert_eq!(slide.background_modifiers, "right overlay:0.7 blur:6");

    let slide = parse_slide_markdown("![background overlay](#1a1a2e)");
    assert_eq!(slide.background, "#1a1a2e");
    assert_eq!(slide.overlay_opacity, FilterSetting::ThemeDefault);
}

#[test]
fn test_slide_directives() {
    let markdown = "[name: intro]\n[.background: #123456]\n[.class: dark wide]\n[.transition: fade]\n[.build-lists: true]\n[.title:color: red]\n[.title:shadow: 0 0 4px black]\n# Hello\n\nBody\n\n^ Remember to smile\n^ Second note";
    let slide = parse_slide_markdown(markdown);

    assert_eq!(slide.name.as_deref(), Some("intro"));
    assert_eq!(slide.background, "#123456");
    assert_eq!(slide.classes, vec!["dark".to_string(), "wide".to_string()]);
    assert_eq!(slide.transition, "fade");
    assert_eq!(slide.build_lists, Some(true));
    assert_eq!(slide.title, "Hello");
    assert_eq!(slide.content, "Body");
    assert_eq!(slide.notes, "Remember to smile\nSecond note");

    let title = slide.text_style.get("title").expect("title overrides");
    assert_eq!(title.get("color").map(String::as_str), Some("red"));
    assert_eq!(title.get("shadow").map(String::as_str), Some("0 0 4px black"));
}

#[test]
fn test_code_fences_are_opaque() {
    let markdown = "# Code\n\n```md\n# not a title\n![bg](not-a-background.jpg)\n^ not a note\n```";
    let slide = parse_slide_markdown(markdown);
    assert_eq!(slide.title, "Code");
    assert!(slide.background.is_empty());
    assert!(slide.notes.is_empty());
    assert!(slide.content.contains("# not a title"));
    assert!(slide.content.contains("^ not a note"));
}

#[test]
fn test_multi_region_horizontal() {
    let markdown = "![left](a.jpg)\n# Left side\nLeft text\n\n![right](b.jpg)\n# Right side\n## Subtitle\nRight text";
    let slide = parse_multi_region_markdown(markdown);

    assert_eq!(slide.direction, Direction::Horizontal);
    assert_eq!(slide.regions.len(), 2);
    assert_eq!(slide.regions[0].image, "a.jpg");
    assert_eq!(slide.regions[0].title, "Left side");
    assert_eq!(slide.regions[0].content, "Left text");
    assert_eq!(slide.regions[1].position, BackgroundPosition::Right);
    assert_eq!(slide.regions[1].title, "Right side");
    assert_eq!(slide.regions[1].subtitle, "Subtitle");
    assert_eq!(slide.regions[1].content, "Right text");
}

#[test]
fn test_multi_region_vertical() {
    let markdown = "![top](sky.jpg)\n## Above\n\n![bottom](sea.jpg)\nBelow text";
    let slide = parse_multi_region_markdown(markdown);

    assert_eq!(slide.direction, Direction::Vertical);
    assert_eq!(slide.regions.len(), 2);
    assert_eq!(slide.regions[0].subtitle, "Above");
    assert_eq!(slide.regions[0].title, "");
    assert_eq!(slide.regions[1].content, "Below text");
}

#[test]
fn test_multi_region_prelude_joins_first_region() {
    let markdown = "[name: panes]\nIntro line\n\n![left](a.jpg)\nA\n\n![right](b.jpg)\nB\n\n^ note";
    let slide = parse_multi_region_markdown(markdown);

    assert_eq!(slide.name.as_deref(), Some("panes"));
    assert_eq!(slide.notes, "note");
    assert_eq!(slide.regions[0].content, "Intro line\n\nA");
    assert_eq!(slide.regions[1].content, "B");
}

#[test]
fn test_single_image_is_one_region() {
    let slide = parse_multi_region_markdown("# Title\n\n![left](a.jpg)\n\nText");
    assert_eq!(slide.regions.len(), 1);
    assert_eq!(slide.regions[0].image, "a.jpg");
    assert_eq!(slide.regions[0].title, "Title");
    assert_eq!(slide.regions[0].content, "Text");
}

#[test]
fn test_inline_images_do_not_open_regions() {
    let markdown = "![left](a.jpg)\nText\n![inline](icon.png)\n\n![right](b.jpg)\nMore";
    let slide = parse_multi_region_markdown(markdown);
    assert_eq!(slide.regions.len(), 2);
    assert!(slide.regions[0].content.contains("![inline](icon.png)"));
}

#[test]
fn test_split_on_separator() {
    let parser = MarkdownParser::new();
    let (info, slides) = parser.split("# One\n\n---\n\n# Two\n---\n\n---\n# Three\n");
    assert_eq!(slides, vec!["# One", "# Two", "# Three"]);
    assert_eq!(info.title, "");
}

#[test]
fn test_separator_inside_code_fence() {
    let parser = MarkdownParser::new();
    let (_, slides) = parser.split("# One\n```yaml\n---\nkey: value\n```\n---\n# Two");
    assert_eq!(slides.len(), 2);
    assert!(slides[0].contains("key: value"));
}

#[test]
fn test_custom_separator() {
    let parser = MarkdownParser::new().with_separator("===");
    let (_, slides) = parser.split("# One\n===\n# Two\n---\nstill two");
    assert_eq!(slides.len(), 2);
    assert!(slides[1].contains("---"));
}

#[test]
fn test_frontmatter() {
    let source = "---\ntitle: \"My Deck\"\nauthor: Ann\ntheme: midnight.json\nslide-numbers: true\nvenue: Main hall\n---\n# First\n---\n# Second";
    let (info, slides) = MarkdownParser::new().parse(source);

    assert_eq!(info.title, "My Deck");
    assert_eq!(info.author, "Ann");
    assert_eq!(info.theme, "midnight.json");
    assert!(info.slide_numbers);
    assert_eq!(info.metadata.get("venue").map(String::as_str), Some("Main hall"));
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0].title, "First");
}

#[test]
fn test_leading_separator_is_not_frontmatter() {
    let (info, slides) = MarkdownParser::new().parse("---\n# Only slide\n\nSome text\n");
    assert_eq!(slides.len(), 1);
    assert_eq!(info.title, "Only slide");
}

#[test]
fn test_deck_directives() {
    let (info, slides) =
        MarkdownParser::new().parse("footer: ACME 2026\nslidenumbers: true\n\n# First\n---\n# Second");
    assert_eq!(info.footer, "ACME 2026");
    assert!(info.slide_numbers);
    assert_eq!(slides.len(), 2);
}
