use serde_json::json;
use stagdeck::{Deck, DeckError, Slide, Theme};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_markdown(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write markdown file");
    path
}

#[test]
fn test_add_from_file() {
    init_logger();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_markdown(
        &temp_dir,
        "talk.md",
        "# Opening\n\nHello\n\n---\n\n---\n\n# Middle\n\n---\n\n[name: closing]\n# End",
    );

    let mut deck = Deck::new();
    deck.add_from_file(&path, None).expect("Failed to load deck");

    assert_eq!(deck.len(), 3);
    assert_eq!(deck.title(), "Opening");
    let names: Vec<&str> = deck.slides().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["slide_0", "slide_1", "closing"]);
    assert_eq!(deck.get_slide(1).map(|s| s.title.as_str()), Some("Middle"));
    assert_eq!(deck.get_slide_index("closing"), Some(2));
    assert_eq!(
        deck.source_files(),
        &[fs::canonicalize(&path).expect("Failed to canonicalize")]
    );
}

#[test]
fn test_add_from_file_with_custom_separator() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_markdown(&temp_dir, "talk.md", "# One\n===\n# Two\n\n---\n\nStill two");

    let mut deck = Deck::new();
    deck.add_from_file(&path, Some("===")).expect("Failed to load deck");

    assert_eq!(deck.len(), 2);
    assert!(deck.slides()[1].content.contains("Still two"));
}

#[test]
fn test_loading_the_same_file_twice_tracks_it_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_markdown(&temp_dir, "talk.md", "# One\n---\n# Two");

    let mut deck = Deck::new();
    deck.add_from_file(&path, None).expect("Failed to load deck");
    deck.add_from_file(&path, None).expect("Failed to load deck");

    assert_eq!(deck.len(), 4);
    assert_eq!(deck.source_files().len(), 1);
    assert_eq!(deck.slides()[3].name, "slide_3");
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut deck = Deck::new();
    let result = deck.add_from_file(&temp_dir.path().join("missing.md"), None);
    assert!(matches!(result, Err(DeckError::PathNotFoundError(_))));
    assert!(deck.is_empty());
}

#[test]
fn test_frontmatter_fills_deck_info() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_markdown(
        &temp_dir,
        "talk.md",
        "---\ntitle: Quarterly Review\nauthor: Sam\ntheme: midnight.json\nvenue: 'Hall B'\n---\n# First\n---\n# Second",
    );

    let mut deck = Deck::new();
    deck.add_from_file(&path, None).expect("Failed to load deck");

    assert_eq!(deck.title(), "Quarterly Review");
    assert_eq!(deck.info.author, "Sam");
    assert_eq!(deck.info.metadata.get("venue").map(String::as_str), Some("Hall B"));
    assert_eq!(deck.len(), 2);
    assert_eq!(deck.get_theme_value("bg").unwrap(), None);

    deck.theme_context().expect("Failed to create theme context");
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#0f172a")));
}

#[test]
fn test_add_markdown_naming() {
    let mut deck = Deck::new();
    deck.add_markdown("# One", None)
        .add_markdown("[name: named]\n# Two", None)
        .add_markdown("[name: ignored]\n# Three", Some("explicit"));

    let names: Vec<&str> = deck.slides().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["slide_0", "named", "explicit"]);
    assert_eq!(deck.get_slide_by_name("explicit").map(|s| s.title.as_str()), Some("Three"));
    assert_eq!(deck.title(), "Presentation");
}

#[test]
fn test_insert_before_and_after() {
    let mut deck = Deck::new();
    deck.add_markdown("# A", Some("a")).add_markdown("# C", Some("c"));

    deck.insert("[name: b]\n# B", None, Some("a"))
        .expect("Failed to insert after");
    deck.insert("[name: start]\n# Start", Some("a"), None)
        .expect("Failed to insert before");

    let names: Vec<&str> = deck.slides().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["start", "a", "b", "c"]);
}

#[test]
fn test_insert_requires_exactly_one_anchor() {
    let mut deck = Deck::new();
    deck.add_markdown("# A", Some("a"));

    let neither = deck.insert("# X", None, None).err().expect("insert should fail");
    assert!(matches!(neither, DeckError::ValidationError(_)));
    assert!(neither.to_string().contains("Exactly one"));

    let both = deck.insert("# X", Some("a"), Some("a")).err().expect("insert should fail");
    assert!(both.to_string().contains("Exactly one"));

    let missing = deck.insert("# X", Some("nope"), None).err().expect("insert should fail");
    assert!(matches!(missing, DeckError::SlideNotFoundError(name) if name == "nope"));
    assert_eq!(deck.len(), 1);
}

#[test]
fn test_replace_keeps_name() {
    let mut deck = Deck::new();
    deck.add_markdown("# Draft", Some("summary"));

    deck.replace("summary", "[name: renamed]\n# Final\n\nDone")
        .expect("Failed to replace slide");

    let slide = deck.get_slide(0).expect("slide should exist");
    assert_eq!(slide.name, "summary");
    assert_eq!(slide.title, "Final");
    assert_eq!(slide.content, "Done");

    let result = deck.replace("missing", "# X");
    assert!(matches!(result, Err(DeckError::SlideNotFoundError(_))));
}

#[test]
fn test_multi_region_slides_keep_regions() {
    let slide = Slide::from_markdown("![left](a.jpg)\nA\n\n![right](b.jpg)\nB");
    assert!(slide.is_multi_region());
    assert_eq!(slide.regions.len(), 2);

    let single = Slide::from_markdown("# Title\n\n![left](a.jpg)\n\nText");
    assert!(!single.is_multi_region());
    assert!(single.regions.is_empty());
}

#[test]
fn test_theme_stack() {
    init_logger();
    let mut deck = Deck::new();
    deck.use_theme("default:midnight.json")
        .expect("Failed to use midnight")
        .use_theme("default:aurora.json")
        .expect("Failed to use aurora");

    let context = deck.context().expect("context should exist");
    assert_eq!(context.themes().len(), 2);
    assert_eq!(context.themes()[0].name, "aurora");
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#ffffff")));

    deck.use_themes(&["default:midnight.json"])
        .expect("Failed to replace themes");
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#0f172a")));
}

#[test]
fn test_overrides_create_default_context() {
    let mut deck = Deck::new();
    deck.override_value("primary", json!("#ff0000"))
        .expect("Failed to set override");

    assert_eq!(deck.get_theme_value("primary").unwrap(), Some(json!("#ff0000")));
    // Falls through to the default theme for everything else.
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#ffffff")));

    deck.override_palette([("bg", json!("#000000"))])
        .expect("Failed to set palette");
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#000000")));
}

#[test]
fn test_use_theme_value() {
    let custom = Theme::from_value(&json!({"name": "inline", "palette": {"accent": "#00ff00"}}))
        .expect("Failed to build theme");

    let mut deck = Deck::new().with_default_theme("default:midnight.json");
    deck.use_theme_value(custom).expect("Failed to use theme");

    assert_eq!(deck.get_theme_value("accent").unwrap(), Some(json!("#00ff00")));
    assert_eq!(deck.get_theme_value("bg").unwrap(), Some(json!("#0f172a")));
}

#[test]
fn test_unknown_theme_reference() {
    let mut deck = Deck::new();
    let result = deck.use_theme("default:nope.json");
    assert!(matches!(result, Err(DeckError::ThemeLoadError(_))));

    let result = deck.use_theme("default:../secrets.json");
    assert!(matches!(result, Err(DeckError::PathSecurityError(_))));
}
