use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn stagdeck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stagdeck"))
        .args(args)
        .env_remove("STAGDECK_THEME")
        .env_remove("STAGDECK_THEME_DIR")
        .env_remove("STAGDECK_SEPARATOR")
        .output()
        .expect("Failed to execute stagdeck")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_deck(dir: &Path) -> std::path::PathBuf {
    let input = dir.join("talk.md");
    fs::write(
        &input,
        "---\ntitle: CLI Deck\nfooter: Test footer\nslidenumbers: true\n---\n\
         # Welcome\n\n## A test deck\n\n---\n\n\
         # Numbers\n\n| Quarter | Revenue |\n|---|---|\n| Q1 | 10 |\n| Q2 | 12 |\n\n---\n\n\
         # Split\n\n![left overlay](photo.jpg)\n\n- one\n- two\n\n^ Speaker note\n\n---\n\n\
         ![left](wide.jpg)\nLeft\n\n![left](wide.jpg)\nRight\n",
    )
    .expect("Failed to write markdown file");
    input
}

#[test]
fn test_generate_html() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_deck(temp_dir.path());
    let output_path = temp_dir.path().join("out").join("deck.html");

    let output = stagdeck(&[
        "generate-html",
        "--input",
        input.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).contains("HTML generated successfully"));

    let html = fs::read_to_string(&output_path).expect("Failed to read output file");
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("<title>CLI Deck</title>"));
    assert!(html.contains("<section id=\"slide_0\" class=\"slide title-only\""));
    assert!(html.contains(">Welcome</h1>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("content-table"));
    assert!(html.contains("split-left"));
    assert!(html.contains("class=\"slide-overlay\""));
    assert!(html.contains("<aside class=\"notes\">Speaker note</aside>"));
    assert!(html.contains("multi-region"));
    assert!(html.contains("url(wide.jpg) 100% center/200% auto no-repeat;"));
    assert!(html.contains("<div class=\"slide-footer\">Test footer</div>"));
    assert!(html.contains("<div class=\"slide-number\">4</div>"));
}

#[test]
fn test_generate_html_with_theme() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("talk.md");
    fs::write(&input, "Only content here").expect("Failed to write markdown file");
    let output_path = temp_dir.path().join("deck.html");

    let output = stagdeck(&[
        "generate-html",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output_path.to_str().unwrap(),
        "--theme",
        "default:midnight.json",
    ]);
    assert!(output.status.success());

    let html = fs::read_to_string(&output_path).expect("Failed to read output file");
    assert!(html.contains("class=\"slide content-only\""));
    assert!(html.contains("background-color: #0f172a;"));
}

#[test]
fn test_generate_html_missing_input() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = stagdeck(&[
        "generate-html",
        "--input",
        temp_dir.path().join("missing.md").to_str().unwrap(),
        "--output",
        temp_dir.path().join("deck.html").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Path not found"));
}

#[test]
fn test_inspect() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_deck(temp_dir.path());

    let output = stagdeck(&["inspect", "--input", input.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("CLI Deck (4 slides)"));
    assert!(text.contains("title_only"));
    assert!(text.contains("table"));
    assert!(text.contains("title_content"));
    assert!(text.contains("region 1 horizontal"));
}

#[test]
fn test_theme_get() {
    let output = stagdeck(&["theme", "get", "bg", "--theme", "default:midnight.json"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "#0f172a");

    let output = stagdeck(&["theme", "get", "title_size"]);
    assert_eq!(stdout(&output).trim(), "80");

    let output = stagdeck(&["theme", "get", "no_such_key"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown theme key: 'no_such_key'"));
}

#[test]
fn test_theme_palette_and_list() {
    let output = stagdeck(&["theme", "palette"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.lines().any(|l| l == "primary: #667eea"));
    assert!(text.lines().any(|l| l == "bg: #ffffff"));

    let output = stagdeck(&["theme", "list"]);
    let text = stdout(&output);
    assert!(text.lines().any(|l| l == "default:aurora.json"));
    assert!(text.lines().any(|l| l == "default:midnight.json"));
}

#[test]
fn test_theme_path_registers_symbol() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("brand.json"),
        r##"{"name": "brand", "extends": "default:aurora.json", "palette": {"primary": "#ff0000"}}"##,
    )
    .expect("Failed to write theme file");
    let theme_path = format!("brand={}", temp_dir.path().display());

    let output = stagdeck(&[
        "theme",
        "get",
        "primary",
        "--theme-path",
        &theme_path,
        "--theme",
        "brand:brand.json",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).trim(), "#ff0000");

    let output = stagdeck(&["theme", "list", "brand", "--theme-path", &theme_path]);
    assert_eq!(stdout(&output).trim(), "brand:brand.json");
}

#[test]
fn test_no_command() {
    let output = stagdeck(&[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No command specified"));
}
