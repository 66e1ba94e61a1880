// ABOUTME: Library module for the stagdeck program.
// ABOUTME: Contains theme resolution, markdown slide parsing, content layout and HTML export.

// Reexport modules
pub mod config;
pub mod deck;
pub mod errors;
pub mod html;
pub mod layout;
pub mod markdown;
pub mod paths;
pub mod theme;

// Reexport common types and functions
pub use config::Config;
pub use deck::{Deck, Slide};
pub use errors::{DeckError, Result};
pub use html::{generate_html, render_deck, write_html_to_file};
pub use layout::{
    analyze_content, calculate_content_scale, detect_layout_mode, plan_slide, ContentMetrics,
    ContentType, LayoutConfig, LayoutMode, SlidePlan,
};
pub use markdown::{parse_multi_region_markdown, parse_slide_markdown, MarkdownParser};
pub use theme::context::{ThemeContext, ThemeOverrides};
pub use theme::loader::ThemeLoader;
pub use theme::Theme;
