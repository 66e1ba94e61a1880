// ABOUTME: Main entry point for the stagdeck program.
// ABOUTME: Provides CLI interface for HTML export, deck inspection and theme queries.

use clap::{Args, Parser, Subcommand};
use stagdeck::layout::{analyze_content, calculate_content_scale, plan_slide};
use stagdeck::theme::context::ThemeContext;
use stagdeck::theme::evaluator::value_to_text;
use stagdeck::theme::loader::DEFAULT_SYMBOL;
use stagdeck::{Config, Deck};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a standalone HTML deck from markdown
    GenerateHtml(GenerateHtmlArgs),

    /// Show how each slide will be laid out
    Inspect(InspectArgs),

    /// Query themes
    #[command(subcommand)]
    Theme(ThemeCommands),
}

#[derive(Args)]
struct ThemeOptions {
    /// Theme reference, e.g. default:midnight.json
    #[arg(long)]
    theme: Option<String>,

    /// Extra theme search path as SYMBOL=DIR (repeatable)
    #[arg(long = "theme-path")]
    theme_paths: Vec<String>,
}

#[derive(Args)]
struct GenerateHtmlArgs {
    /// Path to the markdown file
    #[arg(short, long)]
    input: PathBuf,

    /// Path to output HTML file
    #[arg(short, long)]
    output: PathBuf,

    /// Slide separator line
    #[arg(long)]
    separator: Option<String>,

    #[command(flatten)]
    themes: ThemeOptions,
}

#[derive(Args)]
struct InspectArgs {
    /// Path to the markdown file
    #[arg(short, long)]
    input: PathBuf,

    /// Slide separator line
    #[arg(long)]
    separator: Option<String>,

    #[command(flatten)]
    themes: ThemeOptions,
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// Print one resolved theme value
    Get {
        key: String,
        #[command(flatten)]
        themes: ThemeOptions,
    },
    /// Print the flattened palette
    Palette {
        #[command(flatten)]
        themes: ThemeOptions,
    },
    /// List theme files under a symbol
    List {
        symbol: Option<String>,
        #[command(flatten)]
        themes: ThemeOptions,
    },
}

fn config_for(options: &ThemeOptions) -> stagdeck::Result<Config> {
    let mut config = Config::from_env();
    if let Some(theme) = &options.theme {
        config.default_theme = theme.clone();
    }
    for spec in &options.theme_paths {
        config.add_theme_path(spec)?;
    }
    Ok(config)
}

fn load_deck(
    input: &Path,
    separator: Option<&str>,
    options: &ThemeOptions,
) -> stagdeck::Result<(Deck, Config)> {
    let config = config_for(options)?;
    let mut deck = Deck::with_loader(config.theme_loader()?)
        .with_default_theme(&config.default_theme)
        .with_cache_capacity(config.expr_cache_size);
    let separator = separator.unwrap_or(config.separator.as_str());
    deck.add_from_file(input, Some(separator))?;
    if let Some(theme) = &options.theme {
        deck.use_theme(theme)?;
    }
    Ok((deck, config))
}

fn theme_context(options: &ThemeOptions) -> stagdeck::Result<ThemeContext> {
    let config = config_for(options)?;
    let loader = config.theme_loader()?;
    ThemeContext::from_references(&loader, &[&config.default_theme])
}

fn generate_html(args: &GenerateHtmlArgs) -> stagdeck::Result<()> {
    let (mut deck, config) = load_deck(&args.input, args.separator.as_deref(), &args.themes)?;
    let html_content = stagdeck::render_deck(&mut deck, &config.layout_config())?;
    stagdeck::write_html_to_file(&html_content, &args.output)?;
    println!("HTML generated successfully: {:?}", args.output);
    Ok(())
}

fn inspect(args: &InspectArgs) -> stagdeck::Result<()> {
    let (mut deck, config) = load_deck(&args.input, args.separator.as_deref(), &args.themes)?;
    let layout = config.layout_config();
    let style = deck.layout_style()?;

    println!("{} ({} slides)", deck.title(), deck.len());
    for (index, slide) in deck.slides().iter().enumerate() {
        let plan = plan_slide(slide, &style, &layout);
        println!(
            "{:>3}  {:<16} {:<15} {:<8} scale={:.2} font={:.1}px",
            index,
            slide.name,
            plan.mode.as_str(),
            plan.metrics.content_type.as_str(),
            plan.scale,
            plan.font_size_px
        );
        for (region_index, region) in slide.regions.iter().enumerate() {
            let (_, scale) = calculate_content_scale(&analyze_content(&region.content), &layout);
            println!(
                "       region {} {:<10} image={} scale={:.2}",
                region_index,
                slide.direction.as_str(),
                region.image,
                scale
            );
        }
    }
    Ok(())
}

fn theme_command(command: &ThemeCommands) -> stagdeck::Result<()> {
    match command {
        ThemeCommands::Get { key, themes } => {
            let context = theme_context(themes)?;
            match context.get(key)? {
                Some(value) => println!("{}", value_to_text(&value)),
                None => {
                    return Err(anyhow::anyhow!("Unknown theme key: '{}'", key).into())
                }
            }
        }
        ThemeCommands::Palette { themes } => {
            let context = theme_context(themes)?;
            for (key, value) in context.get_palette() {
                println!("{}: {}", key, value_to_text(&value));
            }
        }
        ThemeCommands::List { symbol, themes } => {
            let loader = config_for(themes)?.theme_loader()?;
            let symbol = symbol.as_deref().unwrap_or(DEFAULT_SYMBOL);
            for name in loader.available_themes(symbol)? {
                println!("{}:{}", symbol, name);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::GenerateHtml(args)) => generate_html(args),
        Some(Commands::Inspect(args)) => inspect(args),
        Some(Commands::Theme(command)) => theme_command(command),
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
