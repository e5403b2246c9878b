//! markview - Main Entry Point
//!
//! Renders Markdown files to an outline of the render tree, toggles task
//! checkboxes in place, and lists highlight themes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};

use markview::config::{load_config, load_config_from};
use markview::markdown::{find_task_item, parse_markdown, toggle, HighlightCache};
use markview::{ColorMode, Error, MarkdownView, Result};

/// Application name constant.
const APP_NAME: &str = "markview";

/// How long `render --wait` waits for code highlighting.
const HIGHLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "markview", version, about = "Markdown render engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a Markdown file and print the render tree outline
    Render {
        /// Markdown file to render
        file: PathBuf,
        /// Use the dark highlight theme
        #[arg(long)]
        dark: bool,
        /// Layout configuration file (default: the user config)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Wait for code highlighting before printing
        #[arg(long)]
        wait: bool,
    },
    /// Toggle the task checkbox of the list item starting on LINE
    Toggle {
        /// Markdown file to edit in place
        file: PathBuf,
        /// 1-based line number of the task item
        line: usize,
    },
    /// List available highlight themes
    Themes,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Render {
            file,
            dark,
            config,
            wait,
        } => render(&file, dark, config.as_deref(), wait),
        Commands::Toggle { file, line } => toggle_file(&file, line),
        Commands::Themes => {
            let mut themes = HighlightCache::default().available_themes();
            themes.sort();
            for name in themes {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn render(file: &Path, dark: bool, config: Option<&Path>, wait: bool) -> Result<()> {
    let text = fs::read_to_string(file)?;
    let config = match config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let color_mode = if dark { ColorMode::Dark } else { ColorMode::Light };

    info!("{} rendering {} ({} mode)", APP_NAME, file.display(), color_mode.label());
    let mut view = MarkdownView::new(text, config, color_mode);
    if wait {
        view.wait_for_highlights(HIGHLIGHT_TIMEOUT);
    }

    print!("{}", view.tree().outline());
    Ok(())
}

fn toggle_file(file: &Path, line: usize) -> Result<()> {
    let text = fs::read_to_string(file)?;
    let doc = parse_markdown(&text)?;
    let item = find_task_item(&doc.root, line).ok_or_else(|| {
        Error::Application(format!("No task item starts on line {} of {}", line, file.display()))
    })?;

    let new_text = toggle(item, &text);
    if new_text == text {
        return Err(Error::Application(format!(
            "Task item on line {} could not be toggled",
            line
        )));
    }

    fs::write(file, new_text)?;
    info!("Toggled task on line {} of {}", line, file.display());
    Ok(())
}
