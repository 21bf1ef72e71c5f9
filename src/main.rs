use std::process::ExitCode;

use clap::{ArgAction, Parser};
use wayscan::{
    backend,
    config::{Config, ConfigOverrides},
    recognition::ProviderKind,
};

#[derive(Parser, Debug)]
#[command(name = "wayscan")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WAYSCAN_GIT_HASH"), ")"),
    about = "Freeze the screen, select a region and recognize its text on Wayland compositors"
)]
struct Cli {
    /// Copy recognized text to the clipboard as soon as it arrives
    #[arg(long = "autocopy", short = 'a', action = ArgAction::SetTrue)]
    auto_copy: bool,

    /// Show a desktop notification with the recognized text
    #[arg(long, short = 'n', action = ArgAction::SetTrue)]
    notify: bool,

    /// Show the frozen image on monitors the pointer is not on
    #[arg(long, short = 'r', action = ArgAction::SetTrue)]
    render_inactive: bool,

    /// Use integer output scales only
    #[arg(long, short = 't', action = ArgAction::SetTrue)]
    no_fractional: bool,

    /// Only log errors
    #[arg(long, short = 'q', action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug output
    #[arg(long, short = 'v', action = ArgAction::SetTrue)]
    verbose: bool,

    /// Recognize every selection with this provider (tesseract, paddle, ollama, gemini)
    #[arg(long, short = 'P', value_name = "NAME")]
    provider: Option<String>,

    /// Language tag for the local engine (e.g. eng, spa, deu)
    #[arg(long = "lang", short = 'L', value_name = "TAG")]
    language: Option<String>,

    /// Ask AI providers to translate instead of transcribe
    #[arg(long, short = 'T', action = ArgAction::SetTrue)]
    translate: bool,
}

fn init_logging(cli: &Cli) {
    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    // RUST_LOG, when set, takes precedence over the default.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let provider = match cli.provider.as_deref().map(str::parse::<ProviderKind>) {
        None => None,
        Some(Ok(kind)) => Some(kind),
        Some(Err(err)) => {
            log::error!("Invalid --provider: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // Check for Wayland environment
    if std::env::var_os("WAYLAND_DISPLAY").is_none() {
        log::error!("WAYLAND_DISPLAY not set - this application requires Wayland.");
        log::error!("Please run on a wlroots-based compositor (Sway, Hyprland, etc.).");
        return ExitCode::FAILURE;
    }

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config: {:#}. Using defaults.", e);
            Config::default()
        }
    };
    config.apply_overrides(&ConfigOverrides {
        auto_copy: cli.auto_copy,
        notify: cli.notify,
        render_inactive: cli.render_inactive,
        no_fractional: cli.no_fractional,
        provider,
        language: cli.language,
        translate: cli.translate,
    });

    log::info!("Starting wayscan overlay...");
    log::info!("Controls:");
    log::info!("  - Select: drag; move or resize by dragging inside or at a corner");
    log::info!("  - Nudge pointer: arrow keys");
    log::info!("  - Cancel: Escape");

    match backend::run_wayland(config) {
        Ok(exit) => {
            log::info!("Session ended ({:?})", exit);
            ExitCode::from(exit.exit_code())
        }
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
