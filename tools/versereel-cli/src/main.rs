//! VerseReel CLI: generate bilingual recitation videos.
//!
//! Usage:
//!   versereel generate <COLLECTION> <START> <END> [OPTIONS]
//!   versereel check                          Check ffmpeg, ffprobe, and fonts
//!   versereel canvas [--platform] [--resolution]
//!   versereel config                         Print the effective configuration

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use versereel_common::{AppConfig, ErrorClass, GenerationError};

mod commands;

#[derive(Parser)]
#[command(
    name = "versereel",
    about = "Bilingual scripture recitation video generator",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a video for a range of units
    Generate(commands::generate::GenerateArgs),

    /// Check system capabilities
    Check,

    /// Show canvas geometry for a platform and resolution
    Canvas {
        /// portrait (reel) or landscape (youtube)
        #[arg(long, default_value = "portrait")]
        platform: String,

        /// Short edge in pixels: 360, 480, 720 or 1080
        #[arg(long, default_value = "720")]
        resolution: u32,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    versereel_common::logging::init_logging(&logging);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::run(config, args).await,
        Commands::Check => commands::check::run(&config),
        Commands::Canvas {
            platform,
            resolution,
        } => commands::canvas::run(&config, &platform, resolution),
        Commands::Config => commands::config::run(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    }
}

/// 2 for rejected input, 1 for every other failure.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<GenerationError>().map(GenerationError::class) {
        Some(ErrorClass::Input) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
