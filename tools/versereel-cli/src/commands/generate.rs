//! Generate a recitation video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use versereel_common::{AppConfig, RendererKind};
use versereel_generator::{spawn_generation, Generator};
use versereel_progress::ProgressRegistry;
use versereel_project_model::{
    EventKind, GenerationRequest, DEFAULT_BACKGROUND_URL, DEFAULT_NARRATOR, DEFAULT_TRANSLATION,
};

use super::{parse_platform, parse_resolution};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    Compositor,
    FilterGraph,
}

impl From<BackendArg> for RendererKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Compositor => RendererKind::Compositor,
            BackendArg::FilterGraph => RendererKind::FilterGraph,
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Collection (surah) number
    pub collection: u32,

    /// First unit (ayah), 1-based
    pub start: u32,

    /// Last unit (ayah), inclusive
    pub end: u32,

    /// Narration audio edition
    #[arg(long, default_value = DEFAULT_NARRATOR)]
    pub narrator: String,

    /// Translation text edition
    #[arg(long, default_value = DEFAULT_TRANSLATION)]
    pub translation: String,

    /// Background video URL or local path
    #[arg(long, default_value = DEFAULT_BACKGROUND_URL)]
    pub background: String,

    /// portrait (reel) or landscape (youtube)
    #[arg(long, default_value = "portrait")]
    pub platform: String,

    /// Short edge in pixels: 360, 480, 720 or 1080
    #[arg(long, default_value = "720")]
    pub resolution: u32,

    /// Request id; also names the progress stream and output file
    #[arg(long)]
    pub id: Option<String>,

    /// Renderer backend (defaults to the configured one)
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Output directory (defaults to the configured one)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write an SRT sidecar next to the video
    #[arg(long)]
    pub srt: bool,
}

impl GenerateArgs {
    fn request(&self) -> anyhow::Result<GenerationRequest> {
        let mut request = GenerationRequest::new(self.collection, self.start, self.end)
            .with_platform(parse_platform(&self.platform)?)
            .with_resolution(parse_resolution(self.resolution)?)
            .with_background(self.background.clone());
        request.narrator_id = self.narrator.clone();
        request.translation_id = self.translation.clone();
        request.correlation_id = self.id.clone();
        Ok(request)
    }
}

pub async fn run(mut config: AppConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let request = args.request()?;
    if let Some(backend) = args.backend {
        config.render.backend = backend.into();
    }
    if let Some(dir) = args.output_dir {
        config.paths.output_dir = dir;
    }
    if args.srt {
        config.output.subtitle_sidecar = true;
    }

    println!(
        "Generating collection {} units {}-{} ({}, {}p)",
        request.collection,
        request.start,
        request.end,
        request.platform.as_str(),
        request.resolution.pixels()
    );

    let registry = ProgressRegistry::from_config(&config.progress);
    // Blocking HTTP clients must be built off the executor threads.
    let generator = tokio::task::spawn_blocking(move || Generator::from_config(config)).await??;
    let handle = spawn_generation(Arc::new(generator), &registry, request)?;
    tracing::debug!(id = handle.id(), "Generation spawned");

    let mut subscription = registry.subscribe(handle.id()).await?;
    while let Some(event) = subscription.next().await {
        match event.kind {
            EventKind::Progress => {
                print!("\r  Progress: {:>3}% {:<24}", event.percentage, event.stage);
                let _ = std::io::stdout().flush();
            }
            EventKind::Complete => println!("\r  Progress: 100% {:<24}", event.stage),
            EventKind::Error => println!(),
        }
    }
    drop(subscription);

    let path = handle.wait().await?;
    println!("Generated: {}", path.display());
    Ok(())
}
