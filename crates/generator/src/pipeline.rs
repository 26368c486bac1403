//! The generation pipeline.
//!
//! Runs synchronously on the calling thread: resolve the timeline, join
//! the narration, adapt the background, lay out and rasterize subtitles,
//! then render. The per-request temporary workspace is purged on every
//! exit path and a failed render leaves no partial output behind.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use versereel_common::fs::TempWorkspace;
use versereel_common::media::FfprobeProbe;
use versereel_common::{AppConfig, GenerationError, GenerationResult, MediaProbe};
use versereel_processing_core::subtitles::save_subtitles;
use versereel_processing_core::{ArabicShaper, BackgroundPlan, FontSet, Shaper, SubtitleLayout};
use versereel_project_model::{CanvasSpec, GenerationRequest, Stage};
use versereel_render_engine::{
    backend_for, rasterize_all, render_job, FfmpegRunner, NarrationJoiner, ProgressCallback,
    RenderJob, RenderProgress, RendererBackend,
};
use versereel_timeline::{AssetFetcher, HttpProvider, RoutingFetcher, ScriptureProvider, TimelineBuilder};

use crate::checkpoint::{Checkpoints, ProgressSink};
use crate::naming::{output_file_name, workspace_key};

/// Local name of the downloaded background inside the workspace.
const BACKGROUND_FILE: &str = "background.mp4";

/// Collaborators a [`Generator`] is assembled from.
pub struct GeneratorParts {
    pub provider: Arc<dyn ScriptureProvider>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub probe: Arc<dyn MediaProbe>,
    pub narration: Box<dyn NarrationJoiner>,
    pub backend: Box<dyn RendererBackend>,
}

/// Produces one video per [`GenerationRequest`].
///
/// Holds blocking HTTP clients when built with [`Generator::from_config`];
/// create, use, and drop it off the async executor threads.
pub struct Generator {
    config: AppConfig,
    timeline: TimelineBuilder,
    fetcher: Arc<dyn AssetFetcher>,
    probe: Arc<dyn MediaProbe>,
    narration: Box<dyn NarrationJoiner>,
    backend: Box<dyn RendererBackend>,
    shaper: Box<dyn Shaper>,
}

impl Generator {
    /// Generator backed by HTTP, ffprobe, and the configured renderer.
    pub fn from_config(config: AppConfig) -> GenerationResult<Self> {
        let provider = Arc::new(HttpProvider::new(&config.provider)?);
        let fetcher = Arc::new(RoutingFetcher::new(&config.provider)?);
        let probe = Arc::new(FfprobeProbe::new(config.render.ffprobe_bin.clone()));
        let narration = Box::new(FfmpegRunner::new(config.render.ffmpeg_bin.clone()));
        let backend = backend_for(config.render.backend, &config.render);
        Ok(Self::with_parts(
            config,
            GeneratorParts {
                provider,
                fetcher,
                probe,
                narration,
                backend,
            },
        ))
    }

    pub fn with_parts(config: AppConfig, parts: GeneratorParts) -> Self {
        let timeline = TimelineBuilder::new(
            parts.provider,
            parts.fetcher.clone(),
            parts.probe.clone(),
            config.provider.audio_fallback_base.clone(),
        );
        Self {
            config,
            timeline,
            fetcher: parts.fetcher,
            probe: parts.probe,
            narration: parts.narration,
            backend: parts.backend,
            shaper: Box::new(ArabicShaper),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate the video for `request` and return its path.
    ///
    /// `sink`, when given, sees every milestone and the terminal event.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<ProgressSink<'_>>,
    ) -> GenerationResult<PathBuf> {
        let checkpoints = Checkpoints::new(sink);
        let result = self.generate_inner(request, &checkpoints);
        match &result {
            Ok(path) => checkpoints.complete(path.display().to_string()),
            Err(e) => checkpoints.error(e.to_string()),
        }
        result
    }

    fn generate_inner(
        &self,
        request: &GenerationRequest,
        checkpoints: &Checkpoints<'_>,
    ) -> GenerationResult<PathBuf> {
        request
            .validate(self.config.provider.collection_count)
            .map_err(|e| GenerationError::invalid_input(e.to_string()))?;

        let span = tracing::info_span!(
            "generate",
            collection = request.collection,
            start = request.start,
            end = request.end,
            platform = request.platform.as_str(),
        );
        let _enter = span.enter();
        let started = Instant::now();
        checkpoints.stage(Stage::Start);

        // A missing font is a deployment problem; fail before any download.
        let fonts = FontSet::load(&self.config.text)?;

        let workspace = TempWorkspace::create(&self.config.paths.temp_root, &workspace_key(request))?;
        let result = self.run(request, &fonts, &workspace, checkpoints);
        drop(workspace);

        match &result {
            Ok(path) => tracing::info!(
                path = %path.display(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Generation complete"
            ),
            Err(e) => tracing::error!(kind = e.kind(), error = %e, "Generation failed"),
        }
        result
    }

    fn run(
        &self,
        request: &GenerationRequest,
        fonts: &FontSet,
        workspace: &TempWorkspace,
        checkpoints: &Checkpoints<'_>,
    ) -> GenerationResult<PathBuf> {
        let units = self.timeline.fetch_units(request)?;
        checkpoints.stage(Stage::FetchComplete);

        let timeline = self.timeline.resolve_assets(request, units, workspace.path())?;
        checkpoints.stage(Stage::DownloadComplete);

        let clips: Vec<PathBuf> = timeline
            .segments
            .iter()
            .map(|s| s.audio_path.clone())
            .collect();
        let audio_path = self.narration.join(&clips, workspace.path())?;
        checkpoints.stage(Stage::AudioReady);

        let canvas = CanvasSpec::for_request(request.platform, request.resolution);
        let background_path = self.resolve_background(request, workspace)?;
        let info = self
            .probe
            .video_info(&background_path)
            .map_err(|e| GenerationError::background_load(&background_path, e.to_string()))?;
        let background = BackgroundPlan::compute(
            &background_path,
            &info,
            canvas,
            timeline.total_secs,
            self.config.encoding.fps,
        )?;
        tracing::info!(
            canvas = %canvas,
            rotate = background.rotate,
            loops = background.loop_count,
            "Background planned"
        );
        checkpoints.stage(Stage::VideoReady);

        let layout = SubtitleLayout::new(&self.config.text, canvas);
        let overlays = layout.layout(
            &timeline,
            self.shaper.as_ref(),
            &fonts.original,
            &fonts.translation,
        );
        let sprites = rasterize_all(&overlays, fonts, canvas);
        checkpoints.stage(Stage::SubtitleReady);

        let output_path = self
            .config
            .paths
            .output_dir
            .join(output_file_name(&self.config.output.file_prefix, request));
        let job = RenderJob {
            background_path,
            background,
            sprites,
            audio_path,
            canvas,
            profile: self.config.encoding.clone(),
            output_path,
            work_dir: workspace.path().to_path_buf(),
            total_secs: timeline.total_secs,
        };

        checkpoints.stage(Stage::RenderStart);
        let on_progress: ProgressCallback<'_> =
            Box::new(|p: RenderProgress| checkpoints.encoding(p.progress));
        render_job(self.backend.as_ref(), &job, Some(on_progress))?;

        if self.config.output.subtitle_sidecar {
            let sidecar = job.output_path.with_extension("srt");
            if let Err(e) = save_subtitles(&timeline.segments, &sidecar) {
                tracing::warn!(path = %sidecar.display(), error = %e, "Failed to write subtitle sidecar");
            }
        }

        Ok(job.output_path)
    }

    /// Download the requested background, falling back to the configured
    /// local asset.
    fn resolve_background(
        &self,
        request: &GenerationRequest,
        workspace: &TempWorkspace,
    ) -> GenerationResult<PathBuf> {
        let dest = workspace.file(BACKGROUND_FILE);
        if self.fetcher.fetch(&request.background, &dest) {
            return Ok(dest);
        }

        let fallback = &self.config.paths.fallback_background;
        if fallback.is_file() {
            tracing::warn!(
                requested = %request.background,
                fallback = %fallback.display(),
                "Background download failed, using local fallback"
            );
            return Ok(fallback.clone());
        }

        Err(GenerationError::background_unavailable(format!(
            "could not fetch {} and no local fallback at {}",
            request.background,
            fallback.display()
        )))
    }
}
