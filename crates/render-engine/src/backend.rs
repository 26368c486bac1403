//! Renderer backend selection and the shared render entry point.

use versereel_common::{GenerationError, GenerationResult, RenderConfig, RendererKind};

use crate::compositor::CompositorBackend;
use crate::ffmpeg::FfmpegRunner;
use crate::filter_graph::FilterGraphBackend;
use crate::job::{ProgressCallback, RenderJob};
use crate::output::OutputGuard;

/// Composes a [`RenderJob`] into its output file.
pub trait RendererBackend: Send + Sync {
    /// Render the job. The caller owns cleanup of partial output.
    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback<'_>>) -> GenerationResult<()>;

    /// Check if this backend can run on this system.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Backend for the configured kind.
pub fn backend_for(kind: RendererKind, config: &RenderConfig) -> Box<dyn RendererBackend> {
    let runner = FfmpegRunner::new(config.ffmpeg_bin.clone());
    match kind {
        RendererKind::Compositor => Box::new(CompositorBackend::new(runner)),
        RendererKind::FilterGraph => Box::new(FilterGraphBackend::new(runner)),
    }
}

/// Render `job` with `backend`, removing any partial output on failure.
///
/// A background plan that cannot span the narration is rejected before any
/// backend runs.
pub fn render_job(
    backend: &dyn RendererBackend,
    job: &RenderJob,
    progress: Option<ProgressCallback<'_>>,
) -> GenerationResult<()> {
    job.check_background_coverage()?;
    if !backend.is_available() {
        return Err(GenerationError::encoding(format!(
            "renderer '{}' is not available (is ffmpeg installed?)",
            backend.name()
        )));
    }
    if let Some(parent) = job.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let guard = OutputGuard::new(&job.output_path);
    let started = std::time::Instant::now();
    tracing::info!(
        backend = backend.name(),
        canvas = %job.canvas,
        overlays = job.sprites.len(),
        "Render started"
    );

    backend.render(job, progress)?;
    if !guard.path().exists() {
        return Err(GenerationError::encoding(format!(
            "renderer '{}' reported success but wrote no file",
            backend.name()
        )));
    }

    let path = guard.commit();
    tracing::info!(
        backend = backend.name(),
        path = %path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Render finished"
    );
    Ok(())
}
