//! Running generations off the async executor.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use versereel_common::{GenerationError, GenerationResult};
use versereel_progress::ProgressRegistry;
use versereel_project_model::{GenerationRequest, ProgressEvent};

use crate::pipeline::Generator;

/// A generation running on a blocking worker thread.
#[derive(Debug)]
pub struct GenerationHandle {
    id: String,
    task: JoinHandle<GenerationResult<PathBuf>>,
}

impl GenerationHandle {
    /// Registry id the progress stream is published under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the generation to finish.
    pub async fn wait(self) -> GenerationResult<PathBuf> {
        self.task
            .await
            .map_err(|e| GenerationError::worker(format!("generation task failed: {e}")))?
    }
}

/// Register a progress channel for `request` and run it on a blocking
/// worker.
///
/// The registry id is the request's trimmed correlation id, or a fresh
/// random id when it has none. The request is rewritten to carry that id,
/// so the output name follows the registry id. Registering an id that is
/// already in flight fails before any work starts. The channel always ends
/// with a terminal event: the output path on success, the cause on failure.
///
/// The worker holds `generator` until it finishes, so when this is the
/// last reference the generator is dropped on the worker thread.
pub fn spawn_generation(
    generator: Arc<Generator>,
    registry: &ProgressRegistry,
    mut request: GenerationRequest,
) -> GenerationResult<GenerationHandle> {
    let id = request
        .correlation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    request.correlation_id = Some(id.clone());

    let sender = registry.register(&id)?;
    tracing::info!(id = %id, backend = generator.backend_name(), "Spawning generation");

    let task = tokio::task::spawn_blocking(move || {
        let forward = |event: &ProgressEvent| {
            if !event.is_terminal() {
                sender.send(event.clone());
            }
        };
        let result = generator.generate(&request, Some(&forward));
        match &result {
            Ok(path) => sender.complete(path.display().to_string()),
            Err(e) => sender.fail(e.to_string()),
        }
        drop(generator);
        result
    });

    Ok(GenerationHandle { id, task })
}
