//! End-to-end generation against in-memory collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde_json::json;
use versereel_common::media::ProbeError;
use versereel_common::{
    AppConfig, ErrorClass, GenerationError, GenerationResult, MediaProbe, VideoInfo,
};
use versereel_generator::{spawn_generation, Generator, GeneratorParts};
use versereel_progress::{ProgressRegistry, RegistryOptions};
use versereel_project_model::{EventKind, GenerationRequest, ProgressEvent};
use versereel_render_engine::{
    NarrationJoiner, ProgressCallback, RenderJob, RenderProgress, RendererBackend,
};
use versereel_timeline::{AssetFetcher, ScriptureProvider};

const FIXTURE_FONT: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/fonts/DejaVuSans.ttf"
);
const BACKGROUND_URL: &str = "https://videos.test/background.mp4";

struct FakeProvider {
    units: u32,
}

impl ScriptureProvider for FakeProvider {
    fn fetch(&self, _collection: u32, editions: &[&str]) -> GenerationResult<serde_json::Value> {
        let units = |prefix: &str| -> Vec<serde_json::Value> {
            (1..=self.units)
                .map(|n| json!({ "numberInSurah": n, "text": format!("{prefix} {n}") }))
                .collect()
        };
        Ok(json!({
            "data": [
                { "edition": { "identifier": editions[0] }, "ayahs": units("بسم الله") },
                { "edition": { "identifier": editions[1] }, "ayahs": units("In the name") }
            ]
        }))
    }
}

/// Writes the URL into the destination, except for URLs containing
/// `unreachable`.
#[derive(Default)]
struct FakeFetcher {
    unreachable: Option<String>,
}

impl AssetFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> bool {
        if self.unreachable.as_deref().is_some_and(|u| url.contains(u)) {
            return false;
        }
        std::fs::write(dest, url.as_bytes()).is_ok()
    }
}

struct FakeProbe {
    durations: HashMap<String, f64>,
}

impl MediaProbe for FakeProbe {
    fn audio_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        Ok(*self.durations.get(&name).unwrap_or(&1.5))
    }

    fn video_info(&self, _path: &Path) -> Result<VideoInfo, ProbeError> {
        Ok(VideoInfo {
            width: 1920,
            height: 1080,
            duration_secs: 10.0,
        })
    }
}

/// Counts catalogue requests and serves nothing.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

impl ScriptureProvider for CountingProvider {
    fn fetch(&self, _collection: u32, _editions: &[&str]) -> GenerationResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "data": [] }))
    }
}

struct FakeJoiner;

impl NarrationJoiner for FakeJoiner {
    fn join(&self, clips: &[PathBuf], work_dir: &Path) -> GenerationResult<PathBuf> {
        let out = work_dir.join("narration.wav");
        std::fs::write(&out, format!("{} clips", clips.len()))?;
        Ok(out)
    }
}

struct RecordedJob {
    total_secs: f64,
    canvas: (u32, u32),
    windows: Vec<(f64, f64)>,
    work_dir: PathBuf,
    work_dir_existed: bool,
    output_path: PathBuf,
}

/// Renders needed before any render may finish. Zero never waits.
#[derive(Default)]
struct Rendezvous {
    expected: usize,
    arrived: Mutex<usize>,
    all_in: Condvar,
}

impl Rendezvous {
    fn of(expected: usize) -> Arc<Self> {
        Arc::new(Self {
            expected,
            ..Self::default()
        })
    }

    /// Blocks until `expected` renders are in flight or five seconds pass.
    /// Returns whether everyone arrived.
    fn arrive(&self) -> bool {
        let mut arrived = self.arrived.lock().unwrap();
        *arrived += 1;
        self.all_in.notify_all();
        let (arrived, _) = self
            .all_in
            .wait_timeout_while(arrived, Duration::from_secs(5), |n| *n < self.expected)
            .unwrap();
        *arrived >= self.expected
    }
}

/// Writes a placeholder output and records what it was asked to render.
#[derive(Clone, Default)]
struct RecordingBackend {
    jobs: Arc<Mutex<Vec<RecordedJob>>>,
    rendezvous: Arc<Rendezvous>,
    overlapped: Arc<AtomicUsize>,
}

impl RecordingBackend {
    /// A backend whose renders all wait for each other.
    fn overlapping(renders: usize) -> Self {
        Self {
            rendezvous: Rendezvous::of(renders),
            ..Self::default()
        }
    }

    fn take_job(&self) -> RecordedJob {
        self.jobs.lock().unwrap().remove(0)
    }
}

impl RendererBackend for RecordingBackend {
    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback<'_>>) -> GenerationResult<()> {
        self.jobs.lock().unwrap().push(RecordedJob {
            total_secs: job.total_secs,
            canvas: (job.canvas.width, job.canvas.height),
            windows: job.sprites.iter().map(|s| (s.start_secs, s.end_secs)).collect(),
            work_dir: job.work_dir.clone(),
            work_dir_existed: job.work_dir.exists(),
            output_path: job.output_path.clone(),
        });
        if self.rendezvous.arrive() {
            self.overlapped.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(cb) = &progress {
            cb(RenderProgress::rendering(12, 36, 0.1));
            cb(RenderProgress::complete(36));
        }
        std::fs::write(&job.output_path, b"mp4")?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct Harness {
    root: tempfile::TempDir,
    config: AppConfig,
}

impl Harness {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.temp_root = root.path().join("tmp");
        config.paths.output_dir = root.path().join("out");
        config.paths.fallback_background = root.path().join("missing_default.mp4");
        config.text.original_font = PathBuf::from(FIXTURE_FONT);
        config.text.translation_font = PathBuf::from(FIXTURE_FONT);
        Self { root, config }
    }

    fn generator(&self, units: u32, fetcher: FakeFetcher, backend: RecordingBackend) -> Generator {
        Generator::with_parts(
            self.config.clone(),
            GeneratorParts {
                provider: Arc::new(FakeProvider { units }),
                fetcher: Arc::new(fetcher),
                probe: Arc::new(FakeProbe {
                    durations: HashMap::new(),
                }),
                narration: Box::new(FakeJoiner),
                backend: Box::new(backend),
            },
        )
    }

    fn temp_entries(&self) -> usize {
        std::fs::read_dir(&self.config.paths.temp_root)
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

fn request(collection: u32, start: u32, end: u32) -> GenerationRequest {
    GenerationRequest::new(collection, start, end).with_background(BACKGROUND_URL)
}

#[test]
fn collection_out_of_bounds_is_input_error_without_temp_dir() {
    let h = Harness::new();
    let generator = h.generator(7, FakeFetcher::default(), RecordingBackend::default());

    let err = generator.generate(&request(115, 1, 1), None).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidInput { .. }));
    assert_eq!(err.class(), ErrorClass::Input);
    assert!(!h.config.paths.temp_root.exists());
}

#[test]
fn range_matching_no_units_is_empty_range() {
    let h = Harness::new();
    let generator = h.generator(5, FakeFetcher::default(), RecordingBackend::default());

    let err = generator.generate(&request(1, 9, 12), None).unwrap_err();
    assert!(matches!(err, GenerationError::EmptyRange { .. }));
    assert_eq!(err.class(), ErrorClass::Failure);
    assert_eq!(h.temp_entries(), 0);
}

#[test]
fn unreachable_background_without_fallback_is_unavailable_and_purged() {
    let h = Harness::new();
    let fetcher = FakeFetcher {
        unreachable: Some("videos.test".to_string()),
    };
    let generator = h.generator(3, fetcher, RecordingBackend::default());

    let events = Mutex::new(Vec::new());
    let sink = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());
    let err = generator.generate(&request(1, 1, 2), Some(&sink)).unwrap_err();

    assert!(matches!(err, GenerationError::BackgroundUnavailable { .. }));
    assert_eq!(h.temp_entries(), 0);

    let events = events.into_inner().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Error);
    assert_eq!(last.percentage, 35);
    assert!(last.message.as_deref().unwrap().contains("Background video unavailable"));
}

#[test]
fn local_fallback_background_is_used_when_download_fails() {
    let mut h = Harness::new();
    let fallback = h.root.path().join("default_background.mp4");
    std::fs::write(&fallback, b"local").unwrap();
    h.config.paths.fallback_background = fallback;

    let fetcher = FakeFetcher {
        unreachable: Some("videos.test".to_string()),
    };
    let generator = h.generator(3, fetcher, RecordingBackend::default());
    let path = generator.generate(&request(1, 1, 2), None).unwrap();
    assert!(path.exists());
}

#[test]
fn single_unit_portrait_request() {
    let h = Harness::new();
    let backend = RecordingBackend::default();
    let generator = h.generator(7, FakeFetcher::default(), backend.clone());

    let events = Mutex::new(Vec::new());
    let sink = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());
    let path = generator.generate(&request(1, 3, 3), Some(&sink)).unwrap();

    assert_eq!(
        path,
        h.config.paths.output_dir.join("recitation_portrait_1_3-3.mp4")
    );
    assert!(path.exists());
    assert_eq!(h.temp_entries(), 0);

    let job = backend.take_job();
    assert_eq!(job.total_secs, 1.5);
    assert_eq!(job.canvas, (720, 1280));
    assert_eq!(job.windows, vec![(0.0, 1.5)]);
    assert!(job.work_dir_existed);

    let events = events.into_inner().unwrap();
    let percents: Vec<u8> = events.iter().map(|e| e.percentage).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.first(), Some(&0));
    assert!(percents.contains(&79));
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Complete);
    assert_eq!(last.message.as_deref(), Some(path.display().to_string().as_str()));
}

#[test]
fn overlays_follow_cumulative_segment_offsets() {
    let h = Harness::new();
    let backend = RecordingBackend::default();
    let generator = Generator::with_parts(
        h.config.clone(),
        GeneratorParts {
            provider: Arc::new(FakeProvider { units: 4 }),
            fetcher: Arc::new(FakeFetcher::default()),
            probe: Arc::new(FakeProbe {
                durations: HashMap::from([
                    ("audio_002_001.mp3".to_string(), 2.0),
                    ("audio_002_002.mp3".to_string(), 0.5),
                    ("audio_002_003.mp3".to_string(), 3.0),
                ]),
            }),
            narration: Box::new(FakeJoiner),
            backend: Box::new(backend.clone()),
        },
    );

    generator.generate(&request(2, 1, 3), None).unwrap();
    let job = backend.take_job();
    assert_eq!(job.windows, vec![(0.0, 2.0), (2.0, 2.5), (2.5, 5.5)]);
    assert_eq!(job.total_secs, 5.5);
}

#[tokio::test]
async fn spawned_failure_ends_stream_with_error_event() {
    let h = Harness::new();
    let generator = Arc::new(h.generator(5, FakeFetcher::default(), RecordingBackend::default()));
    let registry = ProgressRegistry::new(RegistryOptions::default());

    let handle = spawn_generation(
        generator,
        &registry,
        request(1, 9, 12).with_correlation_id("empty-range"),
    )
    .unwrap();
    assert_eq!(handle.id(), "empty-range");

    let mut sub = registry.subscribe("empty-range").await.unwrap();
    let mut events = Vec::new();
    while let Some(e) = sub.next().await {
        events.push(e);
    }

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyRange { .. }));

    let errors: Vec<_> = events.iter().filter(|e| e.kind == EventKind::Error).collect();
    assert_eq!(errors.len(), 1);
    assert!(events.last().unwrap().is_terminal());
    assert!(errors[0].message.as_deref().unwrap().contains("No units found"));
}

#[tokio::test]
async fn duplicate_in_flight_request_id_is_rejected() {
    let h = Harness::new();
    let registry = ProgressRegistry::new(RegistryOptions::default());
    let _held = registry.register("busy").unwrap();

    let generator = Arc::new(h.generator(5, FakeFetcher::default(), RecordingBackend::default()));
    let err = spawn_generation(generator, &registry, request(1, 1, 1).with_correlation_id("busy"))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Input);
}

#[test]
fn missing_font_fails_before_fetching_anything() {
    let mut h = Harness::new();
    h.config.text.original_font = h.root.path().join("no_such_font.ttf");
    let provider = Arc::new(CountingProvider::default());
    let generator = Generator::with_parts(
        h.config.clone(),
        GeneratorParts {
            provider: provider.clone(),
            fetcher: Arc::new(FakeFetcher::default()),
            probe: Arc::new(FakeProbe {
                durations: HashMap::new(),
            }),
            narration: Box::new(FakeJoiner),
            backend: Box::new(RecordingBackend::default()),
        },
    );

    let err = generator.generate(&request(1, 1, 2), None).unwrap_err();
    assert!(matches!(err, GenerationError::FontUnavailable { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(!h.config.paths.temp_root.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_generations_use_separate_workspaces_and_outputs() {
    let h = Harness::new();
    let backend = RecordingBackend::overlapping(2);
    let generator = Arc::new(h.generator(3, FakeFetcher::default(), backend.clone()));
    let registry = ProgressRegistry::new(RegistryOptions::default());

    // Both ids sanitize to `job_1`.
    let first = spawn_generation(
        generator.clone(),
        &registry,
        request(1, 1, 2).with_correlation_id("job/1"),
    )
    .unwrap();
    let second = spawn_generation(
        generator,
        &registry,
        request(1, 1, 2).with_correlation_id("job 1"),
    )
    .unwrap();

    let first = first.wait().await.unwrap();
    let second = second.wait().await.unwrap();
    assert_eq!(backend.overlapped.load(Ordering::SeqCst), 2, "renders never overlapped");

    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());

    let jobs = backend.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_ne!(jobs[0].work_dir, jobs[1].work_dir);
    assert_ne!(jobs[0].output_path, jobs[1].output_path);
    assert!(jobs.iter().all(|j| j.work_dir_existed));
    assert!(jobs.iter().all(|j| !j.work_dir.exists()));
    drop(jobs);
    assert_eq!(h.temp_entries(), 0);
}
