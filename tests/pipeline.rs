//! Integration tests for the batch extraction pipeline.
//!
//! Everything here runs against a deterministic in-process model stub and an
//! in-memory (or tempdir-backed) report sink — no pdfium, no network. The
//! suite pins down the coordinator's observable contract: order
//! preservation under partial failure, flush cadence, per-page failure
//! isolation, and deterministic re-runs.

use async_trait::async_trait;
use pagemill::{
    run_pages, BatchConfig, BatchError, BatchObserver, ChatRequest, ChatResponse, FileReport,
    NoopObserver, PageError, PageImage, ReportSink, TransportError, VisionModel,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// One scripted reply per model call, in call order.
#[derive(Clone)]
enum Reply {
    /// Well-formed response with this markdown.
    Content(&'static str),
    /// 200-shaped response missing the content field.
    MissingContent,
    /// Transport failure (endpoint unreachable).
    Unreachable,
}

/// Deterministic model: replays a script, counts calls.
struct ScriptedModel {
    script: Mutex<Vec<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap()[idx].clone();
        match reply {
            Reply::Content(md) => Ok(ChatResponse::with_content(md)),
            Reply::MissingContent => Ok(ChatResponse::default()),
            Reply::Unreachable => Err(TransportError::Network {
                detail: "connection refused".into(),
            }),
        }
    }
}

/// Sink recording each flush as a separate element.
#[derive(Default)]
struct MemorySink {
    flushes: Vec<String>,
}

impl MemorySink {
    fn combined(&self) -> String {
        self.flushes.concat()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn append(&mut self, markdown: &str) -> Result<(), BatchError> {
        self.flushes.push(markdown.to_string());
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn make_pages(dir: &Path, n: usize) -> Vec<PageImage> {
    (1..=n)
        .map(|i| {
            let path = dir.join(format!("page-{i:04}.png"));
            std::fs::write(&path, format!("payload-{i}")).unwrap();
            PageImage::new(i, path, dir.join("doc.pdf"))
        })
        .collect()
}

fn quick_config(flush_every: usize) -> BatchConfig {
    BatchConfig::builder()
        .flush_every(flush_every)
        .page_delay_ms(0)
        .build()
        .unwrap()
}

fn observer() -> Arc<dyn BatchObserver> {
    Arc::new(NoopObserver)
}

// ── Order preservation ───────────────────────────────────────────────────────

#[tokio::test]
async fn output_order_matches_page_order_under_partial_failure() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 5);
    // Page 3 fails at the transport, page 4 returns a malformed response.
    let model = ScriptedModel::new(vec![
        Reply::Content("# one"),
        Reply::Content("# two"),
        Reply::Unreachable,
        Reply::MissingContent,
        Reply::Content("# five"),
    ]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(100), &mut sink, &observer())
        .await
        .unwrap();

    assert_eq!(sink.combined(), "# one\n\n# two\n\n# five\n\n");
    assert_eq!(outcome.progress.processed, 5);
    assert_eq!(outcome.progress.failed, 2);

    // Results stay in page order, failures included.
    let positions: Vec<_> = outcome.results.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    assert!(matches!(
        outcome.results[2].error,
        Some(PageError::Model { page: 3, .. })
    ));
    assert!(matches!(
        outcome.results[3].error,
        Some(PageError::ResponseShape { page: 4, .. })
    ));
}

#[tokio::test]
async fn every_page_failing_still_terminates_normally() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 3);
    let model = ScriptedModel::new(vec![Reply::Unreachable; 3]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(5), &mut sink, &observer())
        .await
        .unwrap();

    assert_eq!(outcome.progress.failed, 3);
    assert_eq!(outcome.flushes, 0);
    assert!(sink.flushes.is_empty());
}

// ── Flush cadence ────────────────────────────────────────────────────────────

#[tokio::test]
async fn twelve_pages_at_flush_five_is_three_flushes() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 12);
    let model = ScriptedModel::new(vec![Reply::Content("x"); 12]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(5), &mut sink, &observer())
        .await
        .unwrap();

    // After page 5, after page 10, and a final flush covering 11–12.
    assert_eq!(outcome.flushes, 3);
    assert_eq!(sink.flushes.len(), 3);
    assert_eq!(sink.flushes[0], "x\n\n".repeat(5));
    assert_eq!(sink.flushes[1], "x\n\n".repeat(5));
    assert_eq!(sink.flushes[2], "x\n\n".repeat(2));
}

#[tokio::test]
async fn ten_pages_at_flush_five_is_exactly_two_flushes() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 10);
    let model = ScriptedModel::new(vec![Reply::Content("x"); 10]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(5), &mut sink, &observer())
        .await
        .unwrap();

    assert_eq!(outcome.flushes, 2);
    assert_eq!(sink.flushes.len(), 2);
}

#[tokio::test]
async fn failed_pages_count_toward_flush_cadence_but_add_no_content() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 4);
    // Pages 1-2 fail; flush_every=2 means the first window has no content
    // and must produce no flush event.
    let model = ScriptedModel::new(vec![
        Reply::Unreachable,
        Reply::Unreachable,
        Reply::Content("# three"),
        Reply::Content("# four"),
    ]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(2), &mut sink, &observer())
        .await
        .unwrap();

    assert_eq!(outcome.flushes, 1);
    assert_eq!(sink.combined(), "# three\n\n# four\n\n");
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_payload_skips_model_and_continues() {
    let dir = TempDir::new().unwrap();
    let mut pages = make_pages(dir.path(), 3);
    // Page 2's payload vanishes before extraction.
    std::fs::remove_file(&pages[1].path).unwrap();
    pages[1] = PageImage::new(2, dir.path().join("page-0002.png"), dir.path().join("doc.pdf"));

    let model = ScriptedModel::new(vec![Reply::Content("# one"), Reply::Content("# three")]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = MemorySink::default();

    let outcome = run_pages(&pages, &handle, &quick_config(100), &mut sink, &observer())
        .await
        .unwrap();

    // Only two model calls: the missing page never reached the endpoint.
    assert_eq!(model.calls(), 2);
    assert!(matches!(
        outcome.results[1].error,
        Some(PageError::NotFound { page: 2, .. })
    ));
    assert_eq!(sink.combined(), "# one\n\n# three\n\n");
}

#[tokio::test]
async fn zero_pages_means_zero_calls_and_no_artifact() {
    let model = ScriptedModel::new(vec![]);
    let handle: Arc<dyn VisionModel> = model.clone();

    let out_dir = TempDir::new().unwrap();
    let mut sink = FileReport::at(out_dir.path().join("combined_output_test.md"));

    let outcome = run_pages(&[], &handle, &quick_config(5), &mut sink, &observer())
        .await
        .unwrap();

    assert_eq!(model.calls(), 0);
    assert_eq!(outcome.flushes, 0);
    assert!(!sink.created());
    assert!(!sink.path().exists());
}

#[tokio::test]
async fn write_failure_stops_the_batch() {
    struct FailingSink;

    #[async_trait]
    impl ReportSink for FailingSink {
        async fn append(&mut self, _markdown: &str) -> Result<(), BatchError> {
            Err(BatchError::OutputWriteFailed {
                path: "/full/report.md".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "ENOSPC"),
            })
        }
    }

    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 7);
    let model = ScriptedModel::new(vec![Reply::Content("x"); 7]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let mut sink = FailingSink;

    let err = run_pages(&pages, &handle, &quick_config(5), &mut sink, &observer())
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::OutputWriteFailed { .. }));
    // The run stopped at the first flush attempt, after page 5.
    assert_eq!(model.calls(), 5);
}

// ── Determinism ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn rerunning_the_same_batch_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 6);
    let script = vec![
        Reply::Content("# alpha"),
        Reply::Content("# beta"),
        Reply::Unreachable,
        Reply::Content("# delta"),
        Reply::Content("# epsilon"),
        Reply::Content("# zeta"),
    ];

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let model = ScriptedModel::new(script.clone());
        let handle: Arc<dyn VisionModel> = model.clone();
        let mut sink = MemorySink::default();
        run_pages(&pages, &handle, &quick_config(3), &mut sink, &observer())
            .await
            .unwrap();
        outputs.push(sink.combined());
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(
        outputs[0],
        "# alpha\n\n# beta\n\n# delta\n\n# epsilon\n\n# zeta\n\n"
    );
}

// ── Observer events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn observer_sees_every_page_and_flush() {
    #[derive(Default)]
    struct CountingObserver {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        flushes: AtomicUsize,
        batch_done: AtomicUsize,
    }

    impl BatchObserver for CountingObserver {
        fn on_page_start(&self, _position: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_complete(
            &self,
            _position: usize,
            _progress: &pagemill::BatchProgress,
            _len: usize,
        ) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_error(
            &self,
            _position: usize,
            _progress: &pagemill::BatchProgress,
            _error: &str,
        ) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_flush(&self, _pages: usize, _bytes: usize) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_batch_complete(&self, _progress: &pagemill::BatchProgress) {
            self.batch_done.fetch_add(1, Ordering::SeqCst);
        }
    }

    let dir = TempDir::new().unwrap();
    let pages = make_pages(dir.path(), 7);
    let model = ScriptedModel::new(vec![
        Reply::Content("a"),
        Reply::Content("b"),
        Reply::Unreachable,
        Reply::Content("d"),
        Reply::Content("e"),
        Reply::Content("f"),
        Reply::Content("g"),
    ]);
    let handle: Arc<dyn VisionModel> = model.clone();
    let counting = Arc::new(CountingObserver::default());
    let obs: Arc<dyn BatchObserver> = counting.clone();
    let mut sink = MemorySink::default();

    run_pages(&pages, &handle, &quick_config(5), &mut sink, &obs)
        .await
        .unwrap();

    assert_eq!(counting.starts.load(Ordering::SeqCst), 7);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 6);
    assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    // Flush after page 5 plus the final remainder.
    assert_eq!(counting.flushes.load(Ordering::SeqCst), 2);
    assert_eq!(counting.batch_done.load(Ordering::SeqCst), 1);
}
