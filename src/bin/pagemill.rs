//! CLI binary for pagemill.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! drives a terminal progress bar off the observer seam, and prints a
//! summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagemill::{
    run_with_observer, BatchConfig, BatchObserver, BatchProgress, CorruptDocumentPolicy,
    OllamaClient, VisionModel,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal observer: a live progress bar plus one log line per page and per
/// flush. The pipeline is strictly sequential, so no locking is needed for
/// per-page state.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning source directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BatchObserver for CliObserver {
    fn on_batch_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting extraction of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, position: usize, _total: usize) {
        self.bar.set_message(format!("page {position}"));
    }

    fn on_page_complete(&self, position: usize, progress: &BatchProgress, markdown_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            position,
            progress.total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{:.1}s", progress.last_page_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, position: usize, progress: &BatchProgress, error: &str) {
        let msg = truncate_message(error, 80);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            position,
            progress.total,
            red(&msg),
            dim(&format!("{:.1}s", progress.last_page_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_flush(&self, pages_flushed: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} flushed {pages_flushed} pages ({bytes} bytes) to report",
            dim("▸")
        ));
    }

    fn on_batch_complete(&self, progress: &BatchProgress) {
        self.bar.finish_and_clear();

        let succeeded = progress.processed - progress.failed;
        if progress.failed == 0 {
            eprintln!(
                "{} {} pages extracted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                progress.total,
                red(&progress.failed.to_string()),
            );
        }
    }
}

/// Truncate `msg` to at most `max` characters, appending `…` when cut.
///
/// Error messages embed arbitrary file paths and endpoint strings, so the cut
/// must land on a character boundary, never a byte offset.
fn truncate_message(msg: &str, max: usize) -> String {
    if msg.chars().count() <= max {
        return msg.to_string();
    }
    let mut out: String = msg.chars().take(max.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF and page image under ./data
  pagemill ./data

  # Custom output directory and model
  pagemill ./data -o ./reports --model mistral-small3.1:24b-instruct-2503-fp16

  # Remote Ollama endpoint, faster flushing
  pagemill ./data --endpoint http://10.0.0.2:11434 --flush-every 2

  # No inter-page pause, abort on the first corrupt PDF
  pagemill ./data --page-delay-ms 0 --on-corrupt abort

SOURCE DIRECTORY:
  Files are selected by extension (.pdf, .png, .jpg, .jpeg) and processed in
  lexicographic filename order. PDF pages are rasterised to a scratch
  directory first; standalone images are sent as-is.

OUTPUT:
  One append-only Markdown report per run:
    <output-dir>/combined_output_<YYYYmmdd_HHMMSS>.md
  Accumulated content is flushed every --flush-every pages, so partial
  output survives a crash. Zero extracted pages means no file is written.

ENVIRONMENT VARIABLES:
  PAGEMILL_ENDPOINT   Model endpoint base URL
  PAGEMILL_MODEL      Vision model identifier
  PAGEMILL_OUTPUT     Output directory
"#;

/// Batch-convert PDFs and page images to Markdown using a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "pagemill",
    version,
    about = "Batch-convert PDFs and page images to Markdown using a vision model",
    long_about = "Scan a directory for PDF documents and page images, rasterise each page, \
extract its content as Markdown via a vision model (Ollama by default), and append the \
results in page order to a single timestamped report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing .pdf/.png/.jpg source files.
    source_dir: PathBuf,

    /// Directory the timestamped report is written under.
    #[arg(short, long, env = "PAGEMILL_OUTPUT", default_value = "./output")]
    output_dir: PathBuf,

    /// Vision model identifier.
    #[arg(
        long,
        env = "PAGEMILL_MODEL",
        default_value = "llama3.2-vision:11b-instruct-q8_0"
    )]
    model: String,

    /// Model endpoint base URL.
    #[arg(long, env = "PAGEMILL_ENDPOINT", default_value = "http://localhost:11434")]
    endpoint: String,

    /// Flush accumulated output to the report every N pages.
    #[arg(long, env = "PAGEMILL_FLUSH_EVERY", default_value_t = 5)]
    flush_every: usize,

    /// Pause between pages in milliseconds (0 to disable).
    #[arg(long, env = "PAGEMILL_PAGE_DELAY_MS", default_value_t = 1000)]
    page_delay_ms: u64,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "PAGEMILL_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Per-model-call timeout in seconds.
    #[arg(long, env = "PAGEMILL_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "PAGEMILL_PROMPT")]
    prompt: Option<PathBuf>,

    /// What to do with a PDF that cannot be rasterised.
    #[arg(long, value_enum, default_value = "skip")]
    on_corrupt: OnCorruptArg,

    /// Disable the progress bar.
    #[arg(long, env = "PAGEMILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGEMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGEMILL_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OnCorruptArg {
    Skip,
    Abort,
}

impl From<OnCorruptArg> for CorruptDocumentPolicy {
    fn from(v: OnCorruptArg) -> Self {
        match v {
            OnCorruptArg::Skip => CorruptDocumentPolicy::Skip,
            OnCorruptArg::Abort => CorruptDocumentPolicy::Abort,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;

    let model: Arc<dyn VisionModel> = Arc::new(
        OllamaClient::new(&config.endpoint, config.api_timeout_secs)
            .context("Failed to build model client")?,
    );

    let observer: Arc<dyn BatchObserver> = if show_progress {
        CliObserver::new()
    } else {
        Arc::new(pagemill::NoopObserver)
    };

    // ── Run the batch ────────────────────────────────────────────────────
    let summary = run_with_observer(&cli.source_dir, &config, model, observer)
        .await
        .context("Batch extraction failed")?;

    if !cli.quiet {
        match &summary.output_path {
            Some(path) => eprintln!(
                "{}  {}/{} pages  {} flushes  {}ms  →  {}",
                if summary.stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                summary.stats.processed_pages,
                summary.stats.total_pages,
                summary.stats.flushes,
                summary.stats.total_duration_ms,
                bold(&path.display().to_string()),
            ),
            None => eprintln!("{} no content extracted; no report written", cyan("⚠")),
        }
        if summary.stats.skipped_documents > 0 {
            eprintln!(
                "   {} documents could not be rasterised and were skipped",
                red(&summary.stats.skipped_documents.to_string())
            );
        }
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
async fn build_config(cli: &Cli) -> Result<BatchConfig> {
    let prompt = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = BatchConfig::builder()
        .endpoint(cli.endpoint.clone())
        .model(cli.model.clone())
        .flush_every(cli.flush_every)
        .page_delay_ms(cli.page_delay_ms)
        .max_rendered_pixels(cli.max_pixels)
        .api_timeout_secs(cli.api_timeout)
        .on_corrupt(cli.on_corrupt.clone().into())
        .output_dir(&cli.output_dir);

    if let Some(p) = prompt {
        builder = builder.prompt(p);
    }

    builder.build().context("Invalid configuration")
}
