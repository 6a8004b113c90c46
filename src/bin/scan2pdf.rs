//! CLI binary for edgequake-scan2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_scan2pdf::{
    convert_to_file, default_output_path, ConversionConfig, ConversionProgressCallback, ProgressCallback,
    TesseractConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the input files, with a log line per page and per failure.
struct CliProgressCallback {
    bar: ProgressBar,
    pages: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Loading pdfium…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            pages: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  {msg}  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Annotating");
        self.bar.set_message("");
        self.bar.reset_eta();
    }

    fn on_file_start(&self, _file_index: usize, input: &str, pages: usize) {
        self.bar.set_message(format!("{input} ({pages} pages)"));
    }

    fn on_page_complete(&self, _file_index: usize, page_num: usize, regions: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} page {:>3}  {}",
            green("✓"),
            page_num,
            dim(&format!("{regions:>4} text boxes")),
        ));
    }

    fn on_file_error(&self, _file_index: usize, input: &str, error: &str) {
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!("  {} {}  {}", red("✗"), bold(input), red(&msg)));
        self.bar.inc(1);
    }

    fn on_file_complete(&self, _file_index: usize, input: &str, pages: usize) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(input),
            dim(&format!("{pages} pages")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(success_count);
        let pages = self.pages.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} files, {} pages annotated",
                green("✔"),
                bold(&success_count.to_string()),
                pages
            );
        } else {
            eprintln!(
                "{} {}/{} files annotated  ({} skipped)",
                if failed == total_files { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Annotate one scan (writes page_annotated.pdf next to it)
  scan2pdf page.png

  # Several inputs merged into one PDF, in the order given
  scan2pdf cover.jpg letter.pdf https://example.com/receipt.png -o bundle.pdf

  # Keep tesseract's text, no vision model or API key needed
  scan2pdf --no-refine scan.tiff

  # Local OCR model through Ollama
  scan2pdf --provider ollama --model blaifa/Nanonets-OCR-s scan.png

  # German + English detection, JSON report on stdout
  scan2pdf --languages deu+eng --json scan.pdf > report.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v / -q

REQUIREMENTS:
  pdfium shared library   system library path, current directory, or PDFIUM_LIB_PATH
  tesseract               on PATH, or --tesseract /path/to/tesseract
"#;

/// Overlay machine-readable text on scanned images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "scan2pdf",
    version,
    about = "Turn scanned images and PDFs into one annotated PDF with VLM-corrected text overlays",
    long_about = "Detect text lines on every page of scanned images and PDFs, re-read each line \
with a vision language model, and write one merged PDF where the corrected text is drawn over \
the original scan in translucent red. Supports OpenAI, Anthropic, Google Gemini, Ollama and \
any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files, PDF files or HTTP/HTTPS URLs, merged in this order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output PDF. Default: <first input stem>_annotated.pdf.
    #[arg(short, long, env = "SCAN2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID (e.g. gpt-4.1-nano, blaifa/Nanonets-OCR-s).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Keep the detector's text for every region; no model calls.
    #[arg(long, env = "SCAN2PDF_NO_REFINE")]
    no_refine: bool,

    /// Rendering DPI for PDF inputs (72–600).
    #[arg(long, env = "SCAN2PDF_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Concurrent refinement calls per page.
    #[arg(short, long, env = "SCAN2PDF_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Input files processed at the same time.
    #[arg(long, env = "SCAN2PDF_FILE_CONCURRENCY", default_value_t = 1)]
    file_concurrency: usize,

    /// Instruction sent with each region crop.
    #[arg(long, env = "SCAN2PDF_PROMPT")]
    prompt: Option<String>,

    /// Add a system message asking for a bare transcription.
    #[arg(long, env = "SCAN2PDF_STRICT")]
    strict: bool,

    /// Per-region model call timeout in seconds.
    #[arg(long, env = "SCAN2PDF_REFINE_TIMEOUT", default_value_t = 30)]
    refine_timeout: u64,

    /// Max output tokens per region.
    #[arg(long, env = "SCAN2PDF_MAX_TOKENS", default_value_t = 512)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SCAN2PDF_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SCAN2PDF_PASSWORD")]
    password: Option<String>,

    /// tesseract executable.
    #[arg(long, env = "SCAN2PDF_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// tesseract language list, e.g. eng or deu+eng.
    #[arg(long, env = "SCAN2PDF_LANGUAGES", default_value = "eng")]
    languages: String,

    /// tesseract page segmentation mode.
    #[arg(long, env = "SCAN2PDF_PSM", default_value_t = 3)]
    psm: u32,

    /// Ignore detected words below this confidence (0–100).
    #[arg(long, env = "SCAN2PDF_MIN_WORD_CONFIDENCE", default_value_t = 0.0)]
    min_word_confidence: f32,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "SCAN2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2PDF_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SCAN2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let output_path = match &cli.output {
        Some(p) => p.clone(),
        None => default_output_path(&cli.inputs[0]),
    };

    let report = convert_to_file(cli.inputs.as_slice(), &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        let s = &report.stats;
        if !show_progress {
            for failed in report.failed_files() {
                if let Some(ref e) = failed.error {
                    eprintln!("  {} {}: {}", red("✗"), failed.input, e);
                }
            }
        }
        eprintln!(
            "{}  {} pages  {}/{} regions refined  {}ms  →  {}",
            if s.failed_files == 0 { green("✔") } else { cyan("⚠") },
            s.total_pages,
            s.refined_regions,
            s.total_regions,
            s.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .file_concurrency(cli.file_concurrency)
        .refine(!cli.no_refine)
        .strict_transcription(cli.strict)
        .refine_timeout_secs(cli.refine_timeout)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .tesseract(TesseractConfig {
            binary: cli.tesseract.clone(),
            languages: cli.languages.clone(),
            psm: cli.psm,
            min_word_confidence: cli.min_word_confidence,
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref prompt) = cli.prompt {
        builder = builder.refine_prompt(prompt);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
