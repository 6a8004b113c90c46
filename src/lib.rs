//! # edgequake-scan2pdf
//!
//! Turn scanned documents (images or PDFs) into one annotated PDF: every page
//! keeps its original raster as background, with each detected line of text
//! re-transcribed and drawn over it in translucent red.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inputs (paths / URLs)
//!  │
//!  ├─ 1. Rasterize  PDF pages via pdfium, images decoded as one page
//!  ├─ 2. Detect     text-line regions + baseline text (tesseract by default)
//!  ├─ 3. Refine     each region crop re-read by a VLM, one attempt, timeout
//!  ├─ 4. Reconcile  refined text at confidence 1.0, else the baseline
//!  ├─ 5. Annotate   raster background + reflowed overlays → 1-page PDF
//!  └─ 6. Assemble   merge every page of every file, in input order
//! ```
//!
//! A file that cannot be read is left out of the result; a page that cannot
//! be merged fails the whole run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_scan2pdf::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = ConversionConfig::default();
//!     let report = convert_to_file(&["page1.png", "letter.pdf"], "out.pdf", &config).await?;
//!     eprintln!(
//!         "{} pages, {}/{} regions refined",
//!         report.stats.total_pages,
//!         report.stats.refined_regions,
//!         report.stats.total_regions
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! * the pdfium shared library (system path, current directory, or
//!   `PDFIUM_LIB_PATH`)
//! * `tesseract` on `PATH` unless a custom [`RegionDetector`] is supplied
//! * a vision provider unless refinement is disabled

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, TesseractConfig};
pub use convert::{convert, convert_sync, convert_to_file, default_output_path};
pub use error::{AnnotateError, DetectionError, FileError, RefinementError, Scan2PdfError};
pub use geometry::{BoundingBox, Point};
pub use model::{AnnotatedPage, Page, ReconciledRegion, Region, TextSource};
pub use output::{ConversionOutput, ConversionReport, FileOutcome, FileReport, PageReport, RunStats};
pub use pipeline::detect::{RegionDetector, TesseractDetector};
pub use pipeline::layout::{OverlayColor, OverlayStyle};
pub use pipeline::refine::{BaselineRefiner, RegionRefiner, VlmRefiner};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, FileStream};
