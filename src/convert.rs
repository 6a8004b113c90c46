//! Eager (whole-batch) conversion entry points.
//!
//! [`convert`] waits for every input, merges the annotated pages and returns
//! the PDF bytes with a report. Use [`crate::stream::convert_stream`] to
//! receive each file's pages as soon as that file is finished.
//!
//! Failure scopes:
//! * a region whose refinement fails keeps its baseline text
//! * a file that cannot be read, detected or annotated is left out of the
//!   output and recorded in its [`FileReport`]
//! * a merge failure, or a run where no file survives, fails the run

use crate::config::ConversionConfig;
use crate::error::{FileError, Scan2PdfError};
use crate::model::{AnnotatedPage, Page};
use crate::output::{ConversionOutput, ConversionReport, FileOutcome, FileReport, PageReport, RunStats};
use crate::pipeline::detect::{sanitize_regions, RegionDetector};
use crate::pipeline::refine::RegionRefiner;
use crate::pipeline::{annotate, assemble, input, pdfium, reconcile, render};
use crate::provider::{resolve_detector, resolve_refiner};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Collaborators and settings shared by every file of one run.
pub(crate) struct RunContext {
    pub config: ConversionConfig,
    pub detector: Arc<dyn RegionDetector>,
    pub refiner: Arc<dyn RegionRefiner>,
}

impl RunContext {
    /// Resolve collaborators and make sure pdfium and the detector can run.
    pub async fn prepare(config: &ConversionConfig) -> Result<Arc<Self>, Scan2PdfError> {
        pdfium::ensure_available().await?;
        let refiner = resolve_refiner(config)?;
        let detector = resolve_detector(config);
        detector
            .ensure_ready()
            .await
            .map_err(|e| Scan2PdfError::DetectorUnavailable {
                detector: detector.name().to_string(),
                detail: e.to_string(),
            })?;
        info!("Detector: {}", detector.name());
        Ok(Arc::new(Self {
            config: config.clone(),
            detector,
            refiner,
        }))
    }
}

/// Convert scanned images and PDFs into one annotated PDF.
///
/// Pages appear in input order, and within each input in document order.
///
/// # Errors
/// Returns `Err(Scan2PdfError)` only for run-level failures:
/// - empty input list, pdfium not loadable, detector not usable,
///   provider not configured
/// - every input failed ([`Scan2PdfError::NothingToAssemble`])
/// - a page could not be merged ([`Scan2PdfError::AssemblyFailed`])
pub async fn convert<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2PdfError> {
    let total_start = Instant::now();
    if inputs.is_empty() {
        return Err(Scan2PdfError::NoInputs);
    }
    let inputs: Vec<String> = inputs.iter().map(|s| s.as_ref().to_string()).collect();
    info!("Starting conversion of {} inputs", inputs.len());

    let ctx = RunContext::prepare(config).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(inputs.len());
    }

    let outcomes: Vec<FileOutcome> = crate::stream::file_outcomes(inputs, Arc::clone(&ctx))
        .collect()
        .await;

    let succeeded = outcomes.iter().filter(|o| o.report.succeeded()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(outcomes.len(), succeeded);
    }

    let page_pdfs: Vec<Vec<u8>> = outcomes
        .iter()
        .flat_map(|o| o.pages.iter().map(|p| p.pdf.clone()))
        .collect();

    if page_pdfs.is_empty() {
        let first_error = outcomes
            .iter()
            .find_map(|o| o.report.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "inputs contain no pages".to_string());
        return Err(Scan2PdfError::NothingToAssemble {
            total: outcomes.len(),
            first_error,
        });
    }

    let pdf = pdfium::run(move |p| assemble::assemble(p, &page_pdfs)).await??;

    let files: Vec<FileReport> = outcomes.into_iter().map(|o| o.report).collect();
    let stats = RunStats::from_files(&files, total_start.elapsed().as_millis() as u64);
    info!(
        "Conversion complete: {}/{} files, {} pages, {}/{} regions refined, {}ms",
        stats.total_files - stats.failed_files,
        stats.total_files,
        stats.total_pages,
        stats.refined_regions,
        stats.total_regions,
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf,
        report: ConversionReport { files, stats },
    })
}

/// Convert and write the merged PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial file behind.
pub async fn convert_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Scan2PdfError> {
    let output = convert(inputs, config).await?;
    let path = output_path.as_ref();
    let write_err = |e: std::io::Error| Scan2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), output.pdf.len());
    Ok(output.report)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Scan2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, config))
}

/// `<stem>_annotated.pdf` next to a local first input, or in the current
/// directory for a URL.
pub fn default_output_path(first_input: &str) -> PathBuf {
    let (dir, name) = if input::is_url(first_input) {
        let name = first_input
            .split(['?', '#'])
            .next()
            .and_then(|s| s.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        (PathBuf::new(), name)
    } else {
        let p = Path::new(first_input);
        (
            p.parent().map(Path::to_path_buf).unwrap_or_default(),
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    };
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "scan".to_string());
    dir.join(format!("{stem}_annotated.pdf"))
}

// ── Per-file pipeline ────────────────────────────────────────────────────

/// Run one input through the whole pipeline. Never fails: errors are
/// recorded in the returned report.
pub(crate) async fn process_file(index: usize, input_str: String, ctx: Arc<RunContext>) -> FileOutcome {
    let cb = ctx.config.progress_callback.clone();
    match annotate_file(index, &input_str, &ctx).await {
        Ok((pages, reports)) => {
            if let Some(ref cb) = cb {
                cb.on_file_complete(index, &input_str, pages.len());
            }
            FileOutcome {
                index,
                report: FileReport {
                    input: input_str,
                    pages: reports,
                    error: None,
                },
                pages,
            }
        }
        Err(e) => {
            warn!("Skipping '{}': {}", input_str, e);
            if let Some(ref cb) = cb {
                cb.on_file_error(index, &input_str, &e.to_string());
            }
            FileOutcome {
                index,
                report: FileReport {
                    input: input_str,
                    pages: Vec::new(),
                    error: Some(e),
                },
                pages: Vec::new(),
            }
        }
    }
}

async fn annotate_file(
    index: usize,
    input_str: &str,
    ctx: &RunContext,
) -> Result<(Vec<AnnotatedPage>, Vec<PageReport>), FileError> {
    let config = &ctx.config;
    // Keeps a downloaded temp file alive until this file is done.
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pages = render::rasterize(&resolved, config.dpi, config.password.as_deref()).await?;
    info!("'{}': {} pages", input_str, pages.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(index, input_str, pages.len());
    }

    let mut annotated = Vec::with_capacity(pages.len());
    let mut reports = Vec::with_capacity(pages.len());
    for page in pages {
        let (page_pdf, report) = annotate_one(page, ctx).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(index, report.page_num, report.overlays);
        }
        annotated.push(page_pdf);
        reports.push(report);
    }
    Ok((annotated, reports))
}

async fn annotate_one(page: Page, ctx: &RunContext) -> Result<(AnnotatedPage, PageReport), FileError> {
    let start = Instant::now();
    let page_num = page.page_num;

    let regions = ctx
        .detector
        .detect(&page)
        .await
        .map_err(|e| FileError::DetectionFailed {
            page: page_num,
            detail: e.to_string(),
        })?;
    let regions = sanitize_regions(regions);
    debug!("Page {}: {} regions", page_num, regions.len());

    let reconciled = reconcile::reconcile_page(&page, regions, &ctx.refiner, ctx.config.concurrency).await;
    let refined = reconciled.iter().filter(|r| r.is_refined()).count();
    let region_count = reconciled.len();

    let style = ctx.config.style;
    let annotated = pdfium::run(move |p| annotate::annotate_page(p, &page, &reconciled, &style))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()))
        .map_err(|detail| FileError::AnnotationFailed {
            page: page_num,
            detail,
        })?;

    let report = PageReport {
        page_num,
        width: annotated.width,
        height: annotated.height,
        regions: region_count,
        refined,
        fallbacks: region_count - refined,
        overlays: annotated.overlays.len(),
        truncated: annotated.overlays.iter().filter(|o| o.truncated).count(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Ok((annotated, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TesseractConfig;

    #[test]
    fn default_output_next_to_local_input() {
        assert_eq!(
            default_output_path("/scans/letter.tiff"),
            PathBuf::from("/scans/letter_annotated.pdf")
        );
        assert_eq!(default_output_path("page.png"), PathBuf::from("page_annotated.pdf"));
    }

    #[test]
    fn default_output_for_url() {
        assert_eq!(
            default_output_path("https://example.com/docs/report.pdf?dl=1"),
            PathBuf::from("report_annotated.pdf")
        );
        assert_eq!(
            default_output_path("https://example.com/"),
            PathBuf::from("scan_annotated.pdf")
        );
    }

    #[tokio::test]
    async fn missing_tesseract_fails_the_run_up_front() {
        if pdfium::ensure_available().await.is_err() {
            return;
        }
        let config = ConversionConfig::builder()
            .refine(false)
            .tesseract(TesseractConfig {
                binary: "/nonexistent/tesseract".into(),
                ..TesseractConfig::default()
            })
            .build()
            .unwrap();
        let err = convert(&["scan.png"], &config).await.unwrap_err();
        assert!(
            matches!(err, Scan2PdfError::DetectorUnavailable { ref detector, .. } if detector == "tesseract"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn empty_input_list_is_rejected() {
        let inputs: [&str; 0] = [];
        let err = convert(&inputs, &ConversionConfig::default()).await.unwrap_err();
        assert!(matches!(err, Scan2PdfError::NoInputs));
    }
}
