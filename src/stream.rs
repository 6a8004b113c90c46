//! Streaming conversion API: emit each input file as soon as it is done.
//!
//! Unlike the eager [`crate::convert::convert`], which merges everything
//! before returning, [`convert_stream`] yields one [`FileOutcome`] per input
//! with that file's single-page PDFs. Outcomes arrive in input order even
//! when `file_concurrency > 1`. Dropping the stream cancels the files still
//! in flight.
//!
//! Merging is left to the caller; [`crate::pipeline::assemble::assemble`]
//! does it the same way `convert` does.

use crate::config::ConversionConfig;
use crate::convert::{process_file, RunContext};
use crate::error::Scan2PdfError;
use crate::output::FileOutcome;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-file outcomes.
pub type FileStream = Pin<Box<dyn Stream<Item = FileOutcome> + Send>>;

/// Start converting `inputs`, yielding each file's outcome in input order.
///
/// # Returns
/// - `Ok(FileStream)` — one item per input; failed files carry their error
///   in [`crate::output::FileReport::error`]
/// - `Err(Scan2PdfError)` — run-level setup failure (empty input list,
///   pdfium not loadable, provider not configured)
///
/// # Example
/// ```rust,no_run
/// use edgequake_scan2pdf::{convert_stream, ConversionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().refine(false).build()?;
/// let mut files = convert_stream(vec!["scan1.png", "scan2.pdf"], &config).await?;
/// while let Some(file) = files.next().await {
///     match &file.report.error {
///         None => eprintln!("{}: {} pages", file.report.input, file.pages.len()),
///         Some(e) => eprintln!("{}: {}", file.report.input, e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream<S: AsRef<str>>(
    inputs: impl IntoIterator<Item = S>,
    config: &ConversionConfig,
) -> Result<FileStream, Scan2PdfError> {
    let inputs: Vec<String> = inputs.into_iter().map(|s| s.as_ref().to_string()).collect();
    if inputs.is_empty() {
        return Err(Scan2PdfError::NoInputs);
    }
    info!("Starting streaming conversion of {} inputs", inputs.len());

    let ctx = RunContext::prepare(config).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(inputs.len());
    }
    Ok(file_outcomes(inputs, ctx))
}

/// The per-file stage shared by the eager and streaming entry points.
pub(crate) fn file_outcomes(inputs: Vec<String>, ctx: Arc<RunContext>) -> FileStream {
    let concurrency = ctx.config.file_concurrency.max(1);
    let s = stream::iter(inputs.into_iter().enumerate())
        .map(move |(index, input)| process_file(index, input, Arc::clone(&ctx)))
        .buffered(concurrency);
    Box::pin(s)
}
