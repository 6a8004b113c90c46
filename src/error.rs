//! Error types for the edgequake-scan2pdf library.
//!
//! Failures are scoped to the smallest unit they can damage:
//!
//! * [`RefinementError`] — **Region-level**: the recognition model could not
//!   re-read one cropped region. Always absorbed by the reconciler, which
//!   falls back to the detector's baseline text. Never leaves
//!   [`crate::pipeline::reconcile`].
//!
//! * [`FileError`] — **File-level**: one input could not be read, rasterised,
//!   detected or annotated. Stored in [`crate::output::FileReport`]; the
//!   remaining files of the batch are still processed.
//!
//! * [`Scan2PdfError`] — **Run-level**: nothing usable can be produced
//!   (no inputs, pdfium unavailable, merge failed, output not writable).
//!   Returned as `Err` from the top-level `convert*` functions.
//!
//! Assembly is the one place where failure is deliberately *not* isolated:
//! a merged document with a corrupt page is worse than no document, so a
//! single malformed page aborts the whole run with
//! [`Scan2PdfError::AssemblyFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-scan2pdf library.
#[derive(Debug, Error)]
pub enum Scan2PdfError {
    /// The caller supplied an empty input list.
    #[error("No input files were given")]
    NoInputs,

    /// Every input failed; there are no pages to merge.
    #[error("All {total} input files failed; nothing to assemble.\nFirst error: {first_error}")]
    NothingToAssemble { total: usize, first_error: String },

    /// A per-page document could not be merged into the output.
    #[error("Failed to assemble output at page {page}: {detail}\nNo output was written.")]
    AssemblyFailed { page: usize, detail: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
to point at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    /// The region detector cannot run on this machine.
    #[error("Region detector '{detector}' is not usable: {detail}")]
    DetectorUnavailable { detector: String, detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure confined to one input file.
///
/// The variants up to `Undecodable` form the "unreadable input" family: the
/// file could not be opened or turned into pages at all.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The file opened but could not be decoded as an image or rendered.
    #[error("Cannot decode '{path}': {detail}")]
    Undecodable { path: PathBuf, detail: String },

    /// The region detector failed on a page of this file.
    #[error("Page {page}: text detection failed: {detail}")]
    DetectionFailed { page: usize, detail: String },

    /// A page of this file could not be turned into a PDF page.
    #[error("Page {page}: annotation failed: {detail}")]
    AnnotationFailed { page: usize, detail: String },
}

impl FileError {
    /// True when the file could not be read or rasterised at all.
    pub fn is_unreadable(&self) -> bool {
        !matches!(
            self,
            FileError::DetectionFailed { .. } | FileError::AnnotationFailed { .. }
        )
    }
}

/// Why the refined transcription of one region is unavailable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RefinementError {
    /// The region's bounding box has no area on the page.
    #[error("degenerate region ({width}x{height} px)")]
    Degenerate { width: u32, height: u32 },

    /// The crop could not be encoded for transmission.
    #[error("crop encoding failed: {0}")]
    Encode(String),

    /// The model call exceeded the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Transport or provider error.
    #[error("model call failed: {0}")]
    Provider(String),

    /// The model answered but nothing usable was left after normalisation.
    #[error("model returned an empty transcription")]
    EmptyResponse,

    /// Refinement is switched off for this run.
    #[error("refinement disabled")]
    Disabled,
}

/// Error reported by a [`crate::pipeline::detect::RegionDetector`].
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detector could not be started: {0}")]
    Unavailable(String),

    #[error("detector failed: {0}")]
    Failed(String),

    #[error("unparseable detector output: {0}")]
    Parse(String),
}

/// Error raised while drawing or serialising one annotated page.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("pdfium: {0}")]
    Pdfium(String),

    #[error("page image is empty")]
    EmptyImage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_failed_display() {
        let e = Scan2PdfError::AssemblyFailed {
            page: 3,
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("No output was written"));
    }

    #[test]
    fn nothing_to_assemble_display() {
        let e = Scan2PdfError::NothingToAssemble {
            total: 2,
            first_error: "File not found: 'a.png'".into(),
        };
        assert!(e.to_string().contains("All 2 input files failed"));
    }

    #[test]
    fn refinement_timeout_display() {
        let e = RefinementError::Timeout { secs: 30 };
        assert_eq!(e.to_string(), "model call timed out after 30s");
    }

    #[test]
    fn unreadable_classification() {
        let missing = FileError::NotFound {
            path: PathBuf::from("scan.png"),
        };
        let detect = FileError::DetectionFailed {
            page: 1,
            detail: "tesseract exited 1".into(),
        };
        assert!(missing.is_unreadable());
        assert!(!detect.is_unreadable());
    }

    #[test]
    fn file_error_serialises() {
        let e = FileError::Undecodable {
            path: PathBuf::from("x.bin"),
            detail: "unknown format".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("Undecodable"));
    }
}
