//! Pipeline stages for scan-to-annotated-PDF conversion.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ detect ──▶ refine ──▶ reconcile ──▶ annotate ──▶ assemble
//! (URL/path) (pages)   (regions)  (VLM)     (fallback)    (1-page PDF) (merge)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//!    and classify it as PDF or image
//! 2. [`render`] — rasterise into RGB pages
//! 3. [`detect`] — find text-line regions with a baseline transcription
//! 4. [`refine`] — re-read each region crop with a vision model
//!    ([`encode`] crops and base64-wraps, [`postprocess`] cleans the reply)
//! 5. [`reconcile`] — keep the refined text or fall back to the baseline
//! 6. [`annotate`] — background raster plus overlays laid out by [`layout`]
//! 7. [`assemble`] — merge per-page PDFs in order
//!
//! [`pdfium`] owns the shared library used by stages 2, 6 and 7 and runs
//! their work on a single dedicated thread.

pub mod annotate;
pub mod assemble;
pub mod detect;
pub mod encode;
pub mod input;
pub mod layout;
pub mod pdfium;
pub mod postprocess;
pub mod reconcile;
pub mod refine;
pub mod render;
