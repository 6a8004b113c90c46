//! Core data model: pages, detected regions and their reconciled text.
//!
//! Everything here lives for one run only. A [`Page`] owns its raster for as
//! long as its regions are being refined and drawn; nothing is persisted.

use crate::geometry::{polygon_area, BoundingBox, Point};
use crate::pipeline::layout::TextBoxLayout;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

/// One raster page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-indexed position of this page inside its source document.
    pub page_num: usize,
    /// RGB samples, one pixel per PDF point once annotated.
    pub image: RgbImage,
}

impl Page {
    pub fn new(page_num: usize, image: RgbImage) -> Self {
        Self { page_num, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Owned `DynamicImage` view for APIs that want one (pdfium, encoders).
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }
}

/// A detected text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Polygon vertices in page pixels; order defines the edges.
    pub boundary: Vec<Point>,
    /// The detector's own transcription.
    pub baseline_text: String,
    /// Detector confidence in `[0, 1]`.
    pub baseline_confidence: f32,
}

impl Region {
    pub fn new(boundary: Vec<Point>, baseline_text: impl Into<String>, baseline_confidence: f32) -> Self {
        Self {
            boundary,
            baseline_text: baseline_text.into(),
            baseline_confidence,
        }
    }

    /// Axis-aligned rectangle spanning `(x0, y0)`–`(x1, y1)`, clockwise.
    pub fn rect(x0: f32, y0: f32, x1: f32, y1: f32, text: impl Into<String>, confidence: f32) -> Self {
        Self::new(
            vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
            text,
            confidence,
        )
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(&self.boundary)
    }

    /// No enclosed area: fewer than three points, zero-width/height box, or
    /// all vertices collinear.
    pub fn is_degenerate(&self) -> bool {
        match self.bounding_box() {
            Some(b) if self.boundary.len() >= 3 && !b.is_empty() => {
                polygon_area(&self.boundary).abs() < f32::EPSILON
            }
            _ => true,
        }
    }
}

/// Where a region's final text came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextSource {
    /// The refinement model's transcription was accepted.
    Refined,
    /// Refinement failed; `reason` is the rendered [`crate::error::RefinementError`].
    Baseline { reason: String },
}

/// A region after reconciliation.
///
/// Invariant: `final_confidence == 1.0` exactly when `source` is
/// [`TextSource::Refined`]; otherwise text and confidence equal the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRegion {
    /// Position of the region in the detector's output for its page.
    pub index: usize,
    pub region: Region,
    pub final_text: String,
    pub final_confidence: f32,
    pub source: TextSource,
}

impl ReconciledRegion {
    pub fn is_refined(&self) -> bool {
        matches!(self.source, TextSource::Refined)
    }
}

/// A page rendered to a standalone single-page PDF.
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// Overlays that were drawn, in drawing order.
    pub overlays: Vec<TextBoxLayout>,
    /// Serialised single-page PDF.
    pub pdf: Vec<u8>,
}
