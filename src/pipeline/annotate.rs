//! Page annotation: the page raster as a full-bleed background with each
//! region's final text drawn over it.
//!
//! One raster pixel maps to one PDF point, so region coordinates carry over
//! unchanged except for the y axis: images grow downwards, PDF user space
//! grows upwards, hence `pdf_y = page_height - y`.
//!
//! Overlays are drawn in detection order. The layout itself lives in
//! [`crate::pipeline::layout`]; this module only replays it through pdfium.

use crate::error::AnnotateError;
use crate::model::{AnnotatedPage, Page, ReconciledRegion};
use crate::pipeline::layout::{layout_text_box, OverlayStyle, TextBoxLayout};
use pdfium_render::prelude::*;
use tracing::debug;

/// Lay out every drawable overlay of a page, in detection order.
///
/// Degenerate regions and regions without room for text are skipped.
pub fn plan_overlays(regions: &[ReconciledRegion], style: &OverlayStyle) -> Vec<TextBoxLayout> {
    let mut ordered: Vec<&ReconciledRegion> = regions.iter().collect();
    ordered.sort_by_key(|r| r.index);
    ordered
        .into_iter()
        .filter(|r| !r.region.is_degenerate())
        .filter_map(|r| {
            let bbox = r.region.bounding_box()?;
            layout_text_box(&bbox, &r.final_text, style)
        })
        .collect()
}

/// Render one page to a standalone single-page PDF.
pub fn annotate_page(
    pdfium: &Pdfium,
    page: &Page,
    regions: &[ReconciledRegion],
    style: &OverlayStyle,
) -> Result<AnnotatedPage, AnnotateError> {
    let (width, height) = (page.width(), page.height());
    if width == 0 || height == 0 {
        return Err(AnnotateError::EmptyImage);
    }
    let page_w = PdfPoints::new(width as f32);
    let page_h = PdfPoints::new(height as f32);
    let overlays = plan_overlays(regions, style);

    let mut document = pdfium.create_new_pdf().map_err(pdf_err)?;
    let font = document.fonts_mut().helvetica();
    let color = PdfColor::new(
        style.color.r,
        style.color.g,
        style.color.b,
        style.color.alpha_u8(),
    );

    let mut pdf_page = document
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::Custom(page_w, page_h))
        .map_err(pdf_err)?;

    pdf_page
        .objects_mut()
        .create_image_object(
            PdfPoints::ZERO,
            PdfPoints::ZERO,
            &page.to_dynamic(),
            Some(page_w),
            Some(page_h),
        )
        .map_err(pdf_err)?;

    let mut drawn = 0usize;
    for overlay in &overlays {
        for line in &overlay.lines {
            let mut object = pdf_page
                .objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(height as f32 - line.baseline),
                    &line.text,
                    font,
                    PdfPoints::new(overlay.font_size),
                )
                .map_err(pdf_err)?;
            object.set_fill_color(color).map_err(pdf_err)?;
            drawn += 1;
        }
    }
    drop(pdf_page);

    let pdf = document.save_to_bytes().map_err(pdf_err)?;
    debug!(
        "Page {}: {} overlays, {} text lines, {} bytes",
        page.page_num,
        overlays.len(),
        drawn,
        pdf.len()
    );

    Ok(AnnotatedPage {
        page_num: page.page_num,
        width,
        height,
        overlays,
        pdf,
    })
}

fn pdf_err(e: PdfiumError) -> AnnotateError {
    AnnotateError::Pdfium(format!("{:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::{Region, TextSource};
    use crate::pipeline::pdfium;
    use image::RgbImage;

    fn reconciled(index: usize, x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> ReconciledRegion {
        ReconciledRegion {
            index,
            region: Region::rect(x0, y0, x1, y1, text, 0.5),
            final_text: text.to_string(),
            final_confidence: 1.0,
            source: TextSource::Refined,
        }
    }

    #[test]
    fn overlays_follow_detection_order() {
        let regions = vec![
            reconciled(1, 10.0, 40.0, 110.0, 60.0, "second"),
            reconciled(0, 10.0, 10.0, 110.0, 30.0, "first"),
        ];
        let plans = plan_overlays(&regions, &OverlayStyle::default());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].lines[0].text, "first");
        assert_eq!(plans[1].lines[0].text, "second");
    }

    #[test]
    fn empty_and_flat_regions_draw_nothing() {
        let regions = vec![
            reconciled(0, 10.0, 10.0, 110.0, 30.0, "   "),
            reconciled(1, 10.0, 10.0, 110.0, 10.0, "flat"),
        ];
        assert!(plan_overlays(&regions, &OverlayStyle::default()).is_empty());
    }

    #[test]
    fn collinear_region_draws_nothing() {
        let diagonal = Region::new(
            vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0), Point::new(100.0, 100.0)],
            "slanted",
            0.8,
        );
        assert!(diagonal.is_degenerate());
        let regions = vec![ReconciledRegion {
            index: 0,
            final_text: "slanted".into(),
            final_confidence: 0.8,
            source: TextSource::Baseline {
                reason: "degenerate".into(),
            },
            region: diagonal,
        }];
        assert!(plan_overlays(&regions, &OverlayStyle::default()).is_empty());
    }

    #[tokio::test]
    async fn annotated_page_carries_text_and_size() {
        pdfium::try_run(|pdfium| {
            let page = Page::new(1, RgbImage::from_pixel(200, 100, image::Rgb([255, 255, 255])));
            let regions = vec![reconciled(0, 10.0, 10.0, 110.0, 30.0, "Hello")];

            let annotated = annotate_page(pdfium, &page, &regions, &OverlayStyle::default()).unwrap();
            assert_eq!((annotated.width, annotated.height), (200, 100));
            assert_eq!(annotated.overlays.len(), 1);

            let doc = pdfium.load_pdf_from_byte_slice(&annotated.pdf, None).unwrap();
            assert_eq!(doc.pages().len(), 1);
            let p = doc.pages().get(0).unwrap();
            assert_eq!(p.width().value, 200.0);
            assert_eq!(p.height().value, 100.0);
            assert!(p.text().unwrap().all().contains("Hello"));
        })
        .await;
    }

    #[tokio::test]
    async fn empty_raster_is_rejected() {
        pdfium::try_run(|pdfium| {
            let page = Page::new(1, RgbImage::new(0, 0));
            assert!(matches!(
                annotate_page(pdfium, &page, &[], &OverlayStyle::default()),
                Err(AnnotateError::EmptyImage)
            ));
        })
        .await;
    }
}
