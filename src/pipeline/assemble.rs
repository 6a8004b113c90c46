//! Document assembly: merge single-page PDFs into one document.
//!
//! Unlike every other stage, assembly does not isolate failures. One page
//! that will not load or merge aborts the run, and no partial document is
//! returned.

use crate::error::Scan2PdfError;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Concatenate `pages` (serialised PDFs) in order.
///
/// `pages[i]` becomes page `i + 1` of the result. Each input may itself hold
/// several pages; all of them are appended.
pub fn assemble(pdfium: &Pdfium, pages: &[Vec<u8>]) -> Result<Vec<u8>, Scan2PdfError> {
    if pages.is_empty() {
        return Err(Scan2PdfError::AssemblyFailed {
            page: 0,
            detail: "no pages to assemble".into(),
        });
    }

    let mut merged = pdfium.create_new_pdf().map_err(|e| Scan2PdfError::AssemblyFailed {
        page: 0,
        detail: format!("{:?}", e),
    })?;

    for (i, bytes) in pages.iter().enumerate() {
        let failed = |detail: String| Scan2PdfError::AssemblyFailed { page: i + 1, detail };
        let source = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| failed(format!("{:?}", e)))?;
        merged
            .pages_mut()
            .append(&source)
            .map_err(|e| failed(format!("{:?}", e)))?;
        debug!("Appended part {} ({} bytes)", i + 1, bytes.len());
    }

    let out = merged.save_to_bytes().map_err(|e| Scan2PdfError::AssemblyFailed {
        page: pages.len(),
        detail: format!("{:?}", e),
    })?;
    info!("Assembled {} pages → {} bytes", merged.pages().len(), out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdfium;

    fn blank_page(pdfium: &Pdfium, w: f32, h: f32) -> Vec<u8> {
        let mut doc = pdfium.create_new_pdf().unwrap();
        doc.pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(PdfPoints::new(w), PdfPoints::new(h)))
            .unwrap();
        doc.save_to_bytes().unwrap()
    }

    #[tokio::test]
    async fn pages_keep_their_order() {
        pdfium::try_run(|pdfium| {
            let parts = vec![
                blank_page(pdfium, 100.0, 50.0),
                blank_page(pdfium, 200.0, 50.0),
                blank_page(pdfium, 300.0, 50.0),
            ];
            let merged = assemble(pdfium, &parts).unwrap();
            let doc = pdfium.load_pdf_from_byte_slice(&merged, None).unwrap();
            let widths: Vec<f32> = doc.pages().iter().map(|p| p.width().value).collect();
            assert_eq!(widths, vec![100.0, 200.0, 300.0]);
        })
        .await;
    }

    #[tokio::test]
    async fn malformed_page_fails_the_whole_merge() {
        pdfium::try_run(|pdfium| {
            let parts = vec![blank_page(pdfium, 100.0, 50.0), b"not a pdf".to_vec()];
            match assemble(pdfium, &parts) {
                Err(Scan2PdfError::AssemblyFailed { page, .. }) => assert_eq!(page, 2),
                other => panic!("expected AssemblyFailed, got {:?}", other.map(|b| b.len())),
            }
        })
        .await;
    }

    #[tokio::test]
    async fn nothing_to_merge_is_an_error() {
        pdfium::try_run(|pdfium| {
            assert!(matches!(
                assemble(pdfium, &[]),
                Err(Scan2PdfError::AssemblyFailed { page: 0, .. })
            ));
        })
        .await;
    }
}
