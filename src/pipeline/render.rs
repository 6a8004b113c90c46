//! Rasterisation: turn a resolved input into RGB [`Page`]s.
//!
//! PDFs are rendered on the pdfium thread at `dpi / 72` scale, so a page of
//! `w × h` points becomes `w·dpi/72 × h·dpi/72` pixels. Image files are
//! decoded at their native resolution as a single page; decoding is
//! CPU-bound, so it runs on `tokio::task::spawn_blocking`.

use crate::error::FileError;
use crate::model::Page;
use crate::pipeline::input::{InputKind, ResolvedInput};
use crate::pipeline::pdfium;
use image::ImageReader;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise every page of `input`, in document order.
pub async fn rasterize(input: &ResolvedInput, dpi: u32, password: Option<&str>) -> Result<Vec<Page>, FileError> {
    let path = input.path().to_path_buf();
    let undecodable = {
        let path = path.clone();
        move |detail: String| FileError::Undecodable { path, detail }
    };

    match input.kind() {
        InputKind::Pdf => {
            let password = password.map(str::to_string);
            pdfium::run(move |p| render_pdf(p, &path, dpi, password.as_deref()))
                .await
                .map_err(|e| undecodable(e.to_string()))?
        }
        InputKind::Image => tokio::task::spawn_blocking(move || decode_image_blocking(&path))
            .await
            .map_err(|e| undecodable(format!("decode task panicked: {}", e)))?,
    }
}

/// Render every page of the PDF at `pdf_path`.
pub fn render_pdf(pdfium: &Pdfium, pdf_path: &Path, dpi: u32, password: Option<&str>) -> Result<Vec<Page>, FileError> {
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password.is_some(), &e))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| FileError::Undecodable {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        out.push(Page::new(idx + 1, image));
    }

    Ok(out)
}

/// The decoder is chosen from the file's content, not its extension:
/// downloads may have no extension and scans are often misnamed.
fn decode_image_blocking(path: &Path) -> Result<Vec<Page>, FileError> {
    let undecodable = |detail: String| FileError::Undecodable {
        path: path.to_path_buf(),
        detail,
    };
    let image = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| undecodable(e.to_string()))?
        .decode()
        .map_err(|e| undecodable(e.to_string()))?
        .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(FileError::Undecodable {
            path: path.to_path_buf(),
            detail: "image has no pixels".into(),
        });
    }

    debug!("Decoded image {} → {}x{} px", path.display(), image.width(), image.height());
    Ok(vec![Page::new(1, image)])
}

fn load_error(path: &Path, had_password: bool, e: &PdfiumError) -> FileError {
    let detail = format!("{:?}", e);
    let path: PathBuf = path.to_path_buf();
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            FileError::WrongPassword { path }
        } else {
            FileError::PasswordRequired { path }
        }
    } else {
        FileError::CorruptPdf { path, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn resolved(path: &Path, kind: InputKind) -> ResolvedInput {
        ResolvedInput::Local {
            path: path.to_path_buf(),
            kind,
        }
    }

    #[tokio::test]
    async fn image_becomes_one_page_at_native_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(64, 32, Rgb([200, 10, 10])).save(&path).unwrap();

        let pages = rasterize(&resolved(&path, InputKind::Image), 300, None)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_num, 1);
        assert_eq!((pages[0].width(), pages[0].height()), (64, 32));
        assert_eq!(pages[0].image.get_pixel(3, 3), &Rgb([200, 10, 10]));
    }

    #[tokio::test]
    async fn image_is_recognised_by_content_not_name() {
        let dir = tempfile::tempdir().unwrap();
        let png = RgbImage::from_pixel(8, 8, Rgb([0, 0, 255]));
        let mut bytes = Vec::new();
        png.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        for name in ["scan.pdf", "downloaded", "scan.jpg"] {
            let path = dir.path().join(name);
            std::fs::write(&path, &bytes).unwrap();
            let pages = rasterize(&resolved(&path, InputKind::Image), 300, None)
                .await
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!((pages[0].width(), pages[0].height()), (8, 8), "{name}");
        }
    }

    #[tokio::test]
    async fn pdf_pages_scale_with_dpi() {
        if pdfium::ensure_available().await.is_err() {
            println!("SKIP — pdfium not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let bytes = pdfium::run(|p| {
            let mut doc = p.create_new_pdf().unwrap();
            for _ in 0..2 {
                doc.pages_mut()
                    .create_page_at_end(PdfPagePaperSize::Custom(PdfPoints::new(72.0), PdfPoints::new(36.0)))
                    .unwrap();
            }
            doc.save_to_bytes().unwrap()
        })
        .await
        .unwrap();
        std::fs::write(&path, bytes).unwrap();

        let pages = rasterize(&resolved(&path, InputKind::Pdf), 144, None).await.unwrap();
        let sizes: Vec<(usize, u32, u32)> = pages.iter().map(|p| (p.page_num, p.width(), p.height())).collect();
        assert_eq!(sizes, vec![(1, 144, 72), (2, 144, 72)]);
    }

    #[tokio::test]
    async fn corrupt_pdf_is_reported() {
        if pdfium::ensure_available().await.is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\ngarbage").unwrap();
        let err = rasterize(&resolved(&path, InputKind::Pdf), 72, None).await.unwrap_err();
        assert!(matches!(err, FileError::CorruptPdf { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn garbage_image_is_undecodable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let err = rasterize(&resolved(&path, InputKind::Image), 300, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Undecodable { .. }));
        assert!(err.is_unreadable());
    }
}
