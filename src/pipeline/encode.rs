//! Crop and encode: page raster → region crop → base64 PNG `ImageData`.
//!
//! VLM APIs accept images as base64 data embedded in the JSON request body.
//! PNG is lossless, so the model sees exactly the pixels the detector saw;
//! JPEG ringing around thin strokes is enough to flip `l`/`1` on small crops.

use crate::error::RefinementError;
use crate::model::{Page, Region};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{imageops, DynamicImage, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Cut the region's axis-aligned bounding box out of the page.
///
/// Fails with [`RefinementError::Degenerate`] when the region has no area or
/// its box lies outside the page, before any pixel is copied.
pub fn crop_region(page: &Page, region: &Region) -> Result<RgbImage, RefinementError> {
    let bbox = match region.bounding_box() {
        Some(b) if !region.is_degenerate() => b,
        other => {
            let (width, height) = other
                .map(|b| (b.width() as u32, b.height() as u32))
                .unwrap_or((0, 0));
            return Err(RefinementError::Degenerate { width, height });
        }
    };

    let rect = bbox.crop_rect(page.width(), page.height());
    if rect.is_empty() {
        return Err(RefinementError::Degenerate {
            width: rect.width,
            height: rect.height,
        });
    }

    Ok(imageops::crop_imm(&page.image, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Encode a raster as a base64 PNG ready for the VLM API.
///
/// `detail: "high"` keeps OpenAI-class models from downscaling the crop to a
/// single low-resolution tile.
pub fn encode_crop(img: &RgbImage) -> Result<ImageData, RefinementError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RefinementError::Encode(e.to_string()))?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} crop → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
