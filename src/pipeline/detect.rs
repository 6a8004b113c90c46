//! Region detection: find text lines on a page with a baseline transcription.
//!
//! Detection is an external capability behind [`RegionDetector`]; the rest of
//! the pipeline only relies on the [`Region`] contract. The bundled
//! implementation, [`TesseractDetector`], drives the `tesseract` CLI in TSV
//! mode and groups its word rows into line regions.
//!
//! Whatever the backend, detector output passes through [`sanitize_regions`]
//! before it reaches the refiner, so malformed polygons and out-of-range
//! confidences never travel further.

use crate::config::TesseractConfig;
use crate::error::DetectionError;
use crate::geometry::Point;
use crate::model::{Page, Region};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{debug, warn};

/// A text-region detector.
///
/// Implementations return regions in any order; callers must not read
/// meaning into it.
#[async_trait]
pub trait RegionDetector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Detect text regions on one page.
    async fn detect(&self, page: &Page) -> Result<Vec<Region>, DetectionError>;

    /// Checked once before a run starts; an error aborts the run.
    async fn ensure_ready(&self) -> Result<(), DetectionError> {
        Ok(())
    }
}

/// Drop regions that cannot satisfy the [`Region`] contract and clamp the rest.
///
/// Removes regions with fewer than three vertices or any non-finite
/// coordinate; clamps confidences into `[0, 1]` (NaN becomes 0). Degenerate
/// but well-formed regions are kept: they still carry baseline text.
pub fn sanitize_regions(regions: Vec<Region>) -> Vec<Region> {
    let before = regions.len();
    let kept: Vec<Region> = regions
        .into_iter()
        .filter(|r| r.boundary.len() >= 3 && r.boundary.iter().all(Point::is_finite))
        .map(|mut r| {
            r.baseline_confidence = if r.baseline_confidence.is_nan() {
                0.0
            } else {
                r.baseline_confidence.clamp(0.0, 1.0)
            };
            r
        })
        .collect();
    if kept.len() < before {
        warn!("Dropped {} malformed regions from detector output", before - kept.len());
    }
    kept
}

/// Detector backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    config: TesseractConfig,
    dpi: u32,
}

impl TesseractDetector {
    pub fn new(config: TesseractConfig, dpi: u32) -> Self {
        Self { config, dpi }
    }
}

#[async_trait]
impl RegionDetector for TesseractDetector {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn ensure_ready(&self) -> Result<(), DetectionError> {
        let output = tokio::process::Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| DetectionError::Unavailable(format!("{}: {}", self.config.binary.display(), e)))?;
        if !output.status.success() {
            return Err(DetectionError::Unavailable(format!(
                "{} --version exited with {}",
                self.config.binary.display(),
                output.status
            )));
        }
        Ok(())
    }

    async fn detect(&self, page: &Page) -> Result<Vec<Region>, DetectionError> {
        // tesseract reads from a path; the temp file lives until this call returns.
        let image = page.to_dynamic();
        let tmp = tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile, DetectionError> {
            let mut tmp = tempfile::Builder::new()
                .suffix(".png")
                .tempfile()
                .map_err(|e| DetectionError::Failed(format!("temp file: {e}")))?;
            image
                .write_to(&mut tmp, image::ImageFormat::Png)
                .map_err(|e| DetectionError::Failed(format!("temp image: {e}")))?;
            tmp.flush()
                .map_err(|e| DetectionError::Failed(format!("temp image: {e}")))?;
            Ok(tmp)
        })
        .await
        .map_err(|e| DetectionError::Failed(format!("Encode task panicked: {e}")))??;

        let output = tokio::process::Command::new(&self.config.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .arg("tsv")
            .output()
            .await
            .map_err(|e| {
                DetectionError::Unavailable(format!(
                    "failed to run '{}' (is it installed?): {e}",
                    self.config.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectionError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let regions = parse_tsv_regions(&tsv, self.config.min_word_confidence)?;
        debug!("Page {}: tesseract found {} lines", page.page_num, regions.len());
        Ok(regions)
    }
}

struct Word {
    text: String,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    conf: f32,
}

/// Group tesseract TSV word rows (level 5) into one region per text line.
///
/// Words are keyed by `(page, block, paragraph, line)`; each line becomes an
/// axis-aligned rectangle around its words, its text is the words joined by
/// single spaces in left-to-right order, and its confidence is the mean word
/// confidence scaled from 0–100 to 0–1. Words below `min_word_confidence`
/// (0–100 scale) and empty words are ignored.
pub fn parse_tsv_regions(tsv: &str, min_word_confidence: f32) -> Result<Vec<Region>, DetectionError> {
    let mut rows = tsv.lines();
    match rows.next() {
        Some(header) if header.starts_with("level") => {}
        Some(other) => {
            return Err(DetectionError::Parse(format!(
                "missing TSV header, got '{}'",
                other.chars().take(40).collect::<String>()
            )))
        }
        None => return Ok(Vec::new()),
    }

    let mut lines: BTreeMap<(u32, u32, u32, u32), Vec<Word>> = BTreeMap::new();
    for row in rows {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<f32>().ok();
        let (Some(left), Some(top), Some(width), Some(height), Some(conf)) =
            (num(6), num(7), num(8), num(9), num(10))
        else {
            continue;
        };
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 || conf < min_word_confidence {
            continue;
        }
        let id = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        lines.entry((id(1), id(2), id(3), id(4))).or_default().push(Word {
            text: text.to_string(),
            left,
            top,
            right: left + width,
            bottom: top + height,
            conf,
        });
    }

    Ok(lines.into_values().filter_map(line_region).collect())
}

fn line_region(mut words: Vec<Word>) -> Option<Region> {
    if words.is_empty() {
        return None;
    }
    words.sort_by(|a, b| a.left.total_cmp(&b.left));
    let x0 = words.iter().map(|w| w.left).fold(f32::INFINITY, f32::min);
    let y0 = words.iter().map(|w| w.top).fold(f32::INFINITY, f32::min);
    let x1 = words.iter().map(|w| w.right).fold(f32::NEG_INFINITY, f32::max);
    let y1 = words.iter().map(|w| w.bottom).fold(f32::NEG_INFINITY, f32::max);
    let conf = words.iter().map(|w| w.conf).sum::<f32>() / words.len() as f32 / 100.0;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Some(Region::rect(x0, y0, x1, y1, text, conf.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let config = TesseractConfig {
            binary: "/nonexistent/tesseract".into(),
            ..TesseractConfig::default()
        };
        let detector = TesseractDetector::new(config, 300);
        assert!(matches!(
            detector.ensure_ready().await,
            Err(DetectionError::Unavailable(_))
        ));
    }

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn groups_words_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t100\t20\t-1\t",
            "5\t1\t1\t1\t1\t2\t60\t11\t50\t19\t80\tworld",
            "5\t1\t1\t1\t1\t1\t10\t10\t45\t20\t90\tHelo",
            "5\t1\t1\t1\t2\t1\t10\t40\t30\t18\t70\tBye",
        ]);
        let regions = parse_tsv_regions(&input, 0.0).unwrap();
        assert_eq!(regions.len(), 2);

        let first = &regions[0];
        assert_eq!(first.baseline_text, "Helo world");
        assert!((first.baseline_confidence - 0.85).abs() < 1e-6);
        let b = first.bounding_box().unwrap();
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (10.0, 10.0, 110.0, 30.0));

        assert_eq!(regions[1].baseline_text, "Bye");
    }

    #[test]
    fn skips_blank_and_low_confidence_words() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t10\t45\t20\t95\t  ",
            "5\t1\t1\t1\t1\t2\t60\t10\t45\t20\t12\tnoise",
            "5\t1\t1\t1\t1\t3\t110\t10\t45\t20\t91\tkeep",
        ]);
        let regions = parse_tsv_regions(&input, 30.0).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].baseline_text, "keep");
    }

    #[test]
    fn empty_output_has_no_regions() {
        assert!(parse_tsv_regions("", 0.0).unwrap().is_empty());
        assert!(parse_tsv_regions(HEADER, 0.0).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_tsv() {
        assert!(matches!(
            parse_tsv_regions("Error opening data file", 0.0),
            Err(DetectionError::Parse(_))
        ));
    }

    #[test]
    fn sanitize_drops_and_clamps() {
        let good = Region::rect(0.0, 0.0, 10.0, 10.0, "a", 1.7);
        let nan_conf = Region::rect(0.0, 0.0, 10.0, 10.0, "b", f32::NAN);
        let short = Region::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], "c", 0.5);
        let inf = Region::rect(0.0, 0.0, f32::INFINITY, 10.0, "d", 0.5);
        let flat = Region::rect(0.0, 5.0, 10.0, 5.0, "e", 0.5);

        let out = sanitize_regions(vec![good, nan_conf, short, inf, flat]);
        let texts: Vec<&str> = out.iter().map(|r| r.baseline_text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "e"]);
        assert_eq!(out[0].baseline_confidence, 1.0);
        assert_eq!(out[1].baseline_confidence, 0.0);
    }
}
