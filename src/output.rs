//! Result types returned by the conversion entry points.
//!
//! [`ConversionOutput`] carries the merged PDF bytes plus a
//! [`ConversionReport`]; the report alone is what `scan2pdf --json` prints.

use crate::error::FileError;
use crate::model::AnnotatedPage;
use serde::{Deserialize, Serialize};

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The merged, annotated PDF.
    pub pdf: Vec<u8>,
    pub report: ConversionReport,
}

/// Per-file and per-page account of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    /// One entry per input, in input order.
    pub files: Vec<FileReport>,
    pub stats: RunStats,
}

impl ConversionReport {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.error.is_some())
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// The input exactly as given (path or URL).
    pub input: String,
    /// Pages that made it into the output; empty when `error` is set.
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// One processed input, as yielded by [`crate::stream::convert_stream`].
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// 0-based position in the input list.
    pub index: usize,
    pub report: FileReport,
    /// Annotated pages in document order; empty when the file failed.
    pub pages: Vec<AnnotatedPage>,
}

/// Counts for one annotated page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number within its source file.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// Regions the detector returned after sanitising.
    pub regions: usize,
    /// Regions whose final text came from the refiner.
    pub refined: usize,
    /// Regions that kept their baseline text.
    pub fallbacks: usize,
    /// Text boxes drawn on the page.
    pub overlays: usize,
    /// Overlays whose text did not fit and was cut.
    pub truncated: usize,
    pub duration_ms: u64,
}

/// Aggregate run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_files: usize,
    pub failed_files: usize,
    /// Pages in the merged document.
    pub total_pages: usize,
    pub total_regions: usize,
    pub refined_regions: usize,
    pub fallback_regions: usize,
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Aggregate from per-file reports.
    pub fn from_files(files: &[FileReport], total_duration_ms: u64) -> Self {
        let pages = files.iter().flat_map(|f| f.pages.iter());
        let mut stats = RunStats {
            total_files: files.len(),
            failed_files: files.iter().filter(|f| !f.succeeded()).count(),
            total_duration_ms,
            ..Default::default()
        };
        for p in pages {
            stats.total_pages += 1;
            stats.total_regions += p.regions;
            stats.refined_regions += p.refined;
            stats.fallback_regions += p.fallbacks;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page(n: usize, regions: usize, refined: usize) -> PageReport {
        PageReport {
            page_num: n,
            regions,
            refined,
            fallbacks: regions - refined,
            overlays: regions,
            ..Default::default()
        }
    }

    #[test]
    fn stats_aggregate_across_files() {
        let files = vec![
            FileReport {
                input: "a.pdf".into(),
                pages: vec![page(1, 3, 2), page(2, 1, 0)],
                error: None,
            },
            FileReport {
                input: "missing.png".into(),
                pages: vec![],
                error: Some(FileError::NotFound {
                    path: PathBuf::from("missing.png"),
                }),
            },
        ];
        let stats = RunStats::from_files(&files, 42);
        assert_eq!(
            stats,
            RunStats {
                total_files: 2,
                failed_files: 1,
                total_pages: 2,
                total_regions: 4,
                refined_regions: 2,
                fallback_regions: 2,
                total_duration_ms: 42,
            }
        );
    }

    #[test]
    fn report_json_omits_absent_errors() {
        let report = ConversionReport {
            files: vec![FileReport {
                input: "a.png".into(),
                pages: vec![page(1, 1, 1)],
                error: None,
            }],
            stats: RunStats::default(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("\"error\""), "got: {json}");
        assert!(json.contains("\"refined\":1"));
    }
}
