//! Input resolution: normalise a user-supplied path or URL to a local file
//! and decide whether it is a PDF or a raster image.
//!
//! URLs are downloaded into a `TempDir` that lives inside the returned
//! [`ResolvedInput`], so the file is removed when processing of that input
//! finishes, however it finishes.

use crate::error::FileError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// What the rasterizer has to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Render every page through pdfium.
    Pdf,
    /// Decode as a single raster page.
    Image,
}

/// The resolved input: a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: InputKind },
    /// Input was a URL; the body was saved into a temp directory.
    Downloaded {
        path: PathBuf,
        kind: InputKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Path of the local copy regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Local { kind, .. } | ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// PDF when the content starts with `%PDF` or, failing a readable header,
/// when the name ends in `.pdf`. Everything else is treated as an image.
pub fn detect_kind(path: &Path, head: &[u8]) -> InputKind {
    if head.starts_with(b"%PDF") {
        return InputKind::Pdf;
    }
    let pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if head.len() < 4 && pdf_ext {
        InputKind::Pdf
    } else {
        InputKind::Image
    }
}

/// Resolve the input string to a local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, FileError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, FileError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(FileError::NotFound { path });
    }

    let mut head = Vec::with_capacity(8);
    match std::fs::File::open(&path) {
        Ok(f) => {
            f.take(8)
                .read_to_end(&mut head)
                .map_err(|e| FileError::Undecodable {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FileError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FileError::NotFound { path });
        }
    }

    let kind = detect_kind(&path, &head);
    debug!("Resolved local input: {} ({:?})", path.display(), kind);
    Ok(ResolvedInput::Local { path, kind })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, FileError> {
    info!("Downloading input from: {}", url);

    let failed = |reason: String| FileError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FileError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = extract_filename(url);
    let temp_dir = TempDir::new().map_err(|e| failed(format!("temp dir: {}", e)))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| failed(format!("failed to write temp file: {}", e)))?;

    let kind = detect_kind(&file_path, &bytes[..bytes.len().min(8)]);
    info!("Downloaded to: {} ({:?})", file_path.display(), kind);

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Last path segment when it looks like a file name.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/scan.png"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn kind_from_magic_wins_over_extension() {
        assert_eq!(detect_kind(Path::new("a.png"), b"%PDF-1.7"), InputKind::Pdf);
        assert_eq!(
            detect_kind(Path::new("a.pdf"), b"\x89PNG\r\n\x1a\n"),
            InputKind::Image
        );
        assert_eq!(detect_kind(Path::new("scan.PDF"), b""), InputKind::Pdf);
        assert_eq!(detect_kind(Path::new("scan.tiff"), b"II*\0"), InputKind::Image);
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(extract_filename("https://x.org/a/scan.png?x=1"), "scan.png");
        assert_eq!(extract_filename("https://x.org/a/"), "downloaded");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }

    #[tokio::test]
    async fn local_pdf_is_detected() {
        let mut f = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        f.write_all(b"%PDF-1.4\n").unwrap();
        let resolved = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.kind(), InputKind::Pdf);
        assert_eq!(resolved.path(), f.path());
    }
}
