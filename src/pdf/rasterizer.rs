//! Page Rasterizer
//!
//! Converts a PDF into one PNG per page with poppler's `pdftoppm`.
//!
//! `pdftoppm` names its output `<prefix>-<N>.png`, zero-padding `N` to the
//! width of the page count. The padding is not guaranteed, so page order is
//! recovered by parsing `N` numerically rather than sorting file names.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::RasterConfig;

/// Output prefix handed to pdftoppm
const PAGE_PREFIX: &str = "page";

/// Extension of the rendered page images
const PAGE_EXTENSION: &str = "png";

/// PDF rasterization errors (RasterizationFailure)
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("Rasterizer not available: {0}")]
    EngineNotAvailable(String),

    #[error("PDF conversion failed: {0}")]
    ConversionFailed(String),

    #[error("PDF produced no pages")]
    NoPages,

    #[error("IO error during rasterization: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a PDF into ordered page images
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `pdf_path` into a fresh sub-directory of
    /// `work_dir`, returning the image paths in page order.
    async fn rasterize(&self, pdf_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>, RasterizeError>;
}

// ============================================================================
// pdftoppm
// ============================================================================

/// Rasterizer backed by the `pdftoppm` binary
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: String,
    scale_to: u32,
}

impl PdftoppmRasterizer {
    pub fn new(config: &RasterConfig) -> Self {
        Self {
            binary: config.pdftoppm_path.clone(),
            scale_to: config.scale_to,
        }
    }

    /// Check if pdftoppm is installed
    pub async fn is_available(&self) -> bool {
        let result = Command::new(&self.binary)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        // pdftoppm -v exits 0 on recent poppler, 99 on older releases
        result.is_ok()
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
        let output_dir = work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&output_dir).await?;

        let output = Command::new(&self.binary)
            .arg(format!("-{}", PAGE_EXTENSION))
            .arg("-scale-to")
            .arg(self.scale_to.to_string())
            .arg(pdf_path)
            .arg(output_dir.join(PAGE_PREFIX))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RasterizeError::EngineNotAvailable(format!(
                    "{} not found (install poppler-utils)",
                    self.binary
                )),
                _ => RasterizeError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterizeError::ConversionFailed(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let pages = ordered_page_images(&output_dir).await?;
        if pages.is_empty() {
            return Err(RasterizeError::NoPages);
        }

        tracing::debug!(pages = pages.len(), dir = %output_dir.display(), "PDF rasterized");
        Ok(pages)
    }
}

// ============================================================================
// Page ordering
// ============================================================================

/// List the rendered page images in `dir`, ordered by page number
pub async fn ordered_page_images(dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
    let mut numbered = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(number) = page_number_of(&path) {
            numbered.push((number, path));
        }
    }

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

/// Parse the page number out of a `page-<N>.png` file name
pub fn page_number_of(path: &Path) -> Option<u32> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(PAGE_EXTENSION) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ============================================================================
// Mock
// ============================================================================

/// Test rasterizer that writes small PNGs instead of invoking pdftoppm
#[cfg(test)]
pub struct MockRasterizer {
    /// Number of pages to produce
    pub pages: u32,
    /// Fail instead of producing pages
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl PageRasterizer for MockRasterizer {
    async fn rasterize(&self, _pdf_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
        if self.fail {
            return Err(RasterizeError::ConversionFailed(
                "Syntax Error: Couldn't find trailer dictionary".to_string(),
            ));
        }

        let output_dir = work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&output_dir).await?;

        // Unpadded names so lexical order differs from page order past 9
        for page in 1..=self.pages {
            let path = output_dir.join(format!("{}-{}.{}", PAGE_PREFIX, page, PAGE_EXTENSION));
            image::RgbImage::new(10 + page, 20)
                .save(&path)
                .map_err(|e| RasterizeError::ConversionFailed(e.to_string()))?;
        }

        let pages = ordered_page_images(&output_dir).await?;
        if pages.is_empty() {
            return Err(RasterizeError::NoPages);
        }
        Ok(pages)
    }
}

// ============================================================================
// Tests
// ============================================================================
