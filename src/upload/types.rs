//! Upload job and result types
//!
//! The result types serialize to the JSON shapes existing clients consume:
//! a flattened single-page object for images and a `pages` array for PDFs.

use std::path::PathBuf;

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Horizontal padding added around every recognized word box, in pixels
pub const BOX_PADDING: i32 = 4;

/// File name used when the uploaded name has no usable component
pub const FALLBACK_FILE_NAME: &str = "upload";

// ============================================================================
// Job
// ============================================================================

/// An uploaded document waiting to be processed
#[derive(Debug, Clone)]
pub struct UploadJob {
    /// File name as sent by the client
    pub original_filename: String,
    /// Lowercased extension of the original file name, if any
    pub file_extension: Option<String>,
    /// Raw uploaded bytes
    pub raw_bytes: Vec<u8>,
}

impl UploadJob {
    pub fn new(original_filename: impl Into<String>, raw_bytes: Vec<u8>) -> Self {
        let original_filename = original_filename.into();
        let file_extension = extension_of(&original_filename);

        Self {
            original_filename,
            file_extension,
            raw_bytes,
        }
    }

    /// How the pipeline should treat this upload
    pub fn kind(&self) -> DocumentKind {
        match self.file_extension.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            _ => DocumentKind::Image,
        }
    }
}

/// Text after the last dot of the final name component, lowercased.
///
/// A leading dot counts, so `.pdf` has extension `pdf`; a bare `pdf` has none.
fn extension_of(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Processing mode chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Multi-page path: rasterize, then recognize every page
    Pdf,
    /// Single-page path: the upload itself is page 1
    Image,
}

/// A raster image for one document page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number in document order
    pub page_number: usize,
    pub image_path: PathBuf,
}

// ============================================================================
// Results
// ============================================================================

/// A recognized word, in source-image pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordBox {
    /// 0-based index within the page
    pub id: usize,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub confidence: f64,
}

/// Recognition output for a single image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    pub width: u32,
    pub height: u32,
    pub text: String,
    pub boxes: Vec<WordBox>,
}

/// Recognition output for one page of a multi-page document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    #[serde(rename = "page")]
    pub page_number: usize,
    #[serde(flatten)]
    pub content: PageText,
}

/// Successful job result
///
/// Serialized untagged: the variant is recognizable by the presence of
/// `pages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadResult {
    MultiPage(MultiPageResult),
    SinglePage(SinglePageResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiPageResult {
    pub success: bool,
    pub file_name: String,
    pub pages: Vec<PageResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePageResult {
    pub success: bool,
    pub file_name: String,
    #[serde(flatten)]
    pub content: PageText,
}

impl UploadResult {
    pub fn single_page(file_name: impl Into<String>, content: PageText) -> Self {
        Self::SinglePage(SinglePageResult {
            success: true,
            file_name: file_name.into(),
            content,
        })
    }

    /// Build a multi-page result, ordering pages by page number
    pub fn multi_page(file_name: impl Into<String>, mut pages: Vec<PageResult>) -> Self {
        pages.sort_by_key(|page| page.page_number);
        Self::MultiPage(MultiPageResult {
            success: true,
            file_name: file_name.into(),
            pages,
        })
    }

    /// Number of pages covered by this result
    pub fn page_count(&self) -> usize {
        match self {
            Self::MultiPage(result) => result.pages.len(),
            Self::SinglePage(_) => 1,
        }
    }
}

/// Failure body returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
}

impl FailureResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Workspace filesystem errors (IOFailure)
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove workspace {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Tests
// ============================================================================
