//! OCR Types
//!
//! Engine-level types: what an OCR engine reports before boxes are padded
//! into the caller-facing `WordBox`.

use serde::{Deserialize, Serialize};

/// Tesseract page segmentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Fully automatic page segmentation (psm 3)
    Auto,
    /// Treat the image as a single uniform block of text (psm 6)
    SingleBlock,
    /// Treat the image as a single text line (psm 7)
    SingleLine,
    /// Find as much text as possible in no particular order (psm 11)
    Sparse,
}

impl Default for SegmentationMode {
    fn default() -> Self {
        Self::SingleBlock
    }
}

impl SegmentationMode {
    /// Numeric value for `--psm`
    pub fn psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleBlock => 6,
            Self::SingleLine => 7,
            Self::Sparse => 11,
        }
    }

    /// Parse a mode name or psm number
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "3" => Some(Self::Auto),
            "single_block" | "block" | "6" => Some(Self::SingleBlock),
            "single_line" | "line" | "7" => Some(Self::SingleLine),
            "sparse" | "11" => Some(Self::Sparse),
            _ => None,
        }
    }
}

/// Raw word rectangle as corner coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl RawBox {
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

/// A word as reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineWord {
    pub text: String,
    /// Missing when the engine reported no usable rectangle
    pub bbox: Option<RawBox>,
    pub confidence: f64,
}

/// Everything the engine reports for one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    pub words: Vec<EngineWord>,
}

/// OCR error types (RecognitionFailure)
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("Failed to read image metadata: {0}")]
    ImageMetadata(String),

    #[error("Malformed OCR output: {0}")]
    MalformedOutput(String),

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),
}

/// Validate a Tesseract language code to prevent argument injection
pub fn validate_language(lang: &str) -> Result<(), OcrError> {
    // e.g. "eng", "eng+deu", "chi_sim"
    if lang.is_empty() || lang.len() > 20 {
        return Err(OcrError::InvalidLanguage(format!(
            "length must be 1-20, got {}",
            lang.len()
        )));
    }
    if let Some(c) = lang
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '+' && *c != '_')
    {
        return Err(OcrError::InvalidLanguage(format!(
            "invalid character {:?} in {:?}",
            c, lang
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_mode_psm() {
        assert_eq!(SegmentationMode::default().psm(), 6);
        assert_eq!(SegmentationMode::parse("single_block"), Some(SegmentationMode::SingleBlock));
        assert_eq!(SegmentationMode::parse("11"), Some(SegmentationMode::Sparse));
        assert_eq!(SegmentationMode::parse(" AUTO "), Some(SegmentationMode::Auto));
        assert_eq!(SegmentationMode::parse("column"), None);
    }

    #[test]
    fn test_raw_box_emptiness() {
        assert!(!RawBox { x0: 0, y0: 0, x1: 5, y1: 5 }.is_empty());
        assert!(RawBox { x0: 5, y0: 0, x1: 5, y1: 5 }.is_empty());
        assert!(RawBox { x0: 0, y0: 5, x1: 5, y1: 5 }.is_empty());
    }

    #[test]
    fn test_validate_language() {
        assert!(validate_language("eng").is_ok());
        assert!(validate_language("eng+deu").is_ok());
        assert!(validate_language("chi_sim").is_ok());
        assert!(validate_language("").is_err());
        assert!(validate_language("eng --tessdata-dir /").is_err());
        assert!(validate_language(&"a".repeat(21)).is_err());
    }
}
