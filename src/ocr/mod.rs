//! OCR Module
//!
//! Recognizes text and word boxes on page images.
//!
//! - `OcrEngine`: black-box engine boundary (Tesseract command line)
//! - `PageRecognizer`: reads image dimensions, runs the engine and pads
//!   word boxes into the caller-facing shape
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_extractor::ocr::{PageRecognizer, SegmentationMode, TesseractEngine};
//!
//! let recognizer = PageRecognizer::new(
//!     Arc::new(TesseractEngine::default()),
//!     "eng",
//!     SegmentationMode::SingleBlock,
//! );
//! let page = recognizer.recognize(Path::new("scan.png")).await?;
//! ```

mod provider;
mod service;
mod tsv;
mod types;

pub use provider::{OcrEngine, TesseractEngine};
pub use service::{pad_word_boxes, read_dimensions, PageRecognizer};
pub use tsv::parse_tsv_words;
pub use types::{validate_language, EngineOutput, EngineWord, OcrError, RawBox, SegmentationMode};

#[cfg(test)]
pub use provider::MockEngine;
