//! Page Recognizer
//!
//! Turns one page image into `PageText`: dimensions from the image header,
//! text and word boxes from the OCR engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::provider::{OcrEngine, TesseractEngine};
use super::types::{EngineWord, OcrError, SegmentationMode};
use crate::config::OcrConfig;
use crate::upload::{PageText, WordBox, BOX_PADDING};

/// Recognizer for single page images
#[derive(Clone)]
pub struct PageRecognizer {
    engine: Arc<dyn OcrEngine>,
    language: String,
    mode: SegmentationMode,
}

impl PageRecognizer {
    pub fn new(engine: Arc<dyn OcrEngine>, language: impl Into<String>, mode: SegmentationMode) -> Self {
        Self {
            engine,
            language: language.into(),
            mode,
        }
    }

    /// Recognizer backed by the Tesseract binary from the config
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(TesseractEngine::new(config.tesseract_path.clone())),
            config.language.clone(),
            config.segmentation,
        )
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Recognize one page image
    pub async fn recognize(&self, image_path: &Path) -> Result<PageText, OcrError> {
        // The engine's own dimensions are unreliable, so read the header
        let (width, height) = read_dimensions(image_path.to_path_buf()).await?;

        let output = self
            .engine
            .recognize(image_path, &self.language, self.mode)
            .await?;

        let boxes = pad_word_boxes(&output.words);

        tracing::debug!(
            engine = self.engine.name(),
            path = %image_path.display(),
            width,
            height,
            words = boxes.len(),
            "Page recognized"
        );

        Ok(PageText {
            width,
            height,
            text: output.text,
            boxes,
        })
    }
}

/// Read image width and height without decoding the pixels.
///
/// The format is sniffed from the content, so uploads with a missing or
/// wrong extension still work.
pub async fn read_dimensions(path: PathBuf) -> Result<(u32, u32), OcrError> {
    tokio::task::spawn_blocking(move || {
        let metadata_error = |e: &dyn std::fmt::Display| {
            OcrError::ImageMetadata(format!("{}: {}", path.display(), e))
        };
        image::ImageReader::open(&path)
            .map_err(|e| metadata_error(&e))?
            .with_guessed_format()
            .map_err(|e| metadata_error(&e))?
            .into_dimensions()
            .map_err(|e| metadata_error(&e))
    })
    .await
    .map_err(|e| OcrError::ImageMetadata(format!("Metadata task failed: {}", e)))?
}

/// Convert engine words into padded caller-facing boxes.
///
/// Only the horizontal extent is padded; `h` is the raw height. Words without
/// a bounding box are dropped, words with empty text are kept.
pub fn pad_word_boxes(words: &[EngineWord]) -> Vec<WordBox> {
    words
        .iter()
        .filter_map(|word| word.bbox.map(|bbox| (word, bbox)))
        .enumerate()
        .map(|(id, (word, bbox))| WordBox {
            id,
            text: word.text.clone(),
            x: (bbox.x0 + BOX_PADDING).max(0),
            y: (bbox.y0 + BOX_PADDING).max(0),
            w: (bbox.x1 - bbox.x0) + 2 * BOX_PADDING,
            h: bbox.y1 - bbox.y0,
            confidence: word.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::MockEngine;
    use crate::ocr::types::{EngineOutput, RawBox};
    use tempfile::TempDir;

    fn word(text: &str, x0: i32, y0: i32, x1: i32, y1: i32, confidence: f64) -> EngineWord {
        EngineWord {
            text: text.to_string(),
            bbox: Some(RawBox { x0, y0, x1, y1 }),
            confidence,
        }
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_padding_is_horizontal_only() {
        let boxes = pad_word_boxes(&[word("Invoice", 100, 50, 180, 70, 93.0)]);

        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!(b.id, 0);
        assert_eq!(b.x, 104);
        assert_eq!(b.y, 54);
        assert_eq!(b.w, 80 + 8);
        assert_eq!(b.h, 20);
        assert_eq!(b.confidence, 93.0);
    }

    #[test]
    fn test_padding_never_goes_negative() {
        let boxes = pad_word_boxes(&[word("edge", -10, -7, 5, 3, 40.0)]);
        assert_eq!(boxes[0].x, 0);
        assert_eq!(boxes[0].y, 0);
        assert_eq!(boxes[0].w, 15 + 8);
        assert_eq!(boxes[0].h, 10);
    }

    #[test]
    fn test_words_without_box_are_skipped_and_ids_stay_contiguous() {
        let words = vec![
            word("a", 0, 0, 10, 10, 90.0),
            EngineWord {
                text: "ghost".to_string(),
                bbox: None,
                confidence: 0.0,
            },
            word("", 20, 0, 30, 10, 12.5),
        ];
        let boxes = pad_word_boxes(&words);

        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].id, 0);
        assert_eq!(boxes[1].id, 1);
        assert_eq!(boxes[1].text, "");
        assert_eq!(boxes[1].confidence, 12.5);
    }

    #[tokio::test]
    async fn test_recognize_reads_dimensions_from_image() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_png(temp_dir.path(), "scan.png", 64, 32);

        let engine = Arc::new(MockEngine::new(EngineOutput {
            text: "Hello world\n".to_string(),
            words: vec![word("Hello", 2, 3, 20, 12, 95.0), word("world", 24, 3, 44, 12, 88.0)],
        }));
        let recognizer = PageRecognizer::new(engine, "eng", SegmentationMode::SingleBlock);

        let page = recognizer.recognize(&image).await.unwrap();
        assert_eq!(page.width, 64);
        assert_eq!(page.height, 32);
        assert_eq!(page.text, "Hello world\n");
        assert_eq!(page.boxes.len(), 2);
        assert_eq!(page.boxes[1].x, 28);
    }

    #[tokio::test]
    async fn test_zero_words_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_png(temp_dir.path(), "blank.png", 8, 8);

        let engine = Arc::new(MockEngine::new(EngineOutput::default()));
        let recognizer = PageRecognizer::new(engine, "eng", SegmentationMode::SingleBlock);

        let page = recognizer.recognize(&image).await.unwrap();
        assert!(page.boxes.is_empty());
        assert_eq!(page.text, "");
    }

    #[tokio::test]
    async fn test_unreadable_image_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"this is not an image").unwrap();

        let engine = Arc::new(MockEngine::new(EngineOutput::default()));
        let recognizer = PageRecognizer::new(engine.clone(), "eng", SegmentationMode::SingleBlock);

        let result = recognizer.recognize(&path).await;
        assert!(matches!(result, Err(OcrError::ImageMetadata(_))));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_png(temp_dir.path(), "bad.png", 8, 8);

        let engine = Arc::new(MockEngine::new(EngineOutput::default()).failing_on("bad"));
        let recognizer = PageRecognizer::new(engine, "eng", SegmentationMode::SingleBlock);

        let result = recognizer.recognize(&image).await;
        assert!(matches!(result, Err(OcrError::ProcessingError(_))));
    }
}
