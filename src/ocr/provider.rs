//! OCR Engines
//!
//! Defines the engine trait and the Tesseract command-line implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::tsv::parse_tsv_words;
use super::types::{validate_language, EngineOutput, OcrError, SegmentationMode};

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name, for logs
    fn name(&self) -> &'static str;

    /// Check if the engine is available
    async fn is_available(&self) -> bool;

    /// Recognize the text in an image file
    async fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<EngineOutput, OcrError>;
}

/// Tesseract OCR engine
///
/// Runs `tesseract <image> <base> -l <lang> --psm <n> txt tsv`, which writes
/// `<base>.txt` and `<base>.tsv` next to the image. Both files stay inside
/// the job workspace and go away with it.
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn output_base(image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        image_path.with_file_name(format!("{}.ocr", stem))
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<EngineOutput, OcrError> {
        validate_language(language)?;

        let base = Self::output_base(image_path);

        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg(&base)
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(mode.psm().to_string())
            .arg("txt")
            .arg("tsv")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => OcrError::EngineNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary
                )),
                _ => OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        let text_path = base.with_extension("ocr.txt");
        let tsv_path = base.with_extension("ocr.tsv");

        let text = tokio::fs::read_to_string(&text_path)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read text output: {}", e)))?;
        let tsv = tokio::fs::read_to_string(&tsv_path)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read TSV output: {}", e)))?;

        let words = parse_tsv_words(&tsv)?;

        Ok(EngineOutput { text, words })
    }
}

/// Mock engine for testing
#[cfg(test)]
pub struct MockEngine {
    pub response: EngineOutput,
    /// Fail when the image file name contains this string
    pub fail_on: Option<String>,
    /// Every image path passed to `recognize`, in call order
    pub calls: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockEngine {
    pub fn new(response: EngineOutput) -> Self {
        Self {
            response,
            fail_on: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(
        &self,
        image_path: &Path,
        _language: &str,
        _mode: SegmentationMode,
    ) -> Result<EngineOutput, OcrError> {
        self.calls.lock().unwrap().push(image_path.to_path_buf());

        let file_name = image_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if let Some(pattern) = &self.fail_on {
            if file_name.contains(pattern.as_str()) {
                return Err(OcrError::ProcessingError(format!(
                    "Error in pixReadStream: Unknown format: no pix returned for {}",
                    file_name
                )));
            }
        }

        Ok(self.response.clone())
    }
}
