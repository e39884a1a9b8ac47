//! Configuration management for the OCR extractor server

use std::env;
use std::path::PathBuf;

use crate::ocr::SegmentationMode;

/// Default upload limit: 50MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default long-edge size for rasterized PDF pages
pub const DEFAULT_RASTER_SCALE: u32 = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub ocr: OcrConfig,
    pub raster: RasterConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Directory under which every job gets its own workspace
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_path: String,
    pub language: String,
    pub segmentation: SegmentationMode,
}

#[derive(Debug, Clone)]
pub struct RasterConfig {
    pub pdftoppm_path: String,
    /// Long edge of each rendered page, in pixels
    pub scale_to: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            workspace: WorkspaceConfig {
                root: absolutize(PathBuf::from("tmp_uploads")),
            },
            ocr: OcrConfig {
                tesseract_path: "tesseract".to_string(),
                language: "eng".to_string(),
                segmentation: SegmentationMode::SingleBlock,
            },
            raster: RasterConfig {
                pdftoppm_path: "pdftoppm".to_string(),
                scale_to: DEFAULT_RASTER_SCALE,
            },
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Every variable is optional; unparseable values fall back to the
    /// default and are reported through `tracing`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .map(|raw| parse_or_default("PORT", &raw, defaults.server.port))
            .unwrap_or(defaults.server.port);

        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .map(|raw| parse_or_default("MAX_UPLOAD_BYTES", &raw, defaults.server.max_upload_bytes))
            .unwrap_or(defaults.server.max_upload_bytes);

        let scale_to = lookup("RASTER_SCALE")
            .map(|raw| parse_or_default("RASTER_SCALE", &raw, defaults.raster.scale_to))
            .filter(|scale| *scale > 0)
            .unwrap_or(defaults.raster.scale_to);

        let segmentation = match lookup("OCR_PSM") {
            Some(raw) => SegmentationMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown OCR_PSM, using single_block");
                defaults.ocr.segmentation
            }),
            None => defaults.ocr.segmentation,
        };

        Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
                max_upload_bytes,
            },
            workspace: WorkspaceConfig {
                root: lookup("TMP_DIR")
                    .map(PathBuf::from)
                    .map(absolutize)
                    .unwrap_or(defaults.workspace.root),
            },
            ocr: OcrConfig {
                tesseract_path: lookup("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                language: lookup("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                segmentation,
            },
            raster: RasterConfig {
                pdftoppm_path: lookup("PDFTOPPM_PATH").unwrap_or(defaults.raster.pdftoppm_path),
                scale_to,
            },
        }
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid value for {}: {:?}, using {}", key, raw, default);
        default
    })
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.segmentation, SegmentationMode::SingleBlock);
        assert_eq!(config.raster.scale_to, DEFAULT_RASTER_SCALE);
        assert!(config.workspace.root.is_absolute());
        assert!(config.workspace.root.ends_with("tmp_uploads"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("TMP_DIR", "/var/tmp/ocr"),
            ("OCR_LANGUAGE", "deu"),
            ("OCR_PSM", "auto"),
            ("RASTER_SCALE", "2048"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.workspace.root, PathBuf::from("/var/tmp/ocr"));
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.segmentation, SegmentationMode::Auto);
        assert_eq!(config.raster.scale_to, 2048);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("RASTER_SCALE", "0"),
            ("OCR_PSM", "diagonal"),
        ]));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.raster.scale_to, DEFAULT_RASTER_SCALE);
        assert_eq!(config.ocr.segmentation, SegmentationMode::SingleBlock);
    }

    #[test]
    fn test_server_port_fallback() {
        let config = Config::from_lookup(lookup_from(&[("SERVER_PORT", "3000")]));
        assert_eq!(config.server.port, 3000);
    }
}
