//! OCR Extractor
//!
//! Accepts an uploaded image or PDF, rasterizes PDFs into pages, runs OCR on
//! every page and returns page-indexed text with word bounding boxes.
//!
//! # Modules
//!
//! - `upload`: job/result types and per-job workspaces
//! - `pdf`: PDF to page-image rasterization
//! - `ocr`: page recognition and word-box padding
//! - `pipeline`: the orchestrator tying the stages together
//! - `routes`: HTTP endpoints

pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod upload;
