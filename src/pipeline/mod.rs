//! Upload processing pipeline
//!
//! Drives an upload through workspace acquisition, optional PDF
//! rasterization and per-page OCR, then aggregates the page results.

mod orchestrator;

pub use orchestrator::{JobStage, Pipeline, PipelineError};
