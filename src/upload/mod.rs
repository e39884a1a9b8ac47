//! Upload Module
//!
//! Job and result types for uploaded documents, plus the per-job
//! workspace that holds the upload and every intermediate file.

pub mod types;
pub mod workspace;

pub use types::*;
pub use workspace::{stored_file_name, Workspace, WorkspaceManager};
