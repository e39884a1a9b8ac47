//! Pipeline Orchestrator
//!
//! Runs one upload job end to end:
//!
//! ```text
//! Received -> WorkspaceAcquired -> [RasterizingPages] -> RecognizingPage(1..=N)
//!          -> Aggregated -> WorkspaceReleased -> Responded | Failed
//! ```
//!
//! Pages are recognized one at a time in page order. Any stage failure aborts
//! the job without partial results, and the workspace is released on every
//! exit path.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::ocr::{OcrError, PageRecognizer};
use crate::pdf::{PageRasterizer, PdftoppmRasterizer, RasterizeError};
use crate::upload::{
    DocumentKind, PageImage, PageResult, UploadJob, UploadResult, Workspace, WorkspaceError,
    WorkspaceManager,
};

/// Job failure, one variant per stage
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] WorkspaceError),

    #[error(transparent)]
    Rasterization(#[from] RasterizeError),

    #[error("Page {page}: {source}")]
    Recognition {
        page: usize,
        #[source]
        source: OcrError,
    },
}

impl PipelineError {
    /// Stage name, for logs
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Io(_) => "workspace",
            Self::Rasterization(_) => "rasterization",
            Self::Recognition { .. } => "recognition",
        }
    }
}

/// Stages a job moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    WorkspaceAcquired,
    RasterizingPages,
    RecognizingPage(usize),
    Aggregated,
    WorkspaceReleased,
    Responded,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::WorkspaceAcquired => write!(f, "workspace_acquired"),
            Self::RasterizingPages => write!(f, "rasterizing_pages"),
            Self::RecognizingPage(page) => write!(f, "recognizing_page[{}]", page),
            Self::Aggregated => write!(f, "aggregated"),
            Self::WorkspaceReleased => write!(f, "workspace_released"),
            Self::Responded => write!(f, "responded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Document ingestion and page fan-out pipeline
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    workspaces: WorkspaceManager,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: PageRecognizer,
}

impl Pipeline {
    pub fn new(
        workspaces: WorkspaceManager,
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: PageRecognizer,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                workspaces,
                rasterizer,
                recognizer,
            }),
        }
    }

    /// Pipeline using pdftoppm and Tesseract as configured
    pub fn from_config(config: &Config, workspaces: WorkspaceManager) -> Self {
        Self::new(
            workspaces,
            Arc::new(PdftoppmRasterizer::new(&config.raster)),
            PageRecognizer::from_config(&config.ocr),
        )
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.inner.workspaces
    }

    pub fn recognizer(&self) -> &PageRecognizer {
        &self.inner.recognizer
    }

    /// Process one upload.
    ///
    /// The job's workspace is released before this returns, whether the job
    /// succeeded or not.
    pub async fn run(&self, job: UploadJob) -> Result<UploadResult, PipelineError> {
        let job_id = Uuid::new_v4();
        let kind = job.kind();
        log_stage(job_id, JobStage::Received);

        let workspace = match self
            .inner
            .workspaces
            .acquire(&job.raw_bytes, &job.original_filename)
            .await
        {
            Ok(workspace) => workspace,
            Err(e) => return Err(fail(job_id, &job, e.into())),
        };
        log_stage(job_id, JobStage::WorkspaceAcquired);

        let outcome = self.process(job_id, kind, &job, &workspace).await;

        self.inner.workspaces.release(&workspace).await;
        log_stage(job_id, JobStage::WorkspaceReleased);

        match outcome {
            Ok(result) => {
                log_stage(job_id, JobStage::Responded);
                tracing::info!(
                    job_id = %job_id,
                    file_name = %job.original_filename,
                    pages = result.page_count(),
                    "Upload processed"
                );
                Ok(result)
            }
            Err(e) => Err(fail(job_id, &job, e)),
        }
    }

    async fn process(
        &self,
        job_id: Uuid,
        kind: DocumentKind,
        job: &UploadJob,
        workspace: &Workspace,
    ) -> Result<UploadResult, PipelineError> {
        match kind {
            DocumentKind::Pdf => {
                log_stage(job_id, JobStage::RasterizingPages);
                let pages = self.rasterize(&workspace.file_path, &workspace.root_path).await?;

                let mut results = Vec::with_capacity(pages.len());
                for page in &pages {
                    log_stage(job_id, JobStage::RecognizingPage(page.page_number));
                    results.push(self.recognize_page(page).await?);
                }

                log_stage(job_id, JobStage::Aggregated);
                Ok(UploadResult::multi_page(&job.original_filename, results))
            }
            DocumentKind::Image => {
                let page = PageImage {
                    page_number: 1,
                    image_path: workspace.file_path.clone(),
                };
                log_stage(job_id, JobStage::RecognizingPage(page.page_number));
                let result = self.recognize_page(&page).await?;

                log_stage(job_id, JobStage::Aggregated);
                Ok(UploadResult::single_page(&job.original_filename, result.content))
            }
        }
    }

    /// Rasterize a PDF and number its pages from 1
    async fn rasterize(&self, pdf_path: &Path, work_dir: &Path) -> Result<Vec<PageImage>, PipelineError> {
        let images = self.inner.rasterizer.rasterize(pdf_path, work_dir).await?;

        Ok(images
            .into_iter()
            .enumerate()
            .map(|(index, image_path)| PageImage {
                page_number: index + 1,
                image_path,
            })
            .collect())
    }

    async fn recognize_page(&self, page: &PageImage) -> Result<PageResult, PipelineError> {
        let content = self
            .inner
            .recognizer
            .recognize(&page.image_path)
            .await
            .map_err(|source| PipelineError::Recognition {
                page: page.page_number,
                source,
            })?;

        Ok(PageResult {
            page_number: page.page_number,
            content,
        })
    }
}

fn fail(job_id: Uuid, job: &UploadJob, error: PipelineError) -> PipelineError {
    tracing::error!(
        job_id = %job_id,
        file_name = %job.original_filename,
        stage = error.stage(),
        error = ?error,
        "Upload failed: {}",
        error
    );
    log_stage(job_id, JobStage::Failed);
    error
}

fn log_stage(job_id: Uuid, stage: JobStage) {
    tracing::debug!(job_id = %job_id, stage = %stage, "Job stage");
}

// ============================================================================
// Tests
// ============================================================================
