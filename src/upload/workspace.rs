//! Workspace Manager
//!
//! Gives every upload its own directory under a shared temp root:
//! - `init` creates the temp root once at process start
//! - `acquire` allocates `<root>/<uuid>/` and writes the upload into it
//! - `release` removes the workspace recursively and never fails
//! - `teardown` removes what the manager owns at shutdown: the whole temp
//!   root if `init` created it, otherwise only leftover workspace directories
//!
//! A workspace that is dropped without being released (for example when the
//! request future is cancelled) is removed synchronously on drop.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::types::{WorkspaceError, FALLBACK_FILE_NAME};

// ============================================================================
// Workspace Manager
// ============================================================================

/// Owns the temp root all job workspaces live under
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    inner: Arc<WorkspaceManagerInner>,
}

#[derive(Debug)]
struct WorkspaceManagerInner {
    root: PathBuf,
    /// `init` created the root, so teardown may remove it
    created_root: bool,
}

impl WorkspaceManager {
    /// Create the temp root (if needed) and return a manager for it.
    ///
    /// Call once at process startup, before any job runs.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        // An unreadable path counts as existing so teardown leaves it alone
        let created_root = matches!(tokio::fs::try_exists(&root).await, Ok(false));

        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: root.clone(),
                source,
            })?;

        tracing::info!(root = %root.display(), created = created_root, "Workspace root ready");

        Ok(Self {
            inner: Arc::new(WorkspaceManagerInner { root, created_root }),
        })
    }

    /// The temp root
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Allocate a fresh workspace and write the upload into it
    pub async fn acquire(
        &self,
        raw_bytes: &[u8],
        original_filename: &str,
    ) -> Result<Workspace, WorkspaceError> {
        let id = Uuid::new_v4();
        let root_path = self.inner.root.join(id.to_string());

        tokio::fs::create_dir_all(&root_path)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: root_path.clone(),
                source,
            })?;

        // From here on the workspace exists, so dropping it on error cleans up
        let workspace = Workspace {
            id,
            file_path: root_path.join(stored_file_name(original_filename)),
            root_path,
            released: AtomicBool::new(false),
        };

        tokio::fs::write(&workspace.file_path, raw_bytes)
            .await
            .map_err(|source| WorkspaceError::Write {
                path: workspace.file_path.clone(),
                source,
            })?;

        tracing::debug!(
            workspace = %workspace.id,
            path = %workspace.file_path.display(),
            size = raw_bytes.len(),
            "Workspace acquired"
        );

        Ok(workspace)
    }

    /// Remove a workspace and everything under it.
    ///
    /// Idempotent. Failures are logged as warnings and swallowed.
    pub async fn release(&self, workspace: &Workspace) {
        if workspace.released.swap(true, Ordering::SeqCst) {
            return;
        }

        match remove_dir_if_present(&workspace.root_path).await {
            Ok(()) => {
                tracing::debug!(workspace = %workspace.id, "Workspace released");
            }
            Err(e) => {
                tracing::warn!(workspace = %workspace.id, "Cleanup failed: {}", e);
            }
        }
    }

    /// Remove what this manager owns. Call once at shutdown.
    ///
    /// A root created by `init` is removed entirely. A pre-existing root is
    /// kept, and only workspace directories left inside it are removed.
    pub async fn teardown(&self) {
        let root = &self.inner.root;

        if self.inner.created_root {
            match remove_dir_if_present(root).await {
                Ok(()) => tracing::info!(root = %root.display(), "Workspace root removed"),
                Err(e) => tracing::warn!("Failed to remove workspace root: {}", e),
            }
            return;
        }

        match remove_leftover_workspaces(root).await {
            Ok(removed) => tracing::info!(
                root = %root.display(),
                removed,
                "Leftover workspaces removed"
            ),
            Err(e) => tracing::warn!("Failed to scan workspace root: {}", e),
        }
    }
}

// ============================================================================
// Workspace
// ============================================================================

/// A job's private directory and the uploaded file inside it
#[derive(Debug)]
pub struct Workspace {
    pub id: Uuid,
    pub root_path: PathBuf,
    /// Location of the uploaded bytes
    pub file_path: PathBuf,
    released: AtomicBool,
}

impl Workspace {
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        match std::fs::remove_dir_all(&self.root_path) {
            Ok(()) => {
                tracing::debug!(workspace = %self.id, "Workspace removed on drop");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(workspace = %self.id, "Cleanup on drop failed: {}", e);
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn remove_dir_if_present(path: &Path) -> Result<(), WorkspaceError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkspaceError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove `<uuid>` directories under `root`, leaving everything else.
///
/// Returns how many were removed. Per-entry failures are logged and skipped.
async fn remove_leftover_workspaces(root: &Path) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let is_workspace = entry
            .file_name()
            .to_str()
            .is_some_and(|name| Uuid::parse_str(name).is_ok());
        if !is_workspace || !entry.file_type().await?.is_dir() {
            continue;
        }

        match remove_dir_if_present(&entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove leftover workspace: {}", e),
        }
    }

    Ok(removed)
}

/// Reduce a client-supplied name to a single safe path component
pub fn stored_file_name(original: &str) -> String {
    // Clients on Windows send backslash-separated names
    let normalized = original.replace('\\', "/");

    Path::new(&normalized)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn manager(temp_dir: &TempDir) -> WorkspaceManager {
        WorkspaceManager::init(temp_dir.path().join("tmp_uploads"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;
        assert!(manager.root().is_dir());
    }

    #[tokio::test]
    async fn test_acquire_writes_upload() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let workspace = manager.acquire(b"image bytes", "scan.png").await.unwrap();

        assert!(workspace.root_path.starts_with(manager.root()));
        assert_eq!(workspace.file_path, workspace.root_path.join("scan.png"));
        assert_eq!(std::fs::read(&workspace.file_path).unwrap(), b"image bytes");

        manager.release(&workspace).await;
    }

    #[tokio::test]
    async fn test_release_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let workspace = manager.acquire(b"%PDF", "doc.pdf").await.unwrap();
        let nested = workspace.root_path.join("pages").join("page-1.png");
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::write(&nested, b"png").unwrap();

        manager.release(&workspace).await;

        assert!(workspace.is_released());
        assert!(!workspace.root_path.exists());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let workspace = manager.acquire(b"x", "a.png").await.unwrap();
        manager.release(&workspace).await;
        manager.release(&workspace).await;

        assert!(!workspace.root_path.exists());
    }

    #[tokio::test]
    async fn test_release_of_vanished_directory_does_not_fail() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let workspace = manager.acquire(b"x", "a.png").await.unwrap();
        std::fs::remove_dir_all(&workspace.root_path).unwrap();

        manager.release(&workspace).await;
        assert!(workspace.is_released());
    }

    #[tokio::test]
    async fn test_drop_without_release_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let workspace = manager.acquire(b"x", "a.png").await.unwrap();
        let root_path = workspace.root_path.clone();
        drop(workspace);

        assert!(!root_path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_workspaces_are_disjoint() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        let (a, b) = tokio::join!(
            manager.acquire(b"first", "same.png"),
            manager.acquire(b"second", "same.png"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.id, b.id);
        assert_ne!(a.root_path, b.root_path);
        assert!(!a.root_path.starts_with(&b.root_path));
        assert!(!b.root_path.starts_with(&a.root_path));
        assert_eq!(std::fs::read(&a.file_path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.file_path).unwrap(), b"second");

        manager.release(&a).await;
        manager.release(&b).await;
    }

    #[tokio::test]
    async fn test_acquire_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        let manager = WorkspaceManager::init(&root).await.unwrap();

        // Replace the root directory with a plain file
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, b"not a directory").unwrap();

        let result = manager.acquire(b"x", "a.png").await;
        assert!(matches!(result, Err(WorkspaceError::Create { .. })));
    }

    #[tokio::test]
    async fn test_release_failure_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;

        // A plain file where the workspace directory was makes removal fail
        let workspace = manager.acquire(b"x", "a.png").await.unwrap();
        std::fs::remove_dir_all(&workspace.root_path).unwrap();
        std::fs::write(&workspace.root_path, b"not a directory").unwrap();

        manager.release(&workspace).await;

        assert!(workspace.is_released());
        assert!(workspace.root_path.is_file());
    }

    #[tokio::test]
    async fn test_teardown_removes_root() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir).await;
        let _workspace = manager.acquire(b"x", "a.png").await.unwrap();

        manager.teardown().await;
        assert!(!manager.root().exists());
    }

    #[tokio::test]
    async fn test_teardown_keeps_preexisting_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("shared_scratch");
        std::fs::create_dir_all(root.join("other_tool")).unwrap();
        std::fs::write(root.join("someone_elses_file.txt"), b"keep").unwrap();
        std::fs::create_dir(root.join("other_tool").join(Uuid::new_v4().to_string())).unwrap();

        let manager = WorkspaceManager::init(&root).await.unwrap();
        let leftover = root.join(Uuid::new_v4().to_string());
        std::fs::create_dir(&leftover).unwrap();
        std::fs::write(leftover.join("page-1.png"), b"png").unwrap();
        let active = manager.acquire(b"x", "a.png").await.unwrap();
        // Not a directory, so not a workspace
        let uuid_file = root.join(Uuid::new_v4().to_string());
        std::fs::write(&uuid_file, b"file").unwrap();

        manager.teardown().await;

        assert!(root.is_dir());
        assert!(root.join("someone_elses_file.txt").is_file());
        assert!(root.join("other_tool").is_dir());
        assert_eq!(std::fs::read_dir(root.join("other_tool")).unwrap().count(), 1);
        assert!(uuid_file.is_file());
        assert!(!leftover.exists());
        assert!(!active.root_path.exists());
    }

    #[test]
    fn test_stored_file_name_strips_directories() {
        assert_eq!(stored_file_name("scan.png"), "scan.png");
        assert_eq!(stored_file_name("../../etc/passwd"), "passwd");
        assert_eq!(stored_file_name("/abs/path/doc.pdf"), "doc.pdf");
        assert_eq!(stored_file_name("C:\\Users\\me\\doc.pdf"), "doc.pdf");
        assert_eq!(stored_file_name(".."), FALLBACK_FILE_NAME);
        assert_eq!(stored_file_name(""), FALLBACK_FILE_NAME);
    }
}
