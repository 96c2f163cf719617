//! Refresh orchestrator: the single-flight, single-writer path that turns a
//! workspace scan into a new [`IndexedDocument`] snapshot.
//!
//! Concurrency model: a `refresh_lock` (held for the whole refresh) makes
//! refreshes single-flight, while the index itself lives behind a `RwLock`
//! that is only taken briefly — once to snapshot the previous index at the
//! start, and once more to atomically swap in the new one at the end.
//! Search requests can run concurrently against the old snapshot for the
//! entire duration of a long scan.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::extract;
use crate::models::{IndexedDocument, RefreshMode, RefreshStatus, RefreshSummary};
use crate::scanner;

const MAX_DIAGNOSTIC_MESSAGES: usize = 50;
const HASH_CHUNK_BYTES: usize = 1_048_576;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Workspace root directory not found: {0}")]
    WorkspaceRootNotFound(String),
}

fn append_diagnostic(diagnostics: &mut Vec<String>, message: String) {
    if diagnostics.len() < MAX_DIAGNOSTIC_MESSAGES {
        diagnostics.push(message);
    }
}

/// Snapshot of the adapter's index plus the bookkeeping needed to decide
/// whether a refresh should run and to report on the last one.
struct IndexState {
    by_path: HashMap<String, IndexedDocument>,
    last_indexed_at: Option<SystemTime>,
    last_refresh_mode: Option<RefreshMode>,
    last_refresh_summary: Option<RefreshSummary>,
    last_refresh_error: Option<String>,
}

impl Default for IndexState {
    fn default() -> Self {
        IndexState {
            by_path: HashMap::new(),
            last_indexed_at: None,
            last_refresh_mode: None,
            last_refresh_summary: None,
            last_refresh_error: None,
        }
    }
}

/// Shared, clonable handle to one adapter instance's index, config and HTTP
/// client. Cheap to clone (an `Arc` underneath) so it can be held by the
/// Axum router state and the background worker simultaneously.
#[derive(Clone)]
pub struct IndexHandle {
    inner: Arc<IndexHandleInner>,
}

struct IndexHandleInner {
    config: Config,
    http_client: reqwest::Client,
    state: RwLock<IndexState>,
    refresh_lock: Mutex<()>,
}

impl IndexHandle {
    pub fn new(config: Config) -> Self {
        let http_client = reqwest::Client::new();
        IndexHandle {
            inner: Arc::new(IndexHandleInner {
                config,
                http_client,
                state: RwLock::new(IndexState::default()),
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns a cloned list of every currently-indexed document, for the
    /// search evaluator to score against.
    pub async fn snapshot(&self) -> Vec<IndexedDocument> {
        self.inner.state.read().await.by_path.values().cloned().collect()
    }

    pub async fn indexed_file_count(&self) -> usize {
        self.inner.state.read().await.by_path.len()
    }

    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let state = self.inner.state.read().await;
        HealthSnapshot {
            indexed_files: state.by_path.len(),
            last_indexed_at_ms: state
                .last_indexed_at
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
            last_refresh_mode: state.last_refresh_mode.unwrap_or(RefreshMode::None),
            last_refresh_summary: state.last_refresh_summary.clone(),
            last_refresh_error: state.last_refresh_error.clone(),
        }
    }

    /// Runs one refresh pass. `bypass_interval` skips the debounce check
    /// (always `true` for explicit `/reindex` calls and the background
    /// worker; `false` for the implicit refresh `/search` triggers).
    pub async fn refresh(
        &self,
        mode: RefreshMode,
        bypass_interval: bool,
    ) -> Result<RefreshSummary, RefreshError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let started_at = Instant::now();

        let (current_size, previous, should_skip) = {
            let state = self.inner.state.read().await;
            let should_skip = mode == RefreshMode::Incremental
                && !bypass_interval
                && state.last_indexed_at.is_some_and(|last| {
                    last.elapsed()
                        .map(|elapsed| elapsed.as_secs() < self.inner.config.refresh_interval_seconds)
                        .unwrap_or(false)
                });
            (state.by_path.len(), state.by_path.clone(), should_skip)
        };

        if should_skip {
            return Ok(RefreshSummary {
                status: RefreshStatus::Skipped,
                mode,
                reason: Some("refresh-interval".to_string()),
                indexed_files: current_size,
                scanned_files: 0,
                reused_files: 0,
                updated_files: 0,
                removed_files: 0,
                failed_files: 0,
                diagnostics: Vec::new(),
                took_ms: started_at.elapsed().as_millis() as u64,
            });
        }

        let workspace_root = self.inner.config.workspace_root.clone();
        if !workspace_root.is_dir() {
            let message = format!("Workspace root directory not found: {}", workspace_root.display());
            self.inner.state.write().await.last_refresh_error = Some(message.clone());
            return Err(RefreshError::WorkspaceRootNotFound(workspace_root.display().to_string()));
        }

        let scan = scanner::scan_workspace(&workspace_root, self.inner.config.include_pdf_files);
        let mut diagnostics = Vec::new();
        for warning in scan.diagnostics {
            append_diagnostic(&mut diagnostics, warning);
        }

        let mut updated: HashMap<String, IndexedDocument> = HashMap::new();
        let mut reused_files = 0usize;
        let mut updated_files = 0usize;
        let mut failed_files = 0usize;

        for absolute_path in &scan.candidates {
            let Some(relative_path) = relative_file_path(&workspace_root, absolute_path) else {
                continue;
            };

            let stats = match std::fs::metadata(absolute_path) {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(file = %relative_path, error = %err, "skipping file with unreadable stat");
                    failed_files += 1;
                    append_diagnostic(&mut diagnostics, format!("file-stat-failed:{relative_path}"));
                    continue;
                }
            };
            let mtime_ns = mtime_nanos(&stats);
            let size_bytes = stats.len();

            let existing = previous.get(&relative_path);
            if mode == RefreshMode::Incremental {
                if let Some(existing) = existing {
                    if existing.mtime_ns == mtime_ns && existing.size_bytes == size_bytes {
                        updated.insert(relative_path.clone(), existing.clone());
                        reused_files += 1;
                        continue;
                    }
                }
            }

            let content_hash = match compute_file_hash(absolute_path) {
                Ok(hash) => hash,
                Err(err) => {
                    tracing::warn!(file = %relative_path, error = %err, "skipping unreadable file during hash pass");
                    failed_files += 1;
                    append_diagnostic(&mut diagnostics, format!("file-hash-failed:{relative_path}"));
                    continue;
                }
            };

            if mode == RefreshMode::Incremental {
                if let Some(existing) = existing {
                    if existing.content_hash == content_hash {
                        let mut reused = existing.clone();
                        reused.mtime_ns = mtime_ns;
                        reused.size_bytes = size_bytes;
                        updated.insert(relative_path.clone(), reused);
                        reused_files += 1;
                        continue;
                    }
                }
            }

            let extraction = match extract::extract_text_for_file(
                &self.inner.http_client,
                &self.inner.config,
                absolute_path,
                size_bytes,
            )
            .await
            {
                Ok(extraction) => extraction,
                Err(err) => {
                    tracing::warn!(file = %relative_path, error = %err, "skipping unreadable file during extraction");
                    failed_files += 1;
                    append_diagnostic(&mut diagnostics, format!("file-extract-failed:{relative_path}"));
                    continue;
                }
            };

            let title = absolute_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| relative_path.clone());

            updated.insert(
                relative_path.clone(),
                IndexedDocument {
                    file_path: relative_path.clone(),
                    title,
                    subtitle: relative_path,
                    content: extraction.content,
                    source_meta: extraction.source_meta,
                    mtime_ns,
                    size_bytes,
                    content_hash,
                },
            );
            updated_files += 1;
        }

        let removed_files = previous.len().saturating_sub(updated.len());
        let summary = RefreshSummary {
            status: if failed_files > 0 {
                RefreshStatus::Degraded
            } else {
                RefreshStatus::Ok
            },
            mode,
            reason: None,
            indexed_files: updated.len(),
            scanned_files: scan.candidates.len(),
            reused_files,
            updated_files,
            removed_files,
            failed_files,
            diagnostics,
            took_ms: started_at.elapsed().as_millis() as u64,
        };

        {
            let mut state = self.inner.state.write().await;
            state.by_path = updated;
            state.last_indexed_at = Some(SystemTime::now());
            state.last_refresh_mode = Some(mode);
            state.last_refresh_summary = Some(summary.clone());
            state.last_refresh_error = None;
        }

        Ok(summary)
    }
}

pub struct HealthSnapshot {
    pub indexed_files: usize,
    pub last_indexed_at_ms: Option<i64>,
    /// `RefreshMode::None` until the first refresh completes, matching the
    /// `"none"|"full"|"incremental"` contract `/health` promises.
    pub last_refresh_mode: RefreshMode,
    pub last_refresh_summary: Option<RefreshSummary>,
    pub last_refresh_error: Option<String>,
}

fn relative_file_path(root: &std::path::Path, path: &PathBuf) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

#[cfg(unix)]
fn mtime_nanos(stats: &std::fs::Metadata) -> i128 {
    use std::os::unix::fs::MetadataExt;
    stats.mtime() as i128 * 1_000_000_000 + stats.mtime_nsec() as i128
}

#[cfg(not(unix))]
fn mtime_nanos(stats: &std::fs::Metadata) -> i128 {
    stats
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i128)
        .unwrap_or(0)
}

fn compute_file_hash(path: &std::path::Path) -> std::io::Result<String> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(root: PathBuf) -> Config {
        Config {
            workspace_root: root,
            refresh_interval_seconds: 25,
            background_sync_seconds: 0,
            extract_timeout_seconds: 8,
            include_pdf_files: false,
            opensearch_base_url: None,
            opensearch_pipeline: "attachment".to_string(),
            opensearch_username: None,
            opensearch_password: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    #[tokio::test]
    async fn full_refresh_indexes_docx_and_reports_counts() {
        let workspace = TempDir::new().unwrap();
        std::fs::write(workspace.path().join("a.docx"), b"not really a docx").unwrap();

        let handle = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        let summary = handle.refresh(RefreshMode::Full, true).await.unwrap();

        assert_eq!(summary.scanned_files, 1);
        assert_eq!(summary.indexed_files, 1);
        assert_eq!(handle.indexed_file_count().await, 1);
    }

    #[tokio::test]
    async fn incremental_refresh_reuses_unchanged_files() {
        let workspace = TempDir::new().unwrap();
        std::fs::write(workspace.path().join("a.docx"), b"stable content").unwrap();

        let handle = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        handle.refresh(RefreshMode::Full, true).await.unwrap();

        let summary = handle.refresh(RefreshMode::Incremental, true).await.unwrap();
        assert_eq!(summary.reused_files, 1);
        assert_eq!(summary.updated_files, 0);
    }

    #[tokio::test]
    async fn missing_workspace_root_is_reported_as_not_found() {
        let handle = IndexHandle::new(test_config(PathBuf::from("/nonexistent/workspace/root")));
        let err = handle.refresh(RefreshMode::Full, true).await.unwrap_err();
        assert!(matches!(err, RefreshError::WorkspaceRootNotFound(_)));
    }

    #[tokio::test]
    async fn debounced_incremental_refresh_is_skipped_within_interval() {
        let workspace = TempDir::new().unwrap();
        std::fs::write(workspace.path().join("a.docx"), b"content").unwrap();

        let mut config = test_config(workspace.path().to_path_buf());
        config.refresh_interval_seconds = 3600;
        let handle = IndexHandle::new(config);

        handle.refresh(RefreshMode::Full, true).await.unwrap();
        let summary = handle.refresh(RefreshMode::Incremental, false).await.unwrap();
        assert_eq!(summary.status, RefreshStatus::Skipped);
    }
}
