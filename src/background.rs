//! Background refresh worker: a single interval-driven task that keeps the
//! index warm between requests.
//!
//! Started once at process startup when `backgroundSyncSeconds > 0`.
//! `is_alive()` lets a caller check before spawning a second worker rather
//! than risk two background loops racing each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{RefreshMode, RefreshStatus};
use crate::refresh::IndexHandle;

/// Handle to a spawned background worker, used to request cooperative
/// shutdown and to check whether one is already running.
pub struct BackgroundWorker {
    alive: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
}

impl BackgroundWorker {
    /// Spawns the worker if `interval_seconds > 0`; returns `None` otherwise.
    pub fn spawn(index: IndexHandle, interval_seconds: u64) -> Option<Self> {
        if interval_seconds == 0 {
            return None;
        }

        let alive = Arc::new(AtomicBool::new(true));
        let notify = Arc::new(tokio::sync::Notify::new());

        let worker_alive = alive.clone();
        let worker_notify = notify.clone();
        tokio::spawn(async move {
            tracing::info!(interval_seconds, "officeindex background sync enabled");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(interval_seconds)) => {}
                    _ = worker_notify.notified() => break,
                }

                match index.refresh(RefreshMode::Incremental, true).await {
                    Ok(summary) if summary.status == RefreshStatus::Ok || summary.status == RefreshStatus::Degraded => {
                        tracing::info!(
                            indexed = summary.indexed_files,
                            updated = summary.updated_files,
                            failed = summary.failed_files,
                            "officeindex background refresh complete"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(error = %err, "officeindex background refresh failed");
                    }
                }
            }
            worker_alive.store(false, Ordering::SeqCst);
        });

        Some(BackgroundWorker { alive, notify })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            workspace_root: PathBuf::from("."),
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

    #[test]
    fn spawn_returns_none_when_interval_is_zero() {
        let index = IndexHandle::new(test_config());
        assert!(BackgroundWorker::spawn(index, 0).is_none());
    }

    #[tokio::test]
    async fn worker_stops_cooperatively() {
        let index = IndexHandle::new(test_config());
        let worker = BackgroundWorker::spawn(index, 3600).unwrap();
        assert!(worker.is_alive());
        worker.stop();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!worker.is_alive());
    }
}
