use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::Browser;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::driver::ChromiumPageDriver;
use crate::error::SandboxError;
use crate::launch::browser_config;

/// Create a uniquely named storage directory for `task_id` under `root`.
///
/// The name is `navtask-<task_id>-<random>`, so two sandboxes for the same
/// task id never collide.
pub fn create_storage(root: &Path, task_id: &str) -> Result<TempDir, SandboxError> {
    std::fs::create_dir_all(root).map_err(|source| SandboxError::Storage {
        root: root.display().to_string(),
        source,
    })?;
    tempfile::Builder::new()
        .prefix(&format!("navtask-{task_id}-"))
        .tempdir_in(root)
        .map_err(|source| SandboxError::Storage {
            root: root.display().to_string(),
            source,
        })
}

/// What happened during [`ChromeSandbox::release`].
#[derive(Debug, Clone, Default)]
pub struct ReleaseReport {
    /// `false` when the sandbox had already been released and nothing was done.
    pub performed: bool,
    pub warnings: Vec<String>,
}

/// One isolated browser process plus the storage directory it owns.
pub struct ChromeSandbox {
    id: String,
    storage_path: PathBuf,
    storage: Mutex<Option<TempDir>>,
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    driver: Arc<ChromiumPageDriver>,
    close_timeout: Duration,
    released: AtomicBool,
}

impl std::fmt::Debug for ChromeSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSandbox")
            .field("id", &self.id)
            .field("storage_path", &self.storage_path)
            .field("released", &self.is_released())
            .finish()
    }
}

impl ChromeSandbox {
    /// Allocate storage, launch Chromium bound to it and open a blank page.
    ///
    /// On any failure the partially created resources are torn down before
    /// the error is returned.
    pub async fn launch(cfg: &SandboxConfig, task_id: &str) -> Result<Self, SandboxError> {
        let storage = create_storage(&cfg.storage_root, task_id)?;
        let storage_path = storage.path().to_path_buf();
        let id = storage_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("navtask-{task_id}"));

        let browser_cfg = browser_config(cfg, &storage_path)?;
        let (mut browser, mut handler) = Browser::launch(browser_cfg)
            .await
            .map_err(|err| SandboxError::Launch(err.to_string()))?;

        let handler_id = id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "browser-sandbox", sandbox = %handler_id, ?err, "cdp handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if let Some(Err(kill_err)) = browser.kill().await {
                    warn!(target: "browser-sandbox", sandbox = %id, ?kill_err, "failed to kill chromium after page error");
                }
                handler_task.abort();
                return Err(SandboxError::Launch(format!("failed to open page: {err}")));
            }
        };

        info!(
            target: "browser-sandbox",
            sandbox = %id,
            storage = %storage_path.display(),
            "sandbox provisioned"
        );

        Ok(Self {
            driver: Arc::new(ChromiumPageDriver::new(
                page,
                Duration::from_millis(cfg.request_timeout_ms),
            )),
            id,
            storage_path,
            storage: Mutex::new(Some(storage)),
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            close_timeout: Duration::from_millis(cfg.close_timeout_ms),
            released: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn driver(&self) -> Arc<ChromiumPageDriver> {
        self.driver.clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Terminate the browser, then remove the storage directory.
    ///
    /// Never fails; problems are logged and returned as warnings. Only the
    /// first call does any work.
    pub async fn release(&self) -> ReleaseReport {
        if self.released.swap(true, Ordering::SeqCst) {
            return ReleaseReport::default();
        }
        let mut report = ReleaseReport {
            performed: true,
            ..Default::default()
        };

        if let Some(mut browser) = self.browser.lock().await.take() {
            let graceful = tokio::time::timeout(self.close_timeout, async {
                browser.close().await.map_err(|err| err.to_string())?;
                browser.wait().await.map_err(|err| err.to_string())?;
                Ok::<(), String>(())
            })
            .await;
            match graceful {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    report.warnings.push(format!("browser close failed: {err}"));
                    kill_browser(&mut browser, &mut report).await;
                }
                Err(_) => {
                    report.warnings.push(format!(
                        "browser did not exit within {}ms",
                        self.close_timeout.as_millis()
                    ));
                    kill_browser(&mut browser, &mut report).await;
                }
            }
        }

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }

        if let Some(storage) = self.storage.lock().await.take() {
            if let Err(err) = storage.close() {
                report.warnings.push(format!(
                    "failed to remove storage {}: {err}",
                    self.storage_path.display()
                ));
            }
        }

        for warning in &report.warnings {
            warn!(target: "browser-sandbox", sandbox = %self.id, "{warning}");
        }
        info!(target: "browser-sandbox", sandbox = %self.id, "sandbox released");
        report
    }
}

async fn kill_browser(browser: &mut Browser, report: &mut ReleaseReport) {
    match browser.kill().await {
        Some(Err(err)) => report.warnings.push(format!("browser kill failed: {err}")),
        Some(Ok(())) => {
            let _ = browser.wait().await;
        }
        None => {}
    }
}

impl Drop for ChromeSandbox {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        warn!(target: "browser-sandbox", sandbox = %self.id, "sandbox dropped without release");

        if let Ok(mut guard) = self.handler.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
        if let Ok(mut guard) = self.browser.try_lock() {
            if let Some(mut browser) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Some(Err(err)) = browser.kill().await {
                            warn!(target: "browser-sandbox", ?err, "failed to kill chromium child");
                        }
                    });
                } else {
                    debug!(target: "browser-sandbox", "no tokio runtime available to kill chromium child");
                }
            }
        }
        // The TempDir removes the storage directory when it is dropped with `self`.
    }
}
