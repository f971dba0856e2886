use async_trait::async_trait;
use headless_chrome::Tab;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// External debugging collaborator: the automation core only decides *when*
/// artifacts are worth capturing (an unrecognized page structure); what gets
/// emitted and where is this boundary's business.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    /// Capture whatever helps a human diagnose the page the automation gave
    /// up on. Must never fail the run.
    async fn capture_failure(&self, tab: &Tab, label: &str);
}

/// Bundled sink writing a full-page PNG and the serialized markup to disk.
pub struct FsDiagnostics {
    dir: PathBuf,
}

impl FsDiagnostics {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn artifact_path(&self, label: &str, extension: &str) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!(
            "{}_{}_{}.{}",
            label,
            timestamp,
            uuid::Uuid::new_v4().simple(),
            extension
        );
        self.dir.join(filename)
    }
}

#[async_trait]
impl DiagnosticsSink for FsDiagnostics {
    async fn capture_failure(&self, tab: &Tab, label: &str) {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!("Failed to create diagnostics directory: {}", err);
            return;
        }

        match tab.capture_screenshot(
            headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
            None,
            None,
            true,
        ) {
            Ok(data) => {
                let path = self.artifact_path(label, "png");
                match std::fs::write(&path, data) {
                    Ok(()) => info!("Wrote diagnostic screenshot to {}", path.display()),
                    Err(err) => warn!("Failed to write diagnostic screenshot: {}", err),
                }
            }
            Err(err) => warn!("Screenshot capture failed: {}", err),
        }

        match tab.get_content() {
            Ok(html) => {
                let path = self.artifact_path(label, "html");
                match std::fs::write(&path, html) {
                    Ok(()) => info!("Wrote diagnostic markup to {}", path.display()),
                    Err(err) => warn!("Failed to write diagnostic markup: {}", err),
                }
            }
            Err(err) => warn!("Markup capture failed: {}", err),
        }
    }
}
