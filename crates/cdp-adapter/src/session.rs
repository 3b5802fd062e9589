//! Browser launch and lifecycle

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use which::which;

use crate::{errors::CdpError, page::CdpPage};

/// Environment variable naming an explicit Chrome binary
pub const CHROME_ENV: &str = "HEALWRIGHT_CHROME";

/// How to launch the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit binary; detected from the environment when unset
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub launch_timeout_ms: u64,
    pub sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1280,
            window_height: 800,
            launch_timeout_ms: 20_000,
            sandbox: true,
        }
    }
}

impl BrowserSettings {
    fn to_browser_config(&self) -> Result<BrowserConfig, CdpError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(CdpError::Config(format!(
                "window size {}x{} must be non-zero",
                self.window_width, self.window_height
            )));
        }

        let executable = match &self.executable {
            Some(path) if path.exists() => path.clone(),
            Some(path) => {
                return Err(CdpError::ExecutableNotFound(path.display().to_string()));
            }
            None => detect_chrome_executable().ok_or_else(|| {
                CdpError::ExecutableNotFound(format!(
                    "no Chrome or Chromium on PATH; set {} to the binary",
                    CHROME_ENV
                ))
            })?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .window_size(self.window_width, self.window_height)
            .launch_timeout(Duration::from_millis(self.launch_timeout_ms))
            .args(vec![
                "--disable-background-networking",
                "--disable-default-apps",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-popup-blocking",
                "--disable-sync",
                "--no-first-run",
                "--no-default-browser-check",
                "--password-store=basic",
            ]);
        if !self.headless {
            builder = builder.with_head();
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }

        builder.build().map_err(CdpError::Config)
    }
}

/// Locate a Chrome binary: the env override first, then well-known names on PATH
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var(CHROME_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
            warn!(path = %candidate.display(), "{} points at a missing file", CHROME_ENV);
        }
    }

    chrome_executable_names()
        .iter()
        .find_map(|name| which(name).ok())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

/// A running browser plus the task pumping its protocol events
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, CdpError> {
        let config = settings.to_browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| CdpError::Launch(err.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "CDP handler stopped");
                    break;
                }
            }
        });

        info!(headless = settings.headless, "Browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }

    /// Open a blank tab
    pub async fn new_page(&self) -> Result<CdpPage, CdpError> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(CdpPage::new(page))
    }

    /// Close the browser and wait for the process to exit
    pub async fn close(self) -> Result<(), CdpError> {
        let mut browser = self.browser.into_inner();
        browser.close().await?;
        if let Err(err) = browser.wait().await {
            warn!(error = %err, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}
