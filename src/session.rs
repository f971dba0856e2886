use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::models::Cookie;
use crate::utils::error::{AppError, Result};

/// Owns the connection to one browser process and hands out cookie-injected
/// tabs. In attach mode the process belongs to the operator and is reused
/// across runs; in launch mode a dedicated process is started per session and
/// dies with this manager.
pub struct BrowserSessionManager {
    browser: Browser,
    config: BrowserConfig,
}

impl BrowserSessionManager {
    /// Attach to the already-running browser at the configured debugging
    /// endpoint. An unreachable endpoint aborts the whole run.
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let endpoint = config.debug_endpoint();
        let version_url = format!("{}/json/version", endpoint);

        let response = reqwest::Client::new()
            .get(&version_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| AppError::Connection {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let version: serde_json::Value =
            response.json().await.map_err(|e| AppError::Connection {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Connection {
                endpoint: endpoint.clone(),
                message: "debugging endpoint returned no webSocketDebuggerUrl".to_string(),
            })?;

        debug!("Attaching to browser at {}", ws_url);
        let browser = Browser::connect(ws_url.to_string()).map_err(|e| AppError::Connection {
            endpoint,
            message: e.to_string(),
        })?;

        info!("Attached to running browser at {}", config.debug_endpoint());
        Ok(Self {
            browser,
            config: config.clone(),
        })
    }

    /// Launch a dedicated browser process for this session.
    pub fn launch(config: &BrowserConfig, headless: bool) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        info!("Launched dedicated browser process (headless: {})", headless);
        Ok(Self {
            browser,
            config: config.clone(),
        })
    }

    /// Open a new tab with the account's cookie jar injected before any
    /// navigation. The returned guard closes the tab on every exit path;
    /// the underlying browser stays up.
    pub fn authenticated_tab(&self, cookies: &[Cookie]) -> Result<PageGuard> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&self.config.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(self.config.page_timeout));

        if !cookies.is_empty() {
            let params: Vec<CookieParam> = cookies.iter().map(to_cookie_param).collect();
            tab.set_cookies(params)
                .map_err(|e| AppError::Browser(format!("Failed to inject cookies: {}", e)))?;
            debug!("Injected {} cookies into fresh tab", cookies.len());
        }

        Ok(PageGuard { tab })
    }

    /// Navigate with a bounded number of retries. Exceeding the per-page
    /// deadline surfaces as a retryable `NavigationTimeout`.
    pub async fn navigate(&self, tab: &Tab, url: &str, retries: u32) -> Result<()> {
        let strategy = FixedInterval::from_millis(750).take(retries as usize);
        Retry::spawn(strategy, move || async move {
            match try_navigate(tab, url) {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!("Navigation to {} failed: {}", url, err);
                    Err(err)
                }
            }
        })
        .await
    }
}

fn try_navigate(tab: &Tab, url: &str) -> Result<()> {
    tab.navigate_to(url)
        .map_err(|e| AppError::Browser(format!("Navigation to {} failed: {}", url, e)))?;
    tab.wait_until_navigated()
        .map_err(|_| AppError::NavigationTimeout {
            url: url.to_string(),
        })?;
    Ok(())
}

/// Sites answer expired cookies by bouncing to their sign-in flow; catching
/// the redirect early turns a confusing scrape failure into `AuthExpired`.
pub fn login_redirected(tab: &Tab) -> bool {
    let url = tab.get_url().to_ascii_lowercase();
    url.contains("/login") || url.contains("/signin") || url.contains("passport")
}

fn to_cookie_param(cookie: &Cookie) -> CookieParam {
    CookieParam {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        url: None,
        domain: Some(cookie.domain.clone()),
        path: Some("/".to_string()),
        secure: None,
        http_only: None,
        same_site: None,
        expires: None,
        priority: None,
        same_party: None,
        source_scheme: None,
        source_port: None,
        partition_key: None,
    }
}

/// Scoped ownership of one tab. The tab is the only shared mutable resource
/// of a session and belongs exclusively to this guard until drop.
pub struct PageGuard {
    tab: Arc<Tab>,
}

impl PageGuard {
    pub fn tab(&self) -> &Tab {
        &self.tab
    }
}

impl std::ops::Deref for PageGuard {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.tab
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        // Close only the tab; the browser process is shared and reused.
        if let Err(err) = self.tab.close(true) {
            debug!("Failed to close tab on release: {}", err);
        }
    }
}

/// Account-keyed session locks. One automation session per account at any
/// instant; a second caller for the same account waits its turn rather than
/// interleaving against the same login cookies.
#[derive(Clone, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, account_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            map.entry(account_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
