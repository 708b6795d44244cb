//! Browser session lifecycle.
//!
//! One [`BrowserSession`] per scenario run:
//! - launches a dedicated Chromium process and page
//! - owns the task pumping DevTools Protocol events
//! - is torn down with [`BrowserSession::close`] on every exit path, with
//!   `Drop` aborting the event task if the session is dropped early

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};

/// Upper bound for the browser to acknowledge shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A running browser with a single page
pub struct BrowserSession {
    pub(crate) browser: Browser,
    pub(crate) page: chromiumoxide::Page,
    /// Counter for element handles tagged into the page
    pub(crate) next_handle: u64,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a browser and open a blank page
    pub async fn launch(settings: &BrowserSettings) -> VerifyResult<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(settings.viewport_width, settings.viewport_height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| VerifyError::Browser(format!("invalid browser config: {}", e)))?;

        info!(headless = settings.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| VerifyError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("DevTools event loop ended");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(VerifyError::Browser(format!("failed to open page: {}", e)));
            }
        };

        Ok(Self {
            browser,
            page,
            next_handle: 0,
            handler,
        })
    }

    /// Shut the browser down and wait for the event task to finish
    pub async fn close(mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.browser.close()).await {
            Ok(Ok(_)) => debug!("Browser closed"),
            Ok(Err(e)) => warn!("Error closing browser: {}", e),
            Err(_) => warn!("Browser did not acknowledge close within {:?}", CLOSE_TIMEOUT),
        }
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.handler)
            .await
            .is_err()
        {
            self.handler.abort();
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Browser's own drop kills the child process
        self.handler.abort();
    }
}

/// Source of fresh page sessions, one per scenario run
#[async_trait]
pub trait SessionProvider: Send {
    type Session: PageDriver;

    /// Open a session exclusively owned by the next scenario
    async fn open(&mut self) -> VerifyResult<Self::Session>;

    /// Tear a session down; must not fail
    async fn close(&mut self, session: Self::Session);
}

/// Launches a new Chromium for every scenario
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionProvider for ChromeLauncher {
    type Session = BrowserSession;

    async fn open(&mut self) -> VerifyResult<BrowserSession> {
        BrowserSession::launch(&self.settings).await
    }

    async fn close(&mut self, session: BrowserSession) {
        session.close().await;
    }
}
