//! DevTools Protocol implementation of [`PageDriver`].
//!
//! Locators are resolved inside the page: the best match is tagged with a
//! fresh handle attribute and then looked up by CSS selector, so every action
//! works on the element as it exists at that moment.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use std::path::Path;
use tracing::debug;

use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};
use crate::locator::{ElementState, Locator};
use crate::session::BrowserSession;

/// Document status as recorded by the Navigation Timing API (null when unknown)
const NAVIGATION_STATUS_SCRIPT: &str = "(() => { \
    const nav = performance.getEntriesByType('navigation')[0]; \
    return nav && nav.responseStatus ? nav.responseStatus : null; \
})()";

impl BrowserSession {
    /// Tag the best match for `locator` and return it as a DevTools element
    async fn resolve(&mut self, locator: &Locator) -> VerifyResult<Element> {
        self.next_handle += 1;
        let token = format!("h{}", self.next_handle);

        let marked: bool = self
            .page
            .evaluate(locator.mark_script(&token))
            .await?
            .into_value()?;
        if !marked {
            return Err(VerifyError::ElementNotFound {
                locator: locator.to_string(),
            });
        }

        Ok(self
            .page
            .find_element(Locator::handle_selector(&token))
            .await?)
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn goto(&mut self, url: &str) -> VerifyResult<Option<u16>> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| VerifyError::NavigationError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        // Older browsers do not expose the status; treat that as unknown
        let status = self
            .page
            .evaluate(NAVIGATION_STATUS_SCRIPT)
            .await
            .ok()
            .and_then(|v| v.into_value::<Option<u16>>().ok())
            .flatten();
        Ok(status)
    }

    async fn current_url(&mut self) -> VerifyResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn title(&mut self) -> VerifyResult<String> {
        let title: Option<String> = self.page.evaluate("document.title").await?.into_value()?;
        Ok(title.unwrap_or_default())
    }

    async fn probe(&mut self, locator: &Locator) -> VerifyResult<ElementState> {
        Ok(self
            .page
            .evaluate(locator.probe_script())
            .await?
            .into_value()?)
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> VerifyResult<()> {
        let element = self.resolve(locator).await?;

        // Clear through the native setter so framework-controlled inputs see the change
        element
            .call_js_fn(
                "function() { \
                    this.focus(); \
                    const proto = Object.getPrototypeOf(this); \
                    const desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
                    if (desc && desc.set) { desc.set.call(this, ''); } else { this.value = ''; } \
                    this.dispatchEvent(new Event('input', { bubbles: true })); \
                }",
                false,
            )
            .await?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> VerifyResult<()> {
        let element = self.resolve(locator).await?;
        element.click().await?;
        Ok(())
    }

    async fn set_input_files(&mut self, locator: &Locator, path: &Path) -> VerifyResult<()> {
        let element = self.resolve(locator).await?;
        let params = SetFileInputFilesParams::builder()
            .file(path.to_string_lossy().to_string())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(VerifyError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> VerifyResult<Vec<u8>> {
        let png = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await?;
        Ok(png)
    }

    fn source_type(&self) -> &str {
        "chromium"
    }
}
