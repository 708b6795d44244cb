//! Page driver abstraction.
//!
//! The harness talks to the browser only through [`PageDriver`]:
//! - `BrowserSession` drives headless Chromium over the DevTools Protocol
//! - `ScriptedPage` is an in-memory page whose state changes on a timeline,
//!   used to exercise scenarios without a browser

pub mod chrome;
pub mod scripted;

use async_trait::async_trait;
use std::path::Path;

use crate::error::VerifyResult;
use crate::locator::{ElementState, Locator};

pub use scripted::{Effect, ScriptedElement, ScriptedPage, ScriptedRoute, Trigger};

/// A controllable page.
///
/// Every method performs one browser round trip against the live page.
/// Implementations do not check interaction preconditions; that is the job of
/// the action primitives in [`crate::actions`].
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` and return the document's HTTP status when the browser reports one
    async fn goto(&mut self, url: &str) -> VerifyResult<Option<u16>>;

    /// Current page address
    async fn current_url(&mut self) -> VerifyResult<String>;

    /// Current document title
    async fn title(&mut self) -> VerifyResult<String>;

    /// Resolve `locator` afresh and describe its best match
    async fn probe(&mut self, locator: &Locator) -> VerifyResult<ElementState>;

    /// Replace the content of the matched input with `value`
    async fn fill(&mut self, locator: &Locator, value: &str) -> VerifyResult<()>;

    /// Click the matched element
    async fn click(&mut self, locator: &Locator) -> VerifyResult<()>;

    /// Attach a local file to the matched file input
    async fn set_input_files(&mut self, locator: &Locator, path: &Path) -> VerifyResult<()>;

    /// Full-page PNG screenshot
    async fn screenshot(&mut self) -> VerifyResult<Vec<u8>>;

    /// Source type identifier recorded in evidence manifests (e.g. "chromium", "scripted")
    fn source_type(&self) -> &str;
}
