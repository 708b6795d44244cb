//! Action primitives.
//!
//! Each primitive performs exactly one browser action and returns once the
//! browser has acknowledged it. Preconditions are checked against a fresh
//! probe of the page right before acting; what the application does in
//! response is left to the condition waiter.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};
use crate::locator::{ElementState, Locator};

/// Load `url`. With `check_status`, a non-2xx document status is a failure.
pub async fn navigate<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    check_status: bool,
) -> VerifyResult<()> {
    let status = driver.goto(url).await?;
    debug!(url, ?status, "Navigated");
    match status {
        Some(code) if check_status && !(200..300).contains(&code) => {
            Err(VerifyError::NavigationError {
                url: url.to_string(),
                reason: format!("HTTP status {}", code),
            })
        }
        _ => Ok(()),
    }
}

/// Replace the content of a visible, enabled, editable element
pub async fn fill<D: PageDriver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    value: &str,
) -> VerifyResult<()> {
    let state = probe_existing(driver, locator).await?;
    require_interactable(locator, &state)?;
    if !state.editable {
        return Err(not_interactable(locator, "not an editable input"));
    }
    driver.fill(locator, value).await
}

/// Click a visible, enabled element
pub async fn click<D: PageDriver + ?Sized>(driver: &mut D, locator: &Locator) -> VerifyResult<()> {
    let state = probe_existing(driver, locator).await?;
    require_interactable(locator, &state)?;
    driver.click(locator).await
}

/// Attach a local file to a file input.
///
/// The path is checked before the page is touched at all. The input may be
/// visually hidden; it only has to exist and be a file input.
pub async fn upload_file<D: PageDriver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    path: &Path,
) -> VerifyResult<()> {
    let resolved = resolve_upload_path(path)?;
    let state = probe_existing(driver, locator).await?;
    if !state.file_input {
        return Err(not_interactable(locator, "not a file input"));
    }
    if !state.enabled {
        return Err(not_interactable(locator, "disabled"));
    }
    driver.set_input_files(locator, &resolved).await
}

/// Canonical path of an existing regular file
pub fn resolve_upload_path(path: &Path) -> VerifyResult<PathBuf> {
    let resolved =
        std::fs::canonicalize(path).map_err(|_| VerifyError::FileNotFound(path.to_path_buf()))?;
    if !resolved.is_file() {
        return Err(VerifyError::FileNotFound(path.to_path_buf()));
    }
    Ok(resolved)
}

async fn probe_existing<D: PageDriver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
) -> VerifyResult<ElementState> {
    let state = driver.probe(locator).await?;
    if !state.found() {
        return Err(VerifyError::ElementNotFound {
            locator: locator.to_string(),
        });
    }
    Ok(state)
}

fn require_interactable(locator: &Locator, state: &ElementState) -> VerifyResult<()> {
    if !state.visible {
        return Err(not_interactable(locator, "hidden"));
    }
    if !state.enabled {
        return Err(not_interactable(locator, "disabled"));
    }
    Ok(())
}

fn not_interactable(locator: &Locator, reason: &str) -> VerifyError {
    VerifyError::ElementNotInteractable {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}
