//! Evidence capture.
//!
//! Every scenario run leaves exactly one screenshot behind, on the success path
//! and the failure path alike. The capture right is handed out as a one-shot
//! [`EvidenceSlot`] that is consumed by [`EvidenceSlot::capture`], so a second
//! capture for the same run cannot be expressed.
//!
//! Artifact paths are fixed per scenario and outcome. Each run overwrites its
//! own path and removes the other outcome's files, so a scenario never has
//! more than one screenshot on disk:
//! - `<dir>/<scenario>_verification.png` when the scenario passed
//! - `<dir>/<scenario>_error.png` when it failed
//!
//! Each image gets a JSON manifest with the same stem.

use chrono::{DateTime, Utc};
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::driver::PageDriver;
use crate::error::VerifyResult;

/// Record of a persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub scenario: String,
    pub passed: bool,
    /// Failure reason, when the scenario failed
    pub reason: Option<String>,
    pub image_path: PathBuf,
    pub manifest_path: PathBuf,
    pub url: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub source: String,
    pub host: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

/// Writes snapshots into a fixed artifact directory
#[derive(Debug, Clone)]
pub struct EvidenceCapturer {
    dir: PathBuf,
    host: String,
}

impl EvidenceCapturer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            dir: dir.into(),
            host,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Image path for a scenario outcome
    pub fn image_path(&self, scenario: &str, passed: bool) -> PathBuf {
        let discriminator = if passed { "verification" } else { "error" };
        self.dir
            .join(format!("{}_{}.png", sanitize_label(scenario), discriminator))
    }

    /// The single capture right for one run of `scenario`
    pub fn slot(&self, scenario: &str) -> EvidenceSlot<'_> {
        EvidenceSlot {
            capturer: self,
            scenario: scenario.to_string(),
        }
    }
}

/// One-shot capture right for a scenario run
#[derive(Debug)]
#[must_use = "evidence must be captured on every terminating path"]
pub struct EvidenceSlot<'a> {
    capturer: &'a EvidenceCapturer,
    scenario: String,
}

impl EvidenceSlot<'_> {
    /// Take a full-page snapshot of the current page and persist it.
    ///
    /// `failure` is the reason the scenario failed, `None` if it passed.
    pub async fn capture<D: PageDriver + ?Sized>(
        self,
        driver: &mut D,
        failure: Option<&str>,
    ) -> VerifyResult<EvidenceRecord> {
        let passed = failure.is_none();
        fs::create_dir_all(&self.capturer.dir)?;

        let png = driver.screenshot().await?;
        let (width, height) = image::load_from_memory(&png)?.dimensions();

        // Page details are informational; an unreachable page still gets its screenshot
        let url = driver.current_url().await.unwrap_or_default();
        let title = driver.title().await.unwrap_or_default();

        // The other outcome's pair belongs to an earlier run
        let stale = self.capturer.image_path(&self.scenario, !passed);
        remove_if_present(&stale.with_extension("json"))?;
        remove_if_present(&stale)?;

        let image_path = self.capturer.image_path(&self.scenario, passed);
        fs::write(&image_path, &png)?;

        let record = EvidenceRecord {
            scenario: self.scenario,
            passed,
            reason: failure.map(str::to_string),
            manifest_path: image_path.with_extension("json"),
            image_path,
            url,
            title,
            width,
            height,
            source: driver.source_type().to_string(),
            host: self.capturer.host.clone(),
            timestamp: Utc::now(),
        };
        fs::write(&record.manifest_path, serde_json::to_string_pretty(&record)?)?;

        info!("Screenshot saved to {}", record.image_path.display());
        Ok(record)
    }
}

fn remove_if_present(path: &Path) -> VerifyResult<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Sanitize a label for use in filenames
fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
