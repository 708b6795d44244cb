//! Error types for verification runs

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while driving a scenario.
///
/// The first six variants are the verification taxonomy: each one aborts the
/// running scenario and is reported as its failure reason. The remaining
/// variants cover the harness's own plumbing.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("element not interactable: {locator} ({reason})")]
    ElementNotInteractable { locator: String, reason: String },

    #[error("timed out after {timeout_ms} ms waiting for {condition}")]
    TimeoutExceeded { condition: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    NavigationError { url: String, reason: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("scenario {name} failed: {reason}")]
    ScenarioFailed { name: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid scenario: {0}")]
    Scenario(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl VerifyError {
    /// Short machine-readable name of the variant, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::ElementNotFound { .. } => "element_not_found",
            VerifyError::ElementNotInteractable { .. } => "element_not_interactable",
            VerifyError::TimeoutExceeded { .. } => "timeout_exceeded",
            VerifyError::NavigationError { .. } => "navigation_error",
            VerifyError::FileNotFound(_) => "file_not_found",
            VerifyError::AssertionFailed(_) => "assertion_failed",
            VerifyError::ScenarioFailed { .. } => "scenario_failed",
            VerifyError::Browser(_) => "browser",
            VerifyError::Scenario(_) => "scenario",
            VerifyError::Config(_) => "config",
            VerifyError::Io(_) => "io",
            VerifyError::Json(_) => "json",
            VerifyError::Image(_) => "image",
        }
    }
}

impl From<chromiumoxide::error::CdpError> for VerifyError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        VerifyError::Browser(err.to_string())
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_condition_and_budget() {
        let err = VerifyError::TimeoutExceeded {
            condition: "text \"Processing...\" visible".to_string(),
            timeout_ms: 15_000,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 15000 ms waiting for text \"Processing...\" visible"
        );
        assert_eq!(err.kind(), "timeout_exceeded");
    }

    #[test]
    fn test_file_not_found_displays_path() {
        let err = VerifyError::FileNotFound(PathBuf::from("missing.pdf"));
        assert_eq!(err.to_string(), "file not found: missing.pdf");
    }
}
