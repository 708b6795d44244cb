//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for flow-verify, supporting:
//! - Environment variables for the target application, credentials and artifacts
//! - Sensible defaults matching the local development setup
//! - Builder-style overrides for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FLOW_VERIFY_BASE_URL` | Base URL of the application under test | `http://127.0.0.1:8080` |
//! | `FLOW_VERIFY_EMAIL` | Sign-in email | `test@example.com` |
//! | `FLOW_VERIFY_PASSWORD` | Sign-in password | `password123` |
//! | `FLOW_VERIFY_SAMPLE` | Document uploaded by the upload scenarios | `formspree.io-Formspree.pdf` |
//! | `FLOW_VERIFY_ARTIFACT_DIR` | Directory for screenshots and manifests | `jules-scratch/verification` |
//! | `FLOW_VERIFY_HEADLESS` | Run the browser without a window | `true` |
//! | `FLOW_VERIFY_VIEWPORT` | Browser window size as `WxH` | `1280x720` |
//! | `FLOW_VERIFY_POLL_MS` | Condition polling interval (ms) | `50` |
//! | `FLOW_VERIFY_CHROME` | Chrome/Chromium executable | auto-detect |
//!
//! Timeout budgets can be adjusted with [`TimeoutSettings::scaled`] and
//! [`TimeoutSettings::set_budget`]. The CLI exposes both as `--timeout-scale`
//! and `--timeout NAME=MS`.
//!
//! # Example
//!
//! ```bash
//! export FLOW_VERIFY_BASE_URL="https://staging.example.com"
//! export FLOW_VERIFY_EMAIL="qa@example.com"
//! export FLOW_VERIFY_PASSWORD="..."
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{VerifyError, VerifyResult};

// ============================================================================
// Default Values
// ============================================================================

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Default sign-in email
pub const DEFAULT_EMAIL: &str = "test@example.com";

/// Default sign-in password
pub const DEFAULT_PASSWORD: &str = "password123";

/// Default sample document (not a bank statement)
pub const DEFAULT_SAMPLE: &str = "formspree.io-Formspree.pdf";

/// Default artifact directory
pub const DEFAULT_ARTIFACT_DIR: &str = "jules-scratch/verification";

/// Default browser window width (pixels)
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default browser window height (pixels)
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

/// Default condition polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// ============================================================================
// Timeout Budgets (milliseconds)
// ============================================================================

/// Page reacting locally after a navigation
pub const PAGE_READY_TIMEOUT_MS: u64 = 15_000;

/// Sign-in round trip ending in the dashboard redirect
pub const LOGIN_REDIRECT_TIMEOUT_MS: u64 = 30_000;

/// Upload control rendered on the upload route
pub const UPLOAD_CONTROL_TIMEOUT_MS: u64 = 15_000;

/// Processing indicator shown after the upload is registered
pub const PROCESSING_TIMEOUT_MS: u64 = 15_000;

/// Document processing reaching a terminal marker
pub const TERMINAL_MARKER_TIMEOUT_MS: u64 = 60_000;

/// Static page content becoming visible
pub const PAGE_CONTENT_TIMEOUT_MS: u64 = 15_000;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_BASE_URL: &str = "FLOW_VERIFY_BASE_URL";
pub const ENV_EMAIL: &str = "FLOW_VERIFY_EMAIL";
pub const ENV_PASSWORD: &str = "FLOW_VERIFY_PASSWORD";
pub const ENV_SAMPLE: &str = "FLOW_VERIFY_SAMPLE";
pub const ENV_ARTIFACT_DIR: &str = "FLOW_VERIFY_ARTIFACT_DIR";
pub const ENV_HEADLESS: &str = "FLOW_VERIFY_HEADLESS";
pub const ENV_VIEWPORT: &str = "FLOW_VERIFY_VIEWPORT";
pub const ENV_POLL_MS: &str = "FLOW_VERIFY_POLL_MS";
// Read by the CLI's --timeout-scale and --timeout flags
pub const ENV_TIMEOUT_SCALE: &str = "FLOW_VERIFY_TIMEOUT_SCALE";
pub const ENV_TIMEOUTS: &str = "FLOW_VERIFY_TIMEOUTS";
pub const ENV_CHROME: &str = "FLOW_VERIFY_CHROME";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for flow-verify
#[derive(Debug, Clone)]
pub struct Config {
    /// Application under test
    pub target: TargetSettings,
    /// Sign-in credentials
    pub credentials: CredentialSettings,
    /// Wait budgets
    pub timeouts: TimeoutSettings,
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Evidence output
    pub artifacts: ArtifactSettings,
}

/// Application-related settings
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Local document used as upload payload
    pub sample_path: PathBuf,
    /// Treat non-2xx document responses as navigation failures
    pub check_status: bool,
}

/// Credentials typed into the sign-in form
#[derive(Clone)]
pub struct CredentialSettings {
    pub email: String,
    pub password: String,
}

/// Timeout budgets for each wait in the scenarios
#[derive(Debug, Clone)]
pub struct TimeoutSettings {
    pub poll_interval: Duration,
    pub page_ready: Duration,
    pub login_redirect: Duration,
    pub upload_control: Duration,
    pub processing: Duration,
    pub terminal_marker: Duration,
    pub page_content: Duration,
}

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Explicit Chrome executable; auto-detected when `None`
    pub executable: Option<PathBuf>,
}

/// Evidence output settings
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub dir: PathBuf,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            target: TargetSettings::from_env(),
            credentials: CredentialSettings::from_env(),
            timeouts: TimeoutSettings::from_env(),
            browser: BrowserSettings::from_env(),
            artifacts: ArtifactSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            target: TargetSettings::defaults(),
            credentials: CredentialSettings::defaults(),
            timeouts: TimeoutSettings::defaults(),
            browser: BrowserSettings::defaults(),
            artifacts: ArtifactSettings::defaults(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.target.base_url = normalize_base_url(&url.into());
        self
    }

    pub fn credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = CredentialSettings {
            email: email.into(),
            password: password.into(),
        };
        self
    }

    pub fn sample_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target.sample_path = path.into();
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts.dir = dir.into();
        self
    }

    /// Absolute URL for a route of the application under test
    pub fn url(&self, route: &str) -> String {
        format!("{}/{}", self.target.base_url, route.trim_start_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TargetSettings {
    pub fn from_env() -> Self {
        Self {
            base_url: normalize_base_url(
                &env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ),
            sample_path: env::var(ENV_SAMPLE)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SAMPLE)),
            check_status: true,
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sample_path: PathBuf::from(DEFAULT_SAMPLE),
            check_status: true,
        }
    }
}

impl CredentialSettings {
    pub fn from_env() -> Self {
        Self {
            email: env::var(ENV_EMAIL).unwrap_or_else(|_| DEFAULT_EMAIL.to_string()),
            password: env::var(ENV_PASSWORD).unwrap_or_else(|_| DEFAULT_PASSWORD.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            email: DEFAULT_EMAIL.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl TimeoutSettings {
    pub fn from_env() -> Self {
        let poll_ms = env::var(ENV_POLL_MS)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Self {
            poll_interval: Duration::from_millis(poll_ms),
            ..Self::defaults()
        }
    }

    pub fn defaults() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            page_ready: Duration::from_millis(PAGE_READY_TIMEOUT_MS),
            login_redirect: Duration::from_millis(LOGIN_REDIRECT_TIMEOUT_MS),
            upload_control: Duration::from_millis(UPLOAD_CONTROL_TIMEOUT_MS),
            processing: Duration::from_millis(PROCESSING_TIMEOUT_MS),
            terminal_marker: Duration::from_millis(TERMINAL_MARKER_TIMEOUT_MS),
            page_content: Duration::from_millis(PAGE_CONTENT_TIMEOUT_MS),
        }
    }
}

impl TimeoutSettings {
    /// Names accepted by [`TimeoutSettings::set_budget`]
    pub const BUDGETS: [&'static str; 6] = [
        "page_ready",
        "login_redirect",
        "upload_control",
        "processing",
        "terminal_marker",
        "page_content",
    ];

    fn budget_mut(&mut self, name: &str) -> Option<&mut Duration> {
        match name {
            "page_ready" => Some(&mut self.page_ready),
            "login_redirect" => Some(&mut self.login_redirect),
            "upload_control" => Some(&mut self.upload_control),
            "processing" => Some(&mut self.processing),
            "terminal_marker" => Some(&mut self.terminal_marker),
            "page_content" => Some(&mut self.page_content),
            _ => None,
        }
    }

    /// Replace one named budget
    pub fn set_budget(&mut self, name: &str, budget: Duration) -> VerifyResult<()> {
        if budget.is_zero() {
            return Err(VerifyError::Config(format!("timeout {} must be non-zero", name)));
        }
        let slot = self.budget_mut(name).ok_or_else(|| {
            VerifyError::Config(format!(
                "unknown timeout {:?} (expected one of: {})",
                name,
                Self::BUDGETS.join(", ")
            ))
        })?;
        *slot = budget;
        Ok(())
    }

    /// Multiply every budget by `factor`; the poll interval is left alone
    pub fn scaled(mut self, factor: f64) -> VerifyResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(VerifyError::Config(format!(
                "timeout scale must be a positive number, got {}",
                factor
            )));
        }
        for name in Self::BUDGETS {
            if let Some(budget) = self.budget_mut(name) {
                *budget = Duration::try_from_secs_f64(budget.as_secs_f64() * factor)
                    .map_err(|e| VerifyError::Config(format!("timeout scale {}: {}", factor, e)))?
                    .max(Duration::from_millis(1));
            }
        }
        Ok(self)
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        let (viewport_width, viewport_height) = env::var(ENV_VIEWPORT)
            .ok()
            .and_then(|s| parse_viewport(&s))
            .unwrap_or((DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT));

        Self {
            headless: env::var(ENV_HEADLESS)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            viewport_width,
            viewport_height,
            executable: env::var(ENV_CHROME).ok().map(PathBuf::from),
        }
    }

    pub fn defaults() -> Self {
        Self {
            headless: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            executable: None,
        }
    }
}

impl ArtifactSettings {
    pub fn from_env() -> Self {
        Self {
            dir: env::var(ENV_ARTIFACT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
        }
    }

    pub fn defaults() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a viewport string of the form "WxH"
pub fn parse_viewport(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().to_lowercase().split_once('x').map(|(w, h)| {
        (w.trim().to_string(), h.trim().to_string())
    })?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Parse a timeout override of the form "name=ms"
pub fn parse_timeout_override(spec: &str) -> Option<(String, Duration)> {
    let (name, ms) = spec.trim().split_once('=')?;
    let ms: u64 = ms.trim().parse().ok()?;
    Some((name.trim().to_string(), Duration::from_millis(ms)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
