//! flow-verify - Browser-driven verification of asynchronous upload workflows.
//!
//! This crate provides:
//! - A [`PageDriver`] abstraction with a Chromium backend and an in-memory
//!   [`ScriptedPage`] for testing
//! - Locators, action primitives and a bounded condition waiter
//! - A scenario state machine that resolves every run to a single verdict
//! - Evidence capture: one screenshot and JSON manifest per run
//!
//! # Example
//!
//! ```rust,no_run
//! use flow_verify::config::Config;
//! use flow_verify::evidence::EvidenceCapturer;
//! use flow_verify::runner::run_suite;
//! use flow_verify::scenario::{Orchestrator, catalog};
//! use flow_verify::session::ChromeLauncher;
//!
//! # async fn demo() -> flow_verify::VerifyResult<()> {
//! let config = Config::from_env();
//! let capturer = EvidenceCapturer::new(&config.artifacts.dir);
//! let orchestrator = Orchestrator::from_config(&config, &capturer);
//! let mut launcher = ChromeLauncher::new(config.browser.clone());
//!
//! let suite = run_suite(&mut launcher, &orchestrator, &catalog::all(&config)?).await?;
//! println!("{} passed, {} failed", suite.passed, suite.failed);
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod locator;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod waiter;

// Re-export error types
pub use error::{VerifyError, VerifyResult};

// Re-export drivers
pub use driver::{Effect, PageDriver, ScriptedElement, ScriptedPage, ScriptedRoute, Trigger};
pub use session::{BrowserSession, ChromeLauncher, SessionProvider};

// Re-export the verification model
pub use evidence::{EvidenceCapturer, EvidenceRecord};
pub use locator::{ElementState, Locator};
pub use runner::{ScenarioReport, StepRecord, SuiteReport, run_suite};
pub use scenario::{Orchestrator, Outcome, Scenario, ScenarioState, Step};
pub use waiter::{Condition, Waiter};
