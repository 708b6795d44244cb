//! Scenario model: ordered states, steps grouped into stages, and the terminal
//! condition that decides the verdict.
//!
//! Definitions are built in code by [`crate::scenario::catalog`] and validated by
//! [`ScenarioBuilder::build`]. Only [`ScenarioState`] and [`Outcome`] are
//! serialised, since they end up in reports; steps appear there through their
//! masked `Display` form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{VerifyError, VerifyResult};
use crate::locator::Locator;

/// Position of a scenario in the verification workflow.
///
/// States are ordered; a scenario only ever moves forward and may skip states
/// it has no use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Init,
    Navigated,
    Authenticated,
    OnUploadPage,
    Uploaded,
    Processing,
    Resolved,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Init => "init",
            ScenarioState::Navigated => "navigated",
            ScenarioState::Authenticated => "authenticated",
            ScenarioState::OnUploadPage => "on_upload_page",
            ScenarioState::Uploaded => "uploaded",
            ScenarioState::Processing => "processing",
            ScenarioState::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// One browser action or wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Navigate { url: String },
    Fill { locator: Locator, value: String, secret: bool },
    Click { locator: Locator },
    UploadFile { locator: Locator, path: PathBuf },
    WaitForVisible { locator: Locator, timeout: Duration },
    WaitForUrl { url: String, timeout: Duration },
    WaitForTitle { text: String, timeout: Duration },
}

impl Step {
    pub fn navigate(url: impl Into<String>) -> Self {
        Step::Navigate { url: url.into() }
    }

    pub fn fill(locator: Locator, value: impl Into<String>) -> Self {
        Step::Fill {
            locator,
            value: value.into(),
            secret: false,
        }
    }

    /// Fill whose value is masked in logs and reports
    pub fn fill_secret(locator: Locator, value: impl Into<String>) -> Self {
        Step::Fill {
            locator,
            value: value.into(),
            secret: true,
        }
    }

    pub fn click(locator: Locator) -> Self {
        Step::Click { locator }
    }

    pub fn upload(locator: Locator, path: impl Into<PathBuf>) -> Self {
        Step::UploadFile {
            locator,
            path: path.into(),
        }
    }

    pub fn wait_visible(locator: Locator, timeout: Duration) -> Self {
        Step::WaitForVisible { locator, timeout }
    }

    pub fn wait_url(url: impl Into<String>, timeout: Duration) -> Self {
        Step::WaitForUrl {
            url: url.into(),
            timeout,
        }
    }

    pub fn wait_title(text: impl Into<String>, timeout: Duration) -> Self {
        Step::WaitForTitle {
            text: text.into(),
            timeout,
        }
    }

    /// Wait budget, for the waiting steps
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Step::WaitForVisible { timeout, .. }
            | Step::WaitForUrl { timeout, .. }
            | Step::WaitForTitle { timeout, .. } => Some(*timeout),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate {}", url),
            Step::Fill {
                locator,
                value,
                secret,
            } => {
                if *secret {
                    write!(f, "fill {} with ***", locator)
                } else {
                    write!(f, "fill {} with {:?}", locator, value)
                }
            }
            Step::Click { locator } => write!(f, "click {}", locator),
            Step::UploadFile { locator, path } => {
                write!(f, "upload {} to {}", path.display(), locator)
            }
            Step::WaitForVisible { locator, timeout } => {
                write!(f, "wait {} ms for {} visible", timeout.as_millis(), locator)
            }
            Step::WaitForUrl { url, timeout } => {
                write!(f, "wait {} ms for URL {}", timeout.as_millis(), url)
            }
            Step::WaitForTitle { text, timeout } => {
                write!(f, "wait {} ms for title containing {:?}", timeout.as_millis(), text)
            }
        }
    }
}

/// Steps that together move the scenario into `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub target: ScenarioState,
    pub steps: Vec<Step>,
}

/// Which way asynchronous processing ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Success,
    Error,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Success => f.write_str("success"),
            MarkerKind::Error => f.write_str("error"),
        }
    }
}

/// UI element whose appearance means processing has concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalMarker {
    pub kind: MarkerKind,
    pub locator: Locator,
}

impl TerminalMarker {
    pub fn success(locator: Locator) -> Self {
        Self {
            kind: MarkerKind::Success,
            locator,
        }
    }

    pub fn error(locator: Locator) -> Self {
        Self {
            kind: MarkerKind::Error,
            locator,
        }
    }
}

impl fmt::Display for TerminalMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} marker {}", self.kind, self.locator)
    }
}

/// How a scenario reaches its verdict once every stage has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// Wait for either terminal marker; only `expected` is a success
    Marker {
        expected: TerminalMarker,
        alternative: Option<TerminalMarker>,
        timeout: Duration,
    },
    /// Completing every stage is the success condition
    StagesComplete,
}

/// Tri-state verdict of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    Success,
    Failure { kind: String, reason: String },
}

impl Outcome {
    pub fn failure(err: &VerifyError) -> Self {
        Outcome::Failure {
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// A complete scripted user journey with a single verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub stages: Vec<Stage>,
    pub terminal: Terminal,
}

impl Scenario {
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            name: name.into(),
            description: String::new(),
            stages: Vec::new(),
            terminal: Terminal::StagesComplete,
        }
    }

    /// Every step in execution order
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.stages.iter().flat_map(|s| s.steps.iter())
    }

    /// States the scenario passes through, including `Init` and `Resolved`
    pub fn states(&self) -> Vec<ScenarioState> {
        let mut states = vec![ScenarioState::Init];
        states.extend(self.stages.iter().map(|s| s.target));
        states.push(ScenarioState::Resolved);
        states
    }

    fn validate(&self) -> VerifyResult<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(VerifyError::Scenario(format!(
                "name {:?} must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }
        if self.stages.is_empty() {
            return Err(VerifyError::Scenario(format!("{} has no stages", self.name)));
        }

        let mut previous = ScenarioState::Init;
        for stage in &self.stages {
            if stage.target <= previous || stage.target == ScenarioState::Resolved {
                return Err(VerifyError::Scenario(format!(
                    "{}: stage {} cannot follow {}",
                    self.name, stage.target, previous
                )));
            }
            if stage.steps.is_empty() {
                return Err(VerifyError::Scenario(format!(
                    "{}: stage {} has no steps",
                    self.name, stage.target
                )));
            }
            previous = stage.target;
        }

        let zero_wait = self
            .steps()
            .filter_map(Step::timeout)
            .chain(match &self.terminal {
                Terminal::Marker { timeout, .. } => Some(*timeout),
                Terminal::StagesComplete => None,
            })
            .any(|t| t.is_zero());
        if zero_wait {
            return Err(VerifyError::Scenario(format!(
                "{}: every wait needs a non-zero timeout",
                self.name
            )));
        }

        if let Terminal::Marker {
            expected,
            alternative: Some(alternative),
            ..
        } = &self.terminal
        {
            if expected.kind == alternative.kind || expected.locator == alternative.locator {
                return Err(VerifyError::Scenario(format!(
                    "{}: alternative marker must differ from the expected one",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`Scenario`]; `build` validates the state ordering
#[derive(Debug)]
pub struct ScenarioBuilder {
    name: String,
    description: String,
    stages: Vec<Stage>,
    terminal: Terminal,
}

impl ScenarioBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn stage(mut self, target: ScenarioState, steps: Vec<Step>) -> Self {
        self.stages.push(Stage { target, steps });
        self
    }

    pub fn expect_marker(
        mut self,
        expected: TerminalMarker,
        alternative: Option<TerminalMarker>,
        timeout: Duration,
    ) -> Self {
        self.terminal = Terminal::Marker {
            expected,
            alternative,
            timeout,
        };
        self
    }

    pub fn build(self) -> VerifyResult<Scenario> {
        let scenario = Scenario {
            name: self.name,
            description: self.description,
            stages: self.stages,
            terminal: self.terminal,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}
