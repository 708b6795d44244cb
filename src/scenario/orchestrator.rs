//! Scenario orchestrator.
//!
//! Drives one [`Scenario`] through its stages against a page, resolves the
//! terminal marker and captures evidence. Whatever happens along the way, a
//! run ends with exactly one screenshot and a terminal [`Outcome`].

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::actions;
use crate::config::Config;
use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};
use crate::evidence::{EvidenceCapturer, EvidenceRecord};
use crate::runner::{ScenarioReport, StepRecord};
use crate::scenario::types::{Outcome, Scenario, ScenarioState, Step, Terminal, TerminalMarker};
use crate::waiter::{Condition, Waiter};

/// Runs scenarios and records their evidence
#[derive(Debug, Clone)]
pub struct Orchestrator<'a> {
    waiter: Waiter,
    check_status: bool,
    evidence: &'a EvidenceCapturer,
}

impl<'a> Orchestrator<'a> {
    pub fn new(evidence: &'a EvidenceCapturer, waiter: Waiter, check_status: bool) -> Self {
        Self {
            waiter,
            check_status,
            evidence,
        }
    }

    pub fn from_config(config: &Config, evidence: &'a EvidenceCapturer) -> Self {
        Self::new(
            evidence,
            Waiter::new(config.timeouts.poll_interval),
            config.target.check_status,
        )
    }

    /// Run `scenario` to its verdict.
    ///
    /// The returned report is never `Pending`. Use
    /// [`ScenarioReport::into_result`] to propagate a failure.
    pub async fn run<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        scenario: &Scenario,
    ) -> ScenarioReport {
        let started = Instant::now();
        let slot = self.evidence.slot(&scenario.name);
        let mut run = ScenarioRun::new();

        info!(scenario = %scenario.name, "Starting scenario");
        let verdict = self.drive(driver, scenario, &mut run).await;

        let evidence: Option<EvidenceRecord> = match verdict {
            Ok(()) => match slot.capture(driver, None).await {
                Ok(record) => {
                    run.resolve(Outcome::Success);
                    Some(record)
                }
                Err(err) => {
                    error!(scenario = %scenario.name, "Evidence capture failed: {}", err);
                    run.resolve(Outcome::failure(&err));
                    None
                }
            },
            Err(err) => {
                let reason = err.to_string();
                let record = match slot.capture(driver, Some(&reason)).await {
                    Ok(record) => Some(record),
                    Err(capture_err) => {
                        warn!(scenario = %scenario.name, "Evidence capture failed: {}", capture_err);
                        None
                    }
                };
                run.resolve(Outcome::failure(&err));
                record
            }
        };

        info!(
            scenario = %scenario.name,
            from = %run.state,
            to = %ScenarioState::Resolved,
            "State transition"
        );

        ScenarioReport {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            outcome: run.outcome,
            reached: run.state,
            steps: run.steps,
            duration_ms: started.elapsed().as_millis() as u64,
            evidence,
        }
    }

    /// Execute every stage, then the terminal check. Stops at the first error.
    async fn drive<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        scenario: &Scenario,
        run: &mut ScenarioRun,
    ) -> VerifyResult<()> {
        for stage in &scenario.stages {
            for step in &stage.steps {
                run.record(step.to_string(), self.execute(driver, step))
                    .await?;
            }
            run.advance(&scenario.name, stage.target);
        }

        if let Terminal::Marker {
            expected,
            alternative,
            timeout,
        } = &scenario.terminal
        {
            let description = match alternative {
                Some(alt) => format!(
                    "wait {} ms for {} or {}",
                    timeout.as_millis(),
                    expected,
                    alt
                ),
                None => format!("wait {} ms for {}", timeout.as_millis(), expected),
            };
            run.record(
                description,
                self.await_marker(driver, expected, alternative.as_ref(), *timeout),
            )
            .await?;
        }
        Ok(())
    }

    async fn execute<D: PageDriver + ?Sized>(&self, driver: &mut D, step: &Step) -> VerifyResult<()> {
        match step {
            Step::Navigate { url } => actions::navigate(driver, url, self.check_status).await,
            Step::Fill { locator, value, .. } => actions::fill(driver, locator, value).await,
            Step::Click { locator } => actions::click(driver, locator).await,
            Step::UploadFile { locator, path } => actions::upload_file(driver, locator, path).await,
            Step::WaitForVisible { locator, timeout } => {
                let condition = Condition::ElementVisible {
                    locator: locator.clone(),
                };
                self.waiter.wait_for(driver, &condition, *timeout).await?;
                Ok(())
            }
            Step::WaitForUrl { url, timeout } => {
                let condition = Condition::UrlEquals { url: url.clone() };
                self.waiter.wait_for(driver, &condition, *timeout).await?;
                Ok(())
            }
            Step::WaitForTitle { text, timeout } => {
                let condition = Condition::TitleContains { text: text.clone() };
                self.waiter.wait_for(driver, &condition, *timeout).await?;
                Ok(())
            }
        }
    }

    /// Wait for either terminal marker. Only `expected` counts as success.
    async fn await_marker<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        expected: &TerminalMarker,
        alternative: Option<&TerminalMarker>,
        timeout: Duration,
    ) -> VerifyResult<()> {
        let mut locators = vec![expected.locator.clone()];
        locators.extend(alternative.map(|alt| alt.locator.clone()));
        let condition = Condition::AnyVisible { locators };

        let observed = self.waiter.wait_for(driver, &condition, timeout).await?;
        match (observed.index, alternative) {
            (0, _) => {
                info!("Observed expected {}", expected);
                Ok(())
            }
            (_, Some(alt)) => Err(VerifyError::AssertionFailed(format!(
                "expected {} but observed {}",
                expected, alt
            ))),
            (index, None) => Err(VerifyError::AssertionFailed(format!(
                "unexpected marker index {} while waiting for {}",
                index, expected
            ))),
        }
    }
}

/// Mutable state of one scenario run
struct ScenarioRun {
    state: ScenarioState,
    outcome: Outcome,
    steps: Vec<StepRecord>,
}

impl ScenarioRun {
    fn new() -> Self {
        Self {
            state: ScenarioState::Init,
            outcome: Outcome::Pending,
            steps: Vec::new(),
        }
    }

    /// Await one step and append its record
    async fn record<F>(&mut self, description: String, step: F) -> VerifyResult<()>
    where
        F: std::future::Future<Output = VerifyResult<()>>,
    {
        let number = self.steps.len() + 1;
        debug!(step = number, state = %self.state, "{}", description);
        let started = Instant::now();
        let result = step.await;
        self.steps.push(StepRecord {
            step: number,
            description,
            state: self.state,
            duration_ms: started.elapsed().as_millis() as u64,
            error: result.as_ref().err().map(|e| e.to_string()),
        });
        result
    }

    fn advance(&mut self, scenario: &str, target: ScenarioState) {
        info!(scenario, from = %self.state, to = %target, "State transition");
        self.state = target;
    }

    /// Leave `Pending`. Later attempts are ignored.
    fn resolve(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_terminal() {
            warn!(current = ?self.outcome, ignored = ?outcome, "Outcome already resolved");
            return false;
        }
        self.outcome = outcome;
        true
    }
}
