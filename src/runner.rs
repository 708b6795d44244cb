//! Types for verification run results, and the suite loop.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::{VerifyError, VerifyResult};
use crate::evidence::EvidenceRecord;
use crate::scenario::{Orchestrator, Outcome, Scenario, ScenarioState};
use crate::session::SessionProvider;

/// Result of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step number, starting at 1
    pub step: usize,

    /// Human-readable description (secrets masked)
    pub description: String,

    /// State the scenario was in when the step ran
    pub state: ScenarioState,

    pub duration_ms: u64,

    /// Error message if the step failed
    pub error: Option<String>,
}

/// Result of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,

    pub description: String,

    /// Terminal verdict; never `Pending` once the orchestrator returns
    pub outcome: Outcome,

    /// Last state reached before the verdict
    pub reached: ScenarioState,

    /// Executed steps; steps after a failure are not run and not listed
    pub steps: Vec<StepRecord>,

    pub duration_ms: u64,

    /// The run's screenshot, absent only if capturing it failed
    pub evidence: Option<EvidenceRecord>,
}

impl ScenarioReport {
    /// Hand the report back on success, or turn the failure into an error
    pub fn into_result(self) -> VerifyResult<Self> {
        match &self.outcome {
            Outcome::Success => Ok(self),
            Outcome::Failure { reason, .. } => Err(VerifyError::ScenarioFailed {
                name: self.name.clone(),
                reason: reason.clone(),
            }),
            Outcome::Pending => Err(VerifyError::ScenarioFailed {
                name: self.name.clone(),
                reason: "scenario left pending".to_string(),
            }),
        }
    }
}

/// Result of running several scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> VerifyResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Results written to: {}", path.display());
        Ok(())
    }
}

/// Run `scenarios` one after another, each in a fresh session from `provider`.
///
/// Scenario failures are recorded in the report; only a session that cannot
/// be opened aborts the suite.
pub async fn run_suite<P: SessionProvider>(
    provider: &mut P,
    orchestrator: &Orchestrator<'_>,
    scenarios: &[Scenario],
) -> VerifyResult<SuiteReport> {
    let started = Instant::now();
    let mut reports = Vec::with_capacity(scenarios.len());

    info!("Running {} scenario(s)...", scenarios.len());

    for scenario in scenarios {
        let mut session = provider.open().await?;
        let report = orchestrator.run(&mut session, scenario).await;
        provider.close(session).await;

        match &report.outcome {
            Outcome::Success => info!("✓ {} ({} ms)", report.name, report.duration_ms),
            Outcome::Failure { reason, .. } => error!("✗ {} - {}", report.name, reason),
            Outcome::Pending => error!("✗ {} - left pending", report.name),
        }
        reports.push(report);
    }

    let passed = reports.iter().filter(|r| r.outcome.is_success()).count();
    let suite = SuiteReport {
        total: reports.len(),
        passed,
        failed: reports.len() - passed,
        duration_ms: started.elapsed().as_millis() as u64,
        scenarios: reports,
    };
    info!(
        "Results: {} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
    Ok(suite)
}
