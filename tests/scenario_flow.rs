//! End-to-end scenario runs against a scripted application

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flow_verify::config::Config;
use flow_verify::scenario::catalog::{self, ERROR_MARKER_TEXT, PROCESSING_TEXT, SUCCESS_MARKER_TEXT};
use flow_verify::{
    Effect, EvidenceCapturer, Locator, Orchestrator, Outcome, ScenarioState, ScriptedElement,
    ScriptedPage, ScriptedRoute, SessionProvider, SuiteReport, Trigger, VerifyError, VerifyResult,
    run_suite,
};

const BASE: &str = "http://app";

fn sign_in_button() -> Locator {
    Locator::role("button", catalog::SIGN_IN_BUTTON)
}

fn upload_input() -> Locator {
    Locator::id(catalog::UPLOAD_INPUT_ID)
}

/// Routes shared by every scripted application
fn site() -> ScriptedPage {
    ScriptedPage::new()
        .route(
            "http://app/auth",
            ScriptedRoute::new("Sign in")
                // Tab strip above the form carries the same label
                .element(ScriptedElement::button(catalog::SIGN_IN_BUTTON).with_role("tab"))
                .element(ScriptedElement::button("Sign Up").with_role("tab"))
                .element(ScriptedElement::input(catalog::EMAIL_INPUT_ID))
                .element(ScriptedElement::input(catalog::PASSWORD_INPUT_ID))
                .element(ScriptedElement::button(catalog::SIGN_IN_BUTTON)),
        )
        .route("http://app/dashboard", ScriptedRoute::new("Dashboard"))
        .route(
            "http://app/dashboard/upload",
            ScriptedRoute::new("Upload").element(ScriptedElement::file_input(catalog::UPLOAD_INPUT_ID)),
        )
        .route(
            "http://app/",
            ScriptedRoute::new("Home")
                .element(ScriptedElement::text("Upload your bank statement"))
                .element(ScriptedElement::file_input(catalog::UPLOAD_INPUT_ID).hidden()),
        )
        .route(
            "http://app/dealfuel",
            ScriptedRoute::new("DealFuel Lifetime Deal")
                .element(ScriptedElement::text(catalog::DEALFUEL_HEADING))
                .element(ScriptedElement::text(catalog::DEALFUEL_BANNER)),
        )
}

/// Application that signs in and rejects the uploaded document
fn rejecting_app() -> ScriptedPage {
    site()
        .on(
            Trigger::Click(sign_in_button()),
            vec![(
                Duration::from_millis(800),
                Effect::Navigate("http://app/dashboard".to_string()),
            )],
        )
        .on(
            Trigger::Upload(upload_input()),
            vec![
                (
                    Duration::from_millis(200),
                    Effect::Show(ScriptedElement::text(PROCESSING_TEXT)),
                ),
                (
                    Duration::from_secs(3),
                    Effect::Remove(Locator::text(PROCESSING_TEXT)),
                ),
                (
                    Duration::from_secs(3),
                    Effect::Show(ScriptedElement::text(ERROR_MARKER_TEXT)),
                ),
            ],
        )
}

/// Application that wrongly accepts the document
fn accepting_app() -> ScriptedPage {
    site()
        .on(
            Trigger::Click(sign_in_button()),
            vec![(
                Duration::from_millis(800),
                Effect::Navigate("http://app/dashboard".to_string()),
            )],
        )
        .on(
            Trigger::Upload(upload_input()),
            vec![
                (
                    Duration::from_millis(200),
                    Effect::Show(ScriptedElement::text(PROCESSING_TEXT)),
                ),
                (
                    Duration::from_secs(2),
                    Effect::Show(ScriptedElement::text(SUCCESS_MARKER_TEXT)),
                ),
            ],
        )
}

struct Fixture {
    _dir: tempfile::TempDir,
    artifacts: PathBuf,
    sample: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sample = dir.path().join("statement.pdf");
        fs::write(&sample, b"%PDF-1.4 not a bank statement").unwrap();
        Self {
            artifacts: dir.path().join("verification"),
            sample,
            _dir: dir,
        }
    }

    fn config(&self) -> Config {
        Config::defaults()
            .base_url(BASE)
            .sample_path(&self.sample)
            .artifact_dir(&self.artifacts)
    }

    fn png_count(&self) -> usize {
        fs::read_dir(&self.artifacts)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                    .count()
            })
            .unwrap_or(0)
    }
}

fn failure_kind(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Failure { kind, .. } => kind,
        other => panic!("expected a failure, got {:?}", other),
    }
}

/// Opens a fresh scripted page per scenario and keeps each closed page's log
struct ScriptedProvider {
    build: fn() -> ScriptedPage,
    opened: usize,
    closed: Vec<Vec<String>>,
}

impl ScriptedProvider {
    fn new(build: fn() -> ScriptedPage) -> Self {
        Self {
            build,
            opened: 0,
            closed: Vec::new(),
        }
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    type Session = ScriptedPage;

    async fn open(&mut self) -> VerifyResult<ScriptedPage> {
        self.opened += 1;
        Ok((self.build)())
    }

    async fn close(&mut self, session: ScriptedPage) {
        self.closed.push(session.log().to_vec());
    }
}

#[tokio::test(start_paused = true)]
async fn test_authenticated_upload_observes_processing_error() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = rejecting_app();

    let scenario = catalog::authenticated_upload(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.reached, ScenarioState::Processing);
    assert!(report.steps.iter().all(|s| s.error.is_none()));
    assert_eq!(page.screenshot_count(), 1);
    assert_eq!(fixture.png_count(), 1);

    let evidence = report.evidence.as_ref().unwrap();
    assert_eq!(
        evidence.image_path,
        fixture.artifacts.join("authenticated_upload_verification.png")
    );
    assert_eq!(evidence.url, "http://app/dashboard/upload");
    assert!(evidence.passed);

    assert!(page.log().contains(&"fill #email-signin".to_string()));
    assert!(page.log().contains(&"click role=button[name=\"Sign In\"]".to_string()));
    let clicked = page.clicked();
    assert_eq!(clicked.len(), 1);
    assert_eq!(clicked[0].role.as_deref(), Some("button"));
    assert_eq!(clicked[0].text, catalog::SIGN_IN_BUTTON);
    let canonical = fs::canonicalize(&fixture.sample).unwrap();
    assert!(
        page.log()
            .contains(&format!("upload #pdf-upload {}", canonical.display()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_wrong_terminal_marker_fails_with_error_evidence() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = accepting_app();

    let scenario = catalog::authenticated_upload(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(failure_kind(&report.outcome), "assertion_failed");
    assert!(fixture.artifacts.join("authenticated_upload_error.png").exists());
    assert_eq!(fixture.png_count(), 1);
    assert_eq!(page.screenshot_count(), 1);

    let manifest = fs::read_to_string(fixture.artifacts.join("authenticated_upload_error.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["passed"], serde_json::json!(false));
    assert!(manifest["reason"]
        .as_str()
        .unwrap()
        .contains(SUCCESS_MARKER_TEXT));

    match report.into_result() {
        Err(VerifyError::ScenarioFailed { name, reason }) => {
            assert_eq!(name, "authenticated_upload");
            assert!(reason.starts_with("assertion failed"));
        }
        other => panic!("expected ScenarioFailed, got {:?}", other.map(|r| r.outcome)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_redirect_times_out_after_login_budget() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    // Sign-in is never acknowledged
    let mut page = site();

    let scenario = catalog::authenticated_upload(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(failure_kind(&report.outcome), "timeout_exceeded");
    assert_eq!(report.reached, ScenarioState::Navigated);
    assert!(report.duration_ms >= 30_000);
    assert!(report.duration_ms <= 30_000 + 2 * config.timeouts.poll_interval.as_millis() as u64);

    let last = report.steps.last().unwrap();
    assert!(last.description.contains("http://app/dashboard"));
    assert!(last.error.as_ref().unwrap().contains("30000 ms"));
    assert!(!page.log().iter().any(|entry| entry.starts_with("goto http://app/dashboard")));
    assert!(fixture.artifacts.join("authenticated_upload_error.png").exists());
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_upload_uses_hidden_input() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = rejecting_app();

    let scenario = catalog::anonymous_upload(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(report.outcome, Outcome::Success);
    assert!(!page.log().iter().any(|entry| entry.starts_with("fill")));
    assert!(fixture.artifacts.join("anonymous_upload_verification.png").exists());
}

#[tokio::test(start_paused = true)]
async fn test_missing_sample_fails_before_upload() {
    let fixture = Fixture::new();
    let config = fixture.config().sample_path(Path::new("does/not/exist.pdf"));
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = rejecting_app();

    let scenario = catalog::anonymous_upload(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(failure_kind(&report.outcome), "file_not_found");
    assert_eq!(report.reached, ScenarioState::Navigated);
    assert_eq!(page.log(), &["goto http://app/", "screenshot"]);
    assert!(fixture.artifacts.join("anonymous_upload_error.png").exists());
}

#[tokio::test(start_paused = true)]
async fn test_dealfuel_page_renders_offer() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = site();

    let scenario = catalog::dealfuel_page(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.steps.len(), 4);
    let evidence = report.evidence.unwrap();
    assert_eq!(evidence.title, "DealFuel Lifetime Deal");
    assert!(evidence.image_path.ends_with("dealfuel_page_verification.png"));
}

#[tokio::test(start_paused = true)]
async fn test_dealfuel_missing_banner_times_out() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut page = ScriptedPage::new().route(
        "http://app/dealfuel",
        ScriptedRoute::new("DealFuel").element(ScriptedElement::text(catalog::DEALFUEL_HEADING)),
    );

    let scenario = catalog::dealfuel_page(&config).unwrap();
    let report = orchestrator.run(&mut page, &scenario).await;

    assert_eq!(failure_kind(&report.outcome), "timeout_exceeded");
    assert_eq!(report.steps.len(), 4);
    assert!(report.steps[3].error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_suite_closes_every_session_and_never_leaves_pending() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut provider = ScriptedProvider::new(rejecting_app);

    let scenarios = catalog::all(&config).unwrap();
    let suite = run_suite(&mut provider, &orchestrator, &scenarios)
        .await
        .unwrap();

    assert_eq!(suite.total, 3);
    assert!(suite.success());
    assert_eq!(provider.opened, 3);
    assert_eq!(provider.closed.len(), 3);
    for log in &provider.closed {
        assert_eq!(log.iter().filter(|entry| *entry == "screenshot").count(), 1);
        assert_eq!(log.last().map(String::as_str), Some("screenshot"));
    }
    assert!(suite.scenarios.iter().all(|r| r.outcome.is_terminal()));
    assert_eq!(fixture.png_count(), 3);

    let report_path = fixture.artifacts.join("report.json");
    suite.write_json(&report_path).unwrap();
    let parsed: SuiteReport = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(parsed.passed, 3);
    assert_eq!(parsed.scenarios[0].outcome, Outcome::Success);
}

#[tokio::test(start_paused = true)]
async fn test_suite_records_failures_and_keeps_going() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let mut provider = ScriptedProvider::new(accepting_app);

    let scenarios = catalog::all(&config).unwrap();
    let suite = run_suite(&mut provider, &orchestrator, &scenarios)
        .await
        .unwrap();

    assert!(!suite.success());
    assert_eq!(suite.failed, 2);
    assert_eq!(suite.passed, 1);
    assert_eq!(provider.closed.len(), 3);
    assert!(suite.scenarios[2].outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_rerun_with_other_outcome_leaves_single_screenshot() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let capturer = EvidenceCapturer::new(&config.artifacts.dir);
    let orchestrator = Orchestrator::from_config(&config, &capturer);
    let scenario = catalog::authenticated_upload(&config).unwrap();

    let passed = orchestrator.run(&mut rejecting_app(), &scenario).await;
    assert!(passed.outcome.is_success());
    let failed = orchestrator.run(&mut accepting_app(), &scenario).await;
    assert_eq!(failure_kind(&failed.outcome), "assertion_failed");

    assert_eq!(fixture.png_count(), 1);
    assert!(fixture.artifacts.join("authenticated_upload_error.png").exists());
    assert!(!fixture.artifacts.join("authenticated_upload_verification.png").exists());
    assert!(!fixture.artifacts.join("authenticated_upload_verification.json").exists());
}
