//! The upload workflow scenarios.
//!
//! - `authenticated_upload`: sign in, open the upload page, submit a document
//!   that is not a bank statement and expect the processing error
//! - `anonymous_upload`: the same submission through the home page's hidden
//!   upload input, without signing in
//! - `dealfuel_page`: the DealFuel landing page renders its offer

use crate::config::Config;
use crate::error::{VerifyError, VerifyResult};
use crate::locator::Locator;
use crate::scenario::types::{Scenario, ScenarioState, Step, TerminalMarker};

pub const AUTHENTICATED_UPLOAD: &str = "authenticated_upload";
pub const ANONYMOUS_UPLOAD: &str = "anonymous_upload";
pub const DEALFUEL_PAGE: &str = "dealfuel_page";

pub const EMAIL_INPUT_ID: &str = "email-signin";
pub const PASSWORD_INPUT_ID: &str = "password-signin";
pub const UPLOAD_INPUT_ID: &str = "pdf-upload";
pub const SIGN_IN_BUTTON: &str = "Sign In";
pub const PROCESSING_TEXT: &str = "Processing...";
pub const ERROR_MARKER_TEXT: &str = "Error processing file";
pub const SUCCESS_MARKER_TEXT: &str = "Statement processed successfully!";
pub const DEALFUEL_TITLE: &str = "DealFuel";
pub const DEALFUEL_HEADING: &str = "DealFuel Exclusive Lifetime Deal";
pub const DEALFUEL_BANNER: &str = "Exclusive DealFuel Lifetime Deal - Limited Time Offer";

/// Names of every scenario, in run order
pub fn names() -> [&'static str; 3] {
    [AUTHENTICATED_UPLOAD, ANONYMOUS_UPLOAD, DEALFUEL_PAGE]
}

/// Every scenario, in run order
pub fn all(config: &Config) -> VerifyResult<Vec<Scenario>> {
    names().iter().map(|name| by_name(config, name)).collect()
}

/// Look a scenario up by name
pub fn by_name(config: &Config, name: &str) -> VerifyResult<Scenario> {
    match name {
        AUTHENTICATED_UPLOAD => authenticated_upload(config),
        ANONYMOUS_UPLOAD => anonymous_upload(config),
        DEALFUEL_PAGE => dealfuel_page(config),
        other => Err(VerifyError::Scenario(format!(
            "unknown scenario {:?} (available: {})",
            other,
            names().join(", ")
        ))),
    }
}

/// Signed-in upload of an invalid document; the error marker is the pass condition
pub fn authenticated_upload(config: &Config) -> VerifyResult<Scenario> {
    let t = &config.timeouts;
    let upload = Locator::id(UPLOAD_INPUT_ID);

    Scenario::builder(AUTHENTICATED_UPLOAD)
        .description("Sign in, upload an invalid document and expect the processing error")
        .stage(
            ScenarioState::Navigated,
            vec![
                Step::navigate(config.url("/auth")),
                Step::wait_visible(Locator::id(EMAIL_INPUT_ID), t.page_ready),
            ],
        )
        .stage(
            ScenarioState::Authenticated,
            vec![
                Step::fill(Locator::id(EMAIL_INPUT_ID), &config.credentials.email),
                Step::fill_secret(Locator::id(PASSWORD_INPUT_ID), &config.credentials.password),
                Step::click(Locator::role("button", SIGN_IN_BUTTON)),
                Step::wait_url(config.url("/dashboard"), t.login_redirect),
            ],
        )
        .stage(
            ScenarioState::OnUploadPage,
            vec![
                Step::navigate(config.url("/dashboard/upload")),
                Step::wait_visible(upload.clone(), t.upload_control),
            ],
        )
        .stage(
            ScenarioState::Uploaded,
            vec![Step::upload(upload, config.target.sample_path.clone())],
        )
        .stage(
            ScenarioState::Processing,
            vec![Step::wait_visible(Locator::text(PROCESSING_TEXT), t.processing)],
        )
        .expect_marker(error_marker(), Some(success_marker()), t.terminal_marker)
        .build()
}

/// Upload through the home page without signing in.
///
/// The home page's file input is visually hidden, so only its presence is
/// required before attaching the document.
pub fn anonymous_upload(config: &Config) -> VerifyResult<Scenario> {
    let t = &config.timeouts;

    Scenario::builder(ANONYMOUS_UPLOAD)
        .description("Upload an invalid document from the home page and expect the processing error")
        .stage(
            ScenarioState::Navigated,
            vec![Step::navigate(config.url("/"))],
        )
        .stage(
            ScenarioState::Uploaded,
            vec![Step::upload(
                Locator::id(UPLOAD_INPUT_ID),
                config.target.sample_path.clone(),
            )],
        )
        .stage(
            ScenarioState::Processing,
            vec![Step::wait_visible(Locator::text(PROCESSING_TEXT), t.processing)],
        )
        .expect_marker(error_marker(), Some(success_marker()), t.terminal_marker)
        .build()
}

/// The DealFuel page shows its title, heading and offer banner
pub fn dealfuel_page(config: &Config) -> VerifyResult<Scenario> {
    let t = &config.timeouts;

    Scenario::builder(DEALFUEL_PAGE)
        .description("DealFuel landing page renders its lifetime deal")
        .stage(
            ScenarioState::Navigated,
            vec![
                Step::navigate(config.url("/dealfuel")),
                Step::wait_title(DEALFUEL_TITLE, t.page_content),
                Step::wait_visible(Locator::text(DEALFUEL_HEADING), t.page_content),
                Step::wait_visible(Locator::text(DEALFUEL_BANNER), t.page_content),
            ],
        )
        .build()
}

fn error_marker() -> TerminalMarker {
    TerminalMarker::error(Locator::text(ERROR_MARKER_TEXT))
}

fn success_marker() -> TerminalMarker {
    TerminalMarker::success(Locator::text(SUCCESS_MARKER_TEXT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::types::Terminal;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_every_name_builds() {
        let config = Config::defaults();
        let scenarios = all(&config).unwrap();
        let built: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(built, names().to_vec());
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = by_name(&Config::defaults(), "nope").unwrap_err();
        assert!(err.to_string().contains("authenticated_upload"));
    }

    #[test]
    fn test_authenticated_upload_walks_every_state() {
        let scenario = authenticated_upload(&Config::defaults()).unwrap();
        assert_eq!(
            scenario.states(),
            vec![
                ScenarioState::Init,
                ScenarioState::Navigated,
                ScenarioState::Authenticated,
                ScenarioState::OnUploadPage,
                ScenarioState::Uploaded,
                ScenarioState::Processing,
                ScenarioState::Resolved,
            ]
        );
        assert!(scenario
            .steps()
            .any(|s| *s == Step::wait_url("http://127.0.0.1:8080/dashboard", Duration::from_secs(30))));
        match &scenario.terminal {
            Terminal::Marker {
                expected, timeout, ..
            } => {
                assert_eq!(expected, &error_marker());
                assert_eq!(*timeout, Duration::from_secs(60));
            }
            Terminal::StagesComplete => panic!("expected a terminal marker"),
        }
    }

    #[test]
    fn test_anonymous_upload_skips_authentication() {
        let scenario = anonymous_upload(&Config::defaults()).unwrap();
        assert!(!scenario.states().contains(&ScenarioState::Authenticated));
        assert!(!scenario
            .steps()
            .any(|s| matches!(s, Step::WaitForVisible { locator, .. } if *locator == Locator::id(UPLOAD_INPUT_ID))));
    }

    #[test]
    fn test_credentials_come_from_config() {
        let config = Config::defaults().credentials("qa@example.com", "s3cret");
        let scenario = authenticated_upload(&config).unwrap();
        let rendered: Vec<String> = scenario.steps().map(|s| s.to_string()).collect();
        assert!(rendered.iter().any(|s| s.contains("qa@example.com")));
        assert!(!rendered.iter().any(|s| s.contains("s3cret")));
    }

    #[test]
    fn test_timeout_overrides_reach_the_scenario() {
        let mut config = Config::defaults();
        config.timeouts = config.timeouts.scaled(2.0).unwrap();
        config
            .timeouts
            .set_budget("processing", Duration::from_secs(45))
            .unwrap();

        let scenario = anonymous_upload(&config).unwrap();
        assert!(scenario.steps().any(|s| *s
            == Step::wait_visible(Locator::text(PROCESSING_TEXT), Duration::from_secs(45))));
        match &scenario.terminal {
            Terminal::Marker { timeout, .. } => assert_eq!(*timeout, Duration::from_secs(120)),
            Terminal::StagesComplete => panic!("expected a terminal marker"),
        }
    }

    #[test]
    fn test_dealfuel_completes_on_stages() {
        let scenario = dealfuel_page(&Config::defaults().base_url("http://localhost:5173")).unwrap();
        assert_eq!(scenario.terminal, Terminal::StagesComplete);
        assert_eq!(
            scenario.steps().next(),
            Some(&Step::navigate("http://localhost:5173/dealfuel"))
        );
    }
}
