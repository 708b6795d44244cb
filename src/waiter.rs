//! Condition waiter.
//!
//! Polls the live page until a [`Condition`] holds or its deadline passes.
//! There is no unbounded wait: the polling loop checks the deadline after every
//! evaluation, and the whole loop also runs under `tokio::time::timeout` so a
//! probe that stalls inside the browser cannot overrun the budget.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};
use crate::locator::Locator;

/// A predicate over the current page state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// An element matching the locator exists and is rendered visible
    ElementVisible { locator: Locator },
    /// The page address equals `url` exactly
    UrlEquals { url: String },
    /// The document title contains `text`
    TitleContains { text: String },
    /// At least one of the locators is visible; the first one in list order wins
    AnyVisible { locators: Vec<Locator> },
}

/// A satisfied condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// For `AnyVisible`, the index of the locator that became visible; 0 otherwise
    pub index: usize,
    pub elapsed: Duration,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ElementVisible { locator } => write!(f, "{} visible", locator),
            Condition::UrlEquals { url } => write!(f, "URL == {}", url),
            Condition::TitleContains { text } => write!(f, "title containing {:?}", text),
            Condition::AnyVisible { locators } => {
                let names: Vec<String> = locators.iter().map(|l| l.to_string()).collect();
                write!(f, "any of [{}] visible", names.join(", "))
            }
        }
    }
}

/// Polls conditions at a fixed interval
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    poll_interval: Duration,
}

impl Waiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until `condition` holds, failing with `TimeoutExceeded` once
    /// `timeout` has elapsed. The condition is evaluated at least once.
    pub async fn wait_for<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        condition: &Condition,
        timeout: Duration,
    ) -> VerifyResult<Observation> {
        let started = Instant::now();
        let deadline = started + timeout;
        debug!(%condition, timeout_ms = timeout.as_millis() as u64, "Waiting");

        let poll = async {
            loop {
                if let Some(index) = evaluate(driver, condition).await? {
                    return Ok(Observation {
                        index,
                        elapsed: started.elapsed(),
                    });
                }
                let now = Instant::now();
                if now >= deadline {
                    return Err(timeout_error(condition, timeout));
                }
                tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            }
        };

        match tokio::time::timeout(timeout + self.poll_interval, poll).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error(condition, timeout)),
        }
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS))
    }
}

/// Evaluate once; `Some(index)` when the condition holds
async fn evaluate<D: PageDriver + ?Sized>(
    driver: &mut D,
    condition: &Condition,
) -> VerifyResult<Option<usize>> {
    match condition {
        Condition::ElementVisible { locator } => {
            Ok(driver.probe(locator).await?.visible.then_some(0))
        }
        Condition::UrlEquals { url } => Ok((driver.current_url().await? == *url).then_some(0)),
        Condition::TitleContains { text } => {
            Ok(driver.title().await?.contains(text.as_str()).then_some(0))
        }
        Condition::AnyVisible { locators } => {
            for (index, locator) in locators.iter().enumerate() {
                if driver.probe(locator).await?.visible {
                    return Ok(Some(index));
                }
            }
            Ok(None)
        }
    }
}

fn timeout_error(condition: &Condition, timeout: Duration) -> VerifyError {
    VerifyError::TimeoutExceeded {
        condition: condition.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}
