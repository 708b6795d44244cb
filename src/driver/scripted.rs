//! In-memory page driver for exercising scenarios without a browser.
//!
//! A [`ScriptedPage`] holds a set of routes, each with a title and a list of
//! elements. Actions can schedule [`Effect`]s after a delay, which is how the
//! asynchronous behaviour of a real application (sign-in round trip, document
//! processing) is reproduced. Time is read from `tokio::time`, so tests can run
//! on a paused clock.

use async_trait::async_trait;
use image::{ImageBuffer, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use crate::driver::PageDriver;
use crate::error::{VerifyError, VerifyResult};
use crate::locator::{ElementState, Locator};

/// An element rendered on a scripted page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedElement {
    pub id: Option<String>,
    pub role: Option<String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub editable: bool,
    pub file_input: bool,
    pub value: String,
}

impl ScriptedElement {
    fn base(text: &str) -> Self {
        Self {
            id: None,
            role: None,
            text: text.to_string(),
            visible: true,
            enabled: true,
            editable: false,
            file_input: false,
            value: String::new(),
        }
    }

    /// Visible text block
    pub fn text(text: &str) -> Self {
        Self::base(text)
    }

    /// Editable text input with an id
    pub fn input(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            role: Some("textbox".to_string()),
            editable: true,
            ..Self::base("")
        }
    }

    /// File input with an id
    pub fn file_input(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            file_input: true,
            ..Self::base("")
        }
    }

    /// Button with an accessible name
    pub fn button(name: &str) -> Self {
        Self {
            role: Some("button".to_string()),
            ..Self::base(name)
        }
    }

    /// Give the element an explicit `role`, replacing its implicit one
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Id { id } => self.id.as_deref() == Some(id.as_str()),
            Locator::Role { role, name } => {
                self.role.as_deref() == Some(role.as_str())
                    && self.text.to_lowercase().contains(&name.to_lowercase())
            }
            Locator::Text { text } => {
                let needle = normalize_text(text);
                !needle.is_empty() && normalize_text(&self.text).contains(&needle)
            }
        }
    }
}

/// Collapse whitespace runs and lower-case, the way text locators compare
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Content served for one URL
#[derive(Debug, Clone)]
pub struct ScriptedRoute {
    pub title: String,
    pub status: Option<u16>,
    pub elements: Vec<ScriptedElement>,
}

impl ScriptedRoute {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            status: Some(200),
            elements: Vec::new(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// Page change applied when a scheduled reaction comes due
#[derive(Debug, Clone)]
pub enum Effect {
    /// Client-side navigation to another route
    Navigate(String),
    /// Render an additional element
    Show(ScriptedElement),
    /// Remove every element matching the locator
    Remove(Locator),
}

/// Action that schedules a reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Click(Locator),
    Upload(Locator),
    Goto(String),
}

/// Scripted stand-in for a browser page
pub struct ScriptedPage {
    routes: HashMap<String, ScriptedRoute>,
    reactions: Vec<(Trigger, Vec<(Duration, Effect)>)>,
    pending: Vec<(Instant, Effect)>,
    url: String,
    title: String,
    elements: Vec<ScriptedElement>,
    log: Vec<String>,
    clicked: Vec<ScriptedElement>,
    screenshots: usize,
    fail_screenshots: bool,
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            reactions: Vec::new(),
            pending: Vec::new(),
            url: "about:blank".to_string(),
            title: String::new(),
            elements: Vec::new(),
            log: Vec::new(),
            clicked: Vec::new(),
            screenshots: 0,
            fail_screenshots: false,
        }
    }

    /// Serve `route` at `url`
    pub fn route(mut self, url: &str, route: ScriptedRoute) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    /// Apply `effects` (each after its delay) whenever `trigger` happens
    pub fn on(mut self, trigger: Trigger, effects: Vec<(Duration, Effect)>) -> Self {
        self.reactions.push((trigger, effects));
        self
    }

    /// Make every screenshot attempt fail
    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// Actions performed so far, in order
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Elements hit by clicks so far, in order
    pub fn clicked(&self) -> &[ScriptedElement] {
        &self.clicked
    }

    /// Number of successful screenshots taken
    pub fn screenshot_count(&self) -> usize {
        self.screenshots
    }

    /// Current value of the first input matching `locator`
    pub fn value_of(&self, locator: &Locator) -> Option<&str> {
        self.elements
            .iter()
            .find(|el| el.matches(locator))
            .map(|el| el.value.as_str())
    }

    fn load(&mut self, url: &str) {
        self.url = url.to_string();
        match self.routes.get(url) {
            Some(route) => {
                self.title = route.title.clone();
                self.elements = route.elements.clone();
            }
            None => {
                self.title.clear();
                self.elements.clear();
            }
        }
    }

    fn schedule(&mut self, trigger: &Trigger) {
        let now = Instant::now();
        let due: Vec<(Instant, Effect)> = self
            .reactions
            .iter()
            .filter(|(t, _)| t == trigger)
            .flat_map(|(_, effects)| {
                effects
                    .iter()
                    .map(move |(delay, effect)| (now + *delay, effect.clone()))
            })
            .collect();
        self.pending.extend(due);
    }

    /// Apply every scheduled effect whose time has come, oldest first
    fn settle(&mut self) {
        let now = Instant::now();
        self.pending.sort_by_key(|(at, _)| *at);
        let split = self.pending.iter().take_while(|(at, _)| *at <= now).count();
        let due: Vec<Effect> = self.pending.drain(..split).map(|(_, e)| e).collect();
        for effect in due {
            match effect {
                Effect::Navigate(url) => self.load(&url),
                Effect::Show(element) => self.elements.push(element),
                Effect::Remove(locator) => self.elements.retain(|el| !el.matches(&locator)),
            }
        }
    }

    fn find(&mut self, locator: &Locator) -> VerifyResult<&mut ScriptedElement> {
        self.settle();
        let index = self
            .elements
            .iter()
            .position(|el| el.matches(locator) && el.visible)
            .or_else(|| self.elements.iter().position(|el| el.matches(locator)));
        match index {
            Some(i) => Ok(&mut self.elements[i]),
            None => Err(VerifyError::ElementNotFound {
                locator: locator.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&mut self, url: &str) -> VerifyResult<Option<u16>> {
        self.log.push(format!("goto {}", url));
        let status = match self.routes.get(url) {
            Some(route) => route.status,
            None => {
                return Err(VerifyError::NavigationError {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_REFUSED".to_string(),
                });
            }
        };
        self.pending.clear();
        self.load(url);
        self.schedule(&Trigger::Goto(url.to_string()));
        Ok(status)
    }

    async fn current_url(&mut self) -> VerifyResult<String> {
        self.settle();
        Ok(self.url.clone())
    }

    async fn title(&mut self) -> VerifyResult<String> {
        self.settle();
        Ok(self.title.clone())
    }

    async fn probe(&mut self, locator: &Locator) -> VerifyResult<ElementState> {
        self.settle();
        let matches: Vec<&ScriptedElement> =
            self.elements.iter().filter(|el| el.matches(locator)).collect();
        let best = matches.iter().find(|el| el.visible).or(matches.first());
        Ok(match best {
            Some(el) => ElementState {
                count: matches.len(),
                visible: el.visible,
                enabled: el.enabled,
                editable: el.editable,
                file_input: el.file_input,
            },
            None => ElementState::default(),
        })
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> VerifyResult<()> {
        self.log.push(format!("fill {}", locator));
        self.find(locator)?.value = value.to_string();
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> VerifyResult<()> {
        self.log.push(format!("click {}", locator));
        let element = self.find(locator)?.clone();
        self.clicked.push(element);
        self.schedule(&Trigger::Click(locator.clone()));
        Ok(())
    }

    async fn set_input_files(&mut self, locator: &Locator, path: &Path) -> VerifyResult<()> {
        self.log
            .push(format!("upload {} {}", locator, path.display()));
        self.find(locator)?.value = path.display().to_string();
        self.schedule(&Trigger::Upload(locator.clone()));
        Ok(())
    }

    async fn screenshot(&mut self) -> VerifyResult<Vec<u8>> {
        self.log.push("screenshot".to_string());
        if self.fail_screenshots {
            return Err(VerifyError::Browser("screenshot target closed".to_string()));
        }
        self.settle();

        // One row of pixels per element, grey when hidden
        let height = (self.elements.len() as u32 + 1) * 4;
        let mut img: RgbImage = ImageBuffer::from_pixel(64, height, image::Rgb([255, 255, 255]));
        for (row, element) in self.elements.iter().enumerate() {
            let shade = if element.visible { 0 } else { 160 };
            for x in 0..64 {
                img.put_pixel(x, (row as u32 + 1) * 4, image::Rgb([shade, shade, shade]));
            }
        }
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        self.screenshots += 1;
        Ok(bytes)
    }

    fn source_type(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> ScriptedPage {
        ScriptedPage::new()
            .route(
                "http://app/auth",
                ScriptedRoute::new("Sign in")
                    .element(ScriptedElement::input("email-signin"))
                    .element(ScriptedElement::button("Sign In")),
            )
            .route("http://app/dashboard", ScriptedRoute::new("Dashboard"))
            .on(
                Trigger::Click(Locator::role("button", "sign in")),
                vec![(
                    Duration::from_millis(500),
                    Effect::Navigate("http://app/dashboard".to_string()),
                )],
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_schedules_delayed_navigation() {
        let mut page = login_page();
        page.goto("http://app/auth").await.unwrap();
        page.click(&Locator::role("button", "sign in")).await.unwrap();

        assert_eq!(page.current_url().await.unwrap(), "http://app/auth");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(page.current_url().await.unwrap(), "http://app/dashboard");
        assert_eq!(page.title().await.unwrap(), "Dashboard");
    }

    #[tokio::test]
    async fn test_probe_prefers_visible_match() {
        let mut page = ScriptedPage::new().route(
            "http://app/",
            ScriptedRoute::new("Home")
                .element(ScriptedElement::text("Processing...").hidden())
                .element(ScriptedElement::text("Processing...")),
        );
        page.goto("http://app/").await.unwrap();

        let state = page.probe(&Locator::text("Processing")).await.unwrap();
        assert_eq!(state.count, 2);
        assert!(state.visible);

        let missing = page.probe(&Locator::id("nope")).await.unwrap();
        assert!(!missing.found());
    }

    #[tokio::test]
    async fn test_explicit_role_overrides_implicit_button() {
        let mut page = ScriptedPage::new().route(
            "http://app/auth",
            ScriptedRoute::new("Sign in")
                .element(ScriptedElement::button("Sign In").with_role("tab"))
                .element(ScriptedElement::button("Sign In")),
        );
        page.goto("http://app/auth").await.unwrap();

        let state = page.probe(&Locator::role("button", "Sign In")).await.unwrap();
        assert_eq!(state.count, 1);
        page.click(&Locator::role("button", "Sign In")).await.unwrap();
        assert_eq!(page.clicked()[0].role.as_deref(), Some("button"));
    }

    #[tokio::test]
    async fn test_text_match_ignores_case_and_spacing() {
        let mut page = ScriptedPage::new().route(
            "http://app/",
            ScriptedRoute::new("Home").element(ScriptedElement::text("Error  processing\nfile")),
        );
        page.goto("http://app/").await.unwrap();

        let state = page.probe(&Locator::text("error processing FILE")).await.unwrap();
        assert!(state.visible);
        let missing = page.probe(&Locator::text("   ")).await.unwrap();
        assert!(!missing.found());
    }

    #[tokio::test]
    async fn test_unknown_route_is_navigation_error() {
        let mut page = ScriptedPage::new();
        let err = page.goto("http://app/missing").await.unwrap_err();
        assert!(matches!(err, VerifyError::NavigationError { .. }));
    }

    #[tokio::test]
    async fn test_screenshot_is_png() {
        let mut page = login_page();
        page.goto("http://app/auth").await.unwrap();
        let png = page.screenshot().await.unwrap();
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
        assert_eq!(page.screenshot_count(), 1);
    }
}
