//! Element addressing.
//!
//! A [`Locator`] is one of three explicit addressing modes. Every mode compiles
//! to a single DOM expression returning the array of matching elements, so the
//! driver resolves all of them the same way and always against the live page.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute used to hand a resolved element from the page back to the driver.
pub const HANDLE_ATTRIBUTE: &str = "data-flow-verify-handle";

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Stable `id` attribute
    Id { id: String },

    /// ARIA role plus accessible name (substring, case-insensitive).
    /// An explicit `role` attribute overrides the element's implicit role.
    Role { role: String, name: String },

    /// Innermost elements whose text content contains the given substring
    /// (case-insensitive, whitespace collapsed)
    Text { text: String },
}

/// Snapshot of the best match for a locator.
///
/// The best match is the first visible match, or the first match when none is
/// visible. All flags are false when `count` is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub count: usize,
    pub visible: bool,
    pub enabled: bool,
    pub editable: bool,
    pub file_input: bool,
}

impl ElementState {
    pub fn found(&self) -> bool {
        self.count > 0
    }
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id { id: id.into() }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// DOM expression evaluating to an array of matching elements.
    pub fn to_query(&self) -> String {
        match self {
            Self::Id { id } => format!(
                "(() => {{ const el = document.getElementById({}); return el ? [el] : []; }})()",
                js_string(id)
            ),
            Self::Text { text } => format!(
                "(() => {{ \
                    const norm = s => (s || '').replace(/\\s+/g, ' ').trim().toLowerCase(); \
                    const needle = norm({needle}); \
                    const hits = Array.from(document.querySelectorAll('body *')) \
                        .filter(el => !['SCRIPT', 'STYLE', 'NOSCRIPT'].includes(el.tagName)) \
                        .filter(el => norm(el.textContent).includes(needle)); \
                    return hits.filter(el => !Array.from(el.children).some(c => norm(c.textContent).includes(needle))); \
                }})()",
                needle = js_string(text)
            ),
            Self::Role { role, name } => format!(
                "(() => {{ \
                    const role = {role}; \
                    const name = {name}.toLowerCase(); \
                    const implicit = {{ \
                        button: 'button, input[type=button], input[type=submit], input[type=reset]', \
                        link: 'a[href]', \
                        heading: 'h1, h2, h3, h4, h5, h6', \
                        textbox: 'input:not([type]), input[type=text], input[type=email], input[type=password], textarea', \
                        checkbox: 'input[type=checkbox]' \
                    }}; \
                    const selector = '[role=\"' + role + '\"]' + (implicit[role] ? ', ' + implicit[role] : ''); \
                    const accessibleName = el => (el.getAttribute('aria-label') || el.textContent || el.value || '') \
                        .replace(/\\s+/g, ' ').trim().toLowerCase(); \
                    const explicitRole = el => (el.getAttribute('role') || '').trim().split(/\\s+/)[0]; \
                    return Array.from(document.querySelectorAll(selector)) \
                        .filter(el => !el.hasAttribute('role') || explicitRole(el) === role) \
                        .filter(el => accessibleName(el).includes(name)); \
                }})()",
                role = js_string(role),
                name = js_string(name)
            ),
        }
    }

    /// DOM expression evaluating to an [`ElementState`] object.
    pub fn probe_script(&self) -> String {
        format!(
            "(() => {{ \
                const matches = {query}; \
                {helpers} \
                const best = matches.find(isVisible) || matches[0]; \
                if (!best) return {{ count: 0, visible: false, enabled: false, editable: false, file_input: false }}; \
                return {{ \
                    count: matches.length, \
                    visible: isVisible(best), \
                    enabled: !best.disabled && best.getAttribute('aria-disabled') !== 'true', \
                    editable: isEditable(best), \
                    file_input: best.tagName === 'INPUT' && best.type === 'file' \
                }}; \
            }})()",
            query = self.to_query(),
            helpers = ELEMENT_HELPERS
        )
    }

    /// DOM expression that tags the best match with [`HANDLE_ATTRIBUTE`] set to
    /// `token` and evaluates to whether anything was tagged.
    pub fn mark_script(&self, token: &str) -> String {
        format!(
            "(() => {{ \
                const matches = {query}; \
                {helpers} \
                const best = matches.find(isVisible) || matches[0]; \
                if (!best) return false; \
                best.setAttribute({attr}, {token}); \
                return true; \
            }})()",
            query = self.to_query(),
            helpers = ELEMENT_HELPERS,
            attr = js_string(HANDLE_ATTRIBUTE),
            token = js_string(token)
        )
    }

    /// CSS selector for an element previously tagged by [`Locator::mark_script`].
    pub fn handle_selector(token: &str) -> String {
        format!("[{}=\"{}\"]", HANDLE_ATTRIBUTE, token)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { id } => write!(f, "#{}", id),
            Self::Role { role, name } => write!(f, "role={}[name={:?}]", role, name),
            Self::Text { text } => write!(f, "text={:?}", text),
        }
    }
}

const ELEMENT_HELPERS: &str = "\
    const isVisible = el => { \
        const rect = el.getBoundingClientRect(); \
        const style = window.getComputedStyle(el); \
        return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; \
    }; \
    const isEditable = el => { \
        if (el.isContentEditable) return true; \
        if (el.tagName === 'TEXTAREA') return !el.readOnly; \
        if (el.tagName !== 'INPUT') return false; \
        return !el.readOnly && !['file', 'checkbox', 'radio', 'submit', 'button', 'reset', 'image', 'hidden'].includes(el.type); \
    };";

/// Quote a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::String(value.to_string()).to_string()
}
