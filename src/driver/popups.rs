//! Outcome signal detection
//!
//! After a user action the storefront answers with one of several kinds of
//! popup: a native browser alert, a styled overlay alert, a modal dialog or
//! an inline toast/banner. `detect_popups` polls the page for all of them and
//! reports the first one it sees, always preferring them in that order.
//! Native alerts come first because an open alert blocks every other query.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use super::common::{debug_element_state, truncate};
use super::traits::{BrowserSession, ElementRef, Selector};

/// Class marker of the styled alert widget
pub const OVERLAY_ALERT_CLASS: &str = "sweet-alert";

/// Catch-all selector for an open modal dialog
pub const GENERIC_MODAL_SELECTOR: &str = ".modal.show";

/// Inline alert/toast selectors, checked after any caller-supplied ones
pub const DEFAULT_INLINE_SELECTORS: [&str; 5] = [
    "div.alert",
    "div[role='alert']",
    ".toast",
    ".notify",
    ".notification",
];

/// Modal ids the storefront uses for its forms
pub const DEFAULT_MODAL_IDS: [&str; 4] = ["logInModal", "signInModal", "orderModal", "exampleModal"];

/// Kind of UI signal observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupKind {
    NativeAlert,
    OverlayAlert,
    Modal,
    InlineBanner,
    None,
}

impl PopupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PopupKind::NativeAlert => "native_alert",
            PopupKind::OverlayAlert => "overlay_alert",
            PopupKind::Modal => "modal",
            PopupKind::InlineBanner => "inline_banner",
            PopupKind::None => "none",
        }
    }
}

impl fmt::Display for PopupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupResult {
    pub kind: PopupKind,
    /// Trimmed text of the signal, empty for `None`
    pub text: String,
    /// Element the signal came from; native alerts have none
    pub element: Option<ElementRef>,
}

impl PopupResult {
    pub fn none() -> Self {
        Self {
            kind: PopupKind::None,
            text: String::new(),
            element: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == PopupKind::None
    }

    /// `"<kind>: <text>"`, the form flows put in result details
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind, self.text)
    }
}

/// Detection parameters
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Modal element ids to check, in order
    pub modal_ids: Vec<String>,
    /// Also accept any visible `.modal.show`
    pub modal_fallback: bool,
    /// Site-specific inline selectors, checked before the defaults
    pub extra_inline_selectors: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            poll_interval: Duration::from_millis(250),
            modal_ids: DEFAULT_MODAL_IDS.iter().map(|s| s.to_string()).collect(),
            modal_fallback: true,
            extra_inline_selectors: Vec::new(),
        }
    }
}

impl DetectorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_modal_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modal_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Skip the modal check entirely
    ///
    /// For flows whose own form modal stays open after submit.
    pub fn without_modals(mut self) -> Self {
        self.modal_ids.clear();
        self.modal_fallback = false;
        self
    }

    pub fn with_inline_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_inline_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    fn inline_selectors(&self) -> Vec<Selector> {
        self.extra_inline_selectors
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_INLINE_SELECTORS)
            .map(Selector::css)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Check {
    NativeAlert,
    OverlayAlert,
    Modal,
    InlineBanner,
}

/// Fixed evaluation order, first match wins
const PRECEDENCE: [Check; 4] = [
    Check::NativeAlert,
    Check::OverlayAlert,
    Check::Modal,
    Check::InlineBanner,
];

/// Poll until a popup shows up or `config.timeout` runs out
///
/// Always returns exactly one result; `PopupKind::None` means nothing was
/// observed before the deadline.
pub async fn detect_popups(session: &dyn BrowserSession, config: &DetectorConfig) -> PopupResult {
    let start = Instant::now();
    loop {
        if let Some(found) = detect_once(session, config).await {
            if let Some(element) = &found.element {
                if log::log_enabled!(log::Level::Debug) {
                    debug_element_state(session, &element.locator(), found.kind.as_str()).await;
                }
            }
            return found;
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            break;
        }
        let remaining = config.timeout - elapsed;
        tokio::time::sleep(config.poll_interval.min(remaining)).await;
    }

    debug!("detect_popups: no popup detected within {:?}", config.timeout);
    PopupResult::none()
}

/// Run every check once, in precedence order
pub async fn detect_once(
    session: &dyn BrowserSession,
    config: &DetectorConfig,
) -> Option<PopupResult> {
    for check in PRECEDENCE {
        let found = match check {
            Check::NativeAlert => check_native_alert(session).await,
            Check::OverlayAlert => {
                first_visible(
                    session,
                    &Selector::class(OVERLAY_ALERT_CLASS),
                    PopupKind::OverlayAlert,
                    false,
                )
                .await
            }
            Check::Modal => check_modals(session, config).await,
            Check::InlineBanner => check_inline(session, config).await,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Poll for a native alert only, accepting it when found
///
/// # Returns
/// The alert text, or None on timeout
pub async fn wait_for_native_alert(
    session: &dyn BrowserSession,
    timeout: Duration,
    poll_interval: Duration,
) -> Option<String> {
    let start = Instant::now();
    loop {
        if let Some(found) = check_native_alert(session).await {
            return Some(found.text);
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return None;
        }
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

async fn check_native_alert(session: &dyn BrowserSession) -> Option<PopupResult> {
    let text = match session.native_alert_text().await {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            debug!("detect_popups: alert check failed: {}", e);
            return None;
        }
    };

    match session.accept_native_alert().await {
        Ok(()) => debug!("detect_popups: native alert detected and accepted: {}", text),
        Err(e) => warn!("detect_popups: failed to accept alert: {}", e),
    }

    Some(PopupResult {
        kind: PopupKind::NativeAlert,
        text: text.trim().to_string(),
        element: None,
    })
}

async fn check_modals(session: &dyn BrowserSession, config: &DetectorConfig) -> Option<PopupResult> {
    for id in &config.modal_ids {
        if let Some(found) = first_visible(session, &Selector::id(id), PopupKind::Modal, false).await
        {
            return Some(found);
        }
    }

    if config.modal_fallback {
        return first_visible(
            session,
            &Selector::css(GENERIC_MODAL_SELECTOR),
            PopupKind::Modal,
            false,
        )
        .await;
    }
    None
}

async fn check_inline(session: &dyn BrowserSession, config: &DetectorConfig) -> Option<PopupResult> {
    for selector in config.inline_selectors() {
        if let Some(found) = first_visible(session, &selector, PopupKind::InlineBanner, true).await {
            return Some(found);
        }
    }
    None
}

/// First visible match of `selector`, optionally requiring non-empty text
async fn first_visible(
    session: &dyn BrowserSession,
    selector: &Selector,
    kind: PopupKind,
    require_text: bool,
) -> Option<PopupResult> {
    let elements = match session.query(selector).await {
        Ok(elements) => elements,
        Err(e) => {
            debug!("detect_popups: query {} failed: {}", selector, e);
            return None;
        }
    };

    elements
        .into_iter()
        .enumerate()
        .filter(|(_, el)| el.visible)
        .map(|(index, el)| (index, el.text.trim().to_string()))
        .find(|(_, text)| !require_text || !text.is_empty())
        .map(|(index, text)| {
            debug!(
                "detect_popups: {} via {} => {}",
                kind,
                selector,
                truncate(&text, 200)
            );
            PopupResult {
                kind,
                text,
                element: Some(ElementRef::new(selector.clone(), index)),
            }
        })
}
