//! Shared helpers built on top of `BrowserSession` primitives.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::traits::{BrowserSession, Selector};
use crate::error::FlowError;

/// Poll interval for element waits
pub const WAIT_POLL: Duration = Duration::from_millis(100);

/// Wait for an element to become visible
///
/// Query errors while waiting count as "not there yet".
pub async fn wait_visible(
    session: &dyn BrowserSession,
    selector: &Selector,
    timeout: Duration,
) -> Result<()> {
    let start = Instant::now();
    loop {
        if let Ok(true) = session.is_visible(selector).await {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(FlowError::timeout(selector.to_string(), timeout).into());
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}

/// Wait for an element to disappear
///
/// # Returns
/// True if the element went away, false on timeout
pub async fn wait_hidden(
    session: &dyn BrowserSession,
    selector: &Selector,
    timeout: Duration,
) -> bool {
    let start = Instant::now();
    loop {
        if let Ok(false) = session.is_visible(selector).await {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}

/// Click an element, falling back through pointer and script clicks
///
/// The element is scrolled into view first. Whichever strategy succeeds,
/// the caller just sees `Ok(())`.
pub async fn click_with_fallback(
    session: &dyn BrowserSession,
    selector: &Selector,
    name: &str,
) -> Result<()> {
    if let Err(e) = session.scroll_into_view(selector).await {
        debug!("scroll into view failed for {}: {}", name, e);
    }

    match session.click(selector).await {
        Ok(()) => {
            debug!("Clicked element normally: {}", name);
            return Ok(());
        }
        Err(e) => warn!("Normal click failed for {}: {}; trying pointer click", name, e),
    }

    match session.pointer_click(selector).await {
        Ok(()) => {
            debug!("Clicked element via pointer: {}", name);
            return Ok(());
        }
        Err(e) => warn!("Pointer click failed for {}: {}; trying script click", name, e),
    }

    match session.script_click(selector).await {
        Ok(()) => {
            debug!("Clicked element via script: {}", name);
            Ok(())
        }
        Err(e) => {
            debug_element_state(session, selector, name).await;
            Err(FlowError::ClickFailure {
                target: name.to_string(),
                last_error: e.to_string(),
            }
            .into())
        }
    }
}

/// Wait for an element to show up, then click it with fallbacks
pub async fn click_when_visible(
    session: &dyn BrowserSession,
    selector: &Selector,
    name: &str,
    timeout: Duration,
) -> Result<()> {
    wait_visible(session, selector, timeout).await?;
    click_with_fallback(session, selector, name).await
}

/// Wait for a form field, then replace its value
pub async fn fill_field(
    session: &dyn BrowserSession,
    selector: &Selector,
    value: &str,
    timeout: Duration,
) -> Result<()> {
    wait_visible(session, selector, timeout).await?;
    session.fill(selector, value).await
}

/// Best-effort cookie/storage cleanup before a flow starts
pub async fn prepare_clean_session(session: &dyn BrowserSession) {
    match session.clear_state().await {
        Ok(()) => debug!("Session cleaned before test"),
        Err(e) => warn!("Failed to clean session state: {}", e),
    }
}

/// Log what the element looked like when every click failed
pub async fn debug_element_state(session: &dyn BrowserSession, selector: &Selector, label: &str) {
    let visible = session.is_visible(selector).await.unwrap_or(false);
    match session.describe(selector).await {
        Ok(snippet) => debug!(
            "[DEBUG] {} - visible={}, outerHTML_snippet={}",
            label,
            visible,
            truncate(&snippet, 600)
        ),
        Err(e) => debug!("[DEBUG] {} - visible={}, describe failed: {}", label, visible, e),
    }
}

/// Turn a free-form name into something safe for a file name
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Save a screenshot as `<dir>/<name>.png`
///
/// Failures are logged, never raised: a missing screenshot must not change
/// a test outcome.
pub async fn save_screenshot(
    session: &dyn BrowserSession,
    dir: &Path,
    name: &str,
) -> Option<PathBuf> {
    let path = dir.join(format!("{}.png", safe_file_name(name)));
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Failed to create screenshot dir {}: {}", dir.display(), e);
        return None;
    }
    match session.take_screenshot(&path).await {
        Ok(()) => {
            info!("Saved screenshot: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Failed to save screenshot {}: {}", path.display(), e);
            None
        }
    }
}

/// Quote `text` for use inside an XPath expression
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{}\"", text)
    } else if !text.contains('\'') {
        format!("'{}'", text)
    } else {
        let parts: Vec<String> = text.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Cut `text` to at most `max` characters
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
