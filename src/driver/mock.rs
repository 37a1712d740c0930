//! Scripted in-memory browser session used by unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::traits::{BrowserSession, ElementInfo, SessionFactory, Selector};

/// Which interaction strategy a click used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickKind {
    Direct,
    Pointer,
    Script,
}

/// Page change triggered by navigation or a successful click
#[derive(Debug, Clone)]
pub enum Reaction {
    Show(Selector, String),
    Hide(Selector),
    Alert(String),
}

#[derive(Default)]
struct MockState {
    elements: HashMap<Selector, Vec<ElementInfo>>,
    alerts: VecDeque<String>,
    accept_fails: bool,
    failing_clicks: HashMap<Selector, HashSet<ClickKind>>,
    click_scripts: HashMap<Selector, VecDeque<Vec<Reaction>>>,
    navigate_script: Vec<Reaction>,
    fills: Vec<(Selector, String)>,
    clicks: Vec<(Selector, ClickKind)>,
    screenshots: Vec<String>,
    navigations: Vec<String>,
    closed: bool,
}

/// Clones share the same page state
#[derive(Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    /// Make a single visible element matching `selector`
    pub fn show(&self, selector: Selector, text: &str) -> &Self {
        self.with(|s| apply(s, &Reaction::Show(selector, text.to_string())));
        self
    }

    /// Register an element that exists but is hidden
    pub fn hidden(&self, selector: Selector) -> &Self {
        self.with(|s| {
            s.elements.insert(
                selector,
                vec![ElementInfo {
                    visible: false,
                    text: String::new(),
                }],
            )
        });
        self
    }

    pub fn set_elements(&self, selector: Selector, elements: Vec<ElementInfo>) -> &Self {
        self.with(|s| s.elements.insert(selector, elements));
        self
    }

    pub fn push_alert(&self, text: &str) -> &Self {
        self.with(|s| s.alerts.push_back(text.to_string()));
        self
    }

    pub fn fail_accept(&self) -> &Self {
        self.with(|s| s.accept_fails = true);
        self
    }

    pub fn fail_click(&self, selector: Selector, kinds: &[ClickKind]) -> &Self {
        self.with(|s| {
            s.failing_clicks
                .entry(selector)
                .or_default()
                .extend(kinds.iter().copied())
        });
        self
    }

    /// Reactions applied on every successful click of `selector`
    pub fn on_click(&self, selector: Selector, reactions: Vec<Reaction>) -> &Self {
        self.on_click_sequence(selector, vec![reactions])
    }

    /// One reaction set per click; the last set repeats
    pub fn on_click_sequence(&self, selector: Selector, sequence: Vec<Vec<Reaction>>) -> &Self {
        self.with(|s| s.click_scripts.insert(selector, sequence.into()));
        self
    }

    pub fn on_navigate(&self, reactions: Vec<Reaction>) -> &Self {
        self.with(|s| s.navigate_script = reactions);
        self
    }

    pub fn clicks(&self) -> Vec<(Selector, ClickKind)> {
        self.with(|s| s.clicks.clone())
    }

    pub fn fills(&self) -> Vec<(Selector, String)> {
        self.with(|s| s.fills.clone())
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.with(|s| s.screenshots.clone())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.with(|s| s.navigations.clone())
    }

    pub fn pending_alerts(&self) -> usize {
        self.with(|s| s.alerts.len())
    }

    pub fn is_closed(&self) -> bool {
        self.with(|s| s.closed)
    }

    fn do_click(&self, selector: &Selector, kind: ClickKind) -> Result<()> {
        self.with(|s| {
            let target = base_selector(selector);
            if s
                .failing_clicks
                .get(target)
                .map_or(false, |kinds| kinds.contains(&kind))
            {
                anyhow::bail!("{:?} click intercepted on {}", kind, selector);
            }
            if !lookup(s, selector).iter().any(|e| e.visible) {
                anyhow::bail!("element not visible: {}", selector);
            }
            s.clicks.push((target.clone(), kind));
            let reactions = match s.click_scripts.get_mut(target) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                Some(queue) => queue.front().cloned().unwrap_or_default(),
                None => Vec::new(),
            };
            for reaction in &reactions {
                apply(s, reaction);
            }
            Ok(())
        })
    }
}

fn base_selector(selector: &Selector) -> &Selector {
    match selector {
        Selector::Nth(inner, _) => inner,
        other => other,
    }
}

fn lookup(state: &MockState, selector: &Selector) -> Vec<ElementInfo> {
    match selector {
        Selector::Nth(inner, index) => state
            .elements
            .get(inner.as_ref())
            .and_then(|els| els.get(*index))
            .cloned()
            .into_iter()
            .collect(),
        other => state.elements.get(other).cloned().unwrap_or_default(),
    }
}

fn apply(state: &mut MockState, reaction: &Reaction) {
    match reaction {
        Reaction::Show(selector, text) => {
            state.elements.insert(
                selector.clone(),
                vec![ElementInfo {
                    visible: true,
                    text: text.clone(),
                }],
            );
        }
        Reaction::Hide(selector) => {
            state.elements.remove(selector);
        }
        Reaction::Alert(text) => state.alerts.push_back(text.clone()),
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    fn session_name(&self) -> &str {
        "mock"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.with(|s| {
            s.navigations.push(url.to_string());
            for reaction in s.navigate_script.clone() {
                apply(s, &reaction);
            }
        });
        Ok(())
    }

    async fn clear_state(&self) -> Result<()> {
        Ok(())
    }

    async fn native_alert_text(&self) -> Result<Option<String>> {
        Ok(self.with(|s| s.alerts.front().cloned()))
    }

    async fn accept_native_alert(&self) -> Result<()> {
        self.with(|s| {
            if s.accept_fails {
                anyhow::bail!("alert could not be accepted");
            }
            s.alerts
                .pop_front()
                .map(|_| ())
                .ok_or_else(|| anyhow::anyhow!("no alert open"))
        })
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementInfo>> {
        Ok(self.with(|s| lookup(s, selector)))
    }

    async fn scroll_into_view(&self, _selector: &Selector) -> Result<()> {
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<()> {
        self.do_click(selector, ClickKind::Direct)
    }

    async fn pointer_click(&self, selector: &Selector) -> Result<()> {
        self.do_click(selector, ClickKind::Pointer)
    }

    async fn script_click(&self, selector: &Selector) -> Result<()> {
        self.do_click(selector, ClickKind::Script)
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<()> {
        self.with(|s| {
            if !lookup(s, selector).iter().any(|e| e.visible) {
                anyhow::bail!("field not visible: {}", selector);
            }
            s.fills.push((selector.clone(), text.to_string()));
            Ok(())
        })
    }

    async fn take_screenshot(&self, path: &Path) -> Result<()> {
        self.with(|s| s.screenshots.push(path.display().to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.with(|s| s.closed = true);
        Ok(())
    }
}

/// Hands out pre-built sessions in order; `None` entries fail to open
pub struct MockFactory {
    sessions: Mutex<VecDeque<Option<MockSession>>>,
}

impl MockFactory {
    pub fn new(sessions: Vec<Option<MockSession>>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
        }
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn open(&self, label: &str) -> Result<Box<dyn BrowserSession>> {
        let next = self.sessions.lock().unwrap().pop_front().flatten();
        match next {
            Some(session) => Ok(Box::new(session)),
            None => anyhow::bail!("could not open session for {}", label),
        }
    }
}
