use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

/// Element selector for page elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by element id
    Id(String),
    /// Select by a single class name
    Class(String),
    /// Select by CSS selector
    Css(String),
    /// Select by XPath
    XPath(String),
    /// Select an anchor by its exact visible text
    LinkText(String),
    /// The n-th (0-based) match of another selector
    Nth(Box<Selector>, usize),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Selector::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Selector::Class(class.into())
    }

    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css(css.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Selector::XPath(xpath.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Selector::LinkText(text.into())
    }

    /// Narrow this selector to its `index`-th match
    pub fn nth(&self, index: usize) -> Self {
        match self {
            Selector::Nth(inner, _) => Selector::Nth(inner.clone(), index),
            other => Selector::Nth(Box::new(other.clone()), index),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{}", id),
            Selector::Class(class) => write!(f, ".{}", class),
            Selector::Css(css) => write!(f, "{}", css),
            Selector::XPath(xpath) => write!(f, "xpath={}", xpath),
            Selector::LinkText(text) => write!(f, "link={}", text),
            Selector::Nth(inner, index) => write!(f, "{}[{}]", inner, index),
        }
    }
}

/// Handle to a concrete element found on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Selector that produced the match
    pub selector: Selector,
    /// Position of the element among the selector's matches
    pub index: usize,
}

impl ElementRef {
    pub fn new(selector: Selector, index: usize) -> Self {
        Self { selector, index }
    }

    /// Selector addressing exactly this element
    pub fn locator(&self) -> Selector {
        self.selector.nth(self.index)
    }
}

/// Snapshot of one element matched by a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub visible: bool,
    /// Rendered text, untrimmed
    pub text: String,
}

/// Browser-automation primitives the harness is written against
///
/// One session drives one test case. Implementations wrap a real browser
/// (see `driver::web`) or a scripted page in tests. Every method is a single
/// round-trip; waiting and retrying live in `driver::common`.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Human-readable session label for logs
    fn session_name(&self) -> &str;

    /// Navigate the page to `url`
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Drop cookies plus local and session storage
    async fn clear_state(&self) -> Result<()>;

    /// Text of the pending native alert, if one is open
    async fn native_alert_text(&self) -> Result<Option<String>>;

    /// Accept the pending native alert so the page unblocks
    async fn accept_native_alert(&self) -> Result<()>;

    /// All elements matching `selector`, in document order
    async fn query(&self, selector: &Selector) -> Result<Vec<ElementInfo>>;

    /// Check if any element matching `selector` is currently visible
    async fn is_visible(&self, selector: &Selector) -> Result<bool> {
        Ok(self.query(selector).await?.iter().any(|e| e.visible))
    }

    /// Scroll the first match to the middle of the viewport
    async fn scroll_into_view(&self, selector: &Selector) -> Result<()>;

    /// Regular element click
    async fn click(&self, selector: &Selector) -> Result<()>;

    /// Move the pointer over the element and press/release there
    async fn pointer_click(&self, selector: &Selector) -> Result<()>;

    /// Fire `element.click()` from page script
    async fn script_click(&self, selector: &Selector) -> Result<()>;

    /// Clear the field and type `text` into it
    async fn fill(&self, selector: &Selector, text: &str) -> Result<()>;

    /// Short markup snippet of the first match, for debugging
    async fn describe(&self, selector: &Selector) -> Result<String> {
        Ok(selector.to_string())
    }

    /// Save a PNG screenshot to `path`
    async fn take_screenshot(&self, path: &Path) -> Result<()>;

    /// Release the browser session
    async fn close(&self) -> Result<()>;
}

/// Opens a fresh, exclusively owned session per test case
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// # Arguments
    /// * `label` - Name for the session, e.g. "login - L-01"
    async fn open(&self, label: &str) -> Result<Box<dyn BrowserSession>>;
}
