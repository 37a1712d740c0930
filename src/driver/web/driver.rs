//! Browser session backed by Playwright
//!
//! Launches a local browser or attaches to a remote one over CDP. Native
//! dialogs are captured by a page init script so their text can be read and
//! acknowledged like any other page state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::common::xpath_literal;
use crate::driver::grid::GridTarget;
use crate::driver::traits::{BrowserSession, ElementInfo, SessionFactory, Selector};

/// sessionStorage key holding captured dialog messages
const DIALOG_QUEUE_KEY: &str = "__storefront_dialogs";

/// Replaces `alert`/`confirm` with a recorder. The queue lives in
/// sessionStorage so a message survives the reload that often follows it.
const DIALOG_HOOK_JS: &str = r#"(() => {
    const KEY = '__storefront_dialogs';
    const read = () => {
        try { return JSON.parse(window.sessionStorage.getItem(KEY) || '[]'); }
        catch (e) { return []; }
    };
    const record = (msg) => {
        const queue = read();
        queue.push(msg === undefined || msg === null ? '' : String(msg));
        try { window.sessionStorage.setItem(KEY, JSON.stringify(queue)); } catch (e) {}
    };
    window.alert = (msg) => { record(msg); };
    window.confirm = (msg) => { record(msg); return true; };
})();"#;

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl FromStr for BrowserType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" | "edge" => Ok(BrowserType::Chromium),
            "firefox" => Ok(BrowserType::Firefox),
            "webkit" | "safari" => Ok(BrowserType::Webkit),
            other => anyhow::bail!("Unsupported browser: {}", other),
        }
    }
}

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// CDP endpoint to attach to instead of launching (e.g. http://localhost:9222)
    pub cdp_endpoint: Option<String>,
    /// Upper bound for a single Playwright action such as a click
    pub action_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        let headless = std::env::var("STOREFRONT_HEADLESS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let cdp_endpoint = std::env::var("STOREFRONT_CDP_ENDPOINT").ok();

        Self {
            browser_type: BrowserType::Chromium,
            headless,
            viewport_width: 1280,
            viewport_height: 720,
            cdp_endpoint,
            action_timeout_ms: 5_000,
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    // Keeps the driver process alive for the session's lifetime
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
    name: String,
}

impl WebDriver {
    /// Create a new WebDriver instance
    pub async fn new(config: WebDriverConfig, name: &str) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match (&config.cdp_endpoint, config.browser_type) {
            (Some(endpoint), _) => {
                info!("Connecting to browser over CDP for {}", name);
                playwright
                    .chromium()
                    .connect_over_cdp_builder(endpoint)
                    .connect_over_cdp()
                    .await
                    .context("Failed to connect to browser over CDP")?
            }
            (None, BrowserType::Chromium) => {
                playwright
                    .chromium()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            (None, BrowserType::Firefox) => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            (None, BrowserType::Webkit) => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        context
            .add_init_script(DIALOG_HOOK_JS)
            .await
            .context("Failed to install dialog hook")?;

        let page = context.new_page().await?;
        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        debug!("Browser session ready: {}", name);

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
            name: name.to_string(),
        })
    }

    /// Convert Selector to Playwright selector string
    fn selector_to_playwright(selector: &Selector) -> String {
        match selector {
            Selector::Id(id) => format!("#{}", id),
            Selector::Class(class) => format!(".{}", class),
            Selector::Css(css) => css.clone(),
            Selector::XPath(xpath) => format!("xpath={}", xpath),
            Selector::LinkText(text) => {
                format!("xpath=//a[normalize-space(.)={}]", xpath_literal(text.trim()))
            }
            Selector::Nth(inner, index) => {
                format!("{} >> nth={}", Self::selector_to_playwright(inner), index)
            }
        }
    }

    fn action_timeout(&self) -> f64 {
        self.config.action_timeout_ms as f64
    }
}

#[async_trait]
impl BrowserSession for WebDriver {
    fn session_name(&self) -> &str {
        &self.name
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .context("Failed to navigate to URL")?;
        Ok(())
    }

    async fn clear_state(&self) -> Result<()> {
        self.context.clear_cookies().await?;
        let page = self.page.lock().await;
        page.evaluate::<(), ()>(
            "() => { try { window.localStorage.clear(); window.sessionStorage.clear(); } catch (e) {} }",
            (),
        )
        .await?;
        Ok(())
    }

    async fn native_alert_text(&self) -> Result<Option<String>> {
        let page = self.page.lock().await;
        let js = format!(
            "() => {{ const q = JSON.parse(window.sessionStorage.getItem('{}') || '[]'); return q.length ? q[0] : null; }}",
            DIALOG_QUEUE_KEY
        );
        let text: Option<String> = page.evaluate(&js, ()).await?;
        Ok(text)
    }

    async fn accept_native_alert(&self) -> Result<()> {
        let page = self.page.lock().await;
        let js = format!(
            "() => {{ const k = '{}'; const q = JSON.parse(window.sessionStorage.getItem(k) || '[]'); \
             if (!q.length) return false; q.shift(); window.sessionStorage.setItem(k, JSON.stringify(q)); return true; }}",
            DIALOG_QUEUE_KEY
        );
        let accepted: bool = page.evaluate(&js, ()).await?;
        if !accepted {
            anyhow::bail!("No alert open");
        }
        Ok(())
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementInfo>> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        let mut found = Vec::new();
        for el in page.query_selector_all(&sel).await? {
            let visible = el.is_visible().await?;
            let text = if visible {
                el.inner_text().await?
            } else {
                String::new()
            };
            found.push(ElementInfo { visible, text });
        }
        Ok(found)
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        for el in page.query_selector_all(&sel).await? {
            if el.is_visible().await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn scroll_into_view(&self, selector: &Selector) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        match page.query_selector(&sel).await? {
            Some(el) => {
                el.scroll_into_view_if_needed(None).await?;
                Ok(())
            }
            None => anyhow::bail!("Element not found: {}", sel),
        }
    }

    async fn click(&self, selector: &Selector) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        page.click_builder(&sel)
            .timeout(self.action_timeout())
            .click()
            .await
            .with_context(|| format!("Failed to click: {}", sel))?;
        Ok(())
    }

    async fn pointer_click(&self, selector: &Selector) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        let el = page
            .query_selector(&sel)
            .await?
            .with_context(|| format!("Element not found: {}", sel))?;
        let bbox = el
            .bounding_box()
            .await?
            .with_context(|| format!("Element has no bounding box: {}", sel))?;
        let (x, y) = (bbox.x + bbox.width / 2.0, bbox.y + bbox.height / 2.0);

        page.mouse.r#move(x, y, None).await?;
        page.mouse.down(None, None).await?;
        page.mouse.up(None, None).await?;
        Ok(())
    }

    async fn script_click(&self, selector: &Selector) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        let handle = page
            .query_selector(&sel)
            .await?
            .with_context(|| format!("Element not found: {}", sel))?;
        page.evaluate::<_, ()>("el => el.click()", handle).await?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        let el = page
            .query_selector(&sel)
            .await?
            .with_context(|| format!("Field not found: {}", sel))?;
        el.fill_builder(text).fill().await?;
        Ok(())
    }

    async fn describe(&self, selector: &Selector) -> Result<String> {
        let page = self.page.lock().await;
        let sel = Self::selector_to_playwright(selector);
        let html: String = page
            .evaluate_on_selector(&sel, "el => el.outerHTML || ''", None::<String>)
            .await?;
        Ok(html)
    }

    async fn take_screenshot(&self, path: &Path) -> Result<()> {
        let page = self.page.lock().await;
        let path_buf = path.to_path_buf();

        if let Some(parent) = path_buf.parent() {
            std::fs::create_dir_all(parent)?;
        }

        page.screenshot_builder()
            .path(path_buf)
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        debug!("Browser session closed: {}", self.name);
        Ok(())
    }
}

/// Opens one Playwright session per test case, locally or on the grid
pub struct WebSessionFactory {
    config: WebDriverConfig,
    grid: Option<GridTarget>,
}

impl WebSessionFactory {
    pub fn local(config: WebDriverConfig) -> Self {
        Self { config, grid: None }
    }

    pub fn grid(config: WebDriverConfig, target: GridTarget) -> Self {
        Self {
            config,
            grid: Some(target),
        }
    }
}

#[async_trait]
impl SessionFactory for WebSessionFactory {
    async fn open(&self, label: &str) -> Result<Box<dyn BrowserSession>> {
        let mut config = self.config.clone();
        if let Some(target) = &self.grid {
            config.cdp_endpoint = Some(target.endpoint(label));
            config.browser_type = target.preset.browser_type();
        }
        let driver = WebDriver::new(config, label).await?;
        Ok(Box::new(driver))
    }
}
