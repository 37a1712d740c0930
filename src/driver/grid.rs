//! Remote device-cloud presets
//!
//! A preset names a browser/platform combination on the cloud grid. Remote
//! sessions are brokered over a CDP websocket whose query string carries the
//! capabilities, so only Chromium-family presets can be driven this way.

use anyhow::{Context, Result};
use serde_json::json;

use super::web::BrowserType;

const GRID_CDP_ENDPOINT: &str = "wss://cdp.browserstack.com/puppeteer";

/// Named browser/platform bundle for remote execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub browser: &'static str,
    pub browser_version: &'static str,
    pub os: &'static str,
    pub os_version: &'static str,
}

impl Preset {
    pub fn browser_type(&self) -> BrowserType {
        match self.browser {
            "firefox" => BrowserType::Firefox,
            "safari" => BrowserType::Webkit,
            _ => BrowserType::Chromium,
        }
    }

    pub fn supports_cdp(&self) -> bool {
        matches!(self.browser_type(), BrowserType::Chromium)
    }
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        name: "chrome_latest_win",
        browser: "chrome",
        browser_version: "latest",
        os: "Windows",
        os_version: "11",
    },
    Preset {
        name: "edge_latest_win",
        browser: "edge",
        browser_version: "latest",
        os: "Windows",
        os_version: "11",
    },
    Preset {
        name: "firefox_latest_win",
        browser: "firefox",
        browser_version: "latest",
        os: "Windows",
        os_version: "11",
    },
    Preset {
        name: "safari_latest_mac",
        browser: "safari",
        browser_version: "latest",
        os: "OS X",
        os_version: "Ventura",
    },
];

pub fn find_preset(name: &str) -> Result<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name).with_context(|| {
        let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
        format!("Unknown preset '{}'. Known presets: {}", name, known.join(", "))
    })
}

/// Grid account credentials
#[derive(Debug, Clone)]
pub struct GridCredentials {
    pub username: String,
    pub access_key: String,
}

impl GridCredentials {
    /// Read credentials from the environment
    ///
    /// Accepts both `BROWSERSTACK_USERNAME`/`BROWSERSTACK_ACCESS_KEY` and the
    /// shorter `BROWSERSTACK_USER`/`BROWSERSTACK_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .find(|v| !v.trim().is_empty())
        };
        let username = first(&["BROWSERSTACK_USERNAME", "BROWSERSTACK_USER"]);
        let access_key = first(&["BROWSERSTACK_ACCESS_KEY", "BROWSERSTACK_KEY"]);

        match (username, access_key) {
            (Some(username), Some(access_key)) => Ok(Self {
                username,
                access_key,
            }),
            _ => anyhow::bail!(
                "Grid credentials not found. Set BROWSERSTACK_USERNAME and BROWSERSTACK_ACCESS_KEY"
            ),
        }
    }
}

/// A preset plus the account to run it under
#[derive(Debug, Clone)]
pub struct GridTarget {
    pub preset: &'static Preset,
    pub credentials: GridCredentials,
    pub build: String,
}

impl GridTarget {
    pub fn new(preset: &'static Preset, credentials: GridCredentials, build: &str) -> Result<Self> {
        if !preset.supports_cdp() {
            anyhow::bail!(
                "Preset '{}' ({}) cannot be brokered over CDP; pick a Chromium-family preset",
                preset.name,
                preset.browser
            );
        }
        Ok(Self {
            preset,
            credentials,
            build: build.to_string(),
        })
    }

    /// Websocket endpoint for one remote session named `test_name`
    pub fn endpoint(&self, test_name: &str) -> String {
        let caps = json!({
            "browser": self.preset.browser,
            "browser_version": self.preset.browser_version,
            "os": self.preset.os,
            "os_version": self.preset.os_version,
            "name": test_name,
            "build": self.build,
            "browserstack.username": self.credentials.username,
            "browserstack.accessKey": self.credentials.access_key,
        });
        format!(
            "{}?caps={}",
            GRID_CDP_ENDPOINT,
            urlencoding::encode(&caps.to_string())
        )
    }
}
