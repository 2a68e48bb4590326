use anyhow::{Context, Result};
use async_trait::async_trait;
use cookie::SameSite;
use cookie::time::OffsetDateTime;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::key::Key as WdKey;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::page::{Key, Page};
use crate::session::{SessionState, StoredCookie};
use crate::types::ViewportSize;

/// Largest window edge used when stretching for a full-page screenshot
const MAX_CAPTURE_EDGE: u32 = 16_384;

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Default WebDriver URL for this browser type
    pub fn default_webdriver_url(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    pub fn driver_command(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

/// How to launch the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    pub browser_type: BrowserType,
    /// Connect here instead of finding or starting a local driver
    pub webdriver_url: Option<String>,
    pub headless: bool,
    pub viewport: Option<ViewportSize>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            browser_type: BrowserType::Chrome,
            webdriver_url: None,
            headless: true,
            viewport: Some(ViewportSize {
                width: 1920,
                height: 1080,
            }),
        }
    }
}

impl BrowserSettings {
    fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();

        match self.browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("--headless".to_string());
                }
                if let Some(vp) = &self.viewport {
                    args.push(format!("--width={}", vp.width));
                    args.push(format!("--height={}", vp.height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if self.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some(vp) = &self.viewport {
                    args.push(format!("--window-size={},{}", vp.width, vp.height));
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        caps
    }
}

/// Browser instance for WebDriver automation
pub struct Browser {
    pub(crate) client: Client,
    browser_type: BrowserType,
}

impl Browser {
    /// Open a new browser session on the WebDriver at `webdriver_url`
    pub async fn connect(settings: &BrowserSettings, webdriver_url: &str) -> Result<Self> {
        info!(
            "Connecting to {:?} WebDriver at {}",
            settings.browser_type, webdriver_url
        );

        let client = ClientBuilder::rustls()
            .capabilities(settings.capabilities())
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", webdriver_url))?;

        // Set viewport size after connection if specified
        if let Some(vp) = settings.viewport {
            debug!("Setting viewport to {}x{}", vp.width, vp.height);
            if let Err(e) = client.set_window_size(vp.width, vp.height).await {
                debug!("Note: Could not set window size: {}", e);
            }
        }

        Ok(Browser {
            client,
            browser_type: settings.browser_type,
        })
    }

    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    /// Install stored cookies and localStorage into this browser.
    ///
    /// WebDriver only accepts cookies for the current document's domain, so
    /// each cookie host is visited before its cookies are added.
    pub async fn restore_session(&self, session: &SessionState) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let skipped = session.cookies.len() - session.live_cookies(now).count();
        if skipped > 0 {
            warn!("Skipping {} expired cookie(s) from stored session", skipped);
        }

        for host in session.cookie_hosts(now) {
            let url = format!("https://{}/", host);
            debug!("Visiting {} to install cookies", url);
            self.client
                .goto(&url)
                .await
                .with_context(|| format!("Failed to open {} for cookie restore", url))?;

            for stored in session.live_cookies(now).filter(|c| c.host() == host) {
                if let Err(e) = self.client.add_cookie(to_webdriver_cookie(stored)).await {
                    warn!("Could not restore cookie '{}': {}", stored.name, e);
                }
            }
        }

        for origin in session.origins.iter().filter(|o| !o.local_storage.is_empty()) {
            self.client
                .goto(&origin.origin)
                .await
                .with_context(|| format!("Failed to open {} for storage restore", origin.origin))?;

            let entries: Vec<_> = origin
                .local_storage
                .iter()
                .map(|e| json!([e.name, e.value]))
                .collect();
            self.client
                .execute(
                    "for (const [k, v] of arguments[0]) { window.localStorage.setItem(k, v); }",
                    vec![json!(entries)],
                )
                .await
                .with_context(|| format!("Failed to restore localStorage for {}", origin.origin))?;
        }

        info!(
            "Restored session ({} cookie host(s), {} origin(s))",
            session.cookie_hosts(now).len(),
            session.origins.len()
        );
        Ok(())
    }

    /// Get the current URL - useful for health checks
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    /// Stretch the window to the document size, capture, then restore
    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        let dims = self
            .client
            .execute(
                "return [document.documentElement.scrollWidth, document.documentElement.scrollHeight];",
                vec![],
            )
            .await
            .context("Failed to measure document")?;

        let original = self.client.get_window_size().await.ok();
        let width = dims.get(0).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let height = dims.get(1).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if width > 0 && height > 0 {
            let width = width.clamp(1, MAX_CAPTURE_EDGE);
            let height = height.clamp(1, MAX_CAPTURE_EDGE);
            if let Err(e) = self.client.set_window_size(width, height).await {
                debug!("Could not stretch window for capture: {}", e);
            }
        }

        let png = self.client.screenshot().await.context("Failed to take screenshot");

        if let Some((w, h)) = original
            && let Err(e) = self.client.set_window_size(w as u32, h as u32).await
        {
            debug!("Could not restore window size: {}", e);
        }

        png
    }
}

/// Cookie as WebDriver will install it; session cookies carry no expiry
fn to_webdriver_cookie(stored: &StoredCookie) -> Cookie<'static> {
    let mut cookie = Cookie::new(stored.name.clone(), stored.value.clone());
    cookie.set_domain(stored.domain.clone());
    cookie.set_path(stored.path.clone());
    cookie.set_secure(stored.secure);
    cookie.set_http_only(stored.http_only);

    if stored.expires > 0.0 {
        match OffsetDateTime::from_unix_timestamp(stored.expires as i64) {
            Ok(at) => cookie.set_expires(at),
            Err(e) => debug!("Ignoring expiry of cookie '{}': {}", stored.name, e),
        }
    }

    let same_site = match stored.same_site.as_deref().map(str::to_ascii_lowercase) {
        Some(s) if s == "strict" => Some(SameSite::Strict),
        Some(s) if s == "lax" => Some(SameSite::Lax),
        Some(s) if s == "none" => Some(SameSite::None),
        _ => None,
    };
    cookie.set_same_site(same_site);

    cookie
}

fn wd_key(key: Key) -> String {
    let wd = match key {
        Key::Tab => WdKey::Tab,
        Key::Enter => WdKey::Enter,
        Key::Escape => WdKey::Escape,
        Key::Backspace => WdKey::Backspace,
        Key::ArrowUp => WdKey::Up,
        Key::ArrowDown => WdKey::Down,
        Key::ArrowLeft => WdKey::Left,
        Key::ArrowRight => WdKey::Right,
        Key::Home => WdKey::Home,
        Key::End => WdKey::End,
        Key::Char(c) => return c.to_string(),
    };
    char::from(wd).to_string()
}

#[async_trait]
impl Page for Browser {
    type Element = Element;

    async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))
    }

    async fn is_ready(&self) -> Result<bool> {
        let value = self
            .client
            .execute("return document.readyState === 'complete';", vec![])
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn find_visible(&self, locator: &str) -> Result<Option<Element>> {
        let elements = self.client.find_all(Locator::Css(locator)).await?;
        for element in elements {
            // Elements can go stale between lookup and the visibility check
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<()> {
        self.client
            .execute(
                "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
                vec![serde_json::to_value(element)?],
            )
            .await
            .context("Failed to scroll element into view")?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.context("Click failed")?;
        Ok(())
    }

    async fn fill(&self, element: &Element, text: &str) -> Result<()> {
        element.clear().await.context("Failed to clear field")?;
        element.send_keys(text).await.context("Failed to type into field")?;
        Ok(())
    }

    async fn press_key(&self, target: Option<&Element>, key: Key) -> Result<()> {
        let keys = wd_key(key);
        match target {
            Some(element) => element.send_keys(&keys).await?,
            None => self.client.active_element().await?.send_keys(&keys).await?,
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.full_page_screenshot().await
    }

    async fn html(&self) -> Result<String> {
        self.client.source().await.context("Failed to read page source")
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}
