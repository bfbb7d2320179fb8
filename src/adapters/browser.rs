//! Chrome over CDP, via `chromiumoxide`.

use crate::domain::ports::{ElementHandle, GotoOptions, LoadState, Locator, PageNavigator};
use crate::utils::error::{CrawlError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    GetNavigationHistoryParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const VISIBILITY_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_executable: Option<String>,
    /// Upper bound for load-state waits and history navigation.
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 1024,
            chrome_executable: None,
            wait_timeout_ms: 30_000,
            poll_interval_ms: 250,
        }
    }
}

/// A launched browser with the single page the crawl runs on.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromePage,
}

impl ChromeSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| CrawlError::browser(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::browser(format!("failed to launch Chrome: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::browser(format!("failed to open page: {}", e)))?;

        tracing::info!("Chrome launched (headless: {})", options.headless);
        Ok(Self {
            browser,
            handler,
            page: ChromePage::new(page, options),
        })
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| CrawlError::browser(format!("failed to close Chrome: {}", e)))?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for Chrome to exit: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

#[derive(Clone)]
pub struct ChromePage {
    page: Page,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl ChromePage {
    fn new(page: Page, options: &BrowserOptions) -> Self {
        Self {
            page,
            wait_timeout: Duration::from_millis(options.wait_timeout_ms),
            poll_interval: Duration::from_millis(options.poll_interval_ms.max(10)),
        }
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::Text(text) => self.page.find_xpaths(text_xpath(text)).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(CdpError::Chrome(e)) if is_no_match_message(&e.message) => {
                tracing::trace!("No match for {}: {}", locator, e.message);
                Ok(Vec::new())
            }
            Err(e) => Err(CrawlError::browser(format!("query for {} failed: {}", locator, e))),
        }
    }

    async fn current_url(&self) -> String {
        self.page.url().await.ok().flatten().unwrap_or_default()
    }
}

/// CDP protocol errors that only mean the query matched nothing.
fn is_no_match_message(message: &str) -> bool {
    const NO_MATCH: [&str; 4] = [
        "could not find node",
        "no node",
        "no search session",
        "invalid search result range",
    ];
    let message = message.to_lowercase();
    NO_MATCH.iter().any(|needle| message.contains(needle))
}

/// XPath for elements whose own text contains `text`, outside scripts and styles.
fn text_xpath(text: &str) -> String {
    let literal = if !text.contains('"') {
        format!("\"{}\"", text)
    } else if !text.contains('\'') {
        format!("'{}'", text)
    } else {
        let parts: Vec<String> = text.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    };
    format!(
        "//body//*[not(self::script or self::style)][contains(normalize-space(text()), {})]",
        literal
    )
}

#[async_trait]
impl PageNavigator for ChromePage {
    type Element = ChromeElement;

    async fn goto(&self, url: &str, options: &GotoOptions) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        match tokio::time::timeout(options.timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(CrawlError::browser(format!("navigation to {} failed: {}", url, e))),
            Err(_) => {
                return Err(CrawlError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout.as_millis() as u64,
                })
            }
        }
        self.wait_for_load_state(options.wait_until).await
    }

    async fn query_selector_all(&self, locator: &Locator) -> Result<Vec<ChromeElement>> {
        Ok(self
            .find_all(locator)
            .await?
            .into_iter()
            .map(ChromeElement)
            .collect())
    }

    async fn wait_for_selector(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<ChromeElement>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_all(locator).await?.into_iter().next() {
                return Ok(Some(ChromeElement(element)));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_load_state(&self, state: LoadState) -> Result<()> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let ready: String = self
                .page
                .evaluate("document.readyState")
                .await
                .map_err(|e| CrawlError::browser(format!("readyState check failed: {}", e)))?
                .into_value()?;
            let reached = match state {
                LoadState::DomContentLoaded => ready == "interactive" || ready == "complete",
                LoadState::Load => ready == "complete",
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CrawlError::NavigationTimeout {
                    url: self.current_url().await,
                    timeout_ms: self.wait_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::browser(format!("script failed: {}", e)))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn go_back(&self) -> Result<()> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(|e| CrawlError::browser(format!("history lookup failed: {}", e)))?;
        let previous = usize::try_from(history.result.current_index - 1)
            .ok()
            .and_then(|index| history.result.entries.get(index))
            .ok_or_else(|| CrawlError::element_not_found("previous history entry"))?;

        self.page
            .execute(NavigateToHistoryEntryParams::new(previous.id))
            .await
            .map_err(|e| CrawlError::browser(format!("history navigation failed: {}", e)))?;

        match tokio::time::timeout(self.wait_timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::browser(format!("going back failed: {}", e))),
            Err(_) => Err(CrawlError::NavigationTimeout {
                url: previous.url.clone(),
                timeout_ms: self.wait_timeout.as_millis() as u64,
            }),
        }
    }
}

pub struct ChromeElement(Element);

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| CrawlError::browser(format!("reading attribute {} failed: {}", name, e)))
    }

    async fn inner_text(&self) -> Result<String> {
        Ok(self
            .0
            .inner_text()
            .await
            .map_err(|e| CrawlError::browser(format!("reading text failed: {}", e)))?
            .unwrap_or_default())
    }

    async fn click(&self) -> Result<()> {
        self.0
            .click()
            .await
            .map_err(|e| CrawlError::browser(format!("click failed: {}", e)))?;
        Ok(())
    }

    async fn is_visible(&self) -> Result<bool> {
        let returns = self
            .0
            .call_js_fn(VISIBILITY_FN, false)
            .await
            .map_err(|e| CrawlError::browser(format!("visibility check failed: {}", e)))?;
        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.0
            .scroll_into_view()
            .await
            .map_err(|e| CrawlError::browser(format!("scroll failed: {}", e)))?;
        Ok(())
    }
}
