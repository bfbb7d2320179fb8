use crate::domain::model::CommentaryLine;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector; a comma-separated group yields matches in document order.
    Css(String),
    /// Element whose own text contains this string.
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::Text(text) => write!(f, "text={}", text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoOptions {
    pub timeout: Duration,
    pub wait_until: LoadState,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            wait_until: LoadState::DomContentLoaded,
        }
    }
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
    async fn inner_text(&self) -> Result<String>;
    async fn click(&self) -> Result<()>;
    async fn is_visible(&self) -> Result<bool>;
    async fn scroll_into_view(&self) -> Result<()>;
}

/// The single browser page the crawler drives.
#[async_trait]
pub trait PageNavigator: Send + Sync {
    type Element: ElementHandle;

    async fn goto(&self, url: &str, options: &GotoOptions) -> Result<()>;
    async fn query_selector_all(&self, locator: &Locator) -> Result<Vec<Self::Element>>;
    /// Resolves to `None` when nothing matched before `timeout`.
    async fn wait_for_selector(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Self::Element>>;
    async fn wait_for_load_state(&self, state: LoadState) -> Result<()>;
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    async fn go_back(&self) -> Result<()>;
}

/// Append-only output, one log per year.
pub trait ResultSink: Send + Sync {
    /// Appends `lines` to the year's log and returns the number of rows written.
    fn append(
        &self,
        year: i32,
        lines: &[CommentaryLine],
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}
