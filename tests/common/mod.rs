#![allow(dead_code)]

use async_trait::async_trait;
use commentary_crawler::core::loader::{SCROLL_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT};
use commentary_crawler::core::{ElementHandle, GotoOptions, LoadState, Locator, PageNavigator, ResultSink};
use commentary_crawler::{CommentaryLine, CrawlConfig, CrawlError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://cricket.test";

/// Default configuration pointed at the fake site, with every pause removed.
pub fn test_config() -> CrawlConfig {
    let mut config = CrawlConfig::default();
    config.crawl.base_url = BASE_URL.to_string();
    config.retry.min_delay_ms = 0;
    config.retry.max_delay_ms = 0;
    config.timings = config.timings.clone().without_delays();
    config.loader = config.loader.clone().without_delays();
    config
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

pub fn archive_path(year: i32) -> String {
    format!("/cricket-scorecard-archives/{}", year)
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    links: HashMap<String, Vec<(Option<String>, String)>>,
    commentary_tab: bool,
    commentary_batches: Vec<Vec<String>>,
}

impl FakePage {
    pub fn archive(series: &[(&str, &str)]) -> Self {
        let selectors = CrawlConfig::default().selectors;
        let mut page = Self::default();
        page.links.insert(
            selectors.series_links,
            series
                .iter()
                .map(|(href, label)| (Some(href.to_string()), label.to_string()))
                .collect(),
        );
        page
    }

    pub fn series(matches: &[(&str, &str)]) -> Self {
        let selectors = CrawlConfig::default().selectors;
        let mut page = Self::default();
        page.links
            .insert(selectors.match_list, vec![(None, "Matches".to_string())]);
        page.links.insert(
            selectors.match_links,
            matches
                .iter()
                .map(|(href, label)| (Some(href.to_string()), label.to_string()))
                .collect(),
        );
        page
    }

    /// A match page whose commentary arrives one batch per "load more" click.
    pub fn match_with_commentary(batches: &[&[&str]]) -> Self {
        Self {
            commentary_tab: true,
            commentary_batches: batches
                .iter()
                .map(|batch| batch.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..Self::default()
        }
    }

    pub fn match_without_tab() -> Self {
        Self::default()
    }

    pub fn with_raw_anchor(mut self, selector: &str, href: Option<&str>, label: &str) -> Self {
        self.links
            .entry(selector.to_string())
            .or_default()
            .push((href.map(String::from), label.to_string()));
        self
    }
}

#[derive(Debug, Default)]
pub struct SiteState {
    current: Option<String>,
    history: Vec<String>,
    pub goto_attempts: HashMap<String, u32>,
    pub visited: Vec<String>,
    pub clicks: u32,
    pub back_navigations: u32,
    tab_open: bool,
    batches_loaded: usize,
    failures: HashMap<String, u32>,
}

impl SiteState {
    fn reset_page(&mut self) {
        self.tab_open = false;
        self.batches_loaded = 1;
    }
}

pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    commentary: Locator,
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            commentary: test_config().extractor().locator().clone(),
            state: Arc::new(Mutex::new(SiteState::default())),
        }
    }

    pub fn page(mut self, path: &str, page: FakePage) -> Self {
        self.pages.insert(url(path), page);
        self
    }

    /// The next `times` navigations to `path` fail; `u32::MAX` fails forever.
    pub fn failing(self, path: &str, times: u32) -> Self {
        self.state.lock().unwrap().failures.insert(url(path), times);
        self
    }

    pub fn attempts(&self, path: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .goto_attempts
            .get(&url(path))
            .copied()
            .unwrap_or(0)
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn back_navigations(&self) -> u32 {
        self.state.lock().unwrap().back_navigations
    }

    fn current_page(&self) -> Option<FakePage> {
        let state = self.state.lock().unwrap();
        state
            .current
            .as_ref()
            .and_then(|current| self.pages.get(current))
            .cloned()
    }
}

pub enum FakeElement {
    Link { href: Option<String>, text: String },
    Line(String),
    Tab(Arc<Mutex<SiteState>>),
    LoadMore { state: Arc<Mutex<SiteState>>, total: usize },
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        match self {
            FakeElement::Link { href, .. } if name == "href" => Ok(href.clone()),
            _ => Ok(None),
        }
    }

    async fn inner_text(&self) -> Result<String> {
        match self {
            FakeElement::Link { text, .. } | FakeElement::Line(text) => Ok(text.clone()),
            FakeElement::Tab(_) => Ok("Commentary".to_string()),
            FakeElement::LoadMore { .. } => Ok("Load More Commentary".to_string()),
        }
    }

    async fn click(&self) -> Result<()> {
        match self {
            FakeElement::Tab(state) => {
                let mut state = state.lock().unwrap();
                state.clicks += 1;
                state.tab_open = true;
            }
            FakeElement::LoadMore { state, total } => {
                let mut state = state.lock().unwrap();
                state.clicks += 1;
                state.batches_loaded = (state.batches_loaded + 1).min(*total);
            }
            _ => {}
        }
        Ok(())
    }

    async fn is_visible(&self) -> Result<bool> {
        Ok(true)
    }

    async fn scroll_into_view(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PageNavigator for FakeSite {
    type Element = FakeElement;

    async fn goto(&self, url: &str, options: &GotoOptions) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.goto_attempts.entry(url.to_string()).or_default() += 1;

        if let Some(remaining) = state.failures.get_mut(url) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(CrawlError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout.as_millis() as u64,
                });
            }
        }

        state.visited.push(url.to_string());
        state.history.push(url.to_string());
        state.current = Some(url.to_string());
        state.reset_page();
        Ok(())
    }

    async fn query_selector_all(&self, locator: &Locator) -> Result<Vec<FakeElement>> {
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        let (tab_open, loaded) = {
            let state = self.state.lock().unwrap();
            (state.tab_open, state.batches_loaded)
        };

        if *locator == self.commentary {
            if !tab_open {
                return Ok(Vec::new());
            }
            return Ok(page
                .commentary_batches
                .iter()
                .take(loaded)
                .flatten()
                .map(|text| FakeElement::Line(text.clone()))
                .collect());
        }

        match locator {
            Locator::Text(text) if text == "Commentary" => Ok(if page.commentary_tab {
                vec![FakeElement::Tab(Arc::clone(&self.state))]
            } else {
                Vec::new()
            }),
            Locator::Text(text) if text == "Load More Commentary" => {
                let total = page.commentary_batches.len();
                Ok(if tab_open && loaded < total {
                    vec![FakeElement::LoadMore {
                        state: Arc::clone(&self.state),
                        total,
                    }]
                } else {
                    Vec::new()
                })
            }
            Locator::Text(_) => Ok(Vec::new()),
            Locator::Css(selector) => Ok(page
                .links
                .get(selector)
                .map(|anchors| {
                    anchors
                        .iter()
                        .map(|(href, text)| FakeElement::Link {
                            href: href.clone(),
                            text: text.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()),
        }
    }

    async fn wait_for_selector(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Option<FakeElement>> {
        Ok(self.query_selector_all(locator).await?.into_iter().next())
    }

    async fn wait_for_load_state(&self, _state: LoadState) -> Result<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let state = self.state.lock().unwrap();
        if script == SCROLL_HEIGHT_SCRIPT {
            return Ok(serde_json::json!(1000 + 100 * state.batches_loaded));
        }
        if script == SCROLL_TO_BOTTOM_SCRIPT {
            return Ok(serde_json::Value::Null);
        }
        Err(CrawlError::browser(format!("unexpected script: {}", script)))
    }

    async fn go_back(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.back_navigations += 1;
        state.history.pop();
        state.current = state.history.last().cloned();
        state.reset_page();
        Ok(())
    }
}

/// Collects appended lines in memory; can be told to fail every append.
#[derive(Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<(i32, CommentaryLine)>>>,
    fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<(i32, CommentaryLine)> {
        self.rows.lock().unwrap().clone()
    }

    pub fn texts_for(&self, match_label: &str) -> Vec<String> {
        self.rows()
            .into_iter()
            .filter(|(_, line)| line.match_label == match_label)
            .map(|(_, line)| line.text)
            .collect()
    }
}

impl ResultSink for MemorySink {
    async fn append(&self, year: i32, lines: &[CommentaryLine]) -> Result<usize> {
        if self.fail {
            return Err(CrawlError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only output",
            )));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.extend(lines.iter().cloned().map(|line| (year, line)));
        Ok(lines.len())
    }
}
