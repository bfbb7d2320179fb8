//! Makes paginated and lazily loaded commentary visible before extraction.
//!
//! Two loops run one after the other: clicking "load more" until a click adds
//! nothing, then scrolling to the bottom until the page height stops growing.
//! Each loop stops after a threshold of consecutive observations without growth.

use crate::core::pause;
use crate::domain::ports::{ElementHandle, LoadState, Locator, PageNavigator};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

pub const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Consecutive scroll polls without height growth before stopping.
    pub max_no_change: u32,
    /// Consecutive "load more" clicks without new elements before stopping.
    pub pagination_no_change: u32,
    /// Element-count polls after each click.
    pub count_polls: u32,
    pub poll_interval_ms: u64,
    pub click_settle_ms: u64,
    pub scroll_settle_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_no_change: 3,
            pagination_no_change: 1,
            count_polls: 3,
            poll_interval_ms: 1000,
            click_settle_ms: 3000,
            scroll_settle_ms: 1000,
        }
    }
}

impl LoaderSettings {
    /// Same thresholds, no waiting.
    pub fn without_delays(self) -> Self {
        Self {
            poll_interval_ms: 0,
            click_settle_ms: 0,
            scroll_settle_ms: 0,
            ..self
        }
    }
}

/// Counts consecutive observations without growth.
#[derive(Debug, Clone)]
pub struct NoChangeCounter {
    threshold: u32,
    consecutive: u32,
}

impl NoChangeCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// Records one observation; returns `true` once the loop has converged.
    pub fn observe(&mut self, grew: bool) -> bool {
        if grew {
            self.consecutive = 0;
        } else {
            self.consecutive += 1;
        }
        self.consecutive >= self.threshold
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub clicks: u32,
    pub scroll_polls: u32,
    pub element_count: usize,
}

#[derive(Debug, Clone)]
pub struct ContentLoader {
    settings: LoaderSettings,
    commentary: Locator,
    load_more: Locator,
}

impl ContentLoader {
    pub fn new(settings: LoaderSettings, commentary: Locator, load_more: Locator) -> Self {
        Self {
            settings,
            commentary,
            load_more,
        }
    }

    pub async fn load_all<N: PageNavigator>(&self, page: &N) -> Result<LoadReport> {
        let clicks = self.paginate(page).await?;
        let scroll_polls = self.scroll_to_end(page).await?;
        let element_count = self.count(page).await?;

        tracing::debug!(
            "Commentary converged: {} clicks, {} scroll polls, {} elements",
            clicks,
            scroll_polls,
            element_count
        );

        Ok(LoadReport {
            clicks,
            scroll_polls,
            element_count,
        })
    }

    /// Clicks "load more" while it is visible and keeps adding elements.
    pub async fn paginate<N: PageNavigator>(&self, page: &N) -> Result<u32> {
        let mut counter = NoChangeCounter::new(self.settings.pagination_no_change);
        let mut clicks = 0;

        loop {
            let before = self.count(page).await?;

            let Some(button) = self.visible_load_more(page).await? else {
                tracing::debug!("No visible '{}' control, pagination done", self.load_more);
                break;
            };

            button.scroll_into_view().await?;
            button.click().await?;
            clicks += 1;
            page.wait_for_load_state(LoadState::DomContentLoaded).await?;
            pause(self.settings.click_settle_ms).await;

            let after = self.wait_for_growth(page, before).await?;
            if counter.observe(after > before) {
                tracing::debug!("No new commentary after click {}, stopping", clicks);
                break;
            }
        }

        Ok(clicks)
    }

    /// Scrolls to the bottom until the page height stops growing.
    pub async fn scroll_to_end<N: PageNavigator>(&self, page: &N) -> Result<u32> {
        let mut counter = NoChangeCounter::new(self.settings.max_no_change);
        let mut polls = 0;

        loop {
            let old_height = scroll_height(page).await?;
            page.evaluate(SCROLL_TO_BOTTOM_SCRIPT).await?;
            pause(self.settings.scroll_settle_ms).await;
            let new_height = scroll_height(page).await?;
            polls += 1;

            if counter.observe(new_height > old_height) {
                break;
            }
        }

        Ok(polls)
    }

    async fn count<N: PageNavigator>(&self, page: &N) -> Result<usize> {
        Ok(page.query_selector_all(&self.commentary).await?.len())
    }

    async fn visible_load_more<N: PageNavigator>(&self, page: &N) -> Result<Option<N::Element>> {
        for candidate in page.query_selector_all(&self.load_more).await? {
            if candidate.is_visible().await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn wait_for_growth<N: PageNavigator>(&self, page: &N, before: usize) -> Result<usize> {
        let mut current = before;
        for _ in 0..self.settings.count_polls.max(1) {
            pause(self.settings.poll_interval_ms).await;
            current = self.count(page).await?;
            if current > before {
                break;
            }
        }
        Ok(current)
    }
}

async fn scroll_height<N: PageNavigator>(page: &N) -> Result<f64> {
    let value = page.evaluate(SCROLL_HEIGHT_SCRIPT).await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::GotoOptions;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct PageState {
        batches_loaded: usize,
        scrolls: u32,
        clicks: u32,
    }

    /// Commentary arrives in `batches`; each click reveals one more until
    /// `clickable_batches` is reached. Height grows for `growing_scrolls` scrolls.
    struct LazyPage {
        batches: usize,
        clickable_batches: usize,
        button_visible: bool,
        growing_scrolls: u32,
        state: Arc<Mutex<PageState>>,
    }

    impl LazyPage {
        fn new(batches: usize, clickable_batches: usize, growing_scrolls: u32) -> Self {
            Self {
                batches,
                clickable_batches,
                button_visible: true,
                growing_scrolls,
                state: Arc::new(Mutex::new(PageState {
                    batches_loaded: 1,
                    ..PageState::default()
                })),
            }
        }
    }

    enum Fake {
        Line,
        Button {
            state: Arc<Mutex<PageState>>,
            visible: bool,
            limit: usize,
        },
    }

    #[async_trait]
    impl ElementHandle for Fake {
        async fn attribute(&self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn inner_text(&self) -> Result<String> {
            Ok("line".to_string())
        }
        async fn click(&self) -> Result<()> {
            if let Fake::Button { state, limit, .. } = self {
                let mut state = state.lock().unwrap();
                state.clicks += 1;
                if state.batches_loaded < *limit {
                    state.batches_loaded += 1;
                }
            }
            Ok(())
        }
        async fn is_visible(&self) -> Result<bool> {
            Ok(matches!(self, Fake::Button { visible: true, .. }))
        }
        async fn scroll_into_view(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PageNavigator for LazyPage {
        type Element = Fake;

        async fn goto(&self, _url: &str, _options: &GotoOptions) -> Result<()> {
            Ok(())
        }
        async fn query_selector_all(&self, locator: &Locator) -> Result<Vec<Fake>> {
            match locator {
                Locator::Text(_) => Ok(vec![Fake::Button {
                    state: Arc::clone(&self.state),
                    visible: self.button_visible,
                    limit: self.clickable_batches.min(self.batches),
                }]),
                Locator::Css(_) => {
                    let loaded = self.state.lock().unwrap().batches_loaded;
                    Ok((0..loaded * 10).map(|_| Fake::Line).collect())
                }
            }
        }
        async fn wait_for_selector(
            &self,
            _locator: &Locator,
            _timeout: Duration,
        ) -> Result<Option<Fake>> {
            Ok(None)
        }
        async fn wait_for_load_state(&self, _state: LoadState) -> Result<()> {
            Ok(())
        }
        async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
            let mut state = self.state.lock().unwrap();
            if script == SCROLL_TO_BOTTOM_SCRIPT {
                state.scrolls += 1;
                return Ok(serde_json::Value::Null);
            }
            let grown = state.scrolls.min(self.growing_scrolls);
            Ok(serde_json::json!(1000 + grown * 250))
        }
        async fn go_back(&self) -> Result<()> {
            Ok(())
        }
    }

    fn loader(settings: LoaderSettings) -> ContentLoader {
        ContentLoader::new(
            settings.without_delays(),
            Locator::css(".cb-com-ln"),
            Locator::text("Load More Commentary"),
        )
    }

    #[test]
    fn test_no_change_counter_resets_on_growth() {
        let mut counter = NoChangeCounter::new(3);
        assert!(!counter.observe(false));
        assert!(!counter.observe(false));
        assert!(!counter.observe(true));
        assert!(!counter.observe(false));
        assert!(!counter.observe(false));
        assert!(counter.observe(false));
    }

    #[tokio::test]
    async fn test_scroll_stops_after_max_no_change_extra_polls() {
        for growing in [0, 1, 4] {
            let page = LazyPage::new(1, 1, growing);
            let polls = loader(LoaderSettings::default())
                .scroll_to_end(&page)
                .await
                .unwrap();
            assert_eq!(polls, growing + 3, "height stabilized after {} scrolls", growing);
        }
    }

    #[tokio::test]
    async fn test_pagination_stops_when_click_adds_nothing() {
        // Four batches, three reachable by clicking; the fourth click is a no-op.
        let page = LazyPage::new(4, 4, 0);
        let clicks = loader(LoaderSettings::default()).paginate(&page).await.unwrap();

        assert_eq!(clicks, 4);
        assert_eq!(page.state.lock().unwrap().batches_loaded, 4);
    }

    #[tokio::test]
    async fn test_pagination_threshold_tolerates_stalled_clicks() {
        let page = LazyPage::new(2, 2, 0);
        let settings = LoaderSettings {
            pagination_no_change: 2,
            ..LoaderSettings::default()
        };
        let clicks = loader(settings).paginate(&page).await.unwrap();

        // One productive click, then two stalled ones.
        assert_eq!(clicks, 3);
    }

    #[tokio::test]
    async fn test_hidden_button_skips_pagination() {
        let mut page = LazyPage::new(3, 3, 0);
        page.button_visible = false;

        let report = loader(LoaderSettings::default()).load_all(&page).await.unwrap();

        assert_eq!(report.clicks, 0);
        assert_eq!(report.scroll_polls, 3);
        assert_eq!(report.element_count, 10);
        assert_eq!(page.state.lock().unwrap().clicks, 0);
    }
}
