//! Year → series → match traversal.
//!
//! Every unit (year, series, match) is attempted once; a failure inside it is
//! logged, counted in the [`CrawlSummary`] and the crawl moves on to the next
//! sibling. Nothing below the browser launch aborts the run.

use crate::core::extractor::CommentaryExtractor;
use crate::core::loader::ContentLoader;
use crate::core::pause;
use crate::core::retry::{RetryPolicy, RetryingNavigator};
use crate::core::selection::SelectionPolicy;
use crate::domain::model::{
    Candidate, CrawlSummary, Decision, MatchCandidate, SeriesCandidate,
};
use crate::domain::ports::{ElementHandle, GotoOptions, LoadState, Locator, PageNavigator, ResultSink};
use crate::utils::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub navigation_timeout_ms: u64,
    pub match_list_timeout_ms: u64,
    pub commentary_tab_timeout_ms: u64,
    pub after_navigation_ms: u64,
    pub after_tab_click_ms: u64,
    pub after_back_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 60_000,
            match_list_timeout_ms: 15_000,
            commentary_tab_timeout_ms: 20_000,
            after_navigation_ms: 2_000,
            after_tab_click_ms: 2_000,
            after_back_ms: 2_000,
        }
    }
}

impl Timings {
    /// Same timeouts, no settling pauses.
    pub fn without_delays(self) -> Self {
        Self {
            after_navigation_ms: 0,
            after_tab_click_ms: 0,
            after_back_ms: 0,
            ..self
        }
    }
}

/// Where things live on the site.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: Url,
    /// Archive path with a `{year}` placeholder.
    pub archive_path: String,
    pub series_links: Locator,
    pub match_list: Locator,
    pub match_links: Locator,
    pub commentary_tab: Locator,
    pub timings: Timings,
}

impl CrawlSettings {
    pub fn archive_url(&self, year: i32) -> Result<String> {
        self.resolve(&self.archive_path.replace("{year}", &year.to_string()))
    }

    pub fn resolve(&self, href: &str) -> Result<String> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|e| CrawlError::InvalidLink {
                href: href.to_string(),
                reason: e.to_string(),
            })
    }

    fn goto_options(&self) -> GotoOptions {
        GotoOptions {
            timeout: Duration::from_millis(self.timings.navigation_timeout_ms),
            wait_until: LoadState::DomContentLoaded,
        }
    }
}

/// Per-year browsing context threaded through the step functions.
struct Session<'a, N: PageNavigator> {
    nav: RetryingNavigator<'a, N>,
    year: i32,
}

impl<'a, N: PageNavigator> Session<'a, N> {
    fn page(&self) -> &'a N {
        self.nav.page()
    }
}

pub struct CrawlOrchestrator<S: ResultSink> {
    settings: CrawlSettings,
    policy: SelectionPolicy,
    retry: RetryPolicy,
    loader: ContentLoader,
    extractor: CommentaryExtractor,
    sink: S,
}

impl<S: ResultSink> CrawlOrchestrator<S> {
    pub fn new(
        settings: CrawlSettings,
        policy: SelectionPolicy,
        retry: RetryPolicy,
        loader: ContentLoader,
        extractor: CommentaryExtractor,
        sink: S,
    ) -> Self {
        Self {
            settings,
            policy,
            retry,
            loader,
            extractor,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run<N: PageNavigator>(&self, page: &N, years: RangeInclusive<i32>) -> CrawlSummary {
        let mut summary = CrawlSummary::new();
        for year in years {
            self.crawl_year(page, year, &mut summary).await;
        }
        summary.finish();
        summary
    }

    pub async fn crawl_year<N: PageNavigator>(&self, page: &N, year: i32, summary: &mut CrawlSummary) {
        let session = Session {
            nav: RetryingNavigator::new(page, &self.retry),
            year,
        };

        let series = match self.load_archive(&session).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("Skipping year {}: {}", year, e);
                summary.years_skipped += 1;
                return;
            }
        };
        summary.years_visited += 1;

        if series.is_empty() {
            tracing::info!("No series found in {}", year);
            return;
        }
        tracing::info!("Found {} series in {}", series.len(), year);
        summary.series_seen += series.len() as u32;

        for candidate in &series {
            let decision = self.policy.decide_series(&candidate.raw_label);
            if !decision.include {
                tracing::debug!("Dropping series '{}': {}", candidate.label(), decision.reason);
                continue;
            }
            summary.series_selected += 1;

            if let Err(e) = self.crawl_series(&session, candidate, summary).await {
                tracing::warn!("Skipping series '{}': {}", candidate.label(), e);
                summary.series_skipped += 1;
            }
        }
    }

    /// Loads one archive page and reports the decision for every series on it.
    pub async fn preview_year<N: PageNavigator>(
        &self,
        page: &N,
        year: i32,
    ) -> Result<Vec<(SeriesCandidate, Decision)>> {
        let session = Session {
            nav: RetryingNavigator::new(page, &self.retry),
            year,
        };
        let series = self.load_archive(&session).await?;
        Ok(series
            .into_iter()
            .map(|candidate| {
                let decision = self.policy.decide_series(&candidate.raw_label);
                (candidate, decision)
            })
            .collect())
    }

    async fn load_archive<N: PageNavigator>(&self, session: &Session<'_, N>) -> Result<Vec<SeriesCandidate>> {
        let url = self.settings.archive_url(session.year)?;
        session
            .nav
            .goto_with_retry(&url, &self.settings.goto_options())
            .await?;
        session
            .page()
            .wait_for_load_state(LoadState::DomContentLoaded)
            .await?;
        collect_candidates(session.page(), &self.settings.series_links).await
    }

    async fn crawl_series<N: PageNavigator>(
        &self,
        session: &Session<'_, N>,
        series: &SeriesCandidate,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        let url = self.settings.resolve(&series.href)?;
        tracing::info!("Scraping series {}", series.label());
        session
            .nav
            .goto_with_retry(&url, &self.settings.goto_options())
            .await?;
        pause(self.settings.timings.after_navigation_ms).await;

        let result = self.crawl_matches(session, series, summary).await;
        self.navigate_back(session.page(), &series.label()).await;
        result
    }

    async fn crawl_matches<N: PageNavigator>(
        &self,
        session: &Session<'_, N>,
        series: &SeriesCandidate,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        let timeout = Duration::from_millis(self.settings.timings.match_list_timeout_ms);
        if session
            .page()
            .wait_for_selector(&self.settings.match_list, timeout)
            .await?
            .is_none()
        {
            return Err(CrawlError::element_not_found(format!(
                "match list for '{}'",
                series.label()
            )));
        }

        let matches = collect_candidates(session.page(), &self.settings.match_links).await?;
        if matches.is_empty() {
            tracing::info!("No matches found in '{}'", series.label());
            return Ok(());
        }
        summary.matches_seen += matches.len() as u32;

        for candidate in &matches {
            let decision = self.policy.decide_match(&candidate.raw_label);
            if !decision.include {
                tracing::debug!("Skipping match '{}': {}", candidate.label(), decision.reason);
                continue;
            }
            summary.matches_selected += 1;

            match self.crawl_match(session, candidate, summary).await {
                Ok(written) => {
                    summary.matches_scraped += 1;
                    summary.lines_written += written as u64;
                }
                Err(e) => {
                    tracing::warn!("Skipping match '{}': {}", candidate.label(), e);
                    summary.matches_skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn crawl_match<N: PageNavigator>(
        &self,
        session: &Session<'_, N>,
        candidate: &MatchCandidate,
        summary: &mut CrawlSummary,
    ) -> Result<usize> {
        let started = Instant::now();
        let label = candidate.label();
        let url = self.settings.resolve(&candidate.href)?;

        tracing::info!("Starting to scrape {}", label);
        session
            .nav
            .goto_with_retry(&url, &self.settings.goto_options())
            .await?;
        pause(self.settings.timings.after_navigation_ms).await;

        let result = self.scrape_commentary(session, &label, summary).await;
        self.navigate_back(session.page(), &label).await;

        if result.is_ok() {
            tracing::info!("Scraped match {} in {:.2?}", label, started.elapsed());
        }
        result
    }

    async fn scrape_commentary<N: PageNavigator>(
        &self,
        session: &Session<'_, N>,
        label: &str,
        summary: &mut CrawlSummary,
    ) -> Result<usize> {
        let page = session.page();
        let timeout = Duration::from_millis(self.settings.timings.commentary_tab_timeout_ms);

        let tab = page
            .wait_for_selector(&self.settings.commentary_tab, timeout)
            .await?
            .ok_or_else(|| {
                CrawlError::element_not_found(format!("{} tab for {}", self.settings.commentary_tab, label))
            })?;
        tab.click().await?;
        page.wait_for_load_state(LoadState::DomContentLoaded).await?;
        pause(self.settings.timings.after_tab_click_ms).await;

        if let Err(e) = self.loader.load_all(page).await {
            tracing::warn!("Loading commentary for {} stopped early, extracting what is loaded: {}", label, e);
        }

        let lines = self.extractor.extract(page, label).await?;
        match self.sink.append(session.year, &lines).await {
            Ok(written) => {
                tracing::info!("Commentary of {} lines extracted from {}", written, label);
                Ok(written)
            }
            Err(e) => {
                tracing::error!("Failed to persist {} lines for {}: {}", lines.len(), label, e);
                summary.lines_lost += lines.len() as u64;
                Err(e)
            }
        }
    }

    async fn navigate_back<N: PageNavigator>(&self, page: &N, from: &str) {
        if let Err(e) = page.go_back().await {
            tracing::warn!("Couldn't go back after {}: {}", from, e);
            return;
        }
        if let Err(e) = page.wait_for_load_state(LoadState::DomContentLoaded).await {
            tracing::debug!("Load state after going back from {}: {}", from, e);
        }
        pause(self.settings.timings.after_back_ms).await;
    }
}

/// Anchors with an `href`, deduplicated by href in document order.
async fn collect_candidates<N: PageNavigator>(page: &N, locator: &Locator) -> Result<Vec<Candidate>> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for element in page.query_selector_all(locator).await? {
        let href = match element.attribute("href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Unreadable link under {}: {}", locator, e);
                continue;
            }
        };
        if !seen.insert(href.clone()) {
            continue;
        }
        match element.inner_text().await {
            Ok(text) => candidates.push(Candidate::new(href, text)),
            Err(e) => tracing::debug!("Unreadable label for {}: {}", href, e),
        }
    }

    Ok(candidates)
}
