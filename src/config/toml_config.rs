use crate::adapters::browser::BrowserOptions;
use crate::core::extractor::CommentaryExtractor;
use crate::core::loader::{ContentLoader, LoaderSettings};
use crate::core::orchestrator::{CrawlOrchestrator, CrawlSettings, Timings};
use crate::core::retry::RetryPolicy;
use crate::core::selection::{SelectionPolicy, SelectionRules};
use crate::domain::ports::{Locator, ResultSink};
use crate::utils::error::{CrawlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Full crawler configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub crawl: CrawlSection,
    pub retry: RetrySection,
    pub loader: LoaderSettings,
    pub selection: SelectionRules,
    pub selectors: SelectorConfig,
    pub timings: Timings,
    pub browser: BrowserOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSection {
    pub from_year: i32,
    pub to_year: i32,
    pub base_url: String,
    /// Relative to `base_url`; `{year}` is replaced per iteration.
    pub archive_path: String,
    pub output_path: String,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            from_year: 2016,
            to_year: 2024,
            base_url: "https://www.cricbuzz.com".to_string(),
            archive_path: "/cricket-scorecard-archives/{year}".to_string(),
            output_path: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub series_links: String,
    pub match_list: String,
    pub match_links: String,
    /// Pre/post-match and ball-by-ball commentary, combined into one CSS group.
    pub commentary: Vec<String>,
    pub commentary_tab_text: String,
    pub load_more_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            series_links: ".cb-srs-lst-itm a".to_string(),
            match_list: "div.cb-col-100.cb-col.cb-series-matches.ng-scope".to_string(),
            match_links: "div.cb-col-100.cb-col.cb-series-matches.ng-scope a".to_string(),
            commentary: vec![
                "p.cb-com-ln.ng-binding.ng-scope.cb-col.cb-col-90".to_string(),
                ".cb-col.cb-col-100.cb-com-ln".to_string(),
            ],
            commentary_tab_text: "Commentary".to_string(),
            load_more_text: "Load More Commentary".to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CrawlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CrawlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| CrawlError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("crawl.base_url", &self.crawl.base_url)?;
        validation::validate_non_empty_string("crawl.archive_path", &self.crawl.archive_path)?;
        validation::validate_path("crawl.output_path", &self.crawl.output_path)?;
        validation::validate_range("crawl.from_year", self.crawl.from_year, 1877, 2100)?;
        validation::validate_range("crawl.to_year", self.crawl.to_year, 1877, 2100)?;
        validation::validate_ordered("crawl.years", self.crawl.from_year, self.crawl.to_year)?;

        validation::validate_positive_number("retry.max_attempts", self.retry.max_attempts, 1)?;
        validation::validate_ordered("retry.delay_ms", self.retry.min_delay_ms, self.retry.max_delay_ms)?;

        validation::validate_positive_number("loader.max_no_change", self.loader.max_no_change, 1)?;
        validation::validate_positive_number(
            "loader.pagination_no_change",
            self.loader.pagination_no_change,
            1,
        )?;
        validation::validate_positive_number("loader.count_polls", self.loader.count_polls, 1)?;

        validation::validate_non_empty_string("selectors.series_links", &self.selectors.series_links)?;
        validation::validate_non_empty_string("selectors.match_list", &self.selectors.match_list)?;
        validation::validate_non_empty_string("selectors.match_links", &self.selectors.match_links)?;
        validation::validate_non_empty_string(
            "selectors.commentary_tab_text",
            &self.selectors.commentary_tab_text,
        )?;
        validation::validate_non_empty_string("selectors.load_more_text", &self.selectors.load_more_text)?;
        if self.selectors.commentary.iter().all(|s| s.trim().is_empty()) {
            return Err(CrawlError::MissingConfigError {
                field: "selectors.commentary".to_string(),
            });
        }

        if self.selection.require_team_match && self.selection.teams.is_empty() {
            return Err(CrawlError::ConfigValidationError {
                field: "selection.teams".to_string(),
                message: "require_team_match is set but no teams are listed".to_string(),
            });
        }

        Ok(())
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.crawl.from_year..=self.crawl.to_year
    }

    pub fn output_path(&self) -> &str {
        &self.crawl.output_path
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::randomized(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.min_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    pub fn selection_policy(&self) -> Result<SelectionPolicy> {
        SelectionPolicy::new(&self.selection)
    }

    pub fn extractor(&self) -> CommentaryExtractor {
        CommentaryExtractor::from_selectors(&self.selectors.commentary)
    }

    pub fn content_loader(&self) -> ContentLoader {
        ContentLoader::new(
            self.loader.clone(),
            self.extractor().locator().clone(),
            Locator::text(self.selectors.load_more_text.as_str()),
        )
    }

    pub fn crawl_settings(&self) -> Result<CrawlSettings> {
        let base_url = Url::parse(&self.crawl.base_url).map_err(|e| {
            CrawlError::InvalidConfigValueError {
                field: "crawl.base_url".to_string(),
                value: self.crawl.base_url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(CrawlSettings {
            base_url,
            archive_path: self.crawl.archive_path.clone(),
            series_links: Locator::css(self.selectors.series_links.as_str()),
            match_list: Locator::css(self.selectors.match_list.as_str()),
            match_links: Locator::css(self.selectors.match_links.as_str()),
            commentary_tab: Locator::text(self.selectors.commentary_tab_text.as_str()),
            timings: self.timings.clone(),
        })
    }

    /// Wires every component from this configuration around `sink`.
    pub fn build_orchestrator<S: ResultSink>(&self, sink: S) -> Result<CrawlOrchestrator<S>> {
        Ok(CrawlOrchestrator::new(
            self.crawl_settings()?,
            self.selection_policy()?,
            self.retry_policy(),
            self.content_loader(),
            self.extractor(),
            sink,
        ))
    }
}

impl Validate for CrawlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
