use crate::domain::model::CommentaryLine;
use crate::domain::ports::{ElementHandle, Locator, PageNavigator};
use crate::utils::error::{CrawlError, Result};
use std::collections::HashSet;

/// Reads commentary elements and yields unique, normalized lines.
#[derive(Debug, Clone)]
pub struct CommentaryExtractor {
    commentary: Locator,
}

impl CommentaryExtractor {
    pub fn new(commentary: Locator) -> Self {
        Self { commentary }
    }

    /// Builds the combined locator from the pre/post-match and ball-by-ball selectors.
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> Self {
        let joined = selectors
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(Locator::Css(joined))
    }

    pub fn locator(&self) -> &Locator {
        &self.commentary
    }

    pub async fn extract<N: PageNavigator>(
        &self,
        page: &N,
        match_label: &str,
    ) -> Result<Vec<CommentaryLine>> {
        let elements = page.query_selector_all(&self.commentary).await?;
        if elements.is_empty() {
            return Err(CrawlError::NoCommentaryFound {
                match_label: match_label.to_string(),
            });
        }

        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            match element.inner_text().await {
                Ok(text) => texts.push(text),
                Err(e) => tracing::debug!("Skipping unreadable commentary element: {}", e),
            }
        }

        let lines = unique_lines(match_label, texts);
        tracing::debug!(
            "{} unique lines from {} elements for {}",
            lines.len(),
            elements.len(),
            match_label
        );
        Ok(lines)
    }
}

/// Normalizes `texts` and keeps the first occurrence of each, in order.
pub fn unique_lines<I, S>(match_label: &str, texts: I) -> Vec<CommentaryLine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .filter_map(|raw| CommentaryLine::new(match_label, raw.as_ref()))
        .filter(|line| seen.insert(line.text.clone()))
        .collect()
}
