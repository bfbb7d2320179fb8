pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod retry;
pub mod selection;

pub use crate::domain::model::{CommentaryLine, CrawlSummary, Decision, DecisionReason};
pub use crate::domain::ports::{ElementHandle, GotoOptions, LoadState, Locator, PageNavigator, ResultSink};
pub use crate::utils::error::Result;

use std::time::Duration;

/// Sleeps for `ms` milliseconds; zero returns immediately.
pub(crate) async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
