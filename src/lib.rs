pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::CrawlConfig;

pub use adapters::{ChromeSession, CsvSink};
pub use core::orchestrator::CrawlOrchestrator;
pub use domain::model::{CommentaryLine, CrawlSummary};
pub use utils::error::{CrawlError, Result};
