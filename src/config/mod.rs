pub mod toml_config;

pub use toml_config::CrawlConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "commentary-crawler")]
#[command(about = "Crawls a cricket scorecard archive and saves ball-by-ball commentary per year")]
pub struct CliArgs {
    /// Path to a TOML configuration file; built-in defaults apply without one
    #[arg(short, long)]
    pub config: Option<String>,

    /// First year to crawl (inclusive)
    #[arg(long)]
    pub from_year: Option<i32>,

    /// Last year to crawl (inclusive)
    #[arg(long)]
    pub to_year: Option<i32>,

    /// Directory for the <year>_commentary.csv files
    #[arg(short, long)]
    pub output_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU and memory usage after every year
    #[arg(long)]
    pub monitor: bool,

    /// List series decisions per year without visiting any series
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    /// Loads the configured file (or defaults) and applies command-line overrides.
    pub fn load_config(&self) -> crate::Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::from_file(path)?,
            None => CrawlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut CrawlConfig) {
        if let Some(year) = self.from_year {
            config.crawl.from_year = year;
        }
        if let Some(year) = self.to_year {
            config.crawl.to_year = year;
        }
        if let Some(path) = &self.output_path {
            config.crawl.output_path = path.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}
