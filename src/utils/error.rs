use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed after {attempts} attempts: {last_error}")]
    NavigationExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Element not found: {what}")]
    ElementNotFound { what: String },

    #[error("Cannot resolve link '{href}': {reason}")]
    InvalidLink { href: String, reason: String },

    #[error("No commentary found for {match_label}")]
    NoCommentaryFound { match_label: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Script evaluation error: {0}")]
    Script(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrawlError {
    pub fn browser(message: impl std::fmt::Display) -> Self {
        CrawlError::Browser(message.to_string())
    }

    pub fn element_not_found(what: impl Into<String>) -> Self {
        CrawlError::ElementNotFound { what: what.into() }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CrawlError::NoCommentaryFound { .. }
            | CrawlError::ElementNotFound { .. }
            | CrawlError::InvalidLink { .. } => ErrorSeverity::Low,
            CrawlError::NavigationTimeout { .. } | CrawlError::NavigationExhausted { .. } => {
                ErrorSeverity::Medium
            }
            CrawlError::Script(_) | CrawlError::CsvError(_) | CrawlError::IoError(_) => {
                ErrorSeverity::High
            }
            CrawlError::Browser(_)
            | CrawlError::ConfigValidationError { .. }
            | CrawlError::InvalidConfigValueError { .. }
            | CrawlError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CrawlError::NavigationTimeout { .. } | CrawlError::NavigationExhausted { .. } => {
                "Check network connectivity or raise retry.max_attempts / timings.navigation_timeout_ms"
            }
            CrawlError::ElementNotFound { .. }
            | CrawlError::NoCommentaryFound { .. }
            | CrawlError::InvalidLink { .. } => {
                "The page layout may have changed; review the [selectors] section"
            }
            CrawlError::Browser(_) => "Make sure Chrome or Chromium is installed and on PATH",
            CrawlError::Script(_) => "The page returned an unexpected script result",
            CrawlError::CsvError(_) | CrawlError::IoError(_) => {
                "Check that the output directory exists and is writable"
            }
            CrawlError::ConfigValidationError { .. }
            | CrawlError::InvalidConfigValueError { .. }
            | CrawlError::MissingConfigError { .. } => "Fix the configuration file and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CrawlError::Browser(_) => format!("Could not start the browser session: {}", self),
            CrawlError::ConfigValidationError { .. }
            | CrawlError::InvalidConfigValueError { .. }
            | CrawlError::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
