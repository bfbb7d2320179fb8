// Adapters layer: concrete implementations of the domain ports.

pub mod browser;
pub mod csv_sink;

pub use browser::{BrowserOptions, ChromePage, ChromeSession};
pub use csv_sink::CsvSink;
