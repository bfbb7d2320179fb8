use crate::domain::model::CommentaryLine;
use crate::domain::ports::ResultSink;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 2] = ["Match", "Commentary"];

/// Writes `<year>_commentary.csv` files under one directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    base_path: PathBuf,
}

impl CsvSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.base_path.join(format!("{}_commentary.csv", year))
    }

    fn append_rows(path: &Path, lines: &[CommentaryLine]) -> Result<usize> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Handle lives only for this call.
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_empty {
            writer.write_record(CSV_HEADER)?;
        }

        let mut seen = HashSet::new();
        let mut written = 0;
        for line in lines {
            if !seen.insert((line.match_label.as_str(), line.text.as_str())) {
                continue;
            }
            writer.write_record([line.match_label.as_str(), line.text.as_str()])?;
            written += 1;
        }

        writer.flush()?;
        Ok(written)
    }
}

impl ResultSink for CsvSink {
    async fn append(&self, year: i32, lines: &[CommentaryLine]) -> Result<usize> {
        if lines.is_empty() {
            return Ok(0);
        }
        let path = self.path_for(year);
        let written = Self::append_rows(&path, lines)?;
        tracing::debug!("Appended {} rows to {}", written, path.display());
        Ok(written)
    }
}
