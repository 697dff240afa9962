//! The directory reports are written to

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::naming::validate_pdf_name;
use crate::{ReceiptError, ReceiptResult};

/// PDF files in the report output directory
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed
    pub async fn ensure_dir(&self) -> ReceiptResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.io_error(&self.dir, e))
    }

    /// Where a report with this name is written
    pub fn path_for(&self, filename: &str) -> ReceiptResult<PathBuf> {
        Ok(self.dir.join(validate_pdf_name(filename)?))
    }

    /// Names of the stored reports, sorted
    ///
    /// A missing directory is an empty store.
    pub async fn list(&self) -> ReceiptResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&self.dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error(&self.dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.to_ascii_lowercase().ends_with(".pdf") {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        debug!(count = names.len(), "Listed reports");
        Ok(names)
    }

    /// Delete a stored report
    pub async fn delete(&self, filename: &str) -> ReceiptResult<()> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(filename = %filename, "Deleted report");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReceiptError::FileNotFound(filename.trim().to_string()))
            }
            Err(e) => Err(self.io_error(&path, e)),
        }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ReceiptError {
        ReceiptError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
