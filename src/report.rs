//! Report writing: durable, append-only Markdown output.
//!
//! The coordinator flushes accumulated Markdown through the [`ReportSink`]
//! trait. Production code uses [`FileReport`], which appends to a
//! timestamped file under the configured output directory; tests use an
//! in-memory sink to observe flush events without touching the filesystem.
//!
//! A write failure is fatal ([`BatchError::OutputWriteFailed`]): the report
//! is the only product of a run, so there is no point extracting further
//! pages once their output can no longer land anywhere.

use crate::error::BatchError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for flushed Markdown fragments.
#[async_trait]
pub trait ReportSink: Send {
    /// Durably append `markdown` to the report.
    async fn append(&mut self, markdown: &str) -> Result<(), BatchError>;
}

/// Append-only file sink writing `combined_output_<timestamp>.md`.
///
/// The file and its parent directories are created lazily on the first
/// append, so a batch that flushes nothing leaves no artifact behind.
pub struct FileReport {
    path: PathBuf,
    created: bool,
}

impl FileReport {
    /// Create a sink for a fresh timestamped report under `output_dir`.
    pub fn timestamped(output_dir: &Path) -> Self {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        Self::at(output_dir.join(format!("combined_output_{stamp}.md")))
    }

    /// Create a sink appending to an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            created: false,
        }
    }

    /// Where this report lands (whether or not anything was appended yet).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether at least one append has created the file.
    pub fn created(&self) -> bool {
        self.created
    }
}

#[async_trait]
impl ReportSink for FileReport {
    async fn append(&mut self, markdown: &str) -> Result<(), BatchError> {
        if markdown.is_empty() {
            return Ok(());
        }

        if !self.created {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BatchError::OutputWriteFailed {
                        path: self.path.clone(),
                        source: e,
                    }
                })?;
            }
        }

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| BatchError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        file.write_all(markdown.as_bytes())
            .await
            .map_err(|e| BatchError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        file.flush()
            .await
            .map_err(|e| BatchError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;

        if !self.created {
            info!("Report started: {}", self.path.display());
            self.created = true;
        }
        debug!("Appended {} bytes to {}", markdown.len(), self.path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn appends_accumulate_in_order() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileReport::at(dir.path().join("report.md"));

        sink.append("# One\n\n").await.unwrap();
        sink.append("# Two\n\n").await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, "# One\n\n# Two\n\n");
    }

    #[tokio::test]
    async fn empty_append_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileReport::at(dir.path().join("report.md"));

        sink.append("").await.unwrap();

        assert!(!sink.created());
        assert!(!sink.path().exists());
    }

    #[tokio::test]
    async fn parent_directories_created_on_demand() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c/report.md");
        let mut sink = FileReport::at(nested.clone());

        sink.append("content\n").await.unwrap();

        assert!(nested.exists());
        assert!(sink.created());
    }

    #[tokio::test]
    async fn unwritable_path_is_fatal() {
        // A path whose parent is a file, not a directory.
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let mut sink = FileReport::at(blocker.join("report.md"));

        let err = sink.append("content\n").await.unwrap_err();
        assert!(matches!(err, BatchError::OutputWriteFailed { .. }));
    }

    #[test]
    fn timestamped_name_shape() {
        let dir = TempDir::new().unwrap();
        let sink = FileReport::timestamped(dir.path());
        let name = sink.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("combined_output_"), "got: {name}");
        assert!(name.ends_with(".md"));
        // combined_output_YYYYmmdd_HHMMSS.md
        assert_eq!(name.len(), "combined_output_".len() + 15 + 3);
    }
}
