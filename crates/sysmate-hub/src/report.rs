//! Report store — the only write-capable collaborator.
//!
//! Persists model-generated reports under a single directory with
//! sanitized, date-stamped file names so a report never escapes the
//! reports directory or clobbers yesterday's file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sysmate_core::error::{Result, SysmateError};

/// What the store hands back after a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub path: String,
    pub file_name: String,
}

/// Persistence boundary for the `store_in_file` tool.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn write_report(&self, name: &str, content: &str) -> Result<ReportReceipt>;
}

/// Filesystem-backed store writing into a reports directory.
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `./reports` next to the working directory.
    pub fn default_dir() -> PathBuf {
        PathBuf::from("reports")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Strip anything outside `[A-Za-z0-9.-]` so the name cannot carry path
/// separators or shell metacharacters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Insert a `YYYY-MM-DD` stamp before the extension, defaulting the
/// extension to `.txt`. Names already carrying today's stamp are left
/// alone.
fn stamp_name(name: &str, date: &str) -> String {
    let sanitized = sanitize(name);
    let (stem, ext) = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
        _ => (sanitized.trim_end_matches('.').to_string(), "txt".to_string()),
    };

    if stem.ends_with(date) {
        format!("{}.{}", stem, ext)
    } else {
        format!("{}-{}.{}", stem, date, ext)
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn write_report(&self, name: &str, content: &str) -> Result<ReportReceipt> {
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let file_name = stamp_name(name, &date);
        let path = self.dir.join(&file_name);

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SysmateError::ToolExecution {
                tool: "store_in_file".to_string(),
                message: format!("cannot create reports directory: {}", e),
            }
        })?;
        tokio::fs::write(&path, content).await.map_err(|e| {
            SysmateError::ToolExecution {
                tool: "store_in_file".to_string(),
                message: format!("cannot write {}: {}", path.display(), e),
            }
        })?;

        Ok(ReportReceipt {
            path: path.display().to_string(),
            file_name,
        })
    }
}
