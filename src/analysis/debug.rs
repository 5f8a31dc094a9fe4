use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::AnalysisResult;

/// Side channel that receives every batch outcome. Failures are logged by
/// the caller and never change the returned result.
#[async_trait]
pub trait DebugSink: Send + Sync {
    async fn record(&self, result: &AnalysisResult) -> Result<()>;
}

/// Writes each result as pretty JSON into a directory
#[derive(Debug, Clone)]
pub struct FileDebugSink {
    dir: PathBuf,
}

impl FileDebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name() -> String {
        let timestamp = chrono::Utc::now()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        format!("gemini_analysis_debug_{}.json", timestamp)
    }
}

#[async_trait]
impl DebugSink for FileDebugSink {
    async fn record(&self, result: &AnalysisResult) -> Result<()> {
        let path = self.dir.join(Self::file_name());
        let json = serde_json::to_string_pretty(result)?;

        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write debug file {}", path.display()))?;

        info!("🐛 Analysis output saved to {}", path.display());
        Ok(())
    }
}
