//! API module for the term sheet analyzer
//!
//! Provides the HTTP upload endpoint used by the browser UI.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::analysis::TermSheetAnalyzer;
use crate::config::Config;

pub mod handlers;
pub mod models;
pub mod server;

/// API Server for handling upload requests
pub struct ApiServer {
    analyzer: Arc<TermSheetAnalyzer>,
    config: Arc<Config>,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(analyzer: TermSheetAnalyzer, config: Config, port: u16) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
            port,
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.analyzer, self.config, self.port).await
    }
}
