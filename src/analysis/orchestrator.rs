use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

/// Deadline used when the configured timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

use super::aggregate::aggregate_stream;
use super::debug::{DebugSink, FileDebugSink};
use super::decode::safe_parse_json;
use super::request::{build_requests, FacetPrompts, RequestSpec};
use super::{
    AnalysisError, AnalysisResult, BatchStage, Clause, Facet, PayoffDetails,
    DEFAULT_ANALYSIS_RESULT,
};
use crate::config::{Config, FacetsConfig};
use crate::llm::{create_llm, ChunkStream, LLM};

/// Runs the three facet analyses for a document and consolidates them
pub struct TermSheetAnalyzer {
    llm: Arc<dyn LLM>,
    prompts: FacetPrompts,
    facets: FacetsConfig,
    stream_timeout: Duration,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl TermSheetAnalyzer {
    pub fn new(llm: Arc<dyn LLM>, prompts: FacetPrompts, facets: FacetsConfig) -> Self {
        Self {
            llm,
            prompts,
            facets,
            stream_timeout: Duration::from_secs(300),
            debug_sink: None,
        }
    }

    /// Build an analyzer from configuration: loads the facet prompts, creates
    /// the Gemini provider and, if enabled, the file debug sink.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let prompts = config.prompts.load_facet_prompts(&config.facets).await?;
        let llm: Arc<dyn LLM> = Arc::from(create_llm(&config.gemini)?);

        let mut analyzer = Self::new(llm, prompts, config.facets.clone())
            .with_stream_timeout(Duration::from_secs(config.gemini.stream_timeout_seconds));

        if config.output.enable_debug_output {
            let sink = FileDebugSink::new(config.output.debug_dir.clone());
            analyzer = analyzer.with_debug_sink(Arc::new(sink));
        }

        info!(
            "✅ Term sheet analyzer initialized with {:?} provider",
            analyzer.llm.provider_type()
        );
        Ok(analyzer)
    }

    /// Deadline for a whole batch, covering establishment and reading of all three channels
    pub fn with_stream_timeout(mut self, stream_timeout: Duration) -> Self {
        self.stream_timeout = stream_timeout;
        self
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Analyze `extracted_text`. Never fails: any error degrades the whole
    /// batch to `DEFAULT_ANALYSIS_RESULT`.
    pub async fn analyze(&self, extracted_text: &str) -> AnalysisResult {
        let result = match self.try_analyze(extracted_text).await {
            Ok(result) => result,
            Err(AnalysisError::ConfigurationMissing) => {
                warn!("GOOGLE_API_KEY not configured, returning empty analysis");
                return DEFAULT_ANALYSIS_RESULT;
            }
            Err(_) => {
                warn!("Returning default analysis for voided batch");
                DEFAULT_ANALYSIS_RESULT
            }
        };

        self.record_debug(&result).await;
        result
    }

    /// Analyze `extracted_text`, reporting why a batch failed instead of
    /// degrading. Decode failures are still absorbed per facet.
    pub async fn try_analyze(&self, extracted_text: &str) -> Result<AnalysisResult, AnalysisError> {
        if !self.llm.credential_configured() {
            return Err(AnalysisError::ConfigurationMissing);
        }

        let mut stage = BatchStage::NotStarted;
        let outcome = self.run_batch(extracted_text, &mut stage).await;
        if let Err(e) = &outcome {
            error!("❌ Analysis batch failed after stage '{}': {}", stage, e);
        }
        outcome
    }

    async fn run_batch(
        &self,
        extracted_text: &str,
        stage: &mut BatchStage,
    ) -> Result<AnalysisResult, AnalysisError> {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.stream_timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);

        let requests = build_requests(extracted_text, &self.prompts, &self.facets);
        *stage = BatchStage::RequestsBuilt;

        info!(
            "📤 Sending {} analysis requests ({} chars of text)",
            Facet::ALL.len(),
            extracted_text.len()
        );

        let (control_stream, economics_stream, security_stream) = tokio::try_join!(
            self.establish(&requests.control, deadline),
            self.establish(&requests.economics, deadline),
            self.establish(&requests.security, deadline),
        )?;
        *stage = BatchStage::StreamsEstablished;

        info!("📥 Response streams established, aggregating...");

        let (control_json, economics_json, security_json) = tokio::try_join!(
            self.aggregate(Facet::Control, control_stream, deadline),
            self.aggregate(Facet::Economics, economics_stream, deadline),
            self.aggregate(Facet::Security, security_stream, deadline),
        )?;
        *stage = BatchStage::Aggregated;

        info!("🧩 Aggregated stream responses");

        let control_governance_clauses = safe_parse_json::<Vec<Clause>>(&control_json, Vec::new());
        let cashflow_returns_clauses = safe_parse_json::<Vec<Clause>>(&economics_json, Vec::new());
        let payoff_details = safe_parse_json::<PayoffDetails>(&security_json, PayoffDetails::EMPTY);
        *stage = BatchStage::Decoded;

        let result = AnalysisResult {
            control_governance_clauses,
            cashflow_returns_clauses,
            payoff_details,
        };
        *stage = BatchStage::Consolidated;

        info!(
            "✅ Analysis consolidated: {} control clauses, {} economics clauses",
            result.control_governance_clauses.len(),
            result.cashflow_returns_clauses.len()
        );
        Ok(result)
    }

    async fn establish(
        &self,
        request: &RequestSpec,
        deadline: Instant,
    ) -> Result<ChunkStream, AnalysisError> {
        let facet = request.facet;
        self.within_deadline(facet, deadline, self.llm.generate_stream(request))
            .await?
            .map_err(|source| AnalysisError::Establishment { facet, source })
    }

    async fn aggregate(
        &self,
        facet: Facet,
        stream: ChunkStream,
        deadline: Instant,
    ) -> Result<String, AnalysisError> {
        self.within_deadline(facet, deadline, aggregate_stream(facet, stream))
            .await?
            .map_err(|source| AnalysisError::Aggregation { facet, source })
    }

    async fn within_deadline<F: Future>(
        &self,
        facet: Facet,
        deadline: Instant,
        future: F,
    ) -> Result<F::Output, AnalysisError> {
        timeout_at(deadline, future).await.map_err(|_| AnalysisError::Timeout {
            facet,
            seconds: self.stream_timeout.as_secs(),
        })
    }

    async fn record_debug(&self, result: &AnalysisResult) {
        if let Some(sink) = &self.debug_sink {
            if let Err(e) = sink.record(result).await {
                error!("Failed to write analysis debug output: {:#}", e);
            }
        }
    }
}
