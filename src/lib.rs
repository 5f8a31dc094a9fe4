/// Term Sheet Analyzer
///
/// Extracts the text of an uploaded term sheet and runs three concurrent
/// streaming Gemini analyses over it: control/governance clauses,
/// cashflow/economics clauses, and the payoff structure of the security.

pub mod analysis;
pub mod config;
pub mod extract;
pub mod llm;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::analysis::{
    AnalysisError, AnalysisResult, Clause, Facet, PayoffDetails, TermSheetAnalyzer,
    DEFAULT_ANALYSIS_RESULT,
};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::extract::{extract, ExtractError};
pub use crate::llm::{LLMError, LLMProvider, StreamChunk, LLM};
