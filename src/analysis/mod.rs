/// Term sheet analysis pipeline
///
/// Builds one generation request per facet, streams the three responses
/// concurrently, and consolidates the decoded JSON into an `AnalysisResult`.

pub mod aggregate;
pub mod debug;
pub mod decode;
pub mod orchestrator;
pub mod request;

pub use aggregate::aggregate_stream;
pub use debug::{DebugSink, FileDebugSink};
pub use decode::{decode_json, safe_parse_json, strip_code_fence, DecodeError};
pub use orchestrator::TermSheetAnalyzer;
pub use request::{build_requests, FacetPrompts, RequestBatch, RequestSpec, ResponseFormat};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm::LLMError;

/// A named clause summarised by the control or economics analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clause {
    pub name: String,
    pub summary: String,
}

impl Clause {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
        }
    }
}

/// Financial structure of the security described by the term sheet.
///
/// Every field is independently optional: `None` means the document did not
/// state it or the model did not extract it. No cross-field consistency is
/// checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PayoffDetails {
    pub security_type: Option<String>,
    pub pre_money_valuation: Option<f64>,
    /// Often derivable, but only populated when stated explicitly
    pub post_money_valuation: Option<f64>,
    pub investment_amount_current_round: Option<f64>,
    /// 1.0 for a 1x preference
    pub liquidation_preference_multiple: Option<f64>,
    pub is_participating_preferred: Option<bool>,
    /// 3.0 for a 3x cap
    pub participation_cap_multiple: Option<f64>,
    /// 8.0 for 8%
    pub dividend_rate_percent: Option<f64>,
    pub is_dividend_cumulative: Option<bool>,
    /// e.g. "Broad-Based Weighted Average", "Full Ratchet", "None"
    pub anti_dilution_type: Option<String>,
    pub option_pool_percent: Option<f64>,
    /// "pre-money" or "post-money"
    pub option_pool_timing: Option<String>,
    pub safe_valuation_cap: Option<f64>,
    pub safe_discount_percent: Option<f64>,
    pub note_interest_rate_percent: Option<f64>,
    pub note_maturity_months: Option<f64>,
    pub interest_converts_to_equity: Option<bool>,
}

impl PayoffDetails {
    /// All fields unset
    pub const EMPTY: PayoffDetails = PayoffDetails {
        security_type: None,
        pre_money_valuation: None,
        post_money_valuation: None,
        investment_amount_current_round: None,
        liquidation_preference_multiple: None,
        is_participating_preferred: None,
        participation_cap_multiple: None,
        dividend_rate_percent: None,
        is_dividend_cumulative: None,
        anti_dilution_type: None,
        option_pool_percent: None,
        option_pool_timing: None,
        safe_valuation_cap: None,
        safe_discount_percent: None,
        note_interest_rate_percent: None,
        note_maturity_months: None,
        interest_converts_to_equity: None,
    };
}

/// Consolidated output of the three analyses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub control_governance_clauses: Vec<Clause>,
    pub cashflow_returns_clauses: Vec<Clause>,
    pub payoff_details: PayoffDetails,
}

/// Fallback for every failure path: empty clause lists and no payoff details
pub const DEFAULT_ANALYSIS_RESULT: AnalysisResult = AnalysisResult {
    control_governance_clauses: Vec::new(),
    cashflow_returns_clauses: Vec::new(),
    payoff_details: PayoffDetails::EMPTY,
};

impl Default for AnalysisResult {
    fn default() -> Self {
        DEFAULT_ANALYSIS_RESULT
    }
}

impl AnalysisResult {
    /// True when nothing was extracted, which is also what a voided batch looks like
    pub fn is_empty(&self) -> bool {
        self.control_governance_clauses.is_empty()
            && self.cashflow_returns_clauses.is_empty()
            && self.payoff_details == PayoffDetails::EMPTY
    }
}

/// One of the three independent analysis dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    /// Control and governance clauses
    Control,
    /// Cashflow and economics clauses
    Economics,
    /// Payoff and security structure
    Security,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Facet::Control, Facet::Economics, Facet::Security];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Control => "control",
            Facet::Economics => "economics",
            Facet::Security => "security",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single batch invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    NotStarted,
    RequestsBuilt,
    StreamsEstablished,
    Aggregated,
    Decoded,
    Consolidated,
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchStage::NotStarted => "not started",
            BatchStage::RequestsBuilt => "requests built",
            BatchStage::StreamsEstablished => "streams established",
            BatchStage::Aggregated => "aggregated",
            BatchStage::Decoded => "decoded",
            BatchStage::Consolidated => "consolidated",
        };
        f.write_str(name)
    }
}

/// Reasons a batch degrades to `DEFAULT_ANALYSIS_RESULT`
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("no generative-language credential configured")]
    ConfigurationMissing,

    #[error("{facet} stream could not be established: {source}")]
    Establishment {
        facet: Facet,
        #[source]
        source: LLMError,
    },

    #[error("{facet} stream failed while reading: {source}")]
    Aggregation {
        facet: Facet,
        #[source]
        source: LLMError,
    },

    #[error("{facet} channel exceeded its {seconds}s deadline")]
    Timeout { facet: Facet, seconds: u64 },
}

impl AnalysisError {
    /// The channel that voided the batch, if any
    pub fn facet(&self) -> Option<Facet> {
        match self {
            AnalysisError::ConfigurationMissing => None,
            AnalysisError::Establishment { facet, .. }
            | AnalysisError::Aggregation { facet, .. }
            | AnalysisError::Timeout { facet, .. } => Some(*facet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_result_is_empty() {
        let result = AnalysisResult::default();
        assert_eq!(result, DEFAULT_ANALYSIS_RESULT);
        assert!(result.is_empty());
        assert_eq!(result.payoff_details, PayoffDetails::default());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let value = serde_json::to_value(&DEFAULT_ANALYSIS_RESULT).unwrap();
        assert!(value["controlGovernanceClauses"].as_array().unwrap().is_empty());
        assert!(value["cashflowReturnsClauses"].as_array().unwrap().is_empty());

        let payoff = value["payoffDetails"].as_object().unwrap();
        assert_eq!(payoff.len(), 17);
        assert!(payoff.values().all(|v| v.is_null()));
        assert!(payoff.contains_key("liquidationPreferenceMultiple"));
        assert!(payoff.contains_key("interestConvertsToEquity"));
    }

    #[test]
    fn test_payoff_details_missing_fields_are_none() {
        let details: PayoffDetails =
            serde_json::from_str(r#"{"securityType": "Series A Preferred", "preMoneyValuation": 20000000}"#)
                .unwrap();
        assert_eq!(details.security_type.as_deref(), Some("Series A Preferred"));
        assert_eq!(details.pre_money_valuation, Some(20_000_000.0));
        assert_eq!(details.post_money_valuation, None);
        assert_eq!(details.is_participating_preferred, None);
    }

    #[test]
    fn test_analysis_error_reports_facet() {
        let err = AnalysisError::Timeout {
            facet: Facet::Economics,
            seconds: 30,
        };
        assert_eq!(err.facet(), Some(Facet::Economics));
        assert_eq!(err.to_string(), "economics channel exceeded its 30s deadline");
        assert_eq!(AnalysisError::ConfigurationMissing.facet(), None);
    }
}
