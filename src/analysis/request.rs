use serde::{Deserialize, Serialize};

use super::Facet;
use crate::config::{FacetConfig, FacetsConfig};
use crate::llm::ChatMessage;

/// Output format requested from the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

/// One generation request, built fresh for every batch
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub facet: Facet,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// -1 lets the model pick its own thinking budget
    pub thinking_budget: i32,
    pub system_instruction: String,
    pub response_format: ResponseFormat,
    pub contents: Vec<ChatMessage>,
}

/// System instructions for the three facets, loaded once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPrompts {
    pub control: String,
    pub economics: String,
    pub security: String,
}

impl FacetPrompts {
    pub fn new(
        control: impl Into<String>,
        economics: impl Into<String>,
        security: impl Into<String>,
    ) -> Self {
        Self {
            control: control.into(),
            economics: economics.into(),
            security: security.into(),
        }
    }

    pub fn for_facet(&self, facet: Facet) -> &str {
        match facet {
            Facet::Control => &self.control,
            Facet::Economics => &self.economics,
            Facet::Security => &self.security,
        }
    }
}

/// The three requests of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBatch {
    pub control: RequestSpec,
    pub economics: RequestSpec,
    pub security: RequestSpec,
}

impl RequestBatch {
    pub fn iter(&self) -> impl Iterator<Item = &RequestSpec> {
        [&self.control, &self.economics, &self.security].into_iter()
    }
}

/// Build the control, economics and security requests for `extracted_text`.
///
/// The text is passed through verbatim as a single user message shared by
/// all three requests. Empty text is accepted; rejecting it is up to the caller.
pub fn build_requests(
    extracted_text: &str,
    prompts: &FacetPrompts,
    facets: &FacetsConfig,
) -> RequestBatch {
    let contents = vec![ChatMessage::user(extracted_text)];

    let build = |facet: Facet| {
        let config: &FacetConfig = facets.for_facet(facet);
        RequestSpec {
            facet,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
            thinking_budget: config.thinking_budget,
            system_instruction: prompts.for_facet(facet).to_string(),
            response_format: ResponseFormat::Json,
            contents: contents.clone(),
        }
    };

    RequestBatch {
        control: build(Facet::Control),
        economics: build(Facet::Economics),
        security: build(Facet::Security),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> FacetPrompts {
        FacetPrompts::new("control prompt", "economics prompt", "security prompt")
    }

    #[test]
    fn test_builds_three_facets_with_default_parameters() {
        let batch = build_requests("TERM SHEET", &prompts(), &FacetsConfig::default());

        assert_eq!(batch.control.facet, Facet::Control);
        assert_eq!(batch.control.model, "gemini-2.5-flash");
        assert_eq!(batch.control.temperature, 0.3);
        assert_eq!(batch.control.max_output_tokens, 7500);
        assert_eq!(batch.control.system_instruction, "control prompt");

        assert_eq!(batch.economics.model, "gemini-2.5-flash");
        assert_eq!(batch.economics.temperature, 0.3);
        assert_eq!(batch.economics.max_output_tokens, 10000);
        assert_eq!(batch.economics.system_instruction, "economics prompt");

        assert_eq!(batch.security.model, "gemini-2.5-flash-lite");
        assert_eq!(batch.security.temperature, 0.2);
        assert_eq!(batch.security.max_output_tokens, 10000);
        assert_eq!(batch.security.system_instruction, "security prompt");

        assert!(batch.iter().all(|r| r.response_format == ResponseFormat::Json));
    }

    #[test]
    fn test_user_content_is_shared_and_verbatim() {
        let text = "  Series A\n\nLiquidation preference: 1x non-participating  ";
        let batch = build_requests(text, &prompts(), &FacetsConfig::default());

        for request in batch.iter() {
            assert_eq!(request.contents, vec![ChatMessage::user(text)]);
        }
    }

    #[test]
    fn test_empty_text_is_accepted() {
        let batch = build_requests("", &prompts(), &FacetsConfig::default());
        assert_eq!(batch.security.contents[0].content, "");
    }
}
