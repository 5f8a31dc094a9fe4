use serde::de::DeserializeOwned;
use tracing::warn;

/// Why a response could not be decoded. Never escapes `safe_parse_json`.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("response was empty")]
    Empty,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Remove a leading "```json" fence and a trailing "```" fence, if present.
///
/// Input without fences is returned unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut content = raw;

    if let Some(rest) = content.strip_prefix("```json") {
        content = rest.trim_start();
    }
    if let Some(rest) = content.trim_end().strip_suffix("```") {
        content = rest.trim_end();
    }

    content
}

/// Decode `raw` as `T` after fence stripping
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}

/// Decode `raw` as `T`, falling back to `default` on any failure.
///
/// Failures are logged and absorbed; the caller always gets a value.
pub fn safe_parse_json<T: DeserializeOwned>(raw: &str, default: T) -> T {
    match decode_json(raw) {
        Ok(value) => value,
        Err(DecodeError::Empty) => {
            warn!("Attempted to parse empty JSON response, using default");
            default
        }
        Err(e) => {
            warn!("Failed to parse JSON response: {}", e);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Clause, PayoffDetails};

    #[test]
    fn test_strip_code_fence_with_markdown() {
        let input = "```json\n[{\"name\": \"Board Composition\", \"summary\": \"2 of 5 seats\"}]\n```";
        assert_eq!(
            strip_code_fence(input),
            "[{\"name\": \"Board Composition\", \"summary\": \"2 of 5 seats\"}]"
        );
    }

    #[test]
    fn test_strip_code_fence_without_markdown() {
        let input = "{\"securityType\": \"SAFE\"}";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_fenced_and_bare_decode_identically() {
        let inner = r#"[{"name": "Protective Provisions", "summary": "Series A majority consent"}]"#;
        let fenced = format!("```json\n{}\n```", inner);

        let from_fenced: Vec<Clause> = decode_json(&fenced).unwrap();
        let from_bare: Vec<Clause> = decode_json(inner).unwrap();
        assert_eq!(from_fenced, from_bare);
        assert_eq!(from_bare[0].name, "Protective Provisions");
    }

    #[test]
    fn test_empty_string_returns_default() {
        let default = vec![Clause::new("sentinel", "unchanged")];
        let parsed: Vec<Clause> = safe_parse_json("", default.clone());
        assert_eq!(parsed, default);
        assert!(matches!(decode_json::<Vec<Clause>>(""), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_malformed_json_returns_default() {
        let parsed = safe_parse_json("[{\"name\": \"Board\"", Vec::<Clause>::new());
        assert!(parsed.is_empty());

        let parsed = safe_parse_json("not json at all", PayoffDetails::EMPTY);
        assert_eq!(parsed, PayoffDetails::EMPTY);
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        // An object where a list of clauses is expected
        let parsed = safe_parse_json(r#"{"name": "Board", "summary": "x"}"#, Vec::<Clause>::new());
        assert!(parsed.is_empty());

        // A string where a number is expected
        let payoff = safe_parse_json(r#"{"preMoneyValuation": "twenty million"}"#, PayoffDetails::EMPTY);
        assert_eq!(payoff, PayoffDetails::EMPTY);
    }

    #[test]
    fn test_payoff_details_decode() {
        let raw = "```json\n{\"securityType\": \"Series Seed Preferred\", \"liquidationPreferenceMultiple\": 1, \"isParticipatingPreferred\": false, \"optionPoolTiming\": \"pre-money\"}\n```";
        let payoff = safe_parse_json(raw, PayoffDetails::EMPTY);
        assert_eq!(payoff.security_type.as_deref(), Some("Series Seed Preferred"));
        assert_eq!(payoff.liquidation_preference_multiple, Some(1.0));
        assert_eq!(payoff.is_participating_preferred, Some(false));
        assert_eq!(payoff.option_pool_timing.as_deref(), Some("pre-money"));
        assert_eq!(payoff.safe_valuation_cap, None);
    }
}
