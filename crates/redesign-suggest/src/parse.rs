use serde::{Deserialize, Serialize};

use crate::error::RedesignError;

/// One service as proposed by the generator. Names are unchecked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawMicroservice {
    pub name: String,
    #[serde(default)]
    pub functionality: String,
    pub data_models: Vec<String>,
}

/// Generator output after decoding, before any validation against the resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawRecommendationOutput {
    pub microservices: Vec<RawMicroservice>,
}

/// Decode raw generator output. Tolerates surrounding whitespace and a single
/// Markdown code fence; anything else that is not the expected shape is `BadFormat`.
pub fn parse_recommendation(raw: &str) -> Result<RawRecommendationOutput, RedesignError> {
    let json_str = strip_code_fences(raw);
    serde_json::from_str(json_str).map_err(|source| RedesignError::BadFormat {
        raw: raw.to_string(),
        source,
    })
}

/// Strip markdown code fences (```json ... ```) from the response.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let Some(nl) = text.find('\n') else {
        return text;
    };
    let after_open = &text[nl + 1..];
    match after_open.rfind("```") {
        Some(close) => after_open[..close].trim(),
        None => after_open.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expected_shape() {
        let raw = r#"{"microservices": [
            {"name": "Sales", "functionality": "Takes orders", "dataModels": ["Order", "Customer"]},
            {"name": "Orgs", "dataModels": []}
        ]}"#;

        let out = parse_recommendation(raw).unwrap();
        assert_eq!(out.microservices.len(), 2);
        assert_eq!(out.microservices[0].data_models, vec!["Order", "Customer"]);
        assert_eq!(out.microservices[1].functionality, "");
    }

    #[test]
    fn code_fenced_output_is_accepted() {
        let raw = "```json\n{\"microservices\": [{\"name\": \"A\", \"functionality\": \"\", \"dataModels\": [\"x\"]}]}\n```\n";
        let out = parse_recommendation(raw).unwrap();
        assert_eq!(out.microservices[0].name, "A");
    }

    #[test]
    fn invalid_json_keeps_the_raw_payload() {
        match parse_recommendation("{not json") {
            Err(RedesignError::BadFormat { raw, .. }) => assert_eq!(raw, "{not json"),
            other => panic!("expected BadFormat, got {other:?}"),
        }
    }

    #[test]
    fn missing_microservices_list_is_bad_format() {
        let err = parse_recommendation(r#"{"services": []}"#).unwrap_err();
        assert!(matches!(err, RedesignError::BadFormat { .. }));
    }

    #[test]
    fn wrong_data_models_type_is_bad_format() {
        let raw = r#"{"microservices": [{"name": "A", "dataModels": "Order"}]}"#;
        assert!(matches!(
            parse_recommendation(raw),
            Err(RedesignError::BadFormat { .. })
        ));
    }

    #[test]
    fn json_null_is_bad_format() {
        assert!(matches!(
            parse_recommendation("null"),
            Err(RedesignError::BadFormat { .. })
        ));
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("  {}  "), "{}");
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}"), "{}");
        assert_eq!(strip_code_fences("```"), "```");
    }
}
