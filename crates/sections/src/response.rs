//! Reading structuring-service responses.
//!
//! Model output is rarely bare JSON: it arrives wrapped in Markdown code fences, preceded by a
//! sentence of prose, or not as JSON at all. This module digs out the JSON object when there is
//! one and otherwise keeps the text through the fallback record.

use crate::fallback::{empty_structure, fallback_structure};
use crate::format::DocumentFormat;
use crate::normalize::normalize_structured_data;
use crate::sections::MedicalSections;
use serde_json::Value;

/// Locates the JSON object inside a model response.
///
/// Fenced blocks tagged `json` are searched first, then any other fenced block, then the whole
/// response. Within each candidate the slice from the first `{` to the last `}` is taken.
/// Returns `None` when no candidate holds such a slice.
pub fn extract_json_block(response: &str) -> Option<&str> {
    let blocks = fenced_blocks(response);

    let tagged = blocks
        .iter()
        .filter(|(info, _)| info.eq_ignore_ascii_case("json"))
        .map(|(_, content)| *content);
    let untagged = blocks
        .iter()
        .filter(|(info, _)| !info.eq_ignore_ascii_case("json"))
        .map(|(_, content)| *content);

    tagged
        .chain(untagged)
        .chain(std::iter::once(response))
        .find_map(object_span)
}

/// Slice from the first `{` to the last `}`.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Splits out fenced code blocks as `(info string, contents)` pairs, in order.
///
/// An unterminated fence runs to the end of the response.
fn fenced_blocks(response: &str) -> Vec<(&str, &str)> {
    let mut blocks = Vec::new();
    let mut rest = response;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let (info, content) = match after_fence.find('\n') {
            Some(newline) => (&after_fence[..newline], &after_fence[newline + 1..]),
            None => (after_fence, ""),
        };
        match content.find("```") {
            Some(close) => {
                blocks.push((info.trim(), &content[..close]));
                rest = &content[close + 3..];
            }
            None => {
                blocks.push((info.trim(), content));
                break;
            }
        }
    }

    blocks
}

/// Turns a raw structuring response into a canonical record.
///
/// - blank responses yield the empty structure for the hinted format
/// - a decodable JSON object is normalised with the role hint
/// - anything else is kept verbatim (trimmed) in the fallback record
pub fn parse_structuring_response(response: &str, role: Option<&str>) -> MedicalSections {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        let format = role.and_then(DocumentFormat::from_hint).unwrap_or_default();
        return empty_structure(format);
    }

    if let Some(block) = extract_json_block(trimmed) {
        match serde_json::from_str::<Value>(block) {
            Ok(parsed @ Value::Object(_)) => return normalize_structured_data(&parsed, role),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("structuring response JSON did not parse: {}", e);
            }
        }
    }

    tracing::warn!(
        chars = trimmed.len(),
        "structuring response held no JSON object; using fallback structure"
    );
    fallback_structure(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SoapSections;

    #[test]
    fn extracts_plain_object() {
        assert_eq!(extract_json_block(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn extracts_from_code_fence() {
        let response = "Here is the note:\n```json\n{\"subjective\": \"x\"}\n```\nThanks";
        assert_eq!(extract_json_block(response), Some("{\"subjective\": \"x\"}"));
    }

    #[test]
    fn extracts_from_unterminated_fence() {
        let response = "```\n{\"plan\": \"rest\"}";
        assert_eq!(extract_json_block(response), Some("{\"plan\": \"rest\"}"));
    }

    #[test]
    fn prefers_json_fence_over_earlier_blocks() {
        let response = "```text\npatient well\n```\n```json\n{\"plan\": \"rest\"}\n```";
        assert_eq!(extract_json_block(response), Some("{\"plan\": \"rest\"}"));
    }

    #[test]
    fn searches_whole_response_when_fences_hold_no_object() {
        let response = "{\"subjective\":\"x\",\"objective\":\"y\"}\n```";
        assert_eq!(
            extract_json_block(response),
            Some("{\"subjective\":\"x\",\"objective\":\"y\"}")
        );
    }

    #[test]
    fn trailing_fence_keeps_soap_structure() {
        let response = "{\"subjective\":\"x\",\"objective\":\"y\"}\n```";
        match parse_structuring_response(response, None) {
            MedicalSections::Soap(soap) => {
                assert_eq!(soap.subjective, "x");
                assert_eq!(soap.objective, "y");
            }
            other => panic!("expected SOAP, got {:?}", other),
        }
    }

    #[test]
    fn text_block_before_json_block_keeps_soap_structure() {
        let response = "```text\npatient well\n```\n\
                        ```json\n{\"subjective\": \"cough\", \"objective\": \"clear\"}\n```";
        let sections = parse_structuring_response(response, None);
        assert!(matches!(sections, MedicalSections::Soap(_)), "{:?}", sections);
    }

    #[test]
    fn no_object_returns_none() {
        assert_eq!(extract_json_block("just words"), None);
        assert_eq!(extract_json_block("} backwards {"), None);
    }

    #[test]
    fn parses_fenced_soap_response() {
        let response = "```json\n{\"subjective\": \"x\", \"objective\": \"y\"}\n```";
        assert_eq!(
            parse_structuring_response(response, None),
            MedicalSections::Soap(SoapSections {
                subjective: "x".into(),
                objective: "y".into(),
                ..SoapSections::default()
            })
        );
    }

    #[test]
    fn prose_response_falls_back() {
        let response = "  Patient reports cough for three days.  ";
        assert_eq!(
            parse_structuring_response(response, Some("soap")),
            fallback_structure("Patient reports cough for three days.")
        );
    }

    #[test]
    fn broken_json_falls_back_with_full_text() {
        let response = "{\"subjective\": \"x\", ";
        assert_eq!(
            parse_structuring_response(response, None),
            fallback_structure(response.trim())
        );
    }

    #[test]
    fn blank_response_yields_empty_structure() {
        assert_eq!(
            parse_structuring_response("   ", Some("prescription")),
            empty_structure(DocumentFormat::Prescription)
        );
    }
}
