//! JSON parsing helpers for completion responses
//!
//! Completion models often wrap the JSON payload in prose or code fences, so
//! the payload is cut out between the outermost brackets before parsing.

use tracing::warn;

use crate::error::{Error, Result};

use super::types::ExtractedTag;

/// Shorten raw model output for error messages and logs
fn truncate(raw: &str) -> String {
    const MAX: usize = 200;
    match raw.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

/// Cut out the JSON array between the first `[` and the last `]`
pub fn extract_json_array(response: &str) -> Result<&str> {
    let response = response.trim();
    match (response.find('['), response.rfind(']')) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::InvalidData(format!(
            "No JSON array found in AI response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Parse extracted tags from a completion response
///
/// Malformed or missing JSON yields an empty list. Entries with a blank name
/// are dropped.
pub fn parse_tag_list(response: &str) -> Vec<ExtractedTag> {
    let parsed = extract_json_array(response).and_then(|json| {
        serde_json::from_str::<Vec<ExtractedTag>>(json).map_err(|e| {
            Error::InvalidData(format!("Invalid tag JSON from AI: {} | Raw: {}", e, truncate(json)))
        })
    });

    match parsed {
        Ok(tags) => tags
            .into_iter()
            .map(|t| ExtractedTag {
                name: t.name.trim().to_string(),
                category: t.category.map(|c| c.trim().to_string()),
            })
            .filter(|t| !t.name.is_empty())
            .collect(),
        Err(e) => {
            warn!(error = %e, "Could not parse tags from completion");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list_plain_array() {
        let tags = parse_tag_list(r#"[{"name": "등산", "category": "취미"}]"#);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "등산");
        assert_eq!(tags[0].category.as_deref(), Some("취미"));
    }

    #[test]
    fn test_parse_tag_list_with_surrounding_text() {
        let response = "다음은 추출된 태그입니다:\n```json\n[\n  {\"name\": \"두통\", \"category\": \"몸에 나타나는 증상\"},\n  {\"name\": \"친구\"}\n]\n```";
        let tags = parse_tag_list(response);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].name, "친구");
        assert!(tags[1].category.is_none());
    }

    #[test]
    fn test_parse_tag_list_malformed_is_empty() {
        assert!(parse_tag_list("태그가 없습니다").is_empty());
        assert!(parse_tag_list("[{\"name\": ").is_empty());
        assert!(parse_tag_list("] backwards [").is_empty());
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn test_parse_tag_list_drops_blank_names() {
        let tags = parse_tag_list(r#"[{"name": "  "}, {"name": " 산책 "}]"#);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "산책");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "가".repeat(300);
        let short = truncate(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 203);
    }
}
