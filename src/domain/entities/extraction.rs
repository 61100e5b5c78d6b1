use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One structured record pulled from a page by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub page: usize,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub document: String,
    pub pages_total: usize,
    pub pages_succeeded: usize,
    pub records: Vec<ExtractedRecord>,
    pub warnings: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Tags and fences models tend to echo back from the extraction prompt.
const PROMPT_ARTIFACTS: &[&str] = &[
    "```json",
    "```",
    "\\_",
    "<text>",
    "</text>",
    "<instruction>",
    "</instruction>",
    "<output>",
    "</output>",
    "###END###",
];

/// Isolates the JSON array in a raw model response.
///
/// Takes the span from the first `[` to the last `]` when there is one,
/// otherwise strips prompt artifacts and returns what is left.
pub fn clean_response(response: &str) -> String {
    if response.trim().is_empty() {
        return "[]".to_string();
    }

    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        if end > start {
            return response[start..=end].to_string();
        }
    }

    PROMPT_ARTIFACTS
        .iter()
        .fold(response.to_string(), |text, artifact| text.replace(artifact, ""))
        .trim()
        .to_string()
}

/// Parses a model response into records, dropping non-object entries and
/// entries whose `marker_field` contains `example_marker`.
pub fn parse_records(
    response: &str,
    marker_field: &str,
    example_marker: &str,
) -> Result<Vec<Map<String, Value>>, serde_json::Error> {
    let items: Vec<Value> = serde_json::from_str(&clean_response(response))?;

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .filter(|map| {
            example_marker.is_empty()
                || !map
                    .get(marker_field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.contains(example_marker))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_response_takes_outer_array() {
        let raw = "Here you go:\n```json\n[{\"number\": \"1\"}]\n```\nDone.";
        assert_eq!(clean_response(raw), "[{\"number\": \"1\"}]");
    }

    #[test]
    fn test_clean_response_empty() {
        assert_eq!(clean_response("  "), "[]");
    }

    #[test]
    fn test_clean_response_strips_artifacts() {
        assert_eq!(clean_response("<output>{}</output>###END###"), "{}");
    }

    #[test]
    fn test_parse_records_filters_examples() {
        let raw = r#"[
            {"number": "123", "description": "Example budget approval"},
            {"number": "77", "description": "Appointment of the director"},
            "stray string"
        ]"#;

        let records = parse_records(raw, "description", "Example").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["number"], "77");
    }

    #[test]
    fn test_parse_records_invalid_json() {
        assert!(parse_records("no data on this page", "description", "Example").is_err());
    }

    #[test]
    fn test_parse_records_without_marker_keeps_all() {
        let raw = r#"[{"description": "Example"}]"#;
        assert_eq!(parse_records(raw, "description", "").unwrap().len(), 1);
    }
}
