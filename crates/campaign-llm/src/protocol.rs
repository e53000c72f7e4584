//! Gemini `generateContent` wire types and structured-result decoding.
//!
//! # Example request
//! ```json
//! {
//!   "contents": [{ "role": "user", "parts": [{ "text": "..." }] }],
//!   "generationConfig": {
//!     "responseMimeType": "application/json",
//!     "responseSchema": { "type": "OBJECT", "properties": { ... } }
//!   }
//! }
//! ```

use campaign_core::MessageDraft;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text("user", text)],
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Ask for a JSON body matching `schema`.
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        });
        self
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![Part {
                text: Some(text.into()),
            }],
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftPayload {
    subject: Option<String>,
    content: Option<String>,
    compliance_score: Option<f64>,
    ai_confidence: Option<f64>,
    compliance_analysis: Option<String>,
    strategy_logic: Option<String>,
}

/// Decode the structured JSON body into a draft. Any missing field or
/// out-of-range score is a malformed response.
pub fn decode_draft(text: &str) -> Result<MessageDraft> {
    let payload: DraftPayload = serde_json::from_str(text)
        .map_err(|e| ServiceError::malformed(format!("unparsable draft JSON: {e}")))?;

    Ok(MessageDraft {
        subject: required_text(payload.subject, "subject")?,
        content: required_text(payload.content, "content")?,
        compliance_score: score(payload.compliance_score, "complianceScore")?,
        ai_confidence: score(payload.ai_confidence, "aiConfidence")?,
        compliance_analysis: required_text(payload.compliance_analysis, "complianceAnalysis")?,
        strategy_logic: required_text(payload.strategy_logic, "strategyLogic")?,
    })
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServiceError::malformed(format!("missing field '{field}'")))
}

fn score(value: Option<f64>, field: &str) -> Result<u8> {
    let value = value.ok_or_else(|| ServiceError::malformed(format!("missing field '{field}'")))?;
    if value.fract() != 0.0 {
        return Err(ServiceError::malformed(format!(
            "'{field}' is not a whole number: {value}"
        )));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(ServiceError::malformed(format!(
            "'{field}' out of range: {value}"
        )));
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;

    const VALID: &str = r#"{
        "subject": "A card that travels with you",
        "content": "Hi Asha, ...",
        "complianceScore": 92,
        "aiConfidence": 81,
        "complianceAnalysis": "APR disclosed",
        "strategyLogic": "Frequent traveller"
    }"#;

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest::user_text("hello")
            .with_json_schema(serde_json::json!({"type": "OBJECT"}))
            .with_system_instruction("be brief");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(value["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn decode_valid_draft() {
        let draft = decode_draft(VALID).unwrap();
        assert_eq!(draft.compliance_score, 92);
        assert_eq!(draft.ai_confidence, 81);
        assert_eq!(draft.strategy_logic, "Frequent traveller");
    }

    #[test]
    fn decode_rejects_missing_field() {
        let err = decode_draft(r#"{"subject": "s", "content": "c", "complianceScore": 90}"#)
            .unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::MalformedResponse);
        assert!(!err.retryable);
        assert!(err.message.contains("aiConfidence"));
    }

    #[test]
    fn decode_rejects_out_of_range_score() {
        let text = VALID.replace("\"complianceScore\": 92", "\"complianceScore\": 140");
        let err = decode_draft(&text).unwrap_err();
        assert!(err.message.contains("complianceScore"));
    }

    #[test]
    fn decode_rejects_fractional_score() {
        let text = VALID.replace("\"complianceScore\": 92", "\"complianceScore\": 87.6");
        let err = decode_draft(&text).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::MalformedResponse);
        assert!(err.message.contains("whole number"));
    }

    #[test]
    fn decode_accepts_integral_float_score() {
        let text = VALID.replace("\"complianceScore\": 92", "\"complianceScore\": 92.0");
        let draft = decode_draft(&text).unwrap();
        assert_eq!(draft.compliance_score, 92);
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode_draft("Sure! Here is your message").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::MalformedResponse);
    }
}
