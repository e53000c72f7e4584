//! Google Gemini generator implementation.

use async_trait::async_trait;
use campaign_core::{CustomerRecord, MessageDraft, SynthesisConfig, Tone, DEFAULT_API_BASE, DEFAULT_MODEL};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result, ServiceError};
use crate::generator::MessageGenerator;
use crate::prompt;
use crate::protocol::{decode_draft, GenerateContentRequest, GenerateContentResponse};

pub const CREDENTIAL_VAR: &str = "API_KEY";

pub const LEAD_STRATEGY_UNAVAILABLE: &str = "Strategy engine temporarily offline.";
pub const LEAD_STRATEGY_EMPTY: &str = "No strategy available at this time.";

/// Single-shot marketing copy request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingRequest {
    pub prompt: String,
    pub tone: Tone,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingContent {
    #[serde(default)]
    pub subject: Option<String>,
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Google Gemini API generator.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    /// Create a generator; a blank key is rejected here rather than on first use.
    pub fn new(api_key: impl Into<String>) -> std::result::Result<Self, ConfigurationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential(CREDENTIAL_VAR));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn from_config(config: &SynthesisConfig) -> std::result::Result<Self, ConfigurationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigurationError::MissingCredential(CREDENTIAL_VAR))?;
        Ok(Self::new(api_key)?
            .with_base_url(config.api_base_or_default())
            .with_model(config.model_or_default()))
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::debug!("Gemini returned HTTP {}: {}", status, body);
            return Err(classify_status(status, &body));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ServiceError::malformed(format!("unreadable response envelope: {e}")))
    }

    /// One block of marketing copy, outside any batch.
    pub async fn generate_marketing_content(
        &self,
        request: &MarketingRequest,
    ) -> Result<MarketingContent> {
        let body = GenerateContentRequest::user_text(prompt::marketing_prompt(
            &request.prompt,
            request.tone,
            &request.channel,
        ))
        .with_json_schema(prompt::marketing_response_schema());

        let text = self
            .generate(&body)
            .await?
            .text()
            .ok_or_else(|| ServiceError::malformed("empty marketing response"))?;
        serde_json::from_str(&text)
            .map_err(|e| ServiceError::malformed(format!("unparsable marketing JSON: {e}")))
    }

    /// Free-text follow-up advice for a lead. Never fails: service problems
    /// degrade to a fixed notice.
    pub async fn analyze_lead_strategy(&self, lead: &str) -> String {
        let body = GenerateContentRequest::user_text(prompt::lead_strategy_prompt(lead))
            .with_system_instruction(prompt::LEAD_ADVISOR_INSTRUCTION);

        match self.generate(&body).await {
            Ok(response) => response
                .text()
                .unwrap_or_else(|| LEAD_STRATEGY_EMPTY.to_string()),
            Err(error) => {
                log::error!("Lead strategy analysis failed: {}", error);
                LEAD_STRATEGY_UNAVAILABLE.to_string()
            }
        }
    }
}

#[async_trait]
impl MessageGenerator for GeminiGenerator {
    async fn synthesize(
        &self,
        record: &CustomerRecord,
        objective: &str,
        tone: Tone,
    ) -> Result<MessageDraft> {
        let body = GenerateContentRequest::user_text(prompt::synthesis_prompt(record, objective, tone))
            .with_json_schema(prompt::draft_response_schema());

        log::debug!(
            "Requesting draft for {} (row {}) from {}",
            record.id(),
            record.row_number(),
            self.model
        );

        let text = self
            .generate(&body)
            .await?
            .text()
            .ok_or_else(|| ServiceError::malformed("empty draft response"))?;
        decode_draft(&text)
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let summary = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
    match status {
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limited(summary),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ServiceError::transient(summary),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::authentication(summary),
        StatusCode::BAD_REQUEST if reports_invalid_key(body) => {
            ServiceError::authentication(summary)
        }
        _ => ServiceError::api(summary),
    }
}

fn reports_invalid_key(body: &str) -> bool {
    body.contains("API_KEY_INVALID") || body.contains("API key not valid")
}

fn transport_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::timeout(error.to_string())
    } else if error.is_connect() || error.is_request() {
        ServiceError::transient(error.to_string())
    } else {
        ServiceError::api(error.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;

    #[test]
    fn test_new_generator() {
        let generator = GeminiGenerator::new("test_key").unwrap();
        assert_eq!(generator.api_key, "test_key");
        assert_eq!(generator.base_url, DEFAULT_API_BASE);
        assert_eq!(generator.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_blank_key_is_configuration_error() {
        assert_eq!(
            GeminiGenerator::new("  ").unwrap_err(),
            ConfigurationError::MissingCredential(CREDENTIAL_VAR)
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = SynthesisConfig::default();
        assert!(matches!(
            GeminiGenerator::from_config(&config),
            Err(ConfigurationError::MissingCredential(_))
        ));

        let config = SynthesisConfig {
            api_key: Some("k".to_string()),
            model: Some("gemini-custom".to_string()),
            api_base: Some("https://proxy.example/v1/".to_string()),
            ..Default::default()
        };
        let generator = GeminiGenerator::from_config(&config).unwrap();
        assert_eq!(generator.model(), "gemini-custom");
        assert_eq!(
            generator.endpoint(),
            "https://proxy.example/v1/models/gemini-custom:generateContent"
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "").kind,
            ServiceErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "").kind,
            ServiceErrorKind::Transient
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, "").kind,
            ServiceErrorKind::Authentication
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, r#"{"reason":"API_KEY_INVALID"}"#).kind,
            ServiceErrorKind::Authentication
        );
        let other = classify_status(StatusCode::BAD_REQUEST, "bad schema");
        assert_eq!(other.kind, ServiceErrorKind::Api);
        assert!(!other.retryable);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
